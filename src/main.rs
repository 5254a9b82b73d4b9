// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{LevelFilter, info, warn};
use std::path::PathBuf;
use std::sync::Arc;

use scitrans::app_config::{Config, TranslationMode};
use scitrans::parsing::{ParseOptions, ParsingClient};
use scitrans::pipeline::TranslationPipeline;
use scitrans::render::DocumentRenderer;
use scitrans::storage::JobStore;

/// CLI wrapper for TranslationMode to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliMode {
    Fast,
    Ai,
    Hybrid,
}

impl From<CliMode> for TranslationMode {
    fn from(mode: CliMode) -> Self {
        match mode {
            CliMode::Fast => TranslationMode::Fast,
            CliMode::Ai => TranslationMode::Ai,
            CliMode::Hybrid => TranslationMode::Hybrid,
        }
    }
}

/// CLI wrapper for the log level
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LevelFilter {
    fn from(level: CliLogLevel) -> Self {
        match level {
            CliLogLevel::Error => LevelFilter::Error,
            CliLogLevel::Warn => LevelFilter::Warn,
            CliLogLevel::Info => LevelFilter::Info,
            CliLogLevel::Debug => LevelFilter::Debug,
            CliLogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// scitrans - scientific document translation
///
/// Parses an academic PDF, translates it with math-aware formatting, and
/// renders the result back to PDF.
#[derive(Parser, Debug)]
#[command(name = "scitrans")]
#[command(version = "0.1.0")]
#[command(about = "Translate academic documents with math-aware formatting")]
#[command(long_about = "scitrans parses an academic PDF through an external parsing service, \
translates the text chunk by chunk, repairs mathematical notation, and renders a translated PDF.

EXAMPLES:
    scitrans paper.pdf                        # Hybrid translation using conf.json
    scitrans -m fast paper.pdf                # Fast backend only
    scitrans -s EN -t ZH paper.pdf            # Explicit language pair
    scitrans --end-pages 5 paper.pdf          # Parse only the first five pages
    scitrans parsed.md -o out.pdf             # Skip parsing, translate markdown directly

CONFIGURATION:
    Configuration is stored in conf.json by default. Missing values fall back
    to built-in defaults; backend endpoints must be configured for the chosen
    translation mode.")]
struct CommandLineOptions {
    /// Input PDF, or already-parsed Markdown to translate directly
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Output PDF path; defaults to the input name with a .translated.pdf
    /// suffix
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Translation mode
    #[arg(short, long, value_enum)]
    mode: Option<CliMode>,

    /// Source language code (e.g. 'EN')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g. 'ZH')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Parse only the first N pages
    #[arg(long)]
    end_pages: Option<u32>,

    /// Force OCR even for born-digital PDFs
    #[arg(long)]
    ocr: bool,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let options = CommandLineOptions::parse();

    let level = options
        .log_level
        .clone()
        .map(LevelFilter::from)
        .unwrap_or(LevelFilter::Info);
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp_millis()
        .init();

    let mut config = if std::path::Path::new(&options.config_path).is_file() {
        Config::from_file(&options.config_path)?
    } else {
        warn!(
            "config file {} not found, using built-in defaults",
            options.config_path
        );
        Config::default()
    };
    if let Some(mode) = options.mode.clone() {
        config.mode = mode.into();
    }
    if let Some(lang) = options.source_language.clone() {
        config.source_language = lang;
    }
    if let Some(lang) = options.target_language.clone() {
        config.target_language = lang;
    }

    run(options, config).await
}

async fn run(options: CommandLineOptions, config: Config) -> Result<()> {
    let store = JobStore::create()?;

    let markdown = load_source(&options, &config).await?;
    if markdown.trim().is_empty() {
        return Err(anyhow!("input document produced no text"));
    }
    store.save_source(&markdown)?;

    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::with_template("{spinner} translating [{bar:30}] {pos}/{len} chunks")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    let progress_handle = progress.clone();
    let pipeline = TranslationPipeline::from_config(&config)?.progress(Arc::new(
        move |done, total| {
            progress_handle.set_length(total as u64);
            progress_handle.set_position(done as u64);
        },
    ));

    let outcome = pipeline.translate_document(&markdown).await?;
    progress.finish_and_clear();
    store.save_translation(&outcome.text)?;

    if !outcome.completeness.complete {
        warn!(
            "translation may be incomplete: {} of {} source words untranslated",
            outcome.completeness.residual_words, outcome.completeness.source_words
        );
    }
    if outcome.chunks_missed > 0 {
        warn!(
            "{} of {} chunks kept their source text (deadline)",
            outcome.chunks_missed, outcome.chunks_total
        );
    }

    let title = options
        .input_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "translated document".to_string());
    let renderer = DocumentRenderer::new(config.render.clone());
    let rendered = renderer.render(&outcome.text, &title)?;
    if rendered.diagnostics.degraded {
        warn!("rendered with built-in fonts only; non-Latin text was dropped");
    }
    store.save_pdf(&rendered.bytes)?;

    let output_path = options
        .output
        .clone()
        .unwrap_or_else(|| options.input_path.with_extension("translated.pdf"));
    std::fs::write(&output_path, &rendered.bytes)
        .with_context(|| format!("failed to write output {}", output_path.display()))?;

    info!(
        "wrote {} ({} bytes, {} images embedded); artifacts in {}",
        output_path.display(),
        rendered.bytes.len(),
        rendered.diagnostics.images_embedded,
        store.dir().display()
    );
    Ok(())
}

/// Obtain the source markdown: read it directly, or parse the PDF through
/// the parsing service.
async fn load_source(options: &CommandLineOptions, config: &Config) -> Result<String> {
    let extension = options
        .input_path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if matches!(extension.as_str(), "md" | "markdown" | "txt") {
        return std::fs::read_to_string(&options.input_path)
            .with_context(|| format!("failed to read {}", options.input_path.display()));
    }

    if config.parsing.endpoint.is_empty() {
        return Err(anyhow!(
            "parsing.endpoint is not configured; pass parsed markdown directly or configure the parsing service"
        ));
    }
    let parse_options = ParseOptions {
        is_ocr: options.ocr,
        end_pages: options.end_pages,
        language: config.source_language.to_lowercase(),
        ..ParseOptions::default()
    };
    let client = ParsingClient::new(config.parsing.clone());
    client.parse_file(&options.input_path, &parse_options).await
}
