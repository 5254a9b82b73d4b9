/*!
 * Client for the external document-parsing service.
 *
 * The service accepts a PDF upload, OCRs and lays it out asynchronously,
 * and exposes the result through a task-status endpoint. This client
 * submits the file, polls until the task reaches a terminal state, and
 * extracts Markdown from whichever of the service's result shapes is
 * present.
 *
 * Parsing failures are fatal for a job; unlike the translation backends
 * there is no fail-open here because nothing downstream can run without
 * the parsed text.
 */

use anyhow::{Context, Result};
use log::{debug, info, warn};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;

use crate::app_config::ParsingConfig;
use crate::errors::ParsingServiceError;

/// Options forwarded to the parsing service with each submission.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Force OCR even for born-digital PDFs
    pub is_ocr: bool,
    /// Ask for images inlined as base64 in the markdown output
    pub include_image_base64: bool,
    /// Enable formula recognition
    pub formula_enable: bool,
    /// Enable table recognition
    pub table_enable: bool,
    /// Layout analysis model name
    pub layout_model: String,
    /// Requested output format
    pub output_format: String,
    /// Parse only the first N pages when set
    pub end_pages: Option<u32>,
    /// Document language hint for the OCR stage
    pub language: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            is_ocr: false,
            include_image_base64: true,
            formula_enable: true,
            table_enable: true,
            layout_model: "doclayout_yolo".to_string(),
            output_format: "markdown".to_string(),
            end_pages: None,
            language: "en".to_string(),
        }
    }
}

/// Client for the asynchronous parsing service.
#[derive(Debug)]
pub struct ParsingClient {
    client: Client,
    config: ParsingConfig,
}

impl ParsingClient {
    /// Create a client from the parsing section of the configuration.
    pub fn new(config: ParsingConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.request_timeout_secs))
                .build()
                .unwrap_or_default(),
            config,
        }
    }

    /// Parse a PDF file into Markdown: submit, poll, extract.
    pub async fn parse_file(&self, path: impl AsRef<Path>, options: &ParseOptions) -> Result<String> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read input file {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());

        let task_id = self.submit(bytes, &file_name, options).await?;
        info!("parse task {} submitted for {}", task_id, path.display());

        let result = self.poll(&task_id).await?;
        let markdown = match extract_markdown(&result) {
            Some(markdown) => markdown,
            None => match extract_file_url(&result) {
                Some(url) => self.download(&url).await?,
                None => return Err(ParsingServiceError::EmptyOutput(task_id).into()),
            },
        };

        if markdown.trim().is_empty() {
            return Err(ParsingServiceError::EmptyOutput(task_id).into());
        }
        info!("parse task complete, {} chars of markdown", markdown.len());
        Ok(markdown)
    }

    /// Submit a document and return the task id.
    async fn submit(&self, bytes: Vec<u8>, file_name: &str, options: &ParseOptions) -> Result<String> {
        let mut form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name.to_string()))
            .text("is_ocr", options.is_ocr.to_string())
            .text("include_image_base64", options.include_image_base64.to_string())
            .text("formula_enable", options.formula_enable.to_string())
            .text("table_enable", options.table_enable.to_string())
            .text("layout_model", options.layout_model.clone())
            .text("output_format", options.output_format.clone())
            .text("language", options.language.clone());
        if let Some(end_pages) = options.end_pages {
            form = form.text("end_pages", end_pages.to_string());
        }

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ParsingServiceError::Submit(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ParsingServiceError::Submit(format!("HTTP {status}: {body}")).into());
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ParsingServiceError::Submit(e.to_string()))?;

        extract_task_id(&body)
            .ok_or_else(|| ParsingServiceError::Submit(format!("no task id in response: {body}")).into())
    }

    /// Poll the status endpoint until the task ends or the wall-clock
    /// timeout expires.
    ///
    /// Network errors during polling are logged and retried on the next
    /// tick; only a terminal failure status or the timeout aborts the job.
    async fn poll(&self, task_id: &str) -> Result<Value> {
        let deadline = Instant::now() + Duration::from_secs(self.config.poll_timeout_secs);
        let interval = Duration::from_secs(self.config.poll_interval_secs.max(1));
        let url = format!(
            "{}/{}",
            self.config.status_endpoint.trim_end_matches('/'),
            task_id
        );

        loop {
            if Instant::now() >= deadline {
                return Err(ParsingServiceError::Timeout(self.config.poll_timeout_secs).into());
            }
            tokio::time::sleep(interval).await;

            let response = match self
                .client
                .get(&url)
                .bearer_auth(&self.config.api_token)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    warn!("poll request for task {task_id} failed, retrying: {e}");
                    continue;
                }
            };

            let body: Value = match response.json().await {
                Ok(body) => body,
                Err(e) => {
                    warn!("poll response for task {task_id} unreadable, retrying: {e}");
                    continue;
                }
            };

            if let Some(error) = body.get("error").and_then(Value::as_str) {
                let message = body.get("message").and_then(Value::as_str).unwrap_or("");
                return Err(ParsingServiceError::TaskFailed {
                    task_id: task_id.to_string(),
                    status: format!("{error}: {message}"),
                }
                .into());
            }

            let state = extract_state(&body).unwrap_or_default();
            debug!("task {task_id} state: {state}");
            match state.as_str() {
                "done" | "success" | "completed" | "finished" => return Ok(body),
                "failed" | "error" | "cancelled" => {
                    return Err(ParsingServiceError::TaskFailed {
                        task_id: task_id.to_string(),
                        status: state,
                    }
                    .into());
                }
                _ => {}
            }
        }
    }

    /// Fetch a result file the service stored out of line.
    async fn download(&self, url: &str) -> Result<String> {
        debug!("downloading parse result from {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ParsingServiceError::EmptyOutput(format!("download failed: {e}")))?;
        response
            .text()
            .await
            .map_err(|e| ParsingServiceError::EmptyOutput(format!("download unreadable: {e}")).into())
    }
}

/// Pull the task id out of a submission response, tolerating the service's
/// two envelope shapes.
fn extract_task_id(body: &Value) -> Option<String> {
    body.get("task_id")
        .or_else(|| body.get("data").and_then(|d| d.get("task_id")))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Pull the task state out of a status response.
fn extract_state(body: &Value) -> Option<String> {
    body.get("state")
        .or_else(|| body.get("status"))
        .or_else(|| body.get("data").and_then(|d| d.get("state")))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn result_root(body: &Value) -> &Value {
    body.get("output")
        .or_else(|| body.get("data"))
        .unwrap_or(body)
}

/// Extract Markdown from a completed task, trying the known result shapes
/// in order of preference.
fn extract_markdown(body: &Value) -> Option<String> {
    let root = result_root(body);

    // Segment list: each entry carries a content block
    if let Some(segments) = root.get("segments").and_then(Value::as_array) {
        let parts: Vec<&str> = segments
            .iter()
            .filter_map(|segment| segment.get("content").and_then(Value::as_str))
            .collect();
        if !parts.is_empty() {
            return Some(parts.join("\n\n"));
        }
    }

    for key in ["text_result", "markdown", "md_content", "content"] {
        if let Some(text) = root.get(key).and_then(Value::as_str) {
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }
    }
    None
}

/// Downloadable result reference, present on tasks whose output was too
/// large to inline.
fn extract_file_url(body: &Value) -> Option<String> {
    result_root(body)
        .get("file_url")
        .and_then(Value::as_str)
        .map(str::to_string)
}
