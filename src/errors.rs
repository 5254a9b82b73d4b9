/*!
 * Error types for the scitrans pipeline.
 *
 * This module contains custom error types for different parts of the
 * application, using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when calling a translation backend.
///
/// All three variants are retryable at the backend level; when the retry
/// budget is exhausted the backend fails open and returns the source text.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Connection or timeout failure while talking to the backend
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response indicating throttling or server-side refusal
    #[error("rate limited ({status}): {message}")]
    RateLimited {
        /// HTTP (or protocol-level) status code
        status: u16,
        /// Error message from the backend
        message: String,
    },

    /// Response that does not carry the expected fields, or that failed
    /// the response-hygiene checks (length deviation, clarification text)
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(error: reqwest::Error) -> Self {
        if let Some(status) = error.status() {
            Self::RateLimited {
                status: status.as_u16(),
                message: error.to_string(),
            }
        } else {
            // Timeouts, connect errors and proxy failures all land here
            Self::Network(error.to_string())
        }
    }
}

/// Errors from the external parsing-service collaborator.
///
/// These are fatal for the job: nothing downstream can proceed without the
/// parsed source text.
#[derive(Error, Debug)]
pub enum ParsingServiceError {
    /// Task submission was rejected or returned no task id
    #[error("parse submission failed: {0}")]
    Submit(String),

    /// The service reported the task as failed or cancelled
    #[error("parse task {task_id} ended as {status}")]
    TaskFailed {
        /// Identifier of the failed task
        task_id: String,
        /// Terminal status reported by the service
        status: String,
    },

    /// Polling exceeded the hard wall-clock timeout
    #[error("parse task timed out after {0} seconds")]
    Timeout(u64),

    /// The task succeeded but the output carried no usable content
    #[error("parse output contained no content: {0}")]
    EmptyOutput(String),
}

/// Errors that can occur while rendering the translated document.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Failure registering or loading a font
    #[error("font error: {0}")]
    Font(String),

    /// Unrecoverable failure building or serializing the PDF
    #[error("pdf error: {0}")]
    Pdf(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("file error: {0}")]
    File(String),

    /// Error from the parsing service
    #[error("parsing service error: {0}")]
    Parsing(#[from] ParsingServiceError),

    /// Whole-document rendering failure
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Any other error
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
