//! Error types for the transport and OCR backends.

use thiserror::Error;

/// Errors that can occur while talking to the coverage service or OCR engine.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Network error (connect, timeout, body read)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The OCR executable could not be started
    #[error("failed to start OCR engine `{command}`: {source}")]
    OcrUnavailable {
        /// Executable that was invoked
        command: String,
        /// Spawn error
        #[source]
        source: std::io::Error,
    },

    /// The OCR engine ran but exited unsuccessfully
    #[error("OCR engine exited with status {status:?}: {stderr}")]
    OcrFailed {
        /// Exit code, if the process was not killed by a signal
        status: Option<i32>,
        /// Captured standard error
        stderr: String,
    },

    /// I/O error while exchanging data with a child process
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl ClientError {
    /// Whether a retry with the same session could plausibly succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            _ => false,
        }
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
