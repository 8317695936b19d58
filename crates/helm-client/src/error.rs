//! Helm client errors

use thiserror::Error;

/// Errors that can occur when driving Helm
#[derive(Debug, Error)]
pub enum HelmError {
    /// The helm binary could not be started or its pipes failed
    #[error("Failed to run helm: {0}")]
    Io(#[from] std::io::Error),

    /// helm exited with a non-zero status
    #[error("helm {command} failed: {stderr}")]
    Command {
        /// Subcommand that failed (install, status, ...)
        command: String,
        /// Trimmed stderr output
        stderr: String,
    },

    /// helm did not finish within the configured timeout
    #[error("helm {0} timed out")]
    Timeout(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid request (e.g., empty release name)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}
