//! Error types for judge calls.

use thiserror::Error;

/// Errors a judge backend can return for a single evaluation.
///
/// All variants are isolated to the failing backend: the dispatcher turns them
/// into FAILURE or TIMEOUT verdicts and never aborts the request over them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JudgeError {
    /// Network connectivity error (DNS, connection refused, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// Call exceeded its deadline.
    #[error("Judge timeout after {0}ms")]
    Timeout(u64),

    /// Backend returned an error response (4xx, 5xx).
    #[error("Backend error {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Backend response doesn't match the expected verdict format.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Judge configuration error (missing credentials, bad URL).
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl JudgeError {
    /// Whether this error is a deadline miss rather than a hard failure.
    pub fn is_timeout(&self) -> bool {
        matches!(self, JudgeError::Timeout(_))
    }
}
