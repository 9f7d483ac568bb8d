use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single source request.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network failures, rate limiting and server errors. Worth retrying.
    #[error("transient source failure: {0}")]
    Transient(String),

    /// Client errors and undecodable responses. Retrying will not help.
    #[error("permanent source failure: {0}")]
    Permanent(String),
}

impl SourceError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SourceError::Transient(_))
    }

    pub fn from_status(status: StatusCode, what: &str) -> Self {
        let message = format!("{} returned status {}", what, status);
        if status == StatusCode::TOO_MANY_REQUESTS
            || status == StatusCode::UNAUTHORIZED
            || status.is_server_error()
        {
            SourceError::Transient(message)
        } else {
            SourceError::Permanent(message)
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return SourceError::Permanent(err.to_string());
        }
        match err.status() {
            Some(status) => SourceError::from_status(status, "request"),
            None => SourceError::Transient(err.to_string()),
        }
    }
}
