//! Backend API error types

use thiserror::Error;

/// Errors that can occur when fetching from the statistics backend
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Backend unavailable")]
    Unavailable,

    #[error("Request timeout")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },
}

impl FetchError {
    /// Classify a transport-level reqwest error
    pub(crate) fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_connect() {
            FetchError::Unavailable
        } else {
            FetchError::Request(e)
        }
    }
}

/// Result type alias for backend fetches
pub type FetchResult<T> = Result<T, FetchError>;
