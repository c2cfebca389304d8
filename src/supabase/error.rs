//! Hosted data service error types

use thiserror::Error;

/// Errors returned by the hosted data service adapter
#[derive(Error, Debug)]
pub enum SupabaseError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Realtime error: {0}")]
    Realtime(String),

    #[error("Invalid URL: {0}")]
    Url(String),

    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for SupabaseError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        SupabaseError::Realtime(e.to_string())
    }
}

/// Result type alias for hosted data service calls
pub type SupabaseResult<T> = Result<T, SupabaseError>;
