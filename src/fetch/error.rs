// src/fetch/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store is not configured: {0}")]
    NotConfigured(String),

    #[error("record store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("record store returned HTTP {status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
        details: Option<String>,
        hint: Option<String>,
    },

    #[error("record store returned malformed rows: {0}")]
    Decode(#[from] serde_json::Error),
}

impl StoreError {
    /// HTTP status reported by the store, when the failure came from one.
    pub fn status(&self) -> Option<u16> {
        match self {
            StoreError::Api { status, .. } => Some(*status),
            StoreError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
