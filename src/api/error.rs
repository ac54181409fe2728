use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Entity {
    Equipment,
    Room,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entity::Equipment => f.write_str("Equipment"),
            Entity::Room => f.write_str("Room"),
        }
    }
}

#[derive(Debug, Error)]
pub enum LookupError {
    /// The service answered 404 for the scanned code.
    #[error("{0} not found")]
    NotFound(Entity),

    #[error("Server error {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid service address: {0}")]
    InvalidBaseUrl(String),
}

impl LookupError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, LookupError::NotFound(_))
    }
}
