use thiserror::Error;

/// Errors surfaced by the engine. Missing data (no location, null values)
/// is a normal state and never shows up here.
#[derive(Error, Debug)]
pub enum FinderError {
    #[error("request timed out after {0} ms")]
    NetworkTimeout(u32),

    #[error("network error: {0}")]
    Network(String),

    #[error("validation failed: {0}")]
    Validation(#[from] crate::edit::ValidationErrors),

    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("unknown facility: {0}")]
    UnknownFacility(String),

    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl FinderError {
    /// Stable machine-readable code, used by the bridge envelope.
    pub fn code(&self) -> &'static str {
        match self {
            FinderError::NetworkTimeout(_) => "network_timeout",
            FinderError::Network(_) => "network",
            FinderError::Validation(_) => "validation",
            FinderError::Payload(_) => "payload",
            FinderError::UnknownFacility(_) => "unknown_facility",
            FinderError::UnknownAttribute(_) => "unknown_attribute",
            FinderError::Config(_) => "config",
            FinderError::InvalidState(_) => "invalid_state",
        }
    }
}

pub type Result<T> = std::result::Result<T, FinderError>;
