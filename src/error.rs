use thiserror::Error;

/// Error taxonomy for the demo client.
///
/// Server-reported failures and transport failures are normally carried inside
/// a [`crate::models::RequestResult`] rather than raised; the health probe returns
/// them as errors so callers can act on the outcome. Malformed bodies never
/// surface here: the transport downgrades them to text or an empty object.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Server error ({status}): {detail}")]
    Server { status: String, detail: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("A request is already in progress")]
    Busy,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// True for failures that never reached the backend.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::Busy)
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
