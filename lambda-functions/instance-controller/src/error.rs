use thiserror::Error;

/// Failure to turn the inbound message into an [`crate::InstancePayload`].
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("message data is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload is not a valid instance request: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload field {0} must not be empty")]
    EmptyField(&'static str),

    #[error("payload field {field} cannot be {value:?}")]
    ReservedIdentifier { field: &'static str, value: String },
}

/// Failures reported while talking to the instance admin service.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("failed to obtain access token: {0}")]
    Token(String),

    #[error("admin endpoint cannot address instances: {0}")]
    Endpoint(String),

    #[error("identifier cannot be used as a path segment: {0:?}")]
    Identifier(String),

    #[error("admin request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("admin service returned {status}: {message}")]
    Status { status: u16, message: String },
}

/// Errors returned from a single dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to decode event payload")]
    Decoding(#[from] DecodeError),

    #[error("invalid action: {0:?}")]
    InvalidAction(String),

    #[error("instance admin call failed")]
    RemoteCall(#[from] AdminError),
}

impl DispatchError {
    /// Only remote failures can succeed on redelivery of the same event.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RemoteCall(_))
    }
}
