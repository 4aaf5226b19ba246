use thiserror::Error;

/// Shared error type for the reporting data layer.
///
/// Cloneable so a single fetch outcome can be fanned out to every caller
/// waiting on the same in-flight request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InsightError {
    #[error("remote request failed with status {status}")]
    RemoteStatus { status: u16 },
    #[error("remote transport error: {message}")]
    Transport { message: String },
    #[error("payload decode error: {message}")]
    Decode { message: String },
    #[error("{message}")]
    Message { message: String },
}

impl InsightError {
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    /// HTTP status carried by the error, when it came from a non-2xx response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RemoteStatus { status } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
