use async_trait::async_trait;
use thiserror::Error;
use vconnect_core_types::{Branch, Code, CodeMapping, Customer, EventRecord, InsightError, User};

/// Backend access port. The data service depends on this trait only, so
/// tests can substitute an in-memory fake for the HTTP client.
#[async_trait]
pub trait RemotePort: Send + Sync {
    async fn users(&self) -> Result<Vec<User>, RemoteError>;
    async fn calls(&self) -> Result<Vec<EventRecord>, RemoteError>;
    async fn codes(&self) -> Result<Vec<Code>, RemoteError>;
    async fn branches(&self) -> Result<Vec<Branch>, RemoteError>;
    async fn customers(&self) -> Result<Vec<Customer>, RemoteError>;
    async fn code_mappings(&self) -> Result<Vec<CodeMapping>, RemoteError>;
    async fn branch_codes(&self, branch_id: &str) -> Result<Vec<Code>, RemoteError>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("backend responded with status {code}")]
    Status { code: u16 },
    #[error("transport failure: {message}")]
    Transport { message: String },
    #[error("payload decode failure: {message}")]
    Decode { message: String },
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { code: 404 })
    }
}

impl From<RemoteError> for InsightError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Status { code } => InsightError::RemoteStatus { status: code },
            RemoteError::Transport { message } => InsightError::Transport { message },
            RemoteError::Decode { message } => InsightError::Decode { message },
        }
    }
}
