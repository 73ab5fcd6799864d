use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Transport send failed: {0}")]
    Transport(String),

    #[error("Malformed event payload: {0}")]
    MalformedEvent(#[from] serde_json::Error),

    #[error("Buffer I/O error: {0}")]
    BufferIo(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}
