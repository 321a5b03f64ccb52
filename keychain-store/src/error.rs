use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("store io error: {0}")]
    Io(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
