use thiserror::Error;

#[derive(Debug, Error)]
pub enum CmsError {
    #[error("invalid cms structure: {0}")]
    InvalidCms(String),

    #[error("cms crypto failure: {0}")]
    CryptoFailure(String),
}

pub type CmsResult<T> = Result<T, CmsError>;
