use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("key generation failed: {0}")]
    KeyGenFailed(String),

    #[error("wrong password")]
    WrongPassword,

    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("certificate construction failed: {0}")]
    CertFailure(String),
}

pub type CodecResult<T> = Result<T, CodecError>;
