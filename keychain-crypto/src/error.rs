use thiserror::Error;

/// Errors raised while deriving or using symmetric key material.
///
/// Never carries secret bytes: messages name parameters and bounds,
/// never the passphrase, salt, or derived key itself.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid dek config: {0}")]
    InvalidConfig(String),

    #[error("cipher operation failed: {0}")]
    CipherFailure(String),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
