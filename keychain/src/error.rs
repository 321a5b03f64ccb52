//! Public error surface. Collapses every lower crate's error enum onto
//! the taxonomy callers match against, so a caller never needs to know
//! whether a failure originated in `keychain-crypto`, `keychain-codec`,
//! `keychain-store` or `keychain-cms`.
//!
//! No variant's `Display` ever interpolates DEK bytes, a passphrase, or
//! an unwrapped key body — only names, ids, and the underlying error's
//! own (already-scrubbed) message.

use thiserror::Error;

use keychain_cms::CmsError;
use keychain_codec::CodecError;
use keychain_crypto::CryptoError;
use keychain_store::StoreError;

#[derive(Debug, Error)]
pub enum KeychainError {
    #[error("invalid key name: {0}")]
    InvalidName(String),

    #[error("invalid key type: {0}")]
    InvalidKeyType(String),

    #[error("invalid key size: {0}")]
    InvalidKeySize(String),

    #[error("invalid dek configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("passphrase does not meet the minimum strength requirement")]
    WeakPassphrase,

    #[error("key already exists: {0}")]
    DuplicateKey(String),

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("wrong password")]
    WrongPassword,

    #[error("invalid cms structure: {0}")]
    InvalidCms(String),

    #[error("no stored key can decrypt this message")]
    NoDecryptionKey,

    #[error("store io error: {0}")]
    StoreIO(String),

    #[error("key generation failed: {0}")]
    KeyGenFailed(String),

    #[error("cryptographic operation failed: {0}")]
    CryptoFailure(String),
}

pub type KeychainResult<T> = Result<T, KeychainError>;

impl From<CryptoError> for KeychainError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::InvalidConfig(msg) => KeychainError::InvalidConfig(msg),
            CryptoError::CipherFailure(msg) => KeychainError::CryptoFailure(msg),
        }
    }
}

impl From<CodecError> for KeychainError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::KeyGenFailed(msg) => KeychainError::KeyGenFailed(msg),
            CodecError::WrongPassword => KeychainError::WrongPassword,
            CodecError::InvalidKey(msg) => KeychainError::CryptoFailure(msg),
            CodecError::CertFailure(msg) => KeychainError::CryptoFailure(msg),
        }
    }
}

impl From<StoreError> for KeychainError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(key) => KeychainError::KeyNotFound(key),
            StoreError::Io(msg) => KeychainError::StoreIO(msg),
        }
    }
}

impl From<CmsError> for KeychainError {
    fn from(e: CmsError) -> Self {
        match e {
            CmsError::InvalidCms(msg) => KeychainError::InvalidCms(msg),
            CmsError::CryptoFailure(msg) => KeychainError::CryptoFailure(msg),
        }
    }
}
