//! Secure key chain: RSA private-key lifecycle management backed by a
//! pluggable object store, with keys encrypted at rest under a
//! passphrase-derived key and PKCS#7/CMS `EnvelopedData` as the
//! exchange format for content addressed to a stored key.
//!
//! ```no_run
//! # async fn go() -> keychain::KeychainResult<()> {
//! use std::sync::Arc;
//! use keychain::{Keychain, KeychainConfig};
//!
//! let store = Arc::new(keychain_store::MemoryStore::new());
//! let config = KeychainConfig::default().with_passphrase("this is not a secure phrase");
//! let chain = Keychain::with_config(store, config)?;
//!
//! let info = chain.create_key("alice", "rsa", 2048).await?;
//! let cipher = chain.encrypt(&info.name, b"hello").await?;
//! let plain = chain.decrypt(&info.name, &cipher.cipher_data).await?;
//! assert_eq!(plain, b"hello");
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod info;
mod keychain;
mod name;
mod peer;

pub use config::{DekProfile, KeychainConfig};
pub use error::{KeychainError, KeychainResult};
pub use info::{CipherBlob, KeyInfo, RSA_PKCS1_PADDING};
pub use keychain::Keychain;
pub use name::RESERVED_NAME;
pub use peer::PeerIdentity;
