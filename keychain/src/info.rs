//! [`KeyInfo`]: the read-only projection of a [`crate::KeyRecord`]
//! returned by every lookup and lifecycle operation.

use serde::{Deserialize, Serialize};

/// Wire shape for a stored key: its name, content-addressed id, and
/// (when the store can resolve one) a physical path hint. Never
/// carries key material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    pub name: String,
    pub id: String,
    pub path: Option<String>,
}

/// The return shape of the low-level `_encrypt` primitive (spec §4.4):
/// an algorithm tag plus the raw ciphertext bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherBlob {
    pub algorithm: String,
    pub cipher_data: Vec<u8>,
}

/// Algorithm tag every [`CipherBlob`] produced by
/// [`crate::Keychain::encrypt`] carries.
pub const RSA_PKCS1_PADDING: &str = "RSA_PKCS1_PADDING";
