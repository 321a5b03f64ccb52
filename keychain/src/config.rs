//! Typed configuration surface for the "recognized options" of the
//! constructor contract (spec §6), modeled the way the teacher's
//! `privstack-crypto` merges a caller-supplied `Salt`/iteration count
//! over `KdfParams::default()`: a plain `Default` plus builder-style
//! `with_*` overrides, deep-merged at the point a [`crate::Keychain`] is
//! actually constructed.

use std::path::PathBuf;

use keychain_crypto::{DekParams, DekParamsOverride, KdfHash};
use serde::{Deserialize, Serialize};

use crate::error::KeychainResult;

/// PBKDF2 profile overrides. Every field is optional; absent fields
/// keep [`keychain_crypto::DekParams`]'s recommended defaults. The
/// caller's values always win on collision (§4.1).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DekProfile {
    pub key_length: Option<usize>,
    pub iteration_count: Option<u32>,
    pub salt: Option<Vec<u8>>,
    pub hash: Option<String>,
}

impl DekProfile {
    /// Resolves this profile against the recommended defaults. Does not
    /// itself enforce the NIST floors — that happens at
    /// [`keychain_crypto::Dek::derive`] construction time, where the
    /// passphrase is also in scope.
    pub fn into_params(self) -> KeychainResult<DekParams> {
        let hash = match self.hash {
            Some(name) => Some(KdfHash::parse(&name)?),
            None => None,
        };
        Ok(DekParams::merged(DekParamsOverride {
            key_length: self.key_length,
            iteration_count: self.iteration_count,
            salt: self.salt,
            hash,
        }))
    }
}

/// The constructor's "recognized options" (§6), minus the passphrase
/// itself: `store_root` for a filesystem-backed store, and the DEK's
/// PBKDF2 profile. `passphrase` is loaded separately (env var, prompt,
/// secret manager) and deliberately never `Serialize`s, so a config
/// file or log line can never carry it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeychainConfig {
    pub store_root: PathBuf,
    #[serde(default)]
    pub dek: DekProfile,
    #[serde(skip)]
    pub passphrase: Option<String>,
}

impl Default for KeychainConfig {
    fn default() -> Self {
        Self {
            store_root: PathBuf::from("./keychain-data"),
            dek: DekProfile::default(),
            passphrase: None,
        }
    }
}

impl KeychainConfig {
    pub fn with_store_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.store_root = root.into();
        self
    }

    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }

    pub fn with_dek(mut self, dek: DekProfile) -> Self {
        self.dek = dek;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_win_over_defaults() {
        let profile = DekProfile {
            iteration_count: Some(20_000),
            ..Default::default()
        };
        let params = profile.into_params().unwrap();
        assert_eq!(params.iteration_count, 20_000);
        assert_eq!(params.key_length, keychain_crypto::DEFAULT_KEY_LEN);
    }

    #[test]
    fn config_never_serializes_passphrase() {
        let config = KeychainConfig::default().with_passphrase("this is not a secure phrase");
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("not a secure phrase"));
    }
}
