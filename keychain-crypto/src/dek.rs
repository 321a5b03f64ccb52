//! Passphrase-derived encryption key (DEK).
//!
//! Mirrors the teacher's `DerivedKey`/`KdfParams` split: a small params
//! struct validated at construction, and a zeroizing holder for the
//! derived secret that is never `Debug`/`Serialize`d in full.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::{Sha256, Sha512};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, CryptoResult};

/// Minimum passphrase length in code units (NIST SP 800-132 floor used here).
pub const MIN_PASSPHRASE_LEN: usize = 20;
/// Minimum salt length in bytes (128 bits).
pub const MIN_SALT_LEN: usize = 16;
/// Minimum iteration count.
pub const MIN_ITERATIONS: u32 = 1000;
/// Minimum derived key length in bytes (112 bits).
pub const MIN_KEY_LEN: usize = 14;

/// Recommended default derived key length, in bytes.
pub const DEFAULT_KEY_LEN: usize = 64;
/// Recommended default iteration count.
pub const DEFAULT_ITERATIONS: u32 = 10_000;

/// Supported PBKDF2 pseudorandom functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfHash {
    Sha256,
    Sha512,
}

impl Default for KdfHash {
    fn default() -> Self {
        KdfHash::Sha512
    }
}

impl KdfHash {
    /// Parses a hash algorithm name (`"sha256"`/`"sha512"`, case
    /// insensitive), as accepted by a config surface that stores the
    /// algorithm as a plain string.
    pub fn parse(name: &str) -> CryptoResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sha256" => Ok(KdfHash::Sha256),
            "sha512" => Ok(KdfHash::Sha512),
            other => Err(CryptoError::InvalidConfig(format!(
                "unsupported dek hash algorithm: {other}"
            ))),
        }
    }
}

/// PBKDF2 parameters for deriving a DEK, with the caller's overrides
/// already deep-merged over the recommended defaults.
#[derive(Debug, Clone)]
pub struct DekParams {
    pub key_length: usize,
    pub iteration_count: u32,
    pub salt: Vec<u8>,
    pub hash: KdfHash,
}

impl Default for DekParams {
    /// Defaults use a freshly generated salt; callers overriding only
    /// `key_length`/`iteration_count`/`hash` keep this random salt unless
    /// they supply their own (§4.1: caller's values win on collision).
    fn default() -> Self {
        let mut salt = vec![0u8; MIN_SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        Self {
            key_length: DEFAULT_KEY_LEN,
            iteration_count: DEFAULT_ITERATIONS,
            salt,
            hash: KdfHash::default(),
        }
    }
}

impl DekParams {
    /// Deep-merges `overrides` onto the recommended defaults: fields the
    /// caller actually set (non-`None`) win, everything else keeps the
    /// default.
    pub fn merged(overrides: DekParamsOverride) -> Self {
        let defaults = Self::default();
        Self {
            key_length: overrides.key_length.unwrap_or(defaults.key_length),
            iteration_count: overrides.iteration_count.unwrap_or(defaults.iteration_count),
            salt: overrides.salt.unwrap_or(defaults.salt),
            hash: overrides.hash.unwrap_or(defaults.hash),
        }
    }

    fn validate(&self) -> CryptoResult<()> {
        if self.key_length < MIN_KEY_LEN {
            return Err(CryptoError::InvalidConfig(format!(
                "dek key length {} below minimum {MIN_KEY_LEN}",
                self.key_length
            )));
        }
        if self.salt.len() < MIN_SALT_LEN {
            return Err(CryptoError::InvalidConfig(format!(
                "dek salt length {} below minimum {MIN_SALT_LEN}",
                self.salt.len()
            )));
        }
        if self.iteration_count < MIN_ITERATIONS {
            return Err(CryptoError::InvalidConfig(format!(
                "dek iteration count {} below minimum {MIN_ITERATIONS}",
                self.iteration_count
            )));
        }
        Ok(())
    }

    /// Parses a hash name, deferring to [`KdfHash::parse`] so config
    /// loaders (see `keychain::config`) can accept plain strings.
    pub fn with_hash_name(mut self, name: &str) -> CryptoResult<Self> {
        self.hash = KdfHash::parse(name)?;
        Ok(self)
    }
}

/// Builder-style override set; every field is optional and only present
/// fields displace the default in [`DekParams::merged`].
#[derive(Debug, Clone, Default)]
pub struct DekParamsOverride {
    pub key_length: Option<usize>,
    pub iteration_count: Option<u32>,
    pub salt: Option<Vec<u8>>,
    pub hash: Option<KdfHash>,
}

/// The derived secret itself. Holds its bytes in a zeroizing buffer and
/// exposes them only through [`Dek::secret_hex`] / [`Dek::secret_bytes`],
/// both of which the `keychain` facade is careful never to log.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Dek {
    bytes: Vec<u8>,
}

impl Dek {
    /// Derives a DEK from `passphrase` under `params`, failing
    /// [`CryptoError::InvalidConfig`] if any NIST floor in §4.1 is
    /// violated.
    pub fn derive(passphrase: &str, params: &DekParams) -> CryptoResult<Self> {
        if passphrase.chars().count() < MIN_PASSPHRASE_LEN {
            return Err(CryptoError::InvalidConfig(format!(
                "passphrase shorter than minimum {MIN_PASSPHRASE_LEN} code units"
            )));
        }
        params.validate()?;

        let mut out = vec![0u8; params.key_length];
        match params.hash {
            KdfHash::Sha256 => pbkdf2_hmac::<Sha256>(
                passphrase.as_bytes(),
                &params.salt,
                params.iteration_count,
                &mut out,
            ),
            KdfHash::Sha512 => pbkdf2_hmac::<Sha512>(
                passphrase.as_bytes(),
                &params.salt,
                params.iteration_count,
                &mut out,
            ),
        }
        tracing::debug!(key_length = params.key_length, iterations = params.iteration_count, "derived dek");
        Ok(Self { bytes: out })
    }

    /// Lowercase hex encoding of the derived secret. This is the form
    /// fed into PKCS#8 passphrase-based wrap/unwrap, which expects text.
    pub fn secret_hex(&self) -> String {
        let mut s = String::with_capacity(self.bytes.len() * 2);
        for b in &self.bytes {
            s.push_str(&format!("{b:02x}"));
        }
        s
    }

    /// Raw derived bytes, for callers that need key material directly
    /// (e.g. CMS content-encryption key wrapping).
    pub fn secret_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for Dek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dek").field("bytes", &"<redacted>").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn salt() -> Vec<u8> {
        vec![7u8; MIN_SALT_LEN]
    }

    #[test]
    fn derives_deterministically() {
        let params = DekParams {
            key_length: 32,
            iteration_count: 1000,
            salt: salt(),
            hash: KdfHash::Sha512,
        };
        let a = Dek::derive("this is not a secure phrase", &params).unwrap();
        let b = Dek::derive("this is not a secure phrase", &params).unwrap();
        assert_eq!(a.secret_hex(), b.secret_hex());
        assert_eq!(a.secret_bytes().len(), 32);
    }

    #[test]
    fn rejects_short_passphrase() {
        let params = DekParams {
            key_length: 32,
            iteration_count: 1000,
            salt: salt(),
            hash: KdfHash::Sha512,
        };
        let err = Dek::derive("too short", &params).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_short_salt() {
        let params = DekParams {
            key_length: 32,
            iteration_count: 1000,
            salt: vec![1u8; 4],
            hash: KdfHash::Sha512,
        };
        let err = Dek::derive("this is not a secure phrase", &params).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_low_iteration_count() {
        let params = DekParams {
            key_length: 32,
            iteration_count: 10,
            salt: salt(),
            hash: KdfHash::Sha512,
        };
        let err = Dek::derive("this is not a secure phrase", &params).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_short_key_length() {
        let params = DekParams {
            key_length: 4,
            iteration_count: 1000,
            salt: salt(),
            hash: KdfHash::Sha512,
        };
        let err = Dek::derive("this is not a secure phrase", &params).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidConfig(_)));
    }

    #[test]
    fn defaults_merge_with_overrides() {
        let overrides = DekParamsOverride {
            iteration_count: Some(20_000),
            ..Default::default()
        };
        let merged = DekParams::merged(overrides);
        assert_eq!(merged.iteration_count, 20_000);
        assert_eq!(merged.key_length, DEFAULT_KEY_LEN);
    }

    #[test]
    fn debug_never_prints_bytes() {
        let params = DekParams {
            key_length: 32,
            iteration_count: 1000,
            salt: salt(),
            hash: KdfHash::Sha512,
        };
        let dek = Dek::derive("this is not a secure phrase", &params).unwrap();
        let rendered = format!("{dek:?}");
        assert!(!rendered.contains(&dek.secret_hex()));
    }
}
