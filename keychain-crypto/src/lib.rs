//! Passphrase-derived key material and the symmetric primitives built on
//! it. Scoped to two concerns: deriving a DEK from a passphrase (§4.1)
//! and encrypting CMS envelope content under a random per-message key.

mod cipher;
mod dek;
mod error;

pub use cipher::{decrypt, encrypt, generate_content_key, IV_SIZE, KEY_SIZE};
pub use dek::{
    Dek, DekParams, DekParamsOverride, KdfHash, DEFAULT_ITERATIONS, DEFAULT_KEY_LEN,
    MIN_ITERATIONS, MIN_KEY_LEN, MIN_PASSPHRASE_LEN, MIN_SALT_LEN,
};
pub use error::{CryptoError, CryptoResult};
