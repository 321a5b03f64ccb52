//! RSA keypair lifecycle primitives: generation, content-addressed key
//! ids, encrypted PKCS#8 wrap/unwrap, and self-signed certificate
//! issuance for the CMS recipient-discovery contract.

pub mod der_util;

mod cert;
mod error;
mod export;
mod rsa_key;

pub use cert::{
    build_self_signed, issuer_name_der, issuer_org_and_cn, name_org_and_cn, SELF_SIGNED_SERIAL,
};
pub use error::{CodecError, CodecResult};
pub use export::{unwrap_export, wrap_for_export};
pub use rsa_key::{from_der, generate, key_id, unwrap, wrap, MIN_KEY_BITS};

pub use rsa::RsaPrivateKey;
