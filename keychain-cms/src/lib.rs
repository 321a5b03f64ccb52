//! PKCS#7 (CMS) `EnvelopedData` construction and parsing.
//!
//! Pure, IO-free functions over RSA key material: building an envelope
//! needs a private key (to derive its own certificate) and a plaintext;
//! reading one yields candidate recipient key ids and, once the caller
//! resolves one to a stored key, the decrypted content. Key storage,
//! lookup and passphrase handling all stay in the `keychain` facade.

mod envelope;
mod error;

pub use envelope::{build_anonymous_envelope, decrypt_content, parse, ParsedEnvelope, ParsedRecipient};
pub use error::{CmsError, CmsResult};
