//! AES-256-CBC content cipher used to encrypt CMS envelope payloads
//! under a random per-message content-encryption key (see `keychain-cms`).

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;

use crate::error::{CryptoError, CryptoResult};

pub const KEY_SIZE: usize = 32;
pub const IV_SIZE: usize = 16;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Generates a random AES-256 content-encryption key.
pub fn generate_content_key() -> [u8; KEY_SIZE] {
    let mut key = [0u8; KEY_SIZE];
    rand::thread_rng().fill_bytes(&mut key);
    key
}

/// Encrypts `plaintext` under `key` with a freshly generated random IV.
/// Returns `(iv, ciphertext)`; the IV is not secret and travels alongside
/// the ciphertext in the CMS envelope's encryptedContentInfo.
pub fn encrypt(key: &[u8; KEY_SIZE], plaintext: &[u8]) -> CryptoResult<([u8; IV_SIZE], Vec<u8>)> {
    let mut iv = [0u8; IV_SIZE];
    rand::thread_rng().fill_bytes(&mut iv);
    let enc = Aes256CbcEnc::new(key.into(), &iv.into());
    let ciphertext = enc.encrypt_padded_vec_mut::<Pkcs7>(plaintext);
    Ok((iv, ciphertext))
}

/// Decrypts `ciphertext` under `key`/`iv` produced by [`encrypt`].
pub fn decrypt(key: &[u8; KEY_SIZE], iv: &[u8; IV_SIZE], ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
    let dec = Aes256CbcDec::new(key.into(), iv.into());
    dec.decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|e| CryptoError::CipherFailure(format!("aes-cbc decrypt: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let key = generate_content_key();
        let (iv, ct) = encrypt(&key, b"This is a message from Alice to Bob").unwrap();
        let pt = decrypt(&key, &iv, &ct).unwrap();
        assert_eq!(pt, b"This is a message from Alice to Bob");
    }

    #[test]
    fn wrong_key_fails_or_garbles() {
        let key = generate_content_key();
        let other = generate_content_key();
        let (iv, ct) = encrypt(&key, b"hello world").unwrap();
        let result = decrypt(&other, &iv, &ct);
        assert!(result.is_err() || result.unwrap() != b"hello world");
    }
}
