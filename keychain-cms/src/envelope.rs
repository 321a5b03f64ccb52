//! PKCS#7 `EnvelopedData` (RFC 5652) addressed to a single recipient
//! identified by the `O=ipfs, CN=<keyId>` discovery contract.
//!
//! Both directions are hand-rolled over `keychain_codec::der_util`
//! rather than a general CMS library: the structure we emit and accept
//! is fixed shape (one `KeyTransRecipientInfo`, AES-256-CBC content),
//! so a full ASN.1 stack buys nothing a dedicated encoder/decoder pair
//! doesn't already give us.

use keychain_codec::der_util::*;
use keychain_codec::RsaPrivateKey;
use rand::thread_rng;
use rsa::Pkcs1v15Encrypt;

use crate::error::{CmsError, CmsResult};

const OID_RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
const OID_PKCS7_DATA: &str = "1.2.840.113549.1.7.1";
const OID_PKCS7_ENVELOPED_DATA: &str = "1.2.840.113549.1.7.3";
const OID_AES256_CBC: &str = "2.16.840.1.101.3.4.1.42";

fn oid_of(dotted: &str) -> const_oid::ObjectIdentifier {
    const_oid::ObjectIdentifier::new(dotted).expect("static oid is well formed")
}

/// A single recipient extracted from a parsed envelope: the content-
/// encryption key encrypted under that recipient's RSA public key, keyed
/// by the `keyId` pulled from its issuer `CN`.
pub struct ParsedRecipient {
    pub key_id: String,
    encrypted_key: Vec<u8>,
}

/// A parsed `EnvelopedData`, with the shared encrypted content still
/// sealed — the caller resolves one [`ParsedRecipient`] to a stored key
/// before calling [`decrypt_content`].
pub struct ParsedEnvelope {
    pub recipients: Vec<ParsedRecipient>,
    iv: [u8; keychain_crypto::IV_SIZE],
    ciphertext: Vec<u8>,
}

/// Builds an anonymous (unsigned) `EnvelopedData` addressed to `private`'s
/// own self-signed certificate, containing `plaintext`.
pub fn build_anonymous_envelope(private: &RsaPrivateKey, plaintext: &[u8]) -> CmsResult<Vec<u8>> {
    let cert_der = keychain_codec::build_self_signed(private)
        .map_err(|e| CmsError::CryptoFailure(e.to_string()))?;
    let issuer = keychain_codec::issuer_name_der(&cert_der)
        .map_err(|e| CmsError::InvalidCms(e.to_string()))?;
    let serial = small_integer(keychain_codec::SELF_SIGNED_SERIAL);

    let content_key = keychain_crypto::generate_content_key();
    let (iv, ciphertext) = keychain_crypto::encrypt(&content_key, plaintext)
        .map_err(|e| CmsError::CryptoFailure(e.to_string()))?;

    let public = private.to_public_key();
    let mut rng = thread_rng();
    let encrypted_key = public
        .encrypt(&mut rng, Pkcs1v15Encrypt, &content_key)
        .map_err(|e| CmsError::CryptoFailure(e.to_string()))?;

    let issuer_and_serial = sequence(&[&issuer, &serial]);
    let key_trans_recipient_info = sequence(&[
        &small_integer(0),
        &issuer_and_serial,
        &sequence(&[&oid(&oid_of(OID_RSA_ENCRYPTION)), &null()]),
        &octet_string(&encrypted_key),
    ]);
    let recipient_infos = set_of(&[&key_trans_recipient_info]);

    let encrypted_content_info = sequence(&[
        &oid(&oid_of(OID_PKCS7_DATA)),
        &sequence(&[&oid(&oid_of(OID_AES256_CBC)), &octet_string(&iv)]),
        &context_primitive(0, &ciphertext),
    ]);

    let enveloped_data = sequence(&[&small_integer(0), &recipient_infos, &encrypted_content_info]);

    tracing::debug!(key_id = %keychain_codec::key_id(private).unwrap_or_default(), "built anonymous cms envelope");

    Ok(sequence(&[
        &oid(&oid_of(OID_PKCS7_ENVELOPED_DATA)),
        &context(0, &enveloped_data),
    ]))
}

/// Parses a DER-encoded `ContentInfo`/`EnvelopedData` pair, extracting
/// every recipient whose issuer carries the `O=ipfs, CN=<keyId>`
/// discovery contract. Recipients with any other issuer shape are
/// silently skipped, matching the source's "filter then scan" behavior.
pub fn parse(der: &[u8]) -> CmsResult<ParsedEnvelope> {
    let (tag, content_info, _) =
        parse_tlv(der, 0).ok_or_else(|| CmsError::InvalidCms("truncated cms envelope".into()))?;
    if tag != TAG_SEQUENCE {
        return Err(CmsError::InvalidCms("not a DER SEQUENCE".into()));
    }

    let (_, content_type, next) = parse_tlv(content_info, 0)
        .ok_or_else(|| CmsError::InvalidCms("missing contentType".into()))?;
    if content_type != oid_of(OID_PKCS7_ENVELOPED_DATA).as_bytes() {
        return Err(CmsError::InvalidCms("not a pkcs7 envelopedData".into()));
    }

    let (explicit_tag, explicit_content, _) = parse_tlv(content_info, next)
        .ok_or_else(|| CmsError::InvalidCms("missing envelopedData content".into()))?;
    if explicit_tag != TAG_CONTEXT_0 {
        return Err(CmsError::InvalidCms("malformed content wrapper".into()));
    }

    let (ed_tag, enveloped_data, _) = parse_tlv(explicit_content, 0)
        .ok_or_else(|| CmsError::InvalidCms("missing envelopedData".into()))?;
    if ed_tag != TAG_SEQUENCE {
        return Err(CmsError::InvalidCms("malformed envelopedData".into()));
    }

    let (_, _version, pos) = parse_tlv(enveloped_data, 0)
        .ok_or_else(|| CmsError::InvalidCms("missing envelopedData version".into()))?;
    let (ri_tag, recipient_infos, pos) = parse_tlv(enveloped_data, pos)
        .ok_or_else(|| CmsError::InvalidCms("missing recipientInfos".into()))?;
    if ri_tag != TAG_SET {
        return Err(CmsError::InvalidCms("recipientInfos is not a SET".into()));
    }

    let recipients = parse_recipient_infos(recipient_infos)?;

    let (eci_tag, encrypted_content_info, _) = parse_tlv(enveloped_data, pos)
        .ok_or_else(|| CmsError::InvalidCms("missing encryptedContentInfo".into()))?;
    if eci_tag != TAG_SEQUENCE {
        return Err(CmsError::InvalidCms("malformed encryptedContentInfo".into()));
    }
    let (iv, ciphertext) = parse_encrypted_content_info(encrypted_content_info)?;

    Ok(ParsedEnvelope { recipients, iv, ciphertext })
}

fn parse_recipient_infos(recipient_infos: &[u8]) -> CmsResult<Vec<ParsedRecipient>> {
    let mut recipients = Vec::new();
    let mut pos = 0usize;
    while let Some((kt_tag, key_trans, next)) = parse_tlv(recipient_infos, pos) {
        if kt_tag != TAG_SEQUENCE {
            return Err(CmsError::InvalidCms("malformed KeyTransRecipientInfo".into()));
        }
        let (_, _rid_version, kpos) = parse_tlv(key_trans, 0)
            .ok_or_else(|| CmsError::InvalidCms("missing recipientInfo version".into()))?;
        let (ias_tag, issuer_and_serial, kpos) = parse_tlv(key_trans, kpos)
            .ok_or_else(|| CmsError::InvalidCms("missing issuerAndSerialNumber".into()))?;
        if ias_tag != TAG_SEQUENCE {
            return Err(CmsError::InvalidCms("malformed issuerAndSerialNumber".into()));
        }
        let (issuer_tag, issuer, _) = parse_tlv(issuer_and_serial, 0)
            .ok_or_else(|| CmsError::InvalidCms("missing issuer".into()))?;
        if issuer_tag != TAG_SEQUENCE {
            return Err(CmsError::InvalidCms("malformed issuer".into()));
        }

        let (_, _key_enc_alg, kpos) = parse_tlv(key_trans, kpos)
            .ok_or_else(|| CmsError::InvalidCms("missing keyEncryptionAlgorithm".into()))?;
        let (ek_tag, encrypted_key, _) = parse_tlv(key_trans, kpos)
            .ok_or_else(|| CmsError::InvalidCms("missing encryptedKey".into()))?;
        if ek_tag != TAG_OCTET_STRING {
            return Err(CmsError::InvalidCms("malformed encryptedKey".into()));
        }

        let issuer_der = sequence(&[issuer]);
        let (org, cn) = keychain_codec::name_org_and_cn(&issuer_der)
            .map_err(|e| CmsError::InvalidCms(e.to_string()))?;
        if org.as_deref() == Some("ipfs") {
            if let Some(key_id) = cn {
                recipients.push(ParsedRecipient { key_id, encrypted_key: encrypted_key.to_vec() });
            }
        }

        pos = next;
    }
    Ok(recipients)
}

fn parse_encrypted_content_info(
    encrypted_content_info: &[u8],
) -> CmsResult<([u8; keychain_crypto::IV_SIZE], Vec<u8>)> {
    let (_, _content_type, pos) = parse_tlv(encrypted_content_info, 0)
        .ok_or_else(|| CmsError::InvalidCms("missing encryptedContentInfo contentType".into()))?;
    let (_, content_enc_alg, pos) = parse_tlv(encrypted_content_info, pos)
        .ok_or_else(|| CmsError::InvalidCms("missing contentEncryptionAlgorithm".into()))?;
    let (_, _alg_oid, alg_pos) = parse_tlv(content_enc_alg, 0)
        .ok_or_else(|| CmsError::InvalidCms("malformed contentEncryptionAlgorithm".into()))?;
    let (_, iv_bytes, _) = parse_tlv(content_enc_alg, alg_pos)
        .ok_or_else(|| CmsError::InvalidCms("missing content encryption iv".into()))?;
    if iv_bytes.len() != keychain_crypto::IV_SIZE {
        return Err(CmsError::InvalidCms("content encryption iv has wrong length".into()));
    }
    let mut iv = [0u8; keychain_crypto::IV_SIZE];
    iv.copy_from_slice(iv_bytes);

    let (ec_tag, ciphertext, _) = parse_tlv(encrypted_content_info, pos)
        .ok_or_else(|| CmsError::InvalidCms("missing encryptedContent".into()))?;
    if ec_tag != 0x80 {
        return Err(CmsError::InvalidCms("malformed encryptedContent".into()));
    }

    Ok((iv, ciphertext.to_vec()))
}

/// Decrypts the shared content in `parsed` using `recipient`'s
/// encrypted content-encryption key, unwrapped with `private`.
pub fn decrypt_content(
    parsed: &ParsedEnvelope,
    recipient: &ParsedRecipient,
    private: &RsaPrivateKey,
) -> CmsResult<Vec<u8>> {
    let content_key = private
        .decrypt(Pkcs1v15Encrypt, &recipient.encrypted_key)
        .map_err(|e| CmsError::CryptoFailure(e.to_string()))?;
    let content_key: [u8; keychain_crypto::KEY_SIZE] = content_key
        .try_into()
        .map_err(|_| CmsError::InvalidCms("recovered content key has wrong length".into()))?;
    keychain_crypto::decrypt(&content_key, &parsed.iv, &parsed.ciphertext)
        .map_err(|e| CmsError::CryptoFailure(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use keychain_codec::generate;

    #[test]
    fn round_trips_anonymous_envelope() {
        let key = generate(2048).unwrap();
        let plaintext = b"This is a message from Alice to Bob";
        let der = build_anonymous_envelope(&key, plaintext).unwrap();

        let parsed = parse(&der).unwrap();
        assert_eq!(parsed.recipients.len(), 1);
        let expected_id = keychain_codec::key_id(&key).unwrap();
        assert_eq!(parsed.recipients[0].key_id, expected_id);

        let plain = decrypt_content(&parsed, &parsed.recipients[0], &key).unwrap();
        assert_eq!(plain, plaintext);
    }

    #[test]
    fn rejects_non_cms_bytes() {
        let err = parse(b"not a cms envelope").unwrap_err();
        assert!(matches!(err, CmsError::InvalidCms(_)));
    }

    #[test]
    fn wrong_key_fails_to_decrypt_content() {
        let key = generate(2048).unwrap();
        let other = generate(2048).unwrap();
        let der = build_anonymous_envelope(&key, b"hello world").unwrap();
        let parsed = parse(&der).unwrap();
        let err = decrypt_content(&parsed, &parsed.recipients[0], &other).unwrap_err();
        assert!(matches!(err, CmsError::CryptoFailure(_)));
    }
}
