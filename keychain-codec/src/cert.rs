//! Self-signed X.509 certificate construction for a stored key.
//!
//! The certificate exists only to carry an identity through CMS
//! EnvelopedData — it is never validated as a trust anchor. Its subject
//! and issuer are always identical and fixed to the recipient-discovery
//! contract: `O=ipfs, OU=keystore, CN=<keyId>`.

use chrono::{Duration, Utc};
use const_oid::ObjectIdentifier;
use pkcs1::EncodeRsaPublicKey;
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use sha2::{Digest, Sha256};

use crate::der_util::*;
use crate::error::{CodecError, CodecResult};
use crate::rsa_key::key_id;

const OID_RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
const OID_SHA256_WITH_RSA: &str = "1.2.840.113549.1.1.11";
const OID_COMMON_NAME: &str = "2.5.4.3";
const OID_ORG_NAME: &str = "2.5.4.10";
const OID_ORG_UNIT_NAME: &str = "2.5.4.11";
const OID_BASIC_CONSTRAINTS: &str = "2.5.29.19";
const OID_KEY_USAGE: &str = "2.5.29.15";
const OID_EXT_KEY_USAGE: &str = "2.5.29.37";
const OID_EKU_SERVER_AUTH: &str = "1.3.6.1.5.5.7.3.1";
const OID_EKU_CLIENT_AUTH: &str = "1.3.6.1.5.5.7.3.2";
const OID_EKU_CODE_SIGNING: &str = "1.3.6.1.5.5.7.3.3";
const OID_EKU_EMAIL_PROTECTION: &str = "1.3.6.1.5.5.7.3.4";
const OID_EKU_TIME_STAMPING: &str = "1.3.6.1.5.5.7.3.8";

fn oid_of(dotted: &str) -> ObjectIdentifier {
    ObjectIdentifier::new(dotted).expect("static oid is well formed")
}

fn rdn(attr_oid: &str, value: &str) -> Vec<u8> {
    let entry = sequence(&[&oid(&oid_of(attr_oid)), &utf8_string(value)]);
    set_of(&[&entry])
}

/// Builds the fixed `O=ipfs, OU=keystore, CN=<key id>` subject/issuer
/// name used by every certificate this crate issues.
fn keychain_name(key_id: &str) -> Vec<u8> {
    sequence(&[
        &rdn(OID_ORG_NAME, "ipfs"),
        &rdn(OID_ORG_UNIT_NAME, "keystore"),
        &rdn(OID_COMMON_NAME, key_id),
    ])
}

fn utc_time_of(dt: chrono::DateTime<Utc>) -> Vec<u8> {
    utc_time(&dt.format("%y%m%d%H%M%SZ").to_string())
}

fn algorithm_identifier(dotted: &str, with_null_params: bool) -> Vec<u8> {
    if with_null_params {
        sequence(&[&oid(&oid_of(dotted)), &null()])
    } else {
        sequence(&[&oid(&oid_of(dotted))])
    }
}

fn subject_public_key_info(private: &RsaPrivateKey) -> CodecResult<Vec<u8>> {
    let public = private.to_public_key();
    let pkcs1_der = public
        .to_pkcs1_der()
        .map_err(|e| CodecError::CertFailure(e.to_string()))?;
    Ok(sequence(&[
        &algorithm_identifier(OID_RSA_ENCRYPTION, true),
        &bit_string(pkcs1_der.as_bytes()),
    ]))
}

fn basic_constraints_extension() -> Vec<u8> {
    let value = sequence(&[&tlv(0x01, &[0xFF])]); // cA = TRUE
    sequence(&[
        &oid(&oid_of(OID_BASIC_CONSTRAINTS)),
        &tlv(0x01, &[0xFF]), // critical
        &octet_string(&value),
    ])
}

fn key_usage_extension() -> Vec<u8> {
    // digitalSignature (bit 0) and keyEncipherment (bit 2).
    let bits = [0b1010_0000u8];
    let mut content = vec![5u8];
    content.extend_from_slice(&bits);
    let value = tlv(TAG_BIT_STRING, &content);
    sequence(&[
        &oid(&oid_of(OID_KEY_USAGE)),
        &tlv(0x01, &[0xFF]), // critical
        &octet_string(&value),
    ])
}

fn extended_key_usage_extension() -> Vec<u8> {
    let purposes = [
        OID_EKU_SERVER_AUTH,
        OID_EKU_CLIENT_AUTH,
        OID_EKU_CODE_SIGNING,
        OID_EKU_EMAIL_PROTECTION,
        OID_EKU_TIME_STAMPING,
    ];
    let encoded: Vec<Vec<u8>> = purposes.iter().map(|o| oid(&oid_of(o))).collect();
    let refs: Vec<&[u8]> = encoded.iter().map(|v| v.as_slice()).collect();
    let value = sequence(&refs);
    sequence(&[&oid(&oid_of(OID_EXT_KEY_USAGE)), &octet_string(&value)])
}

/// Builds and self-signs a 10-year X.509 certificate for `private`,
/// returning the DER-encoded `Certificate`.
pub fn build_self_signed(private: &RsaPrivateKey) -> CodecResult<Vec<u8>> {
    let id = key_id(private)?;
    let name = keychain_name(&id);

    let not_before = Utc::now();
    let not_after = not_before + Duration::days(365 * 10);
    let validity = sequence(&[&utc_time_of(not_before), &utc_time_of(not_after)]);

    let spki = subject_public_key_info(private)?;

    let extensions = sequence(&[
        &basic_constraints_extension(),
        &key_usage_extension(),
        &extended_key_usage_extension(),
    ]);

    let version = context(0, &small_integer(2));
    let serial = small_integer(1);
    let signature_alg = algorithm_identifier(OID_SHA256_WITH_RSA, true);

    let tbs = sequence(&[
        &version,
        &serial,
        &signature_alg,
        &name,
        &validity,
        &name,
        &spki,
        &context(3, &extensions),
    ]);

    let digest = Sha256::digest(&tbs);
    let signature = private
        .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
        .map_err(|e| CodecError::CertFailure(format!("self-signing failed: {e}")))?;

    Ok(sequence(&[
        &tbs,
        &signature_alg,
        &bit_string(&signature),
    ]))
}

/// Serial number every certificate from [`build_self_signed`] carries.
/// `keychain-cms` reuses this constant when assembling a CMS
/// `IssuerAndSerialNumber` so the recipient identifier matches the cert.
pub const SELF_SIGNED_SERIAL: u64 = 1;

/// Locates and returns the raw DER bytes (tag + length + content) of the
/// issuer `Name` inside a certificate built by [`build_self_signed`].
/// Used by `keychain-cms` to embed the issuer in a CMS
/// `IssuerAndSerialNumber` without re-deriving it from the key id.
pub fn issuer_name_der(certificate_der: &[u8]) -> CodecResult<Vec<u8>> {
    let tbs = tbs_certificate(certificate_der)?;
    let (issuer_tag, issuer, _) = issuer_field(tbs)?;
    if issuer_tag != TAG_SEQUENCE {
        return Err(CodecError::CertFailure("malformed issuer Name".into()));
    }
    Ok(sequence(&[issuer]))
}

/// Extracts `(organization, common_name)` from the issuer of a
/// certificate's DER encoding, used by `keychain-cms` to implement the
/// recipient-discovery contract without pulling in a full X.509 parser.
pub fn issuer_org_and_cn(certificate_der: &[u8]) -> CodecResult<(Option<String>, Option<String>)> {
    let tbs = tbs_certificate(certificate_der)?;
    let (issuer_tag, issuer, _) = issuer_field(tbs)?;
    if issuer_tag != TAG_SEQUENCE {
        return Err(CodecError::CertFailure("malformed issuer Name".into()));
    }
    name_org_and_cn(&sequence(&[issuer]))
}

fn tbs_certificate(certificate_der: &[u8]) -> CodecResult<&[u8]> {
    let (tag, cert_content, _) =
        parse_tlv(certificate_der, 0).ok_or_else(|| CodecError::CertFailure("truncated certificate".into()))?;
    if tag != TAG_SEQUENCE {
        return Err(CodecError::CertFailure("not a DER SEQUENCE".into()));
    }
    let (tbs_tag, tbs, _) =
        parse_tlv(cert_content, 0).ok_or_else(|| CodecError::CertFailure("missing tbsCertificate".into()))?;
    if tbs_tag != TAG_SEQUENCE {
        return Err(CodecError::CertFailure("malformed tbsCertificate".into()));
    }
    Ok(tbs)
}

fn issuer_field(tbs: &[u8]) -> CodecResult<(u8, &[u8], usize)> {
    let mut pos = 0usize;
    let (first_tag, _, next) =
        parse_tlv(tbs, pos).ok_or_else(|| CodecError::CertFailure("empty tbsCertificate".into()))?;
    if first_tag == TAG_CONTEXT_0 {
        pos = next; // consume explicit version, land on serialNumber
    }
    let (_, _, next) = parse_tlv(tbs, pos).ok_or_else(|| CodecError::CertFailure("missing serial".into()))?;
    pos = next;
    let (_, _, next) = parse_tlv(tbs, pos).ok_or_else(|| CodecError::CertFailure("missing signature alg".into()))?;
    pos = next;
    parse_tlv(tbs, pos).ok_or_else(|| CodecError::CertFailure("missing issuer".into()))
}

/// Extracts `(organization, common_name)` from a standalone DER `Name`
/// (e.g. the issuer field pulled out of a CMS `IssuerAndSerialNumber`),
/// without requiring a surrounding certificate.
pub fn name_org_and_cn(name_der: &[u8]) -> CodecResult<(Option<String>, Option<String>)> {
    let (name_tag, issuer, _) =
        parse_tlv(name_der, 0).ok_or_else(|| CodecError::CertFailure("truncated Name".into()))?;
    if name_tag != TAG_SEQUENCE {
        return Err(CodecError::CertFailure("malformed Name".into()));
    }

    let mut org = None;
    let mut cn = None;
    let mut rdn_pos = 0usize;
    while let Some((set_tag, set_content, next)) = parse_tlv(issuer, rdn_pos) {
        if set_tag != TAG_SET {
            break;
        }
        if let Some((seq_tag, seq_content, _)) = parse_tlv(set_content, 0) {
            if seq_tag == TAG_SEQUENCE {
                if let Some((_, oid_bytes, after_oid)) = parse_tlv(seq_content, 0) {
                    if let Some((_, value_bytes, _)) = parse_tlv(seq_content, after_oid) {
                        let value = String::from_utf8_lossy(value_bytes).to_string();
                        if oid_bytes == oid_of(OID_ORG_NAME).as_bytes() {
                            org = Some(value);
                        } else if oid_bytes == oid_of(OID_COMMON_NAME).as_bytes() {
                            cn = Some(value);
                        }
                    }
                }
            }
        }
        rdn_pos = next;
    }

    Ok((org, cn))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rsa_key::generate;

    #[test]
    fn builds_certificate_with_expected_issuer() {
        let key = generate(2048).unwrap();
        let der = build_self_signed(&key).unwrap();
        assert!(!der.is_empty());
        let (org, cn) = issuer_org_and_cn(&der).unwrap();
        assert_eq!(org.as_deref(), Some("ipfs"));
        assert_eq!(cn.as_deref(), Some(key_id(&key).unwrap().as_str()));
    }

    #[test]
    fn issuer_name_der_matches_issuer_org_and_cn() {
        let key = generate(2048).unwrap();
        let der = build_self_signed(&key).unwrap();
        let issuer = issuer_name_der(&der).unwrap();
        let (org, cn) = name_org_and_cn(&issuer).unwrap();
        assert_eq!(org.as_deref(), Some("ipfs"));
        assert_eq!(cn.as_deref(), Some(key_id(&key).unwrap().as_str()));
    }
}
