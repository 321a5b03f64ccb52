//! Minimal hand-rolled DER encoder/decoder for the ASN.1 subset this
//! crate needs (X.509 certificates) and that `keychain-cms` needs
//! (PKCS#7 EnvelopedData). Kept deliberately small: full generality is
//! unnecessary when every structure we emit or parse is fixed shape.

use const_oid::ObjectIdentifier;

pub const TAG_INTEGER: u8 = 0x02;
pub const TAG_BIT_STRING: u8 = 0x03;
pub const TAG_OCTET_STRING: u8 = 0x04;
pub const TAG_NULL: u8 = 0x05;
pub const TAG_OID: u8 = 0x06;
pub const TAG_UTF8_STRING: u8 = 0x0C;
pub const TAG_PRINTABLE_STRING: u8 = 0x13;
pub const TAG_UTC_TIME: u8 = 0x17;
pub const TAG_SEQUENCE: u8 = 0x30;
pub const TAG_SET: u8 = 0x31;
pub const TAG_CONTEXT_0: u8 = 0xA0;
pub const TAG_CONTEXT_3: u8 = 0xA3;

/// Encodes a DER length prefix for `len` bytes of content.
fn encode_len(len: usize, out: &mut Vec<u8>) {
    if len < 0x80 {
        out.push(len as u8);
    } else {
        let bytes = len.to_be_bytes();
        let significant: Vec<u8> = bytes
            .iter()
            .copied()
            .skip_while(|&b| b == 0)
            .collect();
        out.push(0x80 | significant.len() as u8);
        out.extend_from_slice(&significant);
    }
}

/// Wraps `content` in a tag + length header.
pub fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() + 4);
    out.push(tag);
    encode_len(content.len(), &mut out);
    out.extend_from_slice(content);
    out
}

pub fn sequence(parts: &[&[u8]]) -> Vec<u8> {
    let content: Vec<u8> = parts.concat();
    tlv(TAG_SEQUENCE, &content)
}

pub fn set_of(parts: &[&[u8]]) -> Vec<u8> {
    let content: Vec<u8> = parts.concat();
    tlv(TAG_SET, &content)
}

pub fn oid(id: &ObjectIdentifier) -> Vec<u8> {
    tlv(TAG_OID, id.as_bytes())
}

pub fn null() -> Vec<u8> {
    tlv(TAG_NULL, &[])
}

pub fn octet_string(bytes: &[u8]) -> Vec<u8> {
    tlv(TAG_OCTET_STRING, bytes)
}

pub fn utf8_string(s: &str) -> Vec<u8> {
    tlv(TAG_UTF8_STRING, s.as_bytes())
}

pub fn printable_string(s: &str) -> Vec<u8> {
    tlv(TAG_PRINTABLE_STRING, s.as_bytes())
}

/// Unsigned big-endian INTEGER, with a leading zero byte inserted when
/// the high bit of the first byte would otherwise flip the sign.
pub fn unsigned_integer(bytes: &[u8]) -> Vec<u8> {
    let mut content = bytes.to_vec();
    while content.len() > 1 && content[0] == 0 && content[1] < 0x80 {
        content.remove(0);
    }
    if content.is_empty() {
        content.push(0);
    }
    if content[0] & 0x80 != 0 {
        content.insert(0, 0);
    }
    tlv(TAG_INTEGER, &content)
}

pub fn small_integer(value: u64) -> Vec<u8> {
    unsigned_integer(&value.to_be_bytes())
}

/// A BIT STRING with zero unused trailing bits, as every value here is
/// byte-aligned (public keys, signatures).
pub fn bit_string(bytes: &[u8]) -> Vec<u8> {
    let mut content = Vec::with_capacity(bytes.len() + 1);
    content.push(0u8);
    content.extend_from_slice(bytes);
    tlv(TAG_BIT_STRING, &content)
}

pub fn utc_time(formatted: &str) -> Vec<u8> {
    tlv(TAG_UTC_TIME, formatted.as_bytes())
}

pub fn context(tag_number: u8, constructed_content: &[u8]) -> Vec<u8> {
    tlv(0xA0 | (tag_number & 0x1F), constructed_content)
}

/// An `[n] IMPLICIT` primitive value (as opposed to [`context`]'s
/// `[n] EXPLICIT`, which always constructs). Used for CMS
/// `encryptedContent [0] IMPLICIT OCTET STRING`.
pub fn context_primitive(tag_number: u8, content: &[u8]) -> Vec<u8> {
    tlv(0x80 | (tag_number & 0x1F), content)
}

/// Parses a single TLV at `offset`, returning `(tag, content, next_offset)`.
pub fn parse_tlv(data: &[u8], offset: usize) -> Option<(u8, &[u8], usize)> {
    if offset >= data.len() {
        return None;
    }
    let tag = data[offset];
    let mut pos = offset + 1;
    let first_len = *data.get(pos)?;
    pos += 1;
    let len = if first_len & 0x80 == 0 {
        first_len as usize
    } else {
        let n = (first_len & 0x7F) as usize;
        let mut len = 0usize;
        for _ in 0..n {
            len = (len << 8) | (*data.get(pos)? as usize);
            pos += 1;
        }
        len
    };
    let end = pos.checked_add(len)?;
    let content = data.get(pos..end)?;
    Some((tag, content, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_sequence() {
        let inner = octet_string(b"hi");
        let seq = sequence(&[&inner]);
        let (tag, content, end) = parse_tlv(&seq, 0).unwrap();
        assert_eq!(tag, TAG_SEQUENCE);
        assert_eq!(end, seq.len());
        let (inner_tag, inner_content, _) = parse_tlv(content, 0).unwrap();
        assert_eq!(inner_tag, TAG_OCTET_STRING);
        assert_eq!(inner_content, b"hi");
    }

    #[test]
    fn integer_gets_leading_zero_when_high_bit_set() {
        let v = unsigned_integer(&[0xFF]);
        assert_eq!(v, vec![TAG_INTEGER, 2, 0x00, 0xFF]);
    }

    #[test]
    fn long_length_encodes_multi_byte_form() {
        let content = vec![0u8; 200];
        let v = tlv(TAG_OCTET_STRING, &content);
        assert_eq!(&v[0..3], &[TAG_OCTET_STRING, 0x81, 200]);
    }

    #[test]
    fn huge_claimed_length_does_not_overflow() {
        // tag, 0x88 (8 length-bytes follow), then a length close to usize::MAX.
        let mut data = vec![TAG_OCTET_STRING, 0x88];
        data.extend_from_slice(&(u64::MAX - 1).to_be_bytes());
        assert!(parse_tlv(&data, 0).is_none());
    }
}
