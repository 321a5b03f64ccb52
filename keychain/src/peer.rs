//! The peer-identity contract `importPeer` consumes. The actual
//! peer-identity wire codec (unmarshalling a foreign binary private-key
//! envelope into a raw DER `SubjectPrivateKeyInfo`) is an external
//! collaborator out of scope for this crate (spec §1); this trait is
//! the seam a caller's codec plugs into.

/// An opaque peer identity exposing its marshalled private-key blob and,
/// optionally, its own native string key id (e.g. a multihash). When a
/// native id is present, `importPeer` records it verbatim instead of
/// computing the local content address (spec §9, "two id schemes").
pub trait PeerIdentity {
    /// Raw DER (PKCS#1 or PKCS#8) `SubjectPrivateKeyInfo` bytes, already
    /// decoded by the peer-identity codec from its native wire format.
    fn private_key_blob(&self) -> &[u8];

    /// The peer's own content-addressed id, if it supplies one.
    fn native_id(&self) -> Option<String> {
        None
    }
}
