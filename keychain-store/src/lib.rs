//! Pluggable object-store abstraction.
//!
//! The keychain facade only ever talks to this trait; it never knows
//! whether keys live on disk or in memory. Mirrors the
//! has/get/put/delete/query/batch shape `privstack-blobstore`'s
//! `BlobStore` exposes, generalized away from a single backing
//! connection type.

mod error;
mod filesystem;
mod memory;

pub use error::{StoreError, StoreResult};
pub use filesystem::FilesystemStore;
pub use memory::MemoryStore;

/// A single put/delete queued for atomic commit, used by `renameKey`
/// so the old name's removal and the new name's write land together on
/// stores that support it.
pub enum BatchOp {
    Put(String, Vec<u8>),
    Delete(String),
}

/// Deferred batch of operations. `commit` applies every queued op; a
/// store that cannot offer atomicity may still implement this
/// sequentially, documenting the non-atomic window (see §5/§9).
pub trait Batch {
    fn put(&mut self, key: String, value: Vec<u8>);
    fn delete(&mut self, key: String);
    fn commit(self: Box<Self>) -> StoreResult<()>;
}

/// Object-store contract used by the keychain. Keys are plain strings;
/// implementations are free to map them onto filenames, table rows, or
/// whatever their backing medium needs.
pub trait Store: Send + Sync {
    fn has(&self, key: &str) -> StoreResult<bool>;
    fn get(&self, key: &str) -> StoreResult<Vec<u8>>;
    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()>;
    fn delete(&self, key: &str) -> StoreResult<()>;

    /// Enumerates every stored key. `keys_only` is accepted for parity
    /// with the contract's `query(keysOnly)` signature; every
    /// implementation here only ever stores keys-as-names so the flag
    /// has no effect, but callers pass it to stay future-proof against
    /// a store that also tracks metadata.
    fn query(&self, keys_only: bool) -> StoreResult<Vec<String>>;

    /// Returns a batch handle if the store can offer atomic multi-op
    /// commits. `None` means callers must fall back to a sequential
    /// put-then-delete and accept the documented race window.
    fn batch(&self) -> Option<Box<dyn Batch>> {
        None
    }

    /// Resolves `key` to a physical path, for stores backed by a real
    /// filesystem. `None` for stores with no path concept (e.g. an
    /// in-memory map or a key-value datastore).
    fn path_hint(&self, _key: &str) -> Option<String> {
        None
    }
}
