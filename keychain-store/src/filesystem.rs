use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{StoreError, StoreResult};
use crate::{Batch, BatchOp, Store};

const EXTENSION: &str = "p8";

/// Directory-backed store. Each key `/<name>` maps to
/// `<root>/<name>.p8`, the on-disk convention §6 specifies.
pub struct FilesystemStore {
    root: PathBuf,
}

impl FilesystemStore {
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name = key.trim_start_matches('/');
        self.root.join(format!("{name}.{EXTENSION}"))
    }

    fn name_from_path(&self, path: &Path) -> Option<String> {
        let stem = path.file_stem()?.to_str()?;
        Some(format!("/{stem}"))
    }
}

impl Store for FilesystemStore {
    fn has(&self, key: &str) -> StoreResult<bool> {
        Ok(self.path_for(key).exists())
    }

    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        let path = self.path_for(key);
        fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(key.to_string())
            } else {
                StoreError::Io(e.to_string())
            }
        })
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        fs::write(self.path_for(key), value).map_err(|e| StoreError::Io(e.to_string()))
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e.to_string())),
        }
    }

    fn query(&self, _keys_only: bool) -> StoreResult<Vec<String>> {
        let mut out = Vec::new();
        let entries = fs::read_dir(&self.root).map_err(|e| StoreError::Io(e.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::Io(e.to_string()))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(EXTENSION) {
                if let Some(name) = self.name_from_path(&path) {
                    out.push(name);
                }
            }
        }
        Ok(out)
    }

    fn batch(&self) -> Option<Box<dyn Batch>> {
        Some(Box::new(FilesystemBatch {
            root: self.root.clone(),
            ops: Vec::new(),
        }))
    }

    fn path_hint(&self, key: &str) -> Option<String> {
        Some(self.path_for(key).to_string_lossy().into_owned())
    }
}

struct FilesystemBatch {
    root: PathBuf,
    ops: Vec<BatchOp>,
}

impl Batch for FilesystemBatch {
    fn put(&mut self, key: String, value: Vec<u8>) {
        self.ops.push(BatchOp::Put(key, value));
    }

    fn delete(&mut self, key: String) {
        self.ops.push(BatchOp::Delete(key));
    }

    /// The filesystem offers no cross-file transaction; this applies
    /// puts before deletes so a crash mid-batch leaves both the old and
    /// new record present rather than neither (§5, §9: documented
    /// non-atomic fallback).
    fn commit(self: Box<Self>) -> StoreResult<()> {
        let path_for = |root: &Path, key: &str| root.join(format!("{}.{EXTENSION}", key.trim_start_matches('/')));
        let (puts, deletes): (Vec<_>, Vec<_>) = self
            .ops
            .into_iter()
            .partition(|op| matches!(op, BatchOp::Put(_, _)));
        for op in puts {
            if let BatchOp::Put(key, value) = op {
                fs::write(path_for(&self.root, &key), value).map_err(|e| StoreError::Io(e.to_string()))?;
            }
        }
        for op in deletes {
            if let BatchOp::Delete(key) = op {
                let path = path_for(&self.root, &key);
                if let Err(e) = fs::remove_file(&path) {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        return Err(StoreError::Io(e.to_string()));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn put_get_delete_round_trip() {
        let dir = tempdir().unwrap();
        let store = FilesystemStore::open(dir.path()).unwrap();
        store.put("/rsa-key", b"pem-bytes").unwrap();
        assert!(store.has("/rsa-key").unwrap());
        assert_eq!(store.get("/rsa-key").unwrap(), b"pem-bytes");
        store.delete("/rsa-key").unwrap();
        assert!(!store.has("/rsa-key").unwrap());
    }

    #[test]
    fn query_lists_only_p8_files() {
        let dir = tempdir().unwrap();
        let store = FilesystemStore::open(dir.path()).unwrap();
        store.put("/a", b"1").unwrap();
        store.put("/b", b"2").unwrap();
        std::fs::write(dir.path().join("stray.txt"), b"ignore me").unwrap();
        let mut keys = store.query(true).unwrap();
        keys.sort();
        assert_eq!(keys, vec!["/a".to_string(), "/b".to_string()]);
    }

    #[test]
    fn rename_batch_leaves_exactly_one_record() {
        let dir = tempdir().unwrap();
        let store = FilesystemStore::open(dir.path()).unwrap();
        store.put("/rsa-key", b"pem-bytes").unwrap();
        let mut batch = store.batch().unwrap();
        batch.put("/rsa-key-2".to_string(), b"pem-bytes".to_vec());
        batch.delete("/rsa-key".to_string());
        batch.commit().unwrap();
        assert!(!store.has("/rsa-key").unwrap());
        assert!(store.has("/rsa-key-2").unwrap());
    }
}
