//! Directory-backed fragment storage.
//!
//! Layout: `<root>/<storage key hex>.frag`, each file holding one
//! `codec::encode_fragment` envelope. Writes go through `write_atomic`, so a
//! crash leaves either the old file, the new file, or a stray `.tmp`.

use std::fs;
use std::path::{Path, PathBuf};
use crate::fragment::{codec, Fragment};
use crate::node::StorageKey;
use super::{raw_files, FragmentBackend, StorageError};

const EXTENSION: &str = "frag";

/// One file per fragment under a root directory.
pub struct DirectoryBackend {
    root: PathBuf,
}

impl DirectoryBackend {
    /// Opens (creating if needed) a backend rooted at `root`.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &StorageKey) -> PathBuf {
        self.root.join(format!("{}.{}", key.to_hex(), EXTENSION))
    }
}

impl FragmentBackend for DirectoryBackend {
    fn kind(&self) -> &'static str {
        "directory"
    }

    fn put(&mut self, key: &StorageKey, fragment: &Fragment) -> Result<(), StorageError> {
        raw_files::write_atomic(self.path_for(key), &codec::encode_fragment(fragment))
    }

    fn get(&self, key: &StorageKey) -> Result<Option<Fragment>, StorageError> {
        let bytes = match raw_files::read_file(self.path_for(key)) {
            Ok(bytes) => bytes,
            Err(StorageError::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };
        codec::decode_fragment(&bytes)
            .map(Some)
            .map_err(|_| StorageError::Corruption)
    }

    fn remove(&mut self, key: &StorageKey) -> Result<bool, StorageError> {
        raw_files::delete(self.path_for(key))
    }

    fn contains(&self, key: &StorageKey) -> Result<bool, StorageError> {
        Ok(raw_files::exists(self.path_for(key)))
    }

    fn len(&self) -> Result<usize, StorageError> {
        let mut count = 0;
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(EXTENSION) {
                count += 1;
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::entropy::{EntropySource, OsEntropy};
    use crate::fragment::ContentHash;

    /// A fresh, uniquely named directory under the system temp dir.
    pub(crate) fn scratch_dir(label: &str) -> PathBuf {
        let mut suffix = [0u8; 8];
        OsEntropy.fill(&mut suffix).unwrap();
        let dir = std::env::temp_dir().join(format!("fragvault_{}_{}", label, hex::encode(suffix)));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn fragment(index: u8) -> Fragment {
        Fragment {
            index,
            content_hash: ContentHash::from_bytes([index; 32]),
            created_at: 1_700_000_000,
            payload: vec![index; 48],
        }
    }

    #[test]
    fn test_directory_backend_persists() {
        let dir = scratch_dir("directory");
        let f1 = fragment(1);
        let f2 = fragment(2);
        let k1 = StorageKey::derive(&f1.content_hash, f1.index);
        let k2 = StorageKey::derive(&f2.content_hash, f2.index);

        {
            let mut backend = DirectoryBackend::open(&dir).unwrap();
            backend.put(&k1, &f1).unwrap();
            backend.put(&k2, &f2).unwrap();
            assert_eq!(backend.len().unwrap(), 2);
        }

        // Reopen: contents survive.
        let mut backend = DirectoryBackend::open(&dir).unwrap();
        assert_eq!(backend.len().unwrap(), 2);
        assert_eq!(backend.get(&k1).unwrap(), Some(f1));
        assert!(backend.remove(&k2).unwrap());
        assert_eq!(backend.get(&k2).unwrap(), None);
        assert!(!backend.contains(&k2).unwrap());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_corrupt_file_reported() {
        let dir = scratch_dir("directory_corrupt");
        let f1 = fragment(3);
        let key = StorageKey::derive(&f1.content_hash, f1.index);
        let mut backend = DirectoryBackend::open(&dir).unwrap();
        backend.put(&key, &f1).unwrap();

        fs::write(backend.path_for(&key), b"garbage").unwrap();
        assert_eq!(backend.get(&key), Err(StorageError::Corruption));

        let _ = fs::remove_dir_all(&dir);
    }
}
