//! Storage Module.
//!
//! Backends that hold a node's fragments:
//! - [`MemoryBackend`]: process memory, lost on restart.
//! - [`directory::DirectoryBackend`]: one file per fragment under a directory,
//!   written atomically via `raw_files`.
//!
//! A backend is owned by exactly one node; nothing else writes to it.

pub mod directory;
pub mod raw_files;

pub use directory::DirectoryBackend;

use std::collections::BTreeMap;
use std::fmt;
use crate::fragment::Fragment;
use crate::node::StorageKey;

/// Errors related to storage operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// File not found.
    NotFound,
    /// Permission denied.
    PermissionDenied,
    /// IO error (generic).
    IoError,
    /// Stored bytes could not be decoded.
    Corruption,
    /// Invalid path or filename.
    InvalidPath,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::NotFound => write!(f, "Not found"),
            StorageError::PermissionDenied => write!(f, "Permission denied"),
            StorageError::IoError => write!(f, "I/O error"),
            StorageError::Corruption => write!(f, "Stored data is corrupt"),
            StorageError::InvalidPath => write!(f, "Invalid path"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound,
            std::io::ErrorKind::PermissionDenied => StorageError::PermissionDenied,
            _ => StorageError::IoError,
        }
    }
}

/// Key-value storage for one node's fragments.
pub trait FragmentBackend: Send {
    /// Short name for logs.
    fn kind(&self) -> &'static str;

    /// Inserts or overwrites the fragment under `key`.
    fn put(&mut self, key: &StorageKey, fragment: &Fragment) -> Result<(), StorageError>;

    /// Returns the fragment under `key`, if any.
    fn get(&self, key: &StorageKey) -> Result<Option<Fragment>, StorageError>;

    /// Removes the fragment under `key`; returns whether it existed.
    fn remove(&mut self, key: &StorageKey) -> Result<bool, StorageError>;

    fn contains(&self, key: &StorageKey) -> Result<bool, StorageError>;

    /// Number of stored fragments.
    fn len(&self) -> Result<usize, StorageError>;
}

/// In-memory backend.
#[derive(Default)]
pub struct MemoryBackend {
    fragments: BTreeMap<StorageKey, Fragment>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FragmentBackend for MemoryBackend {
    fn kind(&self) -> &'static str {
        "memory"
    }

    fn put(&mut self, key: &StorageKey, fragment: &Fragment) -> Result<(), StorageError> {
        self.fragments.insert(*key, fragment.clone());
        Ok(())
    }

    fn get(&self, key: &StorageKey) -> Result<Option<Fragment>, StorageError> {
        Ok(self.fragments.get(key).cloned())
    }

    fn remove(&mut self, key: &StorageKey) -> Result<bool, StorageError> {
        Ok(self.fragments.remove(key).is_some())
    }

    fn contains(&self, key: &StorageKey) -> Result<bool, StorageError> {
        Ok(self.fragments.contains_key(key))
    }

    fn len(&self) -> Result<usize, StorageError> {
        Ok(self.fragments.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::ContentHash;

    #[test]
    fn test_memory_backend() {
        let fragment = Fragment {
            index: 1,
            content_hash: ContentHash::from_bytes([3; 32]),
            created_at: 5,
            payload: vec![1, 2, 3],
        };
        let key = StorageKey::derive(&fragment.content_hash, fragment.index);
        let mut backend = MemoryBackend::new();

        assert_eq!(backend.get(&key).unwrap(), None);
        backend.put(&key, &fragment).unwrap();
        assert!(backend.contains(&key).unwrap());
        assert_eq!(backend.len().unwrap(), 1);
        assert_eq!(backend.get(&key).unwrap(), Some(fragment));
        assert!(backend.remove(&key).unwrap());
        assert!(!backend.remove(&key).unwrap());
        assert_eq!(backend.len().unwrap(), 0);
    }
}
