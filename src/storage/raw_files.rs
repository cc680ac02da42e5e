//! Raw File Storage.
//!
//! Provides basic file system operations with safety checks.
//!
//! # Security
//! - Ensures files are written atomically (write-sync-rename).
//! - Caps reads at a fixed size so a corrupt directory cannot exhaust memory.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use super::StorageError;

/// Largest file `read_file` will load.
pub const MAX_FILE_LEN: u64 = 64 * 1024 * 1024;

/// Writes data to a file atomically.
pub fn write_atomic<P: AsRef<Path>>(path: P, data: &[u8]) -> Result<(), StorageError> {
    let path = path.as_ref();
    let dir = path.parent().ok_or(StorageError::InvalidPath)?;
    let filename = path.file_name().ok_or(StorageError::InvalidPath)?;

    let mut temp_path = dir.to_path_buf();
    temp_path.push(format!("{}.tmp", filename.to_string_lossy()));

    let mut file = File::create(&temp_path)?;
    file.write_all(data)?;
    file.sync_all()?;

    // Rename to final path (atomic on POSIX)
    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Reads data from a file.
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, StorageError> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    if len > MAX_FILE_LEN {
        return Err(StorageError::IoError);
    }

    let mut buffer = Vec::with_capacity(len as usize);
    file.read_to_end(&mut buffer)?;
    Ok(buffer)
}

/// Checks if a file exists.
pub fn exists<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().exists()
}

/// Deletes a file; returns whether it existed.
pub fn delete<P: AsRef<Path>>(path: P) -> Result<bool, StorageError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::directory::tests::scratch_dir;

    #[test]
    fn test_atomic_write_read() {
        let dir = scratch_dir("raw_files");
        let path = dir.join("test_atomic.bin");

        let data = b"Hello World";
        write_atomic(&path, data).unwrap();

        assert!(exists(&path));
        assert!(!exists(dir.join("test_atomic.bin.tmp")));
        let read_data = read_file(&path).unwrap();
        assert_eq!(read_data, data);

        assert!(delete(&path).unwrap());
        assert!(!exists(&path));
        assert!(!delete(&path).unwrap());

        assert_eq!(read_file(&path), Err(StorageError::NotFound));
        let _ = fs::remove_dir_all(&dir);
    }
}
