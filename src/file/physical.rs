//! Physical file backend for memory-mapped input.
//!
//! [`Physical`] maps a file read-only into the address space so records can be decoded
//! straight from the mapping without first copying the file into a buffer. It backs
//! [`crate::serialization::Serializable::load_from_file`].

use crate::Result;

use memmap2::Mmap;
use std::{fs, path::Path};

/// A read-only memory mapping of a file on disk.
#[derive(Debug)]
pub struct Physical {
    /// Memory-mapped file data
    data: Mmap,
}

impl Physical {
    /// Create a new physical file backend by memory-mapping the specified file.
    ///
    /// # Errors
    /// Returns [`crate::Error::Io`] if the file cannot be opened or mapped.
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let file = fs::File::open(path)?;

        // SAFETY: the mapping is read-only; callers must not truncate the file while a
        // Physical for it is alive.
        let data = unsafe { Mmap::map(&file) }?;

        Ok(Physical { data })
    }

    /// Returns the complete mapped file contents.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    /// Returns the size of the mapped file.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the mapped file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::io::Write;

    #[test]
    fn test_physical_maps_contents() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"SDRB\x01\x00").unwrap();
        file.flush().unwrap();

        let physical = Physical::new(file.path()).unwrap();
        assert_eq!(physical.len(), 6);
        assert_eq!(&physical.data()[..4], b"SDRB");
    }

    #[test]
    fn test_physical_invalid_file_path() {
        let result = Physical::new("/nonexistent/path/to/record.sdr");
        match result {
            Err(Error::Io(io_error)) => {
                assert_eq!(io_error.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("Expected Io error, got {other:?}"),
        }
    }

    #[test]
    fn test_physical_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let physical = Physical::new(file.path()).unwrap();
        assert!(physical.is_empty());
        assert_eq!(physical.data().len(), 0);
    }
}
