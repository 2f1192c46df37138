//! Handles onto single stored records.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;

use bytes::Bytes;

use crate::error::{Result, StoreError};

/// Read access to the bytes of one record.
///
/// A handle may be opened any number of times; each call returns the full
/// record.
pub trait DataHandle: Send {
    fn open(&mut self) -> Result<Bytes>;

    /// Size of the record in bytes, if known without reading it.
    fn size_hint(&self) -> Option<u64> {
        None
    }
}

/// Handle over bytes already in memory.
#[derive(Debug, Clone)]
pub struct MemoryHandle {
    data: Bytes,
}

impl MemoryHandle {
    pub fn new(data: Bytes) -> Self {
        Self { data }
    }
}

impl DataHandle for MemoryHandle {
    fn open(&mut self) -> Result<Bytes> {
        Ok(self.data.clone())
    }

    fn size_hint(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }
}

/// Handle over a byte range of a file, read on `open`.
#[derive(Debug, Clone)]
pub struct FileRangeHandle {
    path: PathBuf,
    offset: u64,
    length: u64,
}

impl FileRangeHandle {
    pub fn new(path: impl Into<PathBuf>, offset: u64, length: u64) -> Self {
        Self {
            path: path.into(),
            offset,
            length,
        }
    }
}

impl DataHandle for FileRangeHandle {
    fn open(&mut self) -> Result<Bytes> {
        let display = self.path.display().to_string();
        let mut file = File::open(&self.path).map_err(|e| StoreError::io(&display, e))?;

        let file_len = file
            .metadata()
            .map_err(|e| StoreError::io(&display, e))?
            .len();
        let end = self.offset.checked_add(self.length);
        if end.map_or(true, |end| end > file_len) {
            return Err(StoreError::corrupt(
                format!("{}@{}", display, self.offset),
                format!(
                    "range of {} bytes at {} exceeds file length {}",
                    self.length, self.offset, file_len
                ),
            ));
        }

        file.seek(SeekFrom::Start(self.offset))
            .map_err(|e| StoreError::io(&display, e))?;
        let mut buf = vec![0u8; self.length as usize];
        file.read_exact(&mut buf)
            .map_err(|e| StoreError::io(&display, e))?;

        tracing::trace!(path = %self.path.display(), offset = self.offset, length = self.length, "Read record");
        Ok(Bytes::from(buf))
    }

    fn size_hint(&self) -> Option<u64> {
        Some(self.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_memory_handle_reopens() {
        let mut handle = MemoryHandle::new(Bytes::from_static(b"abc"));
        assert_eq!(handle.open().unwrap(), Bytes::from_static(b"abc"));
        assert_eq!(handle.open().unwrap(), Bytes::from_static(b"abc"));
        assert_eq!(handle.size_hint(), Some(3));
    }

    #[test]
    fn test_file_range_handle() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"0123456789").unwrap();
        file.flush().unwrap();

        let mut handle = FileRangeHandle::new(file.path(), 3, 4);
        assert_eq!(&handle.open().unwrap()[..], b"3456");

        let mut past_end = FileRangeHandle::new(file.path(), 8, 4);
        assert!(matches!(past_end.open(), Err(StoreError::Corrupt { .. })));

        let mut overflowing = FileRangeHandle::new(file.path(), u64::MAX, 4);
        assert!(matches!(overflowing.open(), Err(StoreError::Corrupt { .. })));

        let mut missing = FileRangeHandle::new("/nonexistent/cdv/data", 0, 1);
        assert!(matches!(missing.open(), Err(StoreError::Io { .. })));
    }
}
