//! On-disk field store.
//!
//! Layout of a store directory:
//!
//! ```text
//! <root>/
//!   data.bin     append-only concatenation of record bytes
//!   index.json   [{ "key": {..}, "offset": n, "length": n }, ...]
//! ```
//!
//! Archiving appends to `data.bin` immediately; the index is rewritten by
//! `flush` (also attempted on drop). Re-archiving a key points its index entry
//! at the new bytes; the old bytes stay in the data file.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use mars_request::{Key, Request};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::handle::{DataHandle, FileRangeHandle};
use crate::store::{FieldIter, FieldStore, ListElement};

const DATA_FILE: &str = "data.bin";
const INDEX_FILE: &str = "index.json";

/// One index entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub key: Key,
    pub offset: u64,
    pub length: u64,
}

/// Field store persisted in a directory.
pub struct DirectoryStore {
    root: PathBuf,
    entries: RwLock<Vec<IndexEntry>>,
    writer: Mutex<Option<File>>,
    dirty: Mutex<bool>,
}

impl DirectoryStore {
    /// Create a new, empty store. Fails if the directory already holds one.
    pub fn create(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| StoreError::io(root.display().to_string(), e))?;

        if root.join(INDEX_FILE).exists() {
            return Err(StoreError::index(format!(
                "{} already contains a store",
                root.display()
            )));
        }

        let store = Self::with_entries(root, Vec::new());
        store.write_index(&[])?;
        info!(root = %store.root.display(), "Created directory store");
        Ok(store)
    }

    /// Open an existing store.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let index_path = root.join(INDEX_FILE);

        let text = fs::read_to_string(&index_path)
            .map_err(|e| StoreError::io(index_path.display().to_string(), e))?;
        let entries: Vec<IndexEntry> = serde_json::from_str(&text)
            .map_err(|e| StoreError::index(format!("{}: {}", index_path.display(), e)))?;

        let data_len = match fs::metadata(root.join(DATA_FILE)) {
            Ok(meta) => meta.len(),
            Err(_) => 0,
        };
        for entry in &entries {
            match entry.offset.checked_add(entry.length) {
                Some(end) if end <= data_len => {}
                Some(end) => {
                    return Err(StoreError::corrupt(
                        entry.key.to_string(),
                        format!(
                            "indexed range {}..{} exceeds data file length {}",
                            entry.offset, end, data_len
                        ),
                    ));
                }
                None => {
                    return Err(StoreError::corrupt(
                        entry.key.to_string(),
                        format!(
                            "indexed range of {} bytes at {} overflows",
                            entry.length, entry.offset
                        ),
                    ));
                }
            }
        }

        info!(root = %root.display(), records = entries.len(), "Opened directory store");
        Ok(Self::with_entries(root, entries))
    }

    /// Open the store at `root`, creating it if there is none.
    pub fn open_or_create(root: impl AsRef<Path>) -> Result<Self> {
        if root.as_ref().join(INDEX_FILE).exists() {
            Self::open(root)
        } else {
            Self::create(root)
        }
    }

    fn with_entries(root: PathBuf, entries: Vec<IndexEntry>) -> Self {
        Self {
            root,
            entries: RwLock::new(entries),
            writer: Mutex::new(None),
            dirty: Mutex::new(false),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Index entries in archive order.
    pub fn entries(&self) -> Vec<IndexEntry> {
        self.entries.read().clone()
    }

    /// Append a record. Visible to `inspect` immediately, durable after `flush`.
    pub fn archive(&self, key: Key, data: &[u8]) -> Result<()> {
        let data_path = self.root.join(DATA_FILE);
        let display = data_path.display().to_string();

        let mut writer = self.writer.lock();
        if writer.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&data_path)
                .map_err(|e| StoreError::io(&display, e))?;
            *writer = Some(file);
        }
        let Some(file) = writer.as_mut() else {
            return Err(StoreError::index("data file writer unavailable"));
        };

        let offset = file
            .metadata()
            .map_err(|e| StoreError::io(&display, e))?
            .len();
        file.write_all(data).map_err(|e| StoreError::io(&display, e))?;

        let entry = IndexEntry {
            key,
            offset,
            length: data.len() as u64,
        };
        debug!(key = %entry.key, offset, length = entry.length, "Archived record");

        {
            let mut entries = self.entries.write();
            match entries.iter_mut().find(|e| e.key == entry.key) {
                Some(existing) => *existing = entry,
                None => entries.push(entry),
            }
        }
        *self.dirty.lock() = true;
        Ok(())
    }

    /// Sync the data file and rewrite the index.
    pub fn flush(&self) -> Result<()> {
        if let Some(file) = self.writer.lock().as_mut() {
            file.sync_data()
                .map_err(|e| StoreError::io(self.root.join(DATA_FILE).display().to_string(), e))?;
        }

        let mut dirty = self.dirty.lock();
        if *dirty {
            let entries = self.entries.read();
            self.write_index(&entries)?;
            *dirty = false;
        }
        Ok(())
    }

    /// Write the index to a temporary file, then rename it into place.
    fn write_index(&self, entries: &[IndexEntry]) -> Result<()> {
        let index_path = self.root.join(INDEX_FILE);
        let tmp_path = self.root.join(format!("{}.tmp", INDEX_FILE));

        let json = serde_json::to_vec_pretty(entries)?;
        fs::write(&tmp_path, json).map_err(|e| StoreError::io(tmp_path.display().to_string(), e))?;
        fs::rename(&tmp_path, &index_path)
            .map_err(|e| StoreError::io(index_path.display().to_string(), e))?;

        debug!(path = %index_path.display(), records = entries.len(), "Wrote store index");
        Ok(())
    }

    fn handle(&self, entry: &IndexEntry) -> Box<dyn DataHandle> {
        Box::new(FileRangeHandle::new(
            self.root.join(DATA_FILE),
            entry.offset,
            entry.length,
        ))
    }
}

impl FieldStore for DirectoryStore {
    fn retrieve(&self, request: &Request) -> Result<Box<dyn DataHandle>> {
        let entries = self.entries.read();
        let entry = entries
            .iter()
            .find(|e| request.matches(&e.key))
            .ok_or_else(|| StoreError::not_found(request.to_string()))?;
        Ok(self.handle(entry))
    }

    fn inspect(&self, request: &Request) -> Result<FieldIter> {
        let elements: Vec<ListElement> = self
            .entries
            .read()
            .iter()
            .filter(|e| request.matches(&e.key))
            .map(|e| (e.key.clone(), self.handle(e)))
            .collect();

        debug!(
            root = %self.root.display(),
            request = %request,
            matches = elements.len(),
            "Inspecting directory store"
        );
        Ok(Box::new(elements.into_iter().map(Ok)))
    }

    fn describe(&self) -> String {
        format!("directory store at {} ({} records)", self.root.display(), self.len())
    }
}

impl Drop for DirectoryStore {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(root = %self.root.display(), error = %e, "Failed to flush store on drop");
        }
    }
}
