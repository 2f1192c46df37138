//! In-memory field store.

use bytes::Bytes;
use mars_request::{Key, Request};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::handle::{DataHandle, MemoryHandle};
use crate::store::{FieldIter, FieldStore, ListElement};

/// Thread-safe in-memory archive of keyed records.
///
/// Records are listed in archive order. Archiving a key that is already
/// present replaces the record in place.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<(Key, Bytes)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn archive(&self, key: Key, data: impl Into<Bytes>) {
        let data = data.into();
        let mut records = self.records.write();
        match records.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = data,
            None => records.push((key, data)),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Keys of every record, in archive order.
    pub fn keys(&self) -> Vec<Key> {
        self.records.read().iter().map(|(k, _)| k.clone()).collect()
    }

    fn matching(&self, request: &Request) -> Vec<(Key, Bytes)> {
        self.records
            .read()
            .iter()
            .filter(|(key, _)| request.matches(key))
            .cloned()
            .collect()
    }
}

impl FieldStore for MemoryStore {
    fn retrieve(&self, request: &Request) -> Result<Box<dyn DataHandle>> {
        let records = self.records.read();
        let (_, data) = records
            .iter()
            .find(|(key, _)| request.matches(key))
            .ok_or_else(|| StoreError::not_found(request.to_string()))?;
        Ok(Box::new(MemoryHandle::new(data.clone())))
    }

    fn inspect(&self, request: &Request) -> Result<FieldIter> {
        let matches = self.matching(request);
        debug!(request = %request, matches = matches.len(), "Inspecting memory store");

        Ok(Box::new(matches.into_iter().map(|(key, data)| {
            let handle: Box<dyn DataHandle> = Box::new(MemoryHandle::new(data));
            Ok::<ListElement, StoreError>((key, handle))
        })))
    }

    fn describe(&self) -> String {
        format!("memory store ({} records)", self.len())
    }
}
