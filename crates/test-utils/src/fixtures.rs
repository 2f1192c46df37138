//! Populated stores for tests.

use std::sync::Arc;

use field_store::{DirectoryStore, MemoryStore};
use mars_request::{Key, Request};
use tempfile::TempDir;

use crate::generators::record_values;
use crate::grib::Grib2Builder;

/// Common request fragments.
pub mod requests {
    /// Fixed keywords shared by most test requests.
    pub const BASE: &str = "class=od,expver=1,stream=oper,type=fc,levtype=sfc";
}

/// A GRIB2 message holding `values` on a single-row grid.
pub fn grib_message(values: Vec<f32>) -> Vec<u8> {
    Grib2Builder::new().with_values(values).build()
}

/// Archive one GRIB2 message per key of `request` into `store`.
///
/// `values_for(ordinal, key)` yields each record's payload, `ordinal` being the
/// key's position in [`Request::expand`] order. Returns the archived keys.
pub fn populate_memory_store<F>(store: &MemoryStore, request: &str, mut values_for: F) -> Vec<Key>
where
    F: FnMut(usize, &Key) -> Vec<f32>,
{
    let keys = expand(request);
    for (ordinal, key) in keys.iter().enumerate() {
        store.archive(key.clone(), grib_message(values_for(ordinal, key)));
    }
    keys
}

/// Memory store with one record per key of `request`, each holding
/// `record_values(ordinal, payload_len)`.
pub fn seeded_memory_store(request: &str, payload_len: usize) -> (Arc<MemoryStore>, Vec<Key>) {
    let store = Arc::new(MemoryStore::new());
    let keys = populate_memory_store(&store, request, |ordinal, _| {
        record_values(ordinal, payload_len)
    });
    (store, keys)
}

/// Directory store in a fresh temporary directory, seeded like
/// [`seeded_memory_store`]. Keep the `TempDir` alive while using the store.
pub fn seeded_directory_store(request: &str, payload_len: usize) -> (TempDir, DirectoryStore) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = DirectoryStore::create(dir.path().join("store")).expect("create store");
    for (ordinal, key) in expand(request).into_iter().enumerate() {
        store
            .archive(key, &grib_message(record_values(ordinal, payload_len)))
            .expect("archive record");
    }
    store.flush().expect("flush store");
    (dir, store)
}

fn expand(request: &str) -> Vec<Key> {
    Request::parse(request)
        .unwrap_or_else(|e| panic!("invalid fixture request '{}': {}", request, e))
        .expand()
}
