//! Keyword-addressed field stores.
//!
//! A store holds opaque records (typically one GRIB2 message each) under a
//! [`Key`](mars_request::Key). Readers address it with a
//! [`Request`](mars_request::Request):
//!
//! - [`FieldStore::retrieve`] returns a handle to the first matching record;
//! - [`FieldStore::inspect`] lists every matching record with its key.
//!
//! Two implementations are provided: [`MemoryStore`] for tests and embedding,
//! and [`DirectoryStore`], an append-only data file with a JSON index.

pub mod config;
pub mod directory;
pub mod error;
pub mod handle;
pub mod memory;
pub mod store;

pub use config::StoreConfig;
pub use directory::{DirectoryStore, IndexEntry};
pub use error::{Result, StoreError};
pub use handle::{DataHandle, FileRangeHandle, MemoryHandle};
pub use memory::MemoryStore;
pub use store::{FieldIter, FieldStore, ListElement};
