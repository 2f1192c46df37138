//! The store interface.

use mars_request::{Key, Request};

use crate::error::Result;
use crate::handle::DataHandle;

/// One listed record: its full key and a handle to its bytes.
pub type ListElement = (Key, Box<dyn DataHandle>);

/// Lazy, finite sequence of the records matching a request.
pub type FieldIter = Box<dyn Iterator<Item = Result<ListElement>> + Send>;

/// A keyword-addressed record store.
pub trait FieldStore: Send + Sync {
    /// Handle to the first record matching `request`.
    ///
    /// Fails with `StoreError::NotFound` when nothing matches.
    fn retrieve(&self, request: &Request) -> Result<Box<dyn DataHandle>>;

    /// Every record matching `request`, in archive order.
    fn inspect(&self, request: &Request) -> Result<FieldIter>;

    /// Short human readable description, for logs.
    fn describe(&self) -> String;
}
