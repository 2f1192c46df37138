//! Chunked N-dimensional array view over a keyword-addressed field store
//!
//! A field store holds records (one GRIB2 message each) under MARS-style
//! keys. This crate presents a set of such records as a dense array whose
//! axes are request keywords and whose last dimension is the payload of one
//! record. Consumers read the array chunk by chunk; every chunk access turns
//! into one store query per overlapping part.
//!
//! - **Chunked axes**: one element per chunk, one query per element
//! - **Bulk axes**: fetched whole, laid out densely inside every chunk
//! - **Parts**: several base requests concatenated along one extension axis
//!
//! # Architecture
//!
//! ```text
//! ChunkedDataView::at(chunk_index, out)
//!      │
//!      ├─► Clip the chunk region against every part extent
//!      │
//!      └─► For each overlapping part
//!               │
//!               ├─► update_request: pin chunked axes, open bulk axes
//!               │
//!               ├─► FieldStore::inspect(query)
//!               │
//!               └─► Extractor::write_many
//!                        │
//!                        └─► buffer_index_for_key → slot in `out`
//! ```
//!
//! # Example
//!
//! ```ignore
//! use chunked_data_view::{AxisDefinition, ChunkedDataViewBuilder, GribExtractor};
//!
//! let view = ChunkedDataViewBuilder::new(store)
//!     .add_part(
//!         "class=od,date=20200101/to/20200103,time=0/to/18,param=t",
//!         vec![AxisDefinition::chunked(["date"]), AxisDefinition::chunked(["time"]), AxisDefinition::chunked(["param"])],
//!         Box::new(GribExtractor::new()),
//!     )
//!     .build()?;
//!
//! let mut out = vec![0.0; view.count_chunk_values()];
//! let fill = view.at(&[1, 2, 0], &mut out)?;
//! ```

pub mod axis;
pub mod builder;
pub mod config;
pub mod coords;
pub mod error;
pub mod extractor;
pub mod index_mapper;
pub mod part;
pub mod request_manipulation;
pub mod types;
pub mod view;

// Re-export commonly used types at crate root
pub use axis::{Axis, AxisDefinition, Parameter};
pub use builder::ChunkedDataViewBuilder;
pub use config::{MissingFieldPolicy, PartDefinition, ViewConfig, ViewDefinition};
pub use error::{Result, ViewError};
pub use extractor::{Extractor, ExtractorType, GribExtractor};
pub use index_mapper::{
    axis_index_to_buffer_index, buffer_index_for_key, delinearize, index_in_axis_parameters,
    linearize,
};
pub use part::ViewPart;
pub use request_manipulation::update_request;
pub use types::{ChunkFill, DataLayout};
pub use view::{ChunkedDataView, PartSlice};
