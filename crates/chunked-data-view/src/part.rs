//! One base request bound to its axes, an extractor and a store.

use std::collections::HashSet;
use std::sync::Arc;

use field_store::FieldStore;
use mars_request::Request;
use tracing::{debug, info};

use crate::axis::{Axis, AxisDefinition};
use crate::error::{Result, ViewError};
use crate::extractor::Extractor;
use crate::index_mapper::records_per_chunk;
use crate::request_manipulation::update_request;
use crate::types::{ChunkFill, DataLayout};

/// A sub-collection of the view addressed by a single base request.
///
/// Immutable once built. Construction retrieves one record, the one at the
/// all-zero index, to learn the payload layout.
pub struct ViewPart {
    request: Request,
    axes: Vec<Axis>,
    extractor: Box<dyn Extractor>,
    store: Arc<dyn FieldStore>,
    layout: DataLayout,
    shape: Vec<usize>,
    records_per_chunk: usize,
    chunk_values: usize,
}

impl ViewPart {
    pub fn new(
        request: Request,
        axis_definitions: &[AxisDefinition],
        extractor: Box<dyn Extractor>,
        store: Arc<dyn FieldStore>,
    ) -> Result<Self> {
        if axis_definitions.is_empty() {
            return Err(ViewError::config(format!(
                "part {} defines no axis",
                request
            )));
        }

        let axes = axis_definitions
            .iter()
            .map(|def| Axis::from_definition(def, &request))
            .collect::<Result<Vec<_>>>()?;

        check_coverage(&request, &axes)?;
        let records_per_chunk = records_per_chunk(&axes)?;

        let layout = probe_layout(&request, &axes, extractor.as_ref(), store.as_ref())?;
        let chunk_values = records_per_chunk
            .checked_mul(layout.count_values)
            .ok_or_else(|| {
                ViewError::config(format!(
                    "chunks of part {} hold more values than can be addressed",
                    request
                ))
            })?;

        let mut shape: Vec<usize> = axes.iter().map(Axis::size).collect();
        shape.push(layout.count_values);

        info!(
            request = %request,
            shape = ?shape,
            extractor = extractor.name(),
            store = %store.describe(),
            "Created view part"
        );

        Ok(Self {
            request,
            axes,
            extractor,
            store,
            layout,
            shape,
            records_per_chunk,
            chunk_values,
        })
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    /// Axis sizes followed by the record payload length.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of axes, excluding the payload axis.
    pub fn n_axes(&self) -> usize {
        self.axes.len()
    }

    /// Records in one chunk of this part.
    pub fn records_per_chunk(&self) -> usize {
        self.records_per_chunk
    }

    /// Values in one chunk of this part.
    pub fn count_chunk_values(&self) -> usize {
        self.chunk_values
    }

    /// Fill `out` with the chunk at `chunk_index` of this part.
    ///
    /// `chunk_index` holds one entry per axis; bulk axes only accept 0. Slots
    /// whose record is missing or unreadable are left as they were.
    pub fn at(&self, chunk_index: &[usize], out: &mut [f32]) -> Result<ChunkFill> {
        if chunk_index.len() != self.axes.len() {
            return Err(ViewError::ChunkIndexLength {
                got: chunk_index.len(),
                expected: self.axes.len(),
            });
        }

        let needed = self.count_chunk_values();
        if out.len() < needed {
            return Err(ViewError::BufferTooSmall {
                needed,
                got: out.len(),
            });
        }

        let mut query = self.request.clone();
        for (axis, &index) in self.axes.iter().zip(chunk_index) {
            update_request(&mut query, axis, index)?;
        }
        debug!(request = %query, chunk = ?chunk_index, "Querying part chunk");

        let records = self.store.inspect(&query)?;
        self.extractor.write_many(
            &query,
            records,
            &self.axes,
            &self.layout,
            &mut out[..needed],
            self.records_per_chunk(),
        )
    }
}

impl std::fmt::Debug for ViewPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewPart")
            .field("request", &self.request.to_string())
            .field("axes", &self.axes)
            .field("layout", &self.layout)
            .field("extractor", &self.extractor.name())
            .finish()
    }
}

/// Every multi-valued keyword must belong to exactly one axis.
fn check_coverage(request: &Request, axes: &[Axis]) -> Result<()> {
    let mut mapped = HashSet::new();
    for axis in axes {
        for keyword in axis.keywords() {
            if !mapped.insert(keyword) {
                return Err(ViewError::config(format!(
                    "keyword '{}' already mapped by another axis",
                    keyword
                )));
            }
        }
    }

    for param in request.parameters() {
        if param.count() > 1 && !mapped.contains(param.name()) {
            return Err(ViewError::config(format!(
                "keyword '{}' has {} values but is not mapped to any axis",
                param.name(),
                param.count()
            )));
        }
    }
    Ok(())
}

fn probe_layout(
    request: &Request,
    axes: &[Axis],
    extractor: &dyn Extractor,
    store: &dyn FieldStore,
) -> Result<DataLayout> {
    let mut probe = request.clone();
    for axis in axes {
        update_request(&mut probe, axis, 0)?;
    }

    let probe_error = |reason: String| ViewError::Probe {
        request: probe.to_string(),
        reason,
    };

    let mut handle = store
        .retrieve(&probe)
        .map_err(|e| probe_error(e.to_string()))?;
    let layout = extractor
        .layout(handle.as_mut())
        .map_err(|e| probe_error(e.to_string()))?;

    if layout.count_values == 0 {
        return Err(probe_error("record holds no values".to_string()));
    }
    Ok(layout)
}
