//! Assembly of parts into one chunked N-dimensional array.
//!
//! Parts are laid end to end along the extension axis and must agree on
//! every other axis. Each part occupies a box of the global index space; a
//! chunk access clips the chunk's box against every part box and lets each
//! overlapping part fill its slab of the caller's buffer.

use tracing::{debug, info, warn};

use crate::config::{MissingFieldPolicy, ViewConfig};
use crate::coords::{ChunkIndex, GlobalIndex, GlobalRegion, Region, Shape};
use crate::error::{Result, ViewError};
use crate::part::ViewPart;
use crate::types::ChunkFill;

/// The slab of one chunk that a single part answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartSlice {
    /// Position of the part in the view.
    pub part: usize,
    /// Chunk index within the part, one entry per axis.
    pub part_index: Vec<usize>,
    /// Start of the slab inside the chunk, including the payload axis.
    pub offset: Vec<usize>,
    /// Extent of the slab, including the payload axis.
    pub shape: Vec<usize>,
}

/// Read-only chunked view over one or more parts.
///
/// The last dimension of [`shape`](Self::shape) is the payload axis: the
/// values of one record. It is never split, so a chunk index may omit it.
pub struct ChunkedDataView {
    parts: Vec<ViewPart>,
    extension_axis: usize,
    extents: Vec<GlobalRegion>,
    shape: Vec<usize>,
    chunk_shape: Vec<usize>,
    chunks: Vec<usize>,
    config: ViewConfig,
}

impl ChunkedDataView {
    /// Assemble `parts` along `extension_axis`.
    pub fn new(parts: Vec<ViewPart>, extension_axis: usize, config: ViewConfig) -> Result<Self> {
        let first = parts
            .first()
            .ok_or_else(|| ViewError::config("a view needs at least one part"))?;
        let n_axes = first.n_axes();

        if extension_axis >= n_axes {
            return Err(ViewError::config(format!(
                "extension axis {} is out of range, parts have {} axes",
                extension_axis, n_axes
            )));
        }

        let mut shape = first.shape().to_vec();
        for (i, part) in parts.iter().enumerate().skip(1) {
            if part.n_axes() != n_axes {
                return Err(ViewError::config(format!(
                    "part {} has {} axes, part 0 has {}",
                    i,
                    part.n_axes(),
                    n_axes
                )));
            }

            for (d, (&size, &expected)) in part.shape().iter().zip(first.shape()).enumerate() {
                if d == extension_axis {
                    shape[d] = shape[d].checked_add(size).ok_or_else(|| {
                        ViewError::config(format!(
                            "extension axis {} grows past the addressable size at part {}",
                            d, i
                        ))
                    })?;
                } else if size != expected {
                    return Err(ViewError::config(format!(
                        "axis {} of part {} has size {}, part 0 has {}",
                        d, i, size, expected
                    )));
                }
            }

            for (d, (axis, reference)) in part.axes().iter().zip(first.axes()).enumerate() {
                if axis.is_chunked() != reference.is_chunked() {
                    return Err(ViewError::config(format!(
                        "axis {} of part {} is {}, part 0 has it {}",
                        d,
                        i,
                        chunking(axis.is_chunked()),
                        chunking(reference.is_chunked())
                    )));
                }
            }
        }

        let mut chunk_shape = shape.clone();
        for (d, axis) in first.axes().iter().enumerate() {
            if axis.is_chunked() {
                chunk_shape[d] = 1;
            }
        }
        if chunk_shape
            .iter()
            .try_fold(1usize, |n, &extent| n.checked_mul(extent))
            .is_none()
        {
            return Err(ViewError::config(format!(
                "chunks of shape {:?} hold more values than can be addressed",
                chunk_shape
            )));
        }
        let chunks = shape
            .iter()
            .zip(&chunk_shape)
            .map(|(&s, &c)| s.div_ceil(c))
            .collect();

        let mut extents = Vec::with_capacity(parts.len());
        let mut offset = 0;
        for part in &parts {
            let mut start = vec![0; n_axes + 1];
            let mut end = part.shape().to_vec();
            start[extension_axis] = offset;
            end[extension_axis] += offset;
            offset += part.shape()[extension_axis];
            extents.push(Region::new(
                GlobalIndex::from_usizes(&start),
                GlobalIndex::from_usizes(&end),
            ));
        }

        let view = Self {
            parts,
            extension_axis,
            extents,
            shape,
            chunk_shape,
            chunks,
            config,
        };

        info!(
            parts = view.parts.len(),
            extension_axis,
            shape = ?view.shape,
            chunk_shape = ?view.chunk_shape,
            chunks = ?view.chunks,
            "Created chunked data view"
        );
        Ok(view)
    }

    /// Extent of every axis, payload axis last.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Extent of one chunk along every axis.
    pub fn chunk_shape(&self) -> &[usize] {
        &self.chunk_shape
    }

    /// Number of chunks along every axis.
    pub fn chunks(&self) -> &[usize] {
        &self.chunks
    }

    /// Values in one chunk.
    pub fn count_chunk_values(&self) -> usize {
        self.chunk_shape.iter().product()
    }

    /// Number of axes, excluding the payload axis.
    pub fn n_axes(&self) -> usize {
        self.shape.len() - 1
    }

    pub fn extension_axis(&self) -> usize {
        self.extension_axis
    }

    pub fn parts(&self) -> &[ViewPart] {
        &self.parts
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    /// Which parts answer the chunk at `chunk_index`, and where their slabs go.
    pub fn route(&self, chunk_index: &[usize]) -> Result<Vec<PartSlice>> {
        let index = self.check_index(chunk_index)?;

        let mut full_index = index.to_vec();
        full_index.push(0);
        let chunk = ChunkIndex::from_usizes(&full_index);
        let chunk_region =
            GlobalRegion::from_chunk(&chunk, &Shape::from_usizes(&self.chunk_shape));

        let n_axes = self.n_axes();
        let mut slices = Vec::new();
        for (part, extent) in self.extents.iter().enumerate() {
            let Some(overlap) = chunk_region.intersection(extent) else {
                continue;
            };
            let part_local = GlobalRegion::part_local(&chunk_region, extent);
            let in_chunk = overlap.to_local(&chunk_region);

            slices.push(PartSlice {
                part,
                part_index: part_local.start.to_usizes()[..n_axes].to_vec(),
                offset: in_chunk.start.to_usizes(),
                shape: overlap.shape().to_usizes(),
            });
        }
        Ok(slices)
    }

    /// Write the chunk at `chunk_index` into `out`.
    ///
    /// `chunk_index` has one entry per axis, optionally followed by 0 for
    /// the payload axis. `out` must hold at least
    /// [`count_chunk_values`](Self::count_chunk_values) values; the first
    /// that many are overwritten. Slots no record was written to hold the
    /// configured fill value.
    pub fn at(&self, chunk_index: &[usize], out: &mut [f32]) -> Result<ChunkFill> {
        let slices = self.route(chunk_index)?;

        let count = self.count_chunk_values();
        if out.len() < count {
            return Err(ViewError::BufferTooSmall {
                needed: count,
                got: out.len(),
            });
        }
        let out = &mut out[..count];
        out.fill(self.config.fill_value);

        let mut fill = ChunkFill::default();
        for slice in &slices {
            let part = &self.parts[slice.part];
            debug!(
                chunk = ?chunk_index,
                part = slice.part,
                part_index = ?slice.part_index,
                "Routing chunk to part"
            );

            let part_fill = if slice.shape == self.chunk_shape {
                part.at(&slice.part_index, out)?
            } else {
                let mut block = vec![self.config.fill_value; part.count_chunk_values()];
                let part_fill = part.at(&slice.part_index, &mut block)?;
                scatter_block(&block, &slice.shape, out, &self.chunk_shape, &slice.offset);
                part_fill
            };
            fill = fill.combine(part_fill);
        }

        if !fill.is_complete() {
            match self.config.missing_fields {
                MissingFieldPolicy::Strict => {
                    return Err(ViewError::IncompleteChunk {
                        chunk: format!("{:?}", chunk_index),
                        filled: fill.filled,
                        expected: fill.expected,
                    });
                }
                MissingFieldPolicy::Tolerate => {
                    warn!(chunk = ?chunk_index, fill = %fill, "Returning degraded chunk");
                }
            }
        }
        Ok(fill)
    }

    /// Allocating form of [`at`](Self::at).
    pub fn chunk(&self, chunk_index: &[usize]) -> Result<(Vec<f32>, ChunkFill)> {
        let mut out = vec![self.config.fill_value; self.count_chunk_values()];
        let fill = self.at(chunk_index, &mut out)?;
        Ok((out, fill))
    }

    /// Validate a chunk index and strip the optional payload entry.
    fn check_index<'a>(&self, chunk_index: &'a [usize]) -> Result<&'a [usize]> {
        let n_axes = self.n_axes();
        let index = match chunk_index.len() {
            n if n == n_axes => chunk_index,
            n if n == n_axes + 1 => {
                if chunk_index[n_axes] != 0 {
                    return Err(ViewError::out_of_bounds(
                        "payload axis",
                        chunk_index[n_axes],
                        1,
                    ));
                }
                &chunk_index[..n_axes]
            }
            got => {
                return Err(ViewError::ChunkIndexLength {
                    got,
                    expected: n_axes,
                })
            }
        };

        for (d, (&i, &bound)) in index.iter().zip(&self.chunks).enumerate() {
            if i >= bound {
                return Err(ViewError::out_of_bounds(format!("chunk axis {}", d), i, bound));
            }
        }
        Ok(index)
    }
}

impl std::fmt::Debug for ChunkedDataView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedDataView")
            .field("parts", &self.parts)
            .field("extension_axis", &self.extension_axis)
            .field("shape", &self.shape)
            .field("chunk_shape", &self.chunk_shape)
            .field("chunks", &self.chunks)
            .finish()
    }
}

fn chunking(chunked: bool) -> &'static str {
    if chunked {
        "chunked"
    } else {
        "bulk"
    }
}

/// Copy a dense row-major block into a larger row-major buffer at `offset`.
fn scatter_block(
    src: &[f32],
    src_shape: &[usize],
    dst: &mut [f32],
    dst_shape: &[usize],
    offset: &[usize],
) {
    let ndim = src_shape.len();
    if ndim == 0 || src_shape.iter().any(|&s| s == 0) {
        return;
    }

    let row = src_shape[ndim - 1];
    let mut idx = vec![0usize; ndim - 1];
    loop {
        let mut src_lin = 0;
        let mut dst_lin = 0;
        for d in 0..ndim {
            let i = if d < ndim - 1 { idx[d] } else { 0 };
            src_lin = src_lin * src_shape[d] + i;
            dst_lin = dst_lin * dst_shape[d] + i + offset[d];
        }
        dst[dst_lin..dst_lin + row].copy_from_slice(&src[src_lin..src_lin + row]);

        // Odometer over every dimension but the last.
        let mut d = ndim - 1;
        loop {
            if d == 0 {
                return;
            }
            d -= 1;
            idx[d] += 1;
            if idx[d] < src_shape[d] {
                break;
            }
            idx[d] = 0;
        }
    }
}
