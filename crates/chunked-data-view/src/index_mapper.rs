//! Index arithmetic between axes, parameter values and buffer slots.
//!
//! Axes and their parameters are laid out row-major: the last parameter of an
//! axis varies fastest, and in a chunk buffer the last bulk axis varies
//! fastest. Chunked axes occupy a single slot per chunk, so they never
//! contribute to a buffer offset.

use mars_request::Key;

use crate::axis::Axis;
use crate::error::{Result, ViewError};

/// Split a linear axis index into one value index per parameter.
pub fn delinearize(index: usize, axis: &Axis) -> Result<Vec<usize>> {
    let size = axis.size();
    if index >= size {
        return Err(ViewError::out_of_bounds(
            format!("axis {}", axis),
            index,
            size,
        ));
    }

    let params = axis.parameters();
    if params.len() == 1 {
        return Ok(vec![index]);
    }

    let mut indices = vec![0; params.len()];
    let mut remaining = index;
    for i in (0..params.len()).rev() {
        let count = params[i].count();
        indices[i] = remaining % count;
        remaining /= count;
    }
    Ok(indices)
}

/// Inverse of [`delinearize`].
pub fn linearize(indices: &[usize], axis: &Axis) -> Result<usize> {
    let params = axis.parameters();
    if indices.len() != params.len() {
        return Err(ViewError::config(format!(
            "axis {} has {} parameters, got {} indices",
            axis,
            params.len(),
            indices.len()
        )));
    }

    let mut index = 0;
    for (param, &i) in params.iter().zip(indices) {
        if i >= param.count() {
            return Err(ViewError::out_of_bounds(
                format!("parameter '{}'", param.name()),
                i,
                param.count(),
            ));
        }
        index = index * param.count() + i;
    }
    Ok(index)
}

/// Flat slot of a record inside a chunk buffer, counting in units of records.
///
/// `indices` holds one linear index per axis; entries for chunked axes are
/// ignored.
pub fn axis_index_to_buffer_index(indices: &[usize], axes: &[Axis]) -> usize {
    debug_assert_eq!(indices.len(), axes.len());
    let mut index = 0;
    let mut stride = 1;
    for (axis, &i) in axes.iter().zip(indices).rev() {
        if !axis.is_chunked() {
            index += i * stride;
            stride *= axis.size();
        }
    }
    index
}

/// Linear position of `key` along `axis`.
///
/// Fails if the key lacks one of the axis keywords or carries a value the
/// axis does not declare.
pub fn index_in_axis_parameters(axis: &Axis, key: &Key) -> Result<usize> {
    let indices = axis
        .parameters()
        .iter()
        .map(|param| {
            let value = key.get(param.name()).ok_or_else(|| ViewError::MissingKeyword {
                keyword: param.name().to_string(),
                key: key.to_string(),
            })?;
            param.position(value).ok_or_else(|| ViewError::ValueOutsideAxis {
                keyword: param.name().to_string(),
                value: value.to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    linearize(&indices, axis)
}

/// Slot of the record identified by `key` inside a chunk buffer.
pub fn buffer_index_for_key(axes: &[Axis], key: &Key) -> Result<usize> {
    let indices = axes
        .iter()
        .map(|axis| {
            if axis.is_chunked() {
                Ok(0)
            } else {
                index_in_axis_parameters(axis, key)
            }
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(axis_index_to_buffer_index(&indices, axes))
}

/// Number of record slots in one chunk: the product of the bulk axis sizes.
pub fn records_per_chunk(axes: &[Axis]) -> Result<usize> {
    axes.iter()
        .filter(|axis| !axis.is_chunked())
        .try_fold(1usize, |records, axis| {
            axis.checked_size().and_then(|size| records.checked_mul(size))
        })
        .ok_or_else(|| ViewError::config("bulk axes hold more records than can be addressed"))
}
