//! Narrowing a part's base request to a single chunk.

use mars_request::Request;

use crate::axis::Axis;
use crate::error::{Result, ViewError};
use crate::index_mapper::delinearize;

/// Restrict `request` to element `index` of `axis`.
///
/// A bulk axis only has chunk 0 and keeps every value of its parameters; a
/// chunked axis pins each parameter to the single value selected by `index`.
pub fn update_request(request: &mut Request, axis: &Axis, index: usize) -> Result<()> {
    if !axis.is_chunked() {
        if index != 0 {
            return Err(ViewError::out_of_bounds(
                format!("bulk axis {}", axis),
                index,
                1,
            ));
        }
        for param in axis.parameters() {
            request.set_values(param.name(), param.values())?;
        }
        return Ok(());
    }

    let indices = delinearize(index, axis)?;
    for (param, i) in axis.parameters().iter().zip(indices) {
        request.set_value(param.name(), &param.values()[i])?;
    }
    Ok(())
}
