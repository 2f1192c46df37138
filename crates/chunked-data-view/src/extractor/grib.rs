//! GRIB2 records.

use field_store::DataHandle;
use grib2_parser::Grib2Reader;

use super::Extractor;
use crate::error::{Result, ViewError};
use crate::types::DataLayout;

/// Extractor for records holding a single GRIB2 message.
///
/// Values are decoded to `f32`; bitmap-masked points become `NaN`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GribExtractor;

impl GribExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for GribExtractor {
    fn name(&self) -> &'static str {
        "grib"
    }

    fn layout(&self, handle: &mut dyn DataHandle) -> Result<DataLayout> {
        let data = handle.open()?;
        let mut reader = Grib2Reader::new(data);
        let message = reader
            .next_message()?
            .ok_or_else(|| ViewError::extraction("record holds no GRIB message"))?;

        Ok(DataLayout::new(
            message.num_values(),
            std::mem::size_of::<f32>(),
        ))
    }

    fn write_into(
        &self,
        handle: &mut dyn DataHandle,
        layout: &DataLayout,
        out: &mut [f32],
    ) -> Result<()> {
        let data = handle.open()?;
        let mut reader = Grib2Reader::new(data);
        let message = reader
            .next_message()?
            .ok_or_else(|| ViewError::extraction("record holds no GRIB message"))?;

        if message.num_values() != layout.count_values || out.len() != layout.count_values {
            return Err(ViewError::extraction(format!(
                "message has {} values, expected {}",
                message.num_values(),
                layout.count_values
            )));
        }

        let values = message.unpack_data()?;
        if reader.next_message()?.is_some() {
            return Err(ViewError::extraction(
                "record holds more than one GRIB message",
            ));
        }

        out.copy_from_slice(&values);
        Ok(())
    }
}
