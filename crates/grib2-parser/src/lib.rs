//! GRIB2 parser (WMO FM 92 GRIB Edition 2).
//!
//! Reads the messages of a byte buffer and decodes simple-packed data. This is
//! the field encoding understood by the GRIB extractor of `chunked-data-view`.
//!
//! ```text
//! Bytes ──► Grib2Reader ──► Grib2Message ──► unpack_data() ──► Vec<f32>
//!              │                 │
//!              │                 ├─ sections 0,1,3,4,5,6,7
//!              └─ one message    └─ num_values()
//!                 per call
//! ```

use bytes::Bytes;
use thiserror::Error;

pub mod sections;
pub mod unpacking;

use sections::{
    Bitmap, DataRepresentation, DataSection, GridDefinition, Identification, Indicator,
    ProductDefinition, END_MARKER, INDICATOR_LENGTH,
};
use unpacking::SimplePacking;

/// Errors raised while reading or decoding GRIB2 messages.
#[derive(Error, Debug)]
pub enum Grib2Error {
    #[error("Invalid GRIB2 format: {0}")]
    InvalidFormat(String),

    #[error("Invalid section {section}: {reason}")]
    InvalidSection { section: u8, reason: String },

    #[error("Unpacking failed: {0}")]
    UnpackingError(String),

    #[error("Unsupported data representation template 5.{0}")]
    UnsupportedPacking(u16),
}

impl Grib2Error {
    /// Create an InvalidSection error.
    pub fn invalid_section(section: u8, reason: impl Into<String>) -> Self {
        Self::InvalidSection {
            section,
            reason: reason.into(),
        }
    }
}

/// Result type for GRIB2 operations.
pub type Result<T> = std::result::Result<T, Grib2Error>;

/// A parsed GRIB2 message.
#[derive(Debug, Clone)]
pub struct Grib2Message {
    /// Byte offset of the message within its source buffer.
    pub offset: usize,
    pub indicator: Indicator,
    pub identification: Identification,
    pub grid_definition: GridDefinition,
    pub product_definition: ProductDefinition,
    pub data_representation: DataRepresentation,
    pub bitmap: Bitmap,
    pub data_section: DataSection,
    raw: Bytes,
}

impl Grib2Message {
    /// Parse one complete message (indicator through end marker).
    pub fn parse(raw: Bytes) -> Result<Self> {
        Self::parse_at(raw, 0)
    }

    fn parse_at(raw: Bytes, offset: usize) -> Result<Self> {
        let indicator = sections::parse_indicator(&raw)?;
        if indicator.message_length as usize != raw.len() {
            return Err(Grib2Error::InvalidFormat(format!(
                "Message length {} does not match buffer of {} bytes",
                indicator.message_length,
                raw.len()
            )));
        }
        if !raw.ends_with(END_MARKER) {
            return Err(Grib2Error::InvalidFormat(
                "Missing 7777 end marker".to_string(),
            ));
        }

        let message = Self {
            offset,
            identification: sections::parse_identification(&raw)?,
            grid_definition: sections::parse_grid_definition(&raw)?,
            product_definition: sections::parse_product_definition(&raw)?,
            data_representation: sections::parse_data_representation(&raw)?,
            bitmap: sections::parse_bitmap(&raw)?,
            data_section: sections::parse_data_section(&raw)?,
            indicator,
            raw,
        };

        tracing::trace!(
            offset,
            length = message.raw.len(),
            num_values = message.num_values(),
            template = message.data_representation.template,
            "Parsed GRIB2 message"
        );

        Ok(message)
    }

    /// Number of grid points, including bitmap-masked ones.
    pub fn num_values(&self) -> usize {
        self.grid_definition.num_data_points as usize
    }

    /// Grid dimensions as `(nj, ni)`.
    pub fn grid_dims(&self) -> (u32, u32) {
        (self.grid_definition.nj, self.grid_definition.ni)
    }

    /// The raw message bytes.
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// Decode every grid point. Masked points are `NaN`.
    pub fn unpack_data(&self) -> Result<Vec<f32>> {
        let repr = &self.data_representation;
        if repr.template != 0 {
            return Err(Grib2Error::UnsupportedPacking(repr.template));
        }

        let num_points = self.num_values();
        let bitmap = self.bitmap.is_present().then(|| &self.bitmap.data[..]);

        let packed_points = match bitmap {
            Some(bm) => unpacking::count_present(bm, num_points),
            None => num_points,
        };
        if packed_points != repr.num_data_points as usize {
            return Err(Grib2Error::UnpackingError(format!(
                "Section 5 declares {} packed values, grid and bitmap give {}",
                repr.num_data_points, packed_points
            )));
        }

        unpacking::unpack_simple(
            &self.data_section.data,
            num_points,
            SimplePacking {
                reference_value: repr.reference_value,
                binary_scale_factor: repr.binary_scale_factor,
                decimal_scale_factor: repr.decimal_scale_factor,
                bits_per_value: repr.bits_per_value,
            },
            bitmap,
        )
    }
}

/// Sequential reader over the GRIB2 messages in a buffer.
pub struct Grib2Reader {
    data: Bytes,
    offset: usize,
}

impl Grib2Reader {
    pub fn new(data: Bytes) -> Self {
        Self { data, offset: 0 }
    }

    /// Current read position.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Read the next message. `Ok(None)` at a clean end of the buffer.
    pub fn next_message(&mut self) -> Result<Option<Grib2Message>> {
        if self.offset >= self.data.len() {
            return Ok(None);
        }

        let rest = &self.data[self.offset..];
        let indicator = sections::parse_indicator(rest).map_err(|e| {
            Grib2Error::InvalidFormat(format!("At offset {}: {}", self.offset, e))
        })?;

        let length = indicator.message_length as usize;
        if length < INDICATOR_LENGTH + END_MARKER.len() || length > rest.len() {
            return Err(Grib2Error::InvalidFormat(format!(
                "Message at offset {} declares {} bytes, {} available",
                self.offset,
                length,
                rest.len()
            )));
        }

        let raw = self.data.slice(self.offset..self.offset + length);
        let message = Grib2Message::parse_at(raw, self.offset)?;
        self.offset += length;
        Ok(Some(message))
    }
}

impl Iterator for Grib2Reader {
    type Item = Result<Grib2Message>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_message() {
            Ok(Some(message)) => Some(Ok(message)),
            Ok(None) => None,
            Err(e) => {
                // Stop after the first error, the rest cannot be framed.
                self.offset = self.data.len();
                Some(Err(e))
            }
        }
    }
}
