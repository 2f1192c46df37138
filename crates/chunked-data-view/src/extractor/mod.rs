//! Record extractors.
//!
//! An [`Extractor`] knows how to turn the bytes of one stored record into
//! numeric values. Parts use it twice: once at construction to learn the
//! record [`DataLayout`], then for every chunk access to deposit each listed
//! record at its slot in the caller's buffer.

mod grib;

pub use grib::GribExtractor;

use std::fmt;
use std::str::FromStr;

use field_store::{DataHandle, FieldIter};
use mars_request::Request;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::axis::Axis;
use crate::error::{Result, ViewError};
use crate::index_mapper::buffer_index_for_key;
use crate::types::{ChunkFill, DataLayout};

/// Decodes records of one field encoding.
pub trait Extractor: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Layout of the first record reachable through `handle`.
    fn layout(&self, handle: &mut dyn DataHandle) -> Result<DataLayout>;

    /// Decode one record into `out`, which holds exactly
    /// `layout.count_values` values.
    ///
    /// Implementations must leave `out` untouched when they fail.
    fn write_into(
        &self,
        handle: &mut dyn DataHandle,
        layout: &DataLayout,
        out: &mut [f32],
    ) -> Result<()>;

    /// Deposit every listed record at its slot in `out`.
    ///
    /// Slots are computed from each record's key against `axes`. Records that
    /// fail to list or decode are logged and skipped; a record outside the
    /// axes or a slot beyond `expected` aborts the call. Fails with
    /// [`ViewError::NoData`] when the listing is empty.
    fn write_many(
        &self,
        request: &Request,
        records: FieldIter,
        axes: &[Axis],
        layout: &DataLayout,
        out: &mut [f32],
        expected: usize,
    ) -> Result<ChunkFill> {
        let count = layout.count_values;
        let mut filled = vec![false; expected];
        let mut seen = 0usize;

        for item in records {
            seen += 1;
            let (key, mut handle) = match item {
                Ok(element) => element,
                Err(e) => {
                    warn!(request = %request, error = %e, "Skipping unlisted record");
                    continue;
                }
            };

            let slot = buffer_index_for_key(axes, &key)?;
            if slot >= expected {
                return Err(ViewError::extraction(format!(
                    "record {} maps to slot {} but the chunk holds {} records",
                    key, slot, expected
                )));
            }

            let start = slot * count;
            let end = start + count;
            if end > out.len() {
                return Err(ViewError::extraction(format!(
                    "record {} needs values {}..{} but the buffer holds {}",
                    key,
                    start,
                    end,
                    out.len()
                )));
            }

            if let Err(e) = self.write_into(handle.as_mut(), layout, &mut out[start..end]) {
                warn!(
                    key = %key,
                    extractor = self.name(),
                    error = %e,
                    "Skipping record that failed to decode"
                );
                continue;
            }

            if filled[slot] {
                warn!(key = %key, slot, "Record overwrote a slot that was already filled");
            }
            filled[slot] = true;
        }

        if seen == 0 {
            return Err(ViewError::NoData {
                request: request.to_string(),
            });
        }

        let fill = ChunkFill::new(filled.iter().filter(|&&f| f).count(), expected);
        if fill.is_complete() {
            debug!(request = %request, fill = %fill, "Chunk complete");
        } else {
            warn!(
                request = %request,
                fill = %fill,
                missing = fill.missing(),
                "Chunk is missing fields"
            );
        }
        Ok(fill)
    }
}

/// Field encodings with a built-in extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorType {
    #[default]
    Grib,
}

impl ExtractorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grib => "grib",
        }
    }

    /// Instantiate the extractor.
    pub fn create(&self) -> Box<dyn Extractor> {
        match self {
            Self::Grib => Box::new(GribExtractor::new()),
        }
    }
}

impl FromStr for ExtractorType {
    type Err = ViewError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "grib" | "grib2" => Ok(Self::Grib),
            other => Err(ViewError::config(format!("unknown extractor '{}'", other))),
        }
    }
}

impl fmt::Display for ExtractorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use field_store::{ListElement, MemoryHandle, StoreError};
    use mars_request::{Key, Parameter};

    /// Reads records whose bytes are little-endian f32 values.
    struct RawExtractor;

    impl Extractor for RawExtractor {
        fn name(&self) -> &'static str {
            "raw"
        }

        fn layout(&self, handle: &mut dyn DataHandle) -> Result<DataLayout> {
            Ok(DataLayout::new(handle.open()?.len() / 4, 4))
        }

        fn write_into(
            &self,
            handle: &mut dyn DataHandle,
            layout: &DataLayout,
            out: &mut [f32],
        ) -> Result<()> {
            let bytes = handle.open()?;
            if bytes.len() != layout.record_bytes() {
                return Err(ViewError::extraction("size mismatch"));
            }
            for (dst, src) in out.iter_mut().zip(bytes.chunks_exact(4)) {
                *dst = f32::from_le_bytes([src[0], src[1], src[2], src[3]]);
            }
            Ok(())
        }
    }

    fn raw(values: &[f32]) -> Box<dyn DataHandle> {
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Box::new(MemoryHandle::new(Bytes::from(bytes)))
    }

    fn element(key: &str, values: &[f32]) -> field_store::Result<ListElement> {
        Ok((Key::parse(key).unwrap(), raw(values)))
    }

    fn step_axes() -> Vec<Axis> {
        vec![Axis::new(
            vec![Parameter::new("step", vec!["0".into(), "6".into(), "12".into()])],
            false,
        )]
    }

    fn request() -> Request {
        Request::parse("param=t,step=0/6/12").unwrap()
    }

    #[test]
    fn test_write_many_places_records_by_key() {
        let records: FieldIter = Box::new(
            vec![
                element("param=t,step=12", &[5.0, 6.0]),
                element("param=t,step=0", &[1.0, 2.0]),
                element("param=t,step=6", &[3.0, 4.0]),
            ]
            .into_iter(),
        );
        let mut out = vec![f32::NAN; 6];
        let fill = RawExtractor
            .write_many(&request(), records, &step_axes(), &DataLayout::new(2, 4), &mut out, 3)
            .unwrap();

        assert!(fill.is_complete());
        assert_eq!(out, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_write_many_skips_bad_records() {
        let records: FieldIter = Box::new(
            vec![
                element("param=t,step=0", &[1.0, 2.0]),
                element("param=t,step=6", &[3.0]),
                Err(StoreError::NotFound("gone".into())),
            ]
            .into_iter(),
        );
        let mut out = vec![-1.0; 6];
        let fill = RawExtractor
            .write_many(&request(), records, &step_axes(), &DataLayout::new(2, 4), &mut out, 3)
            .unwrap();

        assert_eq!(fill, ChunkFill::new(1, 3));
        assert_eq!(out, vec![1.0, 2.0, -1.0, -1.0, -1.0, -1.0]);
    }

    #[test]
    fn test_write_many_rejects_foreign_record() {
        let records: FieldIter =
            Box::new(vec![element("param=t,step=18", &[1.0, 2.0])].into_iter());
        let mut out = vec![0.0; 6];
        let err = RawExtractor
            .write_many(&request(), records, &step_axes(), &DataLayout::new(2, 4), &mut out, 3)
            .unwrap_err();
        assert!(matches!(err, ViewError::ValueOutsideAxis { .. }));
    }

    #[test]
    fn test_write_many_empty_listing() {
        let records: FieldIter = Box::new(std::iter::empty());
        let mut out = vec![0.0; 6];
        let err = RawExtractor
            .write_many(&request(), records, &step_axes(), &DataLayout::new(2, 4), &mut out, 3)
            .unwrap_err();
        assert!(matches!(err, ViewError::NoData { .. }));
    }

    #[test]
    fn test_extractor_type_parsing() {
        assert_eq!("GRIB".parse::<ExtractorType>().unwrap(), ExtractorType::Grib);
        assert!("netcdf".parse::<ExtractorType>().is_err());
        assert_eq!(ExtractorType::default().to_string(), "grib");
        assert_eq!(ExtractorType::Grib.create().name(), "grib");
    }
}
