//! GRIB2 section parsing.
//!
//! Each GRIB2 message consists of a fixed 16-byte indicator followed by
//! length-prefixed sections (`u32` length, `u8` section number, payload) and
//! the `7777` end marker. Parsers here take the complete message bytes and
//! locate their section by number.

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};

use crate::{Grib2Error, Result};

/// Length of section 0.
pub const INDICATOR_LENGTH: usize = 16;
/// Section 8, the end marker.
pub const END_MARKER: &[u8; 4] = b"7777";

/// Section 0: Indicator Section (16 bytes)
#[derive(Debug, Clone)]
pub struct Indicator {
    pub discipline: u8,
    pub edition: u8,
    pub message_length: u64,
}

/// Section 1: Identification Section
#[derive(Debug, Clone)]
pub struct Identification {
    pub center: u16,
    pub sub_center: u16,
    pub table_version: u8,
    pub local_table_version: u8,
    pub significance_of_reference_time: u8,
    pub reference_time: DateTime<Utc>,
    pub production_status: u8,
    pub data_type: u8,
}

/// Section 3: Grid Definition Section
///
/// Coordinates are kept in the native microdegrees of template 3.0. For other
/// templates only `num_data_points`, `template` and the dimensions are filled.
#[derive(Debug, Clone)]
pub struct GridDefinition {
    pub num_data_points: u32,
    pub template: u16,
    pub grid_shape: u8,
    pub ni: u32,
    pub nj: u32,
    pub first_latitude: i32,
    pub first_longitude: i32,
    pub last_latitude: i32,
    pub last_longitude: i32,
    pub i_increment: u32,
    pub j_increment: u32,
    pub scanning_mode: u8,
}

/// Section 4: Product Definition Section
#[derive(Debug, Clone)]
pub struct ProductDefinition {
    pub template: u16,
    pub parameter_category: u8,
    pub parameter_number: u8,
    pub forecast_time: u32,
    pub level_type: u8,
    pub level_value: u32,
}

/// Section 5: Data Representation Section
#[derive(Debug, Clone)]
pub struct DataRepresentation {
    /// Number of packed values (excludes bitmap-masked points).
    pub num_data_points: u32,
    pub template: u16,
    pub reference_value: f32,
    pub binary_scale_factor: i16,
    pub decimal_scale_factor: i16,
    pub bits_per_value: u8,
    pub original_data_type: u8,
}

/// Section 6: Bitmap Section
#[derive(Debug, Clone)]
pub struct Bitmap {
    pub indicator: u8,
    /// One bit per grid point, most significant bit first, 1 = present.
    pub data: Bytes,
}

impl Bitmap {
    /// True if a bitmap is carried in this section.
    pub fn is_present(&self) -> bool {
        self.indicator == 0
    }
}

/// Section 7: Data Section
#[derive(Debug, Clone)]
pub struct DataSection {
    pub data: Bytes,
}

// ===== Parsing Functions =====

/// Parse Section 0 (Indicator) from start of message
pub fn parse_indicator(data: &[u8]) -> Result<Indicator> {
    if data.len() < INDICATOR_LENGTH {
        return Err(Grib2Error::InvalidFormat(
            "Not enough data for indicator section".to_string(),
        ));
    }

    if &data[0..4] != b"GRIB" {
        return Err(Grib2Error::InvalidFormat(
            "Invalid GRIB magic bytes".to_string(),
        ));
    }

    // Octets 5-6 reserved, 7 discipline, 8 edition, 9-16 total length.
    let discipline = data[6];
    let edition = data[7];
    let message_length = read_u64(data, 8);

    if edition != 2 {
        return Err(Grib2Error::InvalidFormat(format!(
            "Expected GRIB edition 2, got {}",
            edition
        )));
    }

    Ok(Indicator {
        discipline,
        edition,
        message_length,
    })
}

/// Parse Section 1 (Identification)
pub fn parse_identification(data: &[u8]) -> Result<Identification> {
    let offset = find_section(data, 1)?;
    let sec = section_slice(data, offset, 1, 21)?;

    let year = read_u16(sec, 12);
    let (month, day, hour, minute, second) = (sec[14], sec[15], sec[16], sec[17], sec[18]);

    let reference_time = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .and_then(|date| date.and_hms_opt(hour as u32, minute as u32, second as u32))
        .ok_or_else(|| {
            Grib2Error::invalid_section(
                1,
                format!(
                    "Invalid date: {}-{:02}-{:02} {:02}:{:02}:{:02}",
                    year, month, day, hour, minute, second
                ),
            )
        })?;

    Ok(Identification {
        center: read_u16(sec, 5),
        sub_center: read_u16(sec, 7),
        table_version: sec[9],
        local_table_version: sec[10],
        significance_of_reference_time: sec[11],
        reference_time: DateTime::<Utc>::from_naive_utc_and_offset(reference_time, Utc),
        production_status: sec[19],
        data_type: sec[20],
    })
}

/// Parse Section 3 (Grid Definition)
pub fn parse_grid_definition(data: &[u8]) -> Result<GridDefinition> {
    let offset = find_section(data, 3)?;
    let sec = section_slice(data, offset, 3, 14)?;

    // 5: source, 6-9: number of points, 10-11: optional list, 12-13: template.
    let num_data_points = read_u32(sec, 6);
    let template = read_u16(sec, 12);
    let gd = &sec[14..];

    if template == 0 {
        // Template 3.0: regular latitude/longitude.
        if gd.len() < 58 {
            return Err(Grib2Error::invalid_section(
                3,
                format!("Template 0 needs at least 58 bytes, got {}", gd.len()),
            ));
        }

        Ok(GridDefinition {
            num_data_points,
            template,
            grid_shape: gd[0],
            ni: read_u32(gd, 16),
            nj: read_u32(gd, 20),
            first_latitude: read_i32(gd, 32),
            first_longitude: read_i32(gd, 36),
            last_latitude: read_i32(gd, 41),
            last_longitude: read_i32(gd, 45),
            i_increment: read_u32(gd, 49),
            j_increment: read_u32(gd, 53),
            scanning_mode: gd[57],
        })
    } else {
        // Other templates: dimensions from the common positions, if present.
        let ni = if gd.len() >= 20 { read_u32(gd, 16) } else { 0 };
        let nj = if gd.len() >= 24 { read_u32(gd, 20) } else { 0 };

        Ok(GridDefinition {
            num_data_points,
            template,
            grid_shape: gd.first().copied().unwrap_or(0),
            ni,
            nj,
            first_latitude: 0,
            first_longitude: 0,
            last_latitude: 0,
            last_longitude: 0,
            i_increment: 0,
            j_increment: 0,
            scanning_mode: 0,
        })
    }
}

/// Parse Section 4 (Product Definition)
pub fn parse_product_definition(data: &[u8]) -> Result<ProductDefinition> {
    let offset = find_section(data, 4)?;
    let sec = section_slice(data, offset, 4, 11)?;

    // Template 4.0 positions; shorter templates leave the tail zeroed.
    let forecast_time = if sec.len() >= 22 { read_u32(sec, 18) } else { 0 };
    let level_type = sec.get(22).copied().unwrap_or(1);
    let level_value = if sec.len() >= 28 { read_u32(sec, 24) } else { 0 };

    Ok(ProductDefinition {
        template: read_u16(sec, 7),
        parameter_category: sec[9],
        parameter_number: sec[10],
        forecast_time,
        level_type,
        level_value,
    })
}

/// Parse Section 5 (Data Representation)
pub fn parse_data_representation(data: &[u8]) -> Result<DataRepresentation> {
    let offset = find_section(data, 5)?;
    let sec = section_slice(data, offset, 5, 11)?;

    // Octets 6-9 count, 10-11 template, template 5.0 fields from octet 12.
    let num_data_points = read_u32(sec, 5);
    let template = read_u16(sec, 9);
    let t = &sec[11..];

    let reference_value = if t.len() >= 4 {
        f32::from_be_bytes([t[0], t[1], t[2], t[3]])
    } else {
        0.0
    };
    let binary_scale_factor = if t.len() >= 6 { read_i16(t, 4) } else { 0 };
    let decimal_scale_factor = if t.len() >= 8 { read_i16(t, 6) } else { 0 };

    Ok(DataRepresentation {
        num_data_points,
        template,
        reference_value,
        binary_scale_factor,
        decimal_scale_factor,
        bits_per_value: t.get(8).copied().unwrap_or(0),
        original_data_type: t.get(9).copied().unwrap_or(0),
    })
}

/// Parse Section 6 (Bitmap)
pub fn parse_bitmap(data: &[u8]) -> Result<Bitmap> {
    let offset = find_section(data, 6)?;
    let sec = section_slice(data, offset, 6, 6)?;

    let indicator = sec[5];
    let bitmap = match indicator {
        0 => Bytes::copy_from_slice(&sec[6..]),
        255 => Bytes::new(),
        other => {
            return Err(Grib2Error::invalid_section(
                6,
                format!("Unsupported bitmap indicator {}", other),
            ))
        }
    };

    Ok(Bitmap {
        indicator,
        data: bitmap,
    })
}

/// Parse Section 7 (Data)
pub fn parse_data_section(data: &[u8]) -> Result<DataSection> {
    let offset = find_section(data, 7)?;
    let sec = section_slice(data, offset, 7, 5)?;

    Ok(DataSection {
        data: Bytes::copy_from_slice(&sec[5..]),
    })
}

// ===== Helper Functions =====

/// Find a section by number within a message, returning its byte offset.
pub fn find_section(data: &[u8], section_num: u8) -> Result<usize> {
    let mut offset = INDICATOR_LENGTH;

    loop {
        if offset + 4 <= data.len() && &data[offset..offset + 4] == END_MARKER {
            return Err(Grib2Error::invalid_section(
                section_num,
                "Reached end of message without finding section",
            ));
        }
        if offset + 5 > data.len() {
            return Err(Grib2Error::invalid_section(section_num, "Section not found"));
        }

        let section_length = read_u32(data, offset) as usize;
        if section_length < 5 || offset + section_length > data.len() {
            return Err(Grib2Error::invalid_section(
                section_num,
                format!("Invalid section length {} at offset {}", section_length, offset),
            ));
        }

        if data[offset + 4] == section_num {
            return Ok(offset);
        }
        offset += section_length;
    }
}

/// The bytes of the section at `offset`, checked to hold at least `min_len`.
fn section_slice(data: &[u8], offset: usize, section: u8, min_len: usize) -> Result<&[u8]> {
    let length = read_u32(data, offset) as usize;
    if length < min_len {
        return Err(Grib2Error::invalid_section(
            section,
            format!("Section is {} bytes, expected at least {}", length, min_len),
        ));
    }
    Ok(&data[offset..offset + length])
}

fn read_u16(data: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([data[at], data[at + 1]])
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

fn read_u64(data: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&data[at..at + 8]);
    u64::from_be_bytes(buf)
}

fn read_i32(data: &[u8], at: usize) -> i32 {
    read_u32(data, at) as i32
}

/// GRIB2 signed integers are sign-and-magnitude, not two's complement.
fn read_i16(data: &[u8], at: usize) -> i16 {
    let raw = read_u16(data, at);
    let magnitude = (raw & 0x7FFF) as i16;
    if raw & 0x8000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_with_sections(sections: &[Vec<u8>]) -> Vec<u8> {
        let mut msg = Vec::new();
        msg.extend_from_slice(b"GRIB");
        msg.extend_from_slice(&[0, 0, 0, 2]);
        let body: usize = sections.iter().map(Vec::len).sum();
        msg.extend_from_slice(&((INDICATOR_LENGTH + body + 4) as u64).to_be_bytes());
        for s in sections {
            msg.extend_from_slice(s);
        }
        msg.extend_from_slice(END_MARKER);
        msg
    }

    fn section(number: u8, payload: &[u8]) -> Vec<u8> {
        let mut s = ((payload.len() + 5) as u32).to_be_bytes().to_vec();
        s.push(number);
        s.extend_from_slice(payload);
        s
    }

    #[test]
    fn test_parse_indicator() {
        let msg = message_with_sections(&[]);
        let ind = parse_indicator(&msg).unwrap();
        assert_eq!(ind.edition, 2);
        assert_eq!(ind.message_length, 20);

        let mut bad = msg.clone();
        bad[7] = 1;
        assert!(matches!(parse_indicator(&bad), Err(Grib2Error::InvalidFormat(_))));
        assert!(parse_indicator(b"GRIB").is_err());
        assert!(parse_indicator(b"BIRG\0\0\0\x02\0\0\0\0\0\0\0\x14").is_err());
    }

    #[test]
    fn test_find_section_skips_others() {
        let msg = message_with_sections(&[section(1, &[0; 16]), section(7, &[1, 2, 3])]);
        assert_eq!(find_section(&msg, 1).unwrap(), 16);
        assert_eq!(find_section(&msg, 7).unwrap(), 16 + 21);
        assert!(find_section(&msg, 5).is_err());

        let data = parse_data_section(&msg).unwrap();
        assert_eq!(&data.data[..], &[1, 2, 3]);
    }

    #[test]
    fn test_sign_magnitude() {
        assert_eq!(read_i16(&[0x80, 0x03], 0), -3);
        assert_eq!(read_i16(&[0x00, 0x03], 0), 3);
    }

    #[test]
    fn test_bitmap_indicator() {
        let msg = message_with_sections(&[section(6, &[255])]);
        assert!(!parse_bitmap(&msg).unwrap().is_present());

        let msg = message_with_sections(&[section(6, &[0, 0b1010_0000])]);
        let bitmap = parse_bitmap(&msg).unwrap();
        assert!(bitmap.is_present());
        assert_eq!(&bitmap.data[..], &[0b1010_0000]);

        let msg = message_with_sections(&[section(6, &[254])]);
        assert!(parse_bitmap(&msg).is_err());
    }
}
