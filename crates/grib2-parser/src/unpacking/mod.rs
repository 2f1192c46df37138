//! GRIB2 data unpacking.
//!
//! Only simple packing (data representation template 5.0) is decoded.

use crate::{Grib2Error, Result};

/// Parameters of template 5.0.
#[derive(Debug, Clone, Copy)]
pub struct SimplePacking {
    pub reference_value: f32,
    pub binary_scale_factor: i16,
    pub decimal_scale_factor: i16,
    pub bits_per_value: u8,
}

/// Unpack simple packed data onto `num_points` grid points.
///
/// value = (R + packed * 2^E) * 10^-D
///
/// With a bitmap, only points whose bit is set consume a packed value; the
/// others decode as `NaN`.
pub fn unpack_simple(
    packed_data: &[u8],
    num_points: usize,
    packing: SimplePacking,
    bitmap: Option<&[u8]>,
) -> Result<Vec<f32>> {
    let binary_scale = 2.0_f64.powi(packing.binary_scale_factor as i32);
    let decimal_scale = 10.0_f64.powi(-(packing.decimal_scale_factor as i32));
    let reference = packing.reference_value as f64;
    let bits_per_value = packing.bits_per_value as usize;

    if bits_per_value > 32 {
        return Err(Grib2Error::UnpackingError(format!(
            "Invalid number of bits per value: {}",
            bits_per_value
        )));
    }

    let mut values = Vec::with_capacity(num_points);
    let mut bit_position = 0;

    for i in 0..num_points {
        if let Some(bm) = bitmap {
            if !is_bit_set(bm, i) {
                values.push(f32::NAN);
                continue;
            }
        }

        let packed_value = if bits_per_value == 0 {
            0
        } else {
            extract_bits(packed_data, bit_position, bits_per_value)?
        };
        bit_position += bits_per_value;

        values.push(((reference + packed_value as f64 * binary_scale) * decimal_scale) as f32);
    }

    Ok(values)
}

/// Number of set bits among the first `num_points` bits of `bitmap`.
pub fn count_present(bitmap: &[u8], num_points: usize) -> usize {
    (0..num_points).filter(|&i| is_bit_set(bitmap, i)).count()
}

/// Bitmap: 1 bit per point, MSB first, 1 = present. Bits past the end of
/// the bitmap count as missing.
fn is_bit_set(bitmap: &[u8], index: usize) -> bool {
    bitmap
        .get(index / 8)
        .is_some_and(|byte| (byte >> (7 - (index % 8))) & 1 == 1)
}

/// Extract `num_bits` bits starting at `start_bit`, MSB first.
fn extract_bits(data: &[u8], start_bit: usize, num_bits: usize) -> Result<u32> {
    let end_bit = start_bit + num_bits;
    if end_bit.div_ceil(8) > data.len() {
        return Err(Grib2Error::UnpackingError(format!(
            "Not enough data to extract bits {}..{} from {} bytes",
            start_bit,
            end_bit,
            data.len()
        )));
    }

    let mut result = 0u32;
    for absolute_bit in start_bit..end_bit {
        let bit = (data[absolute_bit / 8] >> (7 - (absolute_bit % 8))) & 1;
        result = (result << 1) | bit as u32;
    }
    Ok(result)
}
