//! Synthetic GRIB2 messages.
//!
//! Creates minimal GRIB2 messages with a valid structure: sections 0, 1, 3
//! (template 3.0), 4 (template 4.0), 5 (template 5.0, 16-bit simple packing),
//! 6, 7 and the end marker. Values that are integers in a small range
//! round-trip exactly.

/// Build a minimal GRIB2 message.
#[derive(Debug, Clone)]
pub struct Grib2Builder {
    discipline: u8,
    center: u16,
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    ni: u32,
    nj: u32,
    param_category: u8,
    param_number: u8,
    level_type: u8,
    level_value: u32,
    forecast_hour: u32,
    data_values: Vec<f32>,
    bitmap: Option<Vec<bool>>,
    packing_template: u16,
}

impl Default for Grib2Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Grib2Builder {
    /// A 2 m temperature field on a 10x10 grid.
    pub fn new() -> Self {
        let ni = 10;
        let nj = 10;
        Self {
            discipline: 0,
            center: 98,
            year: 2020,
            month: 1,
            day: 1,
            hour: 0,
            ni,
            nj,
            param_category: 0,
            param_number: 0,
            level_type: 103,
            level_value: 2,
            forecast_hour: 0,
            data_values: vec![288.0; (ni * nj) as usize],
            bitmap: None,
            packing_template: 0,
        }
    }

    pub fn with_reference_time(mut self, year: u16, month: u8, day: u8, hour: u8) -> Self {
        self.year = year;
        self.month = month;
        self.day = day;
        self.hour = hour;
        self
    }

    /// Set the grid size, resetting data to zeros.
    pub fn with_grid(mut self, ni: u32, nj: u32) -> Self {
        self.ni = ni;
        self.nj = nj;
        self.data_values = vec![0.0; (ni * nj) as usize];
        self
    }

    pub fn with_parameter(mut self, category: u8, number: u8) -> Self {
        self.param_category = category;
        self.param_number = number;
        self
    }

    pub fn with_level(mut self, level_type: u8, level_value: u32) -> Self {
        self.level_type = level_type;
        self.level_value = level_value;
        self
    }

    pub fn with_forecast_hour(mut self, hour: u32) -> Self {
        self.forecast_hour = hour;
        self
    }

    pub fn with_constant_value(mut self, value: f32) -> Self {
        self.data_values = vec![value; (self.ni * self.nj) as usize];
        self
    }

    /// Set the values as a single row grid of `data.len()` points.
    pub fn with_values(mut self, data: Vec<f32>) -> Self {
        self.ni = data.len() as u32;
        self.nj = 1;
        self.data_values = data;
        self
    }

    /// Set the values, keeping the grid size.
    pub fn with_data(mut self, data: Vec<f32>) -> Self {
        self.data_values = data;
        self
    }

    /// Mark points as present (`true`) or missing. Missing points are not packed.
    pub fn with_bitmap(mut self, present: Vec<bool>) -> Self {
        self.bitmap = Some(present);
        self
    }

    /// Declare another data representation template (the data stays simple packed).
    pub fn with_packing_template(mut self, template: u16) -> Self {
        self.packing_template = template;
        self
    }

    /// Build the complete GRIB2 message bytes.
    pub fn build(&self) -> Vec<u8> {
        let present = self.present_values();
        let packing = Packing::for_values(&present);

        let sections = [
            self.build_section1(),
            self.build_section3(),
            self.build_section4(),
            self.build_section5(&packing, present.len() as u32),
            self.build_section6(),
            build_section7(&packing, &present),
        ];

        let message_length = 16 + sections.iter().map(Vec::len).sum::<usize>() + 4;

        let mut message = Vec::with_capacity(message_length);
        message.extend_from_slice(b"GRIB");
        message.extend_from_slice(&[0, 0]);
        message.push(self.discipline);
        message.push(2);
        message.extend_from_slice(&(message_length as u64).to_be_bytes());
        for section in &sections {
            message.extend_from_slice(section);
        }
        message.extend_from_slice(b"7777");
        message
    }

    fn present_values(&self) -> Vec<f32> {
        match &self.bitmap {
            Some(mask) => self
                .data_values
                .iter()
                .zip(mask)
                .filter(|(_, &p)| p)
                .map(|(&v, _)| v)
                .collect(),
            None => self.data_values.clone(),
        }
    }

    fn build_section1(&self) -> Vec<u8> {
        let mut section = Vec::new();
        section.extend_from_slice(&21u32.to_be_bytes());
        section.push(1);

        section.extend_from_slice(&self.center.to_be_bytes());
        section.extend_from_slice(&0u16.to_be_bytes()); // Sub-center
        section.push(2); // Master table version
        section.push(1); // Local table version
        section.push(1); // Start of forecast

        section.extend_from_slice(&self.year.to_be_bytes());
        section.push(self.month);
        section.push(self.day);
        section.push(self.hour);
        section.push(0);
        section.push(0);

        section.push(0); // Operational
        section.push(1); // Forecast
        section
    }

    fn build_section3(&self) -> Vec<u8> {
        let mut section = Vec::new();
        section.extend_from_slice(&(14u32 + 58).to_be_bytes());
        section.push(3);

        section.push(0);
        section.extend_from_slice(&(self.ni * self.nj).to_be_bytes());
        section.push(0);
        section.push(0);
        section.extend_from_slice(&0u16.to_be_bytes()); // Template 3.0

        section.push(6); // Spherical earth
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());

        section.extend_from_slice(&self.ni.to_be_bytes());
        section.extend_from_slice(&self.nj.to_be_bytes());
        section.extend_from_slice(&0u32.to_be_bytes());
        section.extend_from_slice(&0xFFFF_FFFFu32.to_be_bytes());

        section.extend_from_slice(&90_000_000i32.to_be_bytes()); // La1
        section.extend_from_slice(&0i32.to_be_bytes()); // Lo1
        section.push(48);
        section.extend_from_slice(&(-90_000_000i32).to_be_bytes()); // La2
        section.extend_from_slice(&359_000_000i32.to_be_bytes()); // Lo2
        section.extend_from_slice(&1_000_000u32.to_be_bytes());
        section.extend_from_slice(&1_000_000u32.to_be_bytes());
        section.push(0);
        section
    }

    fn build_section4(&self) -> Vec<u8> {
        let mut section = Vec::new();
        section.extend_from_slice(&34u32.to_be_bytes());
        section.push(4);

        section.extend_from_slice(&0u16.to_be_bytes());
        section.extend_from_slice(&0u16.to_be_bytes()); // Template 4.0

        section.push(self.param_category);
        section.push(self.param_number);
        section.push(2);
        section.push(0);
        section.push(0);
        section.extend_from_slice(&0u16.to_be_bytes());
        section.push(0);
        section.push(1); // Hours
        section.extend_from_slice(&self.forecast_hour.to_be_bytes());

        section.push(self.level_type);
        section.push(0);
        section.extend_from_slice(&self.level_value.to_be_bytes());

        section.push(255);
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());
        section
    }

    fn build_section5(&self, packing: &Packing, packed_count: u32) -> Vec<u8> {
        let mut section = Vec::new();
        section.extend_from_slice(&21u32.to_be_bytes());
        section.push(5);

        section.extend_from_slice(&packed_count.to_be_bytes());
        section.extend_from_slice(&self.packing_template.to_be_bytes());

        section.extend_from_slice(&packing.reference.to_be_bytes());
        section.extend_from_slice(&sign_magnitude(packing.binary_scale));
        section.extend_from_slice(&sign_magnitude(0));
        section.push(packing.bits);
        section.push(0);
        section
    }

    fn build_section6(&self) -> Vec<u8> {
        let mut section = Vec::new();
        match &self.bitmap {
            None => {
                section.extend_from_slice(&6u32.to_be_bytes());
                section.push(6);
                section.push(255);
            }
            Some(mask) => {
                let mut bits = vec![0u8; mask.len().div_ceil(8)];
                for (i, _) in mask.iter().enumerate().filter(|(_, &p)| p) {
                    bits[i / 8] |= 0x80 >> (i % 8);
                }
                section.extend_from_slice(&(6 + bits.len() as u32).to_be_bytes());
                section.push(6);
                section.push(0);
                section.extend_from_slice(&bits);
            }
        }
        section
    }
}

/// Simple packing parameters for a set of values.
struct Packing {
    reference: f32,
    binary_scale: i16,
    bits: u8,
}

impl Packing {
    fn for_values(values: &[f32]) -> Self {
        let (min_val, max_val) = values
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), &v| {
                (min.min(v), max.max(v))
            });

        if values.is_empty() || max_val == min_val {
            return Self {
                reference: if values.is_empty() { 0.0 } else { min_val },
                binary_scale: 0,
                bits: 0,
            };
        }

        // range = 65535 * 2^E
        let range = max_val - min_val;
        Self {
            reference: min_val,
            binary_scale: (range / 65535.0).log2().ceil() as i16,
            bits: 16,
        }
    }
}

fn build_section7(packing: &Packing, values: &[f32]) -> Vec<u8> {
    let mut packed = Vec::new();
    if packing.bits == 16 {
        let scale = 2.0_f32.powi(packing.binary_scale as i32);
        for &v in values {
            let p = ((v - packing.reference) / scale).round() as u16;
            packed.extend_from_slice(&p.to_be_bytes());
        }
    }

    let mut section = Vec::with_capacity(5 + packed.len());
    section.extend_from_slice(&(5 + packed.len() as u32).to_be_bytes());
    section.push(7);
    section.extend_from_slice(&packed);
    section
}

/// GRIB2 signed 16-bit: sign bit plus magnitude.
fn sign_magnitude(value: i16) -> [u8; 2] {
    let magnitude = value.unsigned_abs() & 0x7FFF;
    let raw = if value < 0 { magnitude | 0x8000 } else { magnitude };
    raw.to_be_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_message_framing() {
        let data = Grib2Builder::new().build();
        assert_eq!(&data[0..4], b"GRIB");
        assert_eq!(data[7], 2);
        assert_eq!(&data[data.len() - 4..], b"7777");

        let declared = u64::from_be_bytes(data[8..16].try_into().unwrap());
        assert_eq!(declared as usize, data.len());
    }

    #[test]
    fn test_constant_field_has_no_packed_data() {
        let data = Grib2Builder::new().with_constant_value(5.0).build();
        let sixteen_bit = Grib2Builder::new()
            .with_data((0..100).map(|i| i as f32).collect())
            .build();
        assert_eq!(sixteen_bit.len() - data.len(), 200);
    }

    #[test]
    fn test_sign_magnitude() {
        assert_eq!(sign_magnitude(-12), [0x80, 0x0C]);
        assert_eq!(sign_magnitude(3), [0x00, 0x03]);
    }

    #[test]
    fn test_bitmap_section_length() {
        let data = Grib2Builder::new()
            .with_values(vec![1.0, 2.0, 3.0])
            .with_bitmap(vec![true, false, true])
            .build();
        let plain = Grib2Builder::new().with_values(vec![1.0, 3.0, 3.0]).build();
        // One bitmap byte added, one packed value (2 bytes) fewer.
        assert_eq!(data.len() + 1, plain.len());
    }
}
