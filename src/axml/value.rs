use crate::axml::cursor::Cursor;
use crate::axml::error::AxmlResult;
use crate::axml::string_pool::StringPool;

pub(crate) const TYPE_NULL: u8 = 0x00;
pub(crate) const TYPE_STRING: u8 = 0x03;
pub(crate) const TYPE_FLOAT: u8 = 0x04;
pub(crate) const TYPE_DIMENSION: u8 = 0x05;
pub(crate) const TYPE_FRACTION: u8 = 0x06;
pub(crate) const TYPE_INT_DEC: u8 = 0x10;
pub(crate) const TYPE_INT_HEX: u8 = 0x11;
pub(crate) const TYPE_INT_BOOLEAN: u8 = 0x12;

// Complex values store a signed 24-bit mantissa in the high bits; the radix
// field selects how far the binary point is shifted into it.
const MANTISSA_MULT: f32 = 1.0 / (1 << 8) as f32;
const RADIX_MULTS: [f32; 4] = [
    MANTISSA_MULT,
    MANTISSA_MULT / (1 << 7) as f32,
    MANTISSA_MULT / (1 << 15) as f32,
    MANTISSA_MULT / (1 << 23) as f32,
];

const UNIT_PX: u32 = 0;
const UNIT_DIP: u32 = 1;
const UNIT_SP: u32 = 2;
const UNIT_PT: u32 = 3;
const UNIT_IN: u32 = 4;
const UNIT_MM: u32 = 5;
const UNIT_FRACTION: u32 = 0;
const UNIT_FRACTION_PARENT: u32 = 1;

/// The 8-byte `Res_value` record carried by attributes and CDATA nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResValue {
    pub size: u16,
    pub res0: u8,
    pub data_type: u8,
    pub data: u32,
}

impl ResValue {
    pub(crate) fn read(cursor: &mut Cursor<'_>) -> AxmlResult<ResValue> {
        Ok(ResValue {
            size: cursor.get_u16()?,
            res0: cursor.get_u8()?,
            data_type: cursor.get_u8()?,
            data: cursor.get_u32()?,
        })
    }

    /// Renders the value as attribute text. String values resolve through the
    /// pool; everything else is formatted from `data` alone. Unrecognised
    /// types render as `type<N>/<data>` so no record is silently dropped.
    pub fn format(&self, strings: &StringPool) -> AxmlResult<String> {
        let text = match self.data_type {
            TYPE_NULL => "null".to_string(),
            TYPE_STRING => strings.require(self.data)?.to_string(),
            TYPE_FLOAT => f32::from_bits(self.data).to_string(),
            TYPE_DIMENSION => {
                let unit = match self.data & 0xF {
                    UNIT_PX => "px",
                    UNIT_DIP => "dip",
                    UNIT_SP => "sp",
                    UNIT_PT => "pt",
                    UNIT_IN => "in",
                    UNIT_MM => "mm",
                    _ => "",
                };
                format!("{}{}", complex_value(self.data), unit)
            }
            TYPE_FRACTION => {
                let unit = match self.data & 0xF {
                    UNIT_FRACTION => "%",
                    UNIT_FRACTION_PARENT => "%p",
                    _ => "",
                };
                format!("{}{}", complex_value(self.data) * 100.0, unit)
            }
            TYPE_INT_DEC => self.data.to_string(),
            TYPE_INT_HEX => format!("0x{:x}", self.data),
            TYPE_INT_BOOLEAN => {
                if self.data != 0 {
                    "true".to_string()
                } else {
                    "false".to_string()
                }
            }
            other => format!("type{}/{}", other, self.data),
        };
        Ok(text)
    }
}

fn complex_value(data: u32) -> f32 {
    let mantissa = (data & 0xFFFF_FF00) as i32;
    mantissa as f32 * RADIX_MULTS[((data >> 4) & 0x3) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(data_type: u8, data: u32) -> ResValue {
        ResValue {
            size: 8,
            res0: 0,
            data_type,
            data,
        }
    }

    fn format(data_type: u8, data: u32) -> String {
        value(data_type, data).format(&StringPool::empty()).unwrap()
    }

    #[test]
    fn null_and_booleans() {
        assert_eq!(format(TYPE_NULL, 0), "null");
        assert_eq!(format(TYPE_INT_BOOLEAN, 0), "false");
        assert_eq!(format(TYPE_INT_BOOLEAN, 1), "true");
        assert_eq!(format(TYPE_INT_BOOLEAN, 0xFFFF_FFFF), "true");
    }

    #[test]
    fn integers() {
        assert_eq!(format(TYPE_INT_DEC, 42), "42");
        assert_eq!(format(TYPE_INT_DEC, 0), "0");
        assert_eq!(format(TYPE_INT_HEX, 0x7F04_0001), "0x7f040001");
    }

    #[test]
    fn floats() {
        assert_eq!(format(TYPE_FLOAT, 1.5f32.to_bits()), "1.5");
        assert_eq!(format(TYPE_FLOAT, 0.0f32.to_bits()), "0");
    }

    #[test]
    fn dimensions() {
        // Mantissa 0x1400 = 5120, radix 0, unit dip: 5120 / 256 = 20.
        assert_eq!(format(TYPE_DIMENSION, 0x0000_1401), "20dip");
        assert_eq!(format(TYPE_DIMENSION, 0x0000_1400), "20px");
        assert_eq!(format(TYPE_DIMENSION, 0x0000_1402), "20sp");
    }

    #[test]
    fn negative_dimension() {
        // Mantissa -256 (0xFFFFFF00), radix 0: -256 / 256 = -1.
        assert_eq!(format(TYPE_DIMENSION, 0xFFFF_FF00), "-1px");
    }

    #[test]
    fn fractions() {
        // Mantissa 0x4000, radix 1: 16384 / 32768 = 0.5, printed as 50.
        assert_eq!(format(TYPE_FRACTION, 0x0000_4010), "50%");
        assert_eq!(format(TYPE_FRACTION, 0x0000_4011), "50%p");
    }

    #[test]
    fn string_values_resolve_through_the_pool() {
        let result = value(TYPE_STRING, 0).format(&StringPool::empty());
        assert!(result.is_err());
    }

    #[test]
    fn unknown_types_fall_through() {
        assert_eq!(format(0x1C, 7), "type28/7");
        assert_eq!(format(0x01, 0x7F04_0001), "type1/2130968577");
    }
}
