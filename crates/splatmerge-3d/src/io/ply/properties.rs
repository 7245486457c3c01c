use super::PlyError;

/// Numeric type of a single PLY property.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PlyDataType {
    /// 32-bit IEEE float (`float` / `float32`).
    Float32,
    /// 64-bit IEEE float (`double` / `float64`).
    Float64,
    /// 8-bit unsigned integer (`uchar` / `uint8`).
    UInt8,
    /// 32-bit unsigned integer (`uint` / `uint32`).
    UInt32,
}

impl PlyDataType {
    /// Size in bytes of one value of this type.
    pub fn size(&self) -> usize {
        match self {
            PlyDataType::Float32 | PlyDataType::UInt32 => 4,
            PlyDataType::Float64 => 8,
            PlyDataType::UInt8 => 1,
        }
    }

    /// Parse a header type token.
    pub fn from_token(token: &str) -> Result<Self, PlyError> {
        match token {
            "float" | "float32" => Ok(PlyDataType::Float32),
            "double" | "float64" => Ok(PlyDataType::Float64),
            "uchar" | "uint8" => Ok(PlyDataType::UInt8),
            "uint" | "uint32" => Ok(PlyDataType::UInt32),
            _ => Err(PlyError::UnknownPropertyType(token.to_string())),
        }
    }

    /// Decode one little-endian value from the start of `buf`.
    ///
    /// All values are widened to `f64`. `buf` must hold at least
    /// `self.size()` bytes; a shorter buffer panics on the out-of-range
    /// index instead of decoding garbage.
    pub fn read_le(&self, buf: &[u8]) -> f64 {
        match self {
            PlyDataType::Float32 => {
                f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f64
            }
            PlyDataType::Float64 => f64::from_le_bytes([
                buf[0], buf[1], buf[2], buf[3], buf[4], buf[5], buf[6], buf[7],
            ]),
            PlyDataType::UInt8 => buf[0] as f64,
            PlyDataType::UInt32 => {
                u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f64
            }
        }
    }
}

/// One property declaration from a PLY header.
#[derive(Debug, PartialEq, Clone)]
pub struct PlyPropertyDefinition {
    /// Logical name of the property, e.g. `x` or `opacity`.
    pub name: String,
    /// Numeric type of the binary values.
    pub data_type: PlyDataType,
}

/// Size in bytes of one binary record under the given schema.
pub fn record_size(schema: &[PlyPropertyDefinition]) -> usize {
    schema.iter().map(|p| p.data_type.size()).sum()
}
