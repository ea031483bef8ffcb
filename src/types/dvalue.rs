//! Data value representing a value of any [DType](crate::models::DType)

use serde::{Deserialize, Serialize};

use crate::error::SimplError;
use crate::models::DType;

/// A single scalar of any supported element kind.
///
/// The tag carries the element type, so a value can be checked against the array it is written
/// to instead of being silently reinterpreted.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DValue {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Float32(f32),
    Float64(f64),
    Bool(bool),
}

impl DValue {
    /// Returns the element type of the value.
    pub fn dtype(&self) -> DType {
        match self {
            Self::Int8(_) => DType::Int8,
            Self::Int16(_) => DType::Int16,
            Self::Int32(_) => DType::Int32,
            Self::Int64(_) => DType::Int64,
            Self::Uint8(_) => DType::Uint8,
            Self::Uint16(_) => DType::Uint16,
            Self::Uint32(_) => DType::Uint32,
            Self::Uint64(_) => DType::Uint64,
            Self::Float32(_) => DType::Float32,
            Self::Float64(_) => DType::Float64,
            Self::Bool(_) => DType::Bool,
        }
    }

    /// Returns the value widened to f64. Booleans map to 0 and 1.
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Int8(v) => v as f64,
            Self::Int16(v) => v as f64,
            Self::Int32(v) => v as f64,
            Self::Int64(v) => v as f64,
            Self::Uint8(v) => v as f64,
            Self::Uint16(v) => v as f64,
            Self::Uint32(v) => v as f64,
            Self::Uint64(v) => v as f64,
            Self::Float32(v) => v as f64,
            Self::Float64(v) => v,
            Self::Bool(v) => f64::from(u8::from(v)),
        }
    }

    /// Convert an f64 to a value of the given element type.
    ///
    /// Returns `None` if `value` cannot be represented, e.g. it is out of range for an integer
    /// type or has a fractional part.
    pub fn from_f64(dtype: DType, value: f64) -> Option<DValue> {
        use num_traits::NumCast;
        fn cast<T: NumCast>(value: f64) -> Option<T> {
            if value.fract() != 0.0 {
                return None;
            }
            T::from(value)
        }
        match dtype {
            DType::Int8 => cast(value).map(Self::Int8),
            DType::Int16 => cast(value).map(Self::Int16),
            DType::Int32 => cast(value).map(Self::Int32),
            DType::Int64 => cast(value).map(Self::Int64),
            DType::Uint8 => cast(value).map(Self::Uint8),
            DType::Uint16 => cast(value).map(Self::Uint16),
            DType::Uint32 => cast(value).map(Self::Uint32),
            DType::Uint64 => cast(value).map(Self::Uint64),
            DType::Float32 => {
                // If the number is too large to be represented as an f32 this cast returns
                // infinity.
                let float = value as f32;
                (float.is_finite() || !value.is_finite()).then_some(Self::Float32(float))
            }
            DType::Float64 => Some(Self::Float64(value)),
            DType::Bool => Some(Self::Bool(value != 0.0)),
        }
    }
}

/// Attempt to convert from a [DValue] to a specific element type.
// This trait exists because we can't implement TryFrom<DValue> for primitive types as the trait
// and types are in external crates.
pub trait TryFromDValue: Sized {
    /// Try to convert from a [DValue]. The tag must match the target type exactly.
    fn try_from_dvalue(value: DValue) -> Result<Self, SimplError>;
}

macro_rules! impl_dvalue_conversions {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl TryFromDValue for $t {
                fn try_from_dvalue(value: DValue) -> Result<Self, SimplError> {
                    match value {
                        DValue::$variant(v) => Ok(v),
                        _ => Err(SimplError::IncompatibleValue {
                            value,
                            dtype: DType::$variant,
                        }),
                    }
                }
            }

            impl From<$t> for DValue {
                fn from(value: $t) -> Self {
                    DValue::$variant(value)
                }
            }
        )*
    };
}

impl_dvalue_conversions!(
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => Uint8,
    u16 => Uint16,
    u32 => Uint32,
    u64 => Uint64,
    f32 => Float32,
    f64 => Float64,
    bool => Bool,
);
