pub mod dvalue;
pub mod range;
pub mod small_vec;

// Re-export types for convenience.
pub use crate::types::dvalue::DValue;
pub use crate::types::range::{Range, Range2D, Range3D, RangeError};
pub use crate::types::small_vec::{
    FloatVec3, FloatVec6, IVec2, IVec3, IVec4, IVec5, IVec6, IVec7, IntVec3, SizeVec2, SizeVec3,
    SmallVec,
};
