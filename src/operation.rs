use rand::distributions::uniform::SampleUniform;
use rand::Rng;

use crate::array::{DataArray, IDataArray};
use crate::models::DType;
use crate::types::dvalue::TryFromDValue;
use crate::types::DValue;

/// Trait for array elements.
///
/// Implemented for every supported element type, including `bool`. The `f64` helpers give a
/// common currency for range checks of user supplied values, which always arrive as `f64`.
pub trait Element:
    Clone
    + Copy
    + Default
    + PartialEq
    + PartialOrd
    + std::fmt::Debug
    + Send
    + Sync
    + 'static
    + TryFromDValue
    + Into<DValue>
{
    /// Runtime tag of the element type.
    const DTYPE: DType;

    /// Lowest finite value.
    fn lowest() -> Self;

    /// Highest finite value.
    fn highest() -> Self;

    /// Smallest positive normal value for floats, one for integers.
    fn min_positive() -> Self;

    /// Widen to f64.
    fn to_f64(self) -> f64;

    /// Narrow from f64 with `as` cast semantics. Callers range check first.
    fn from_f64(value: f64) -> Self;

    /// Draw a uniformly distributed value from the closed interval `[low, high]`.
    fn random_in<R: Rng + ?Sized>(rng: &mut R, low: Self, high: Self) -> Self;

    /// Borrow the typed array if `array` holds this element type.
    fn downcast(array: &IDataArray) -> Option<&DataArray<Self>>;

    /// Mutably borrow the typed array if `array` holds this element type.
    fn downcast_mut(array: &mut IDataArray) -> Option<&mut DataArray<Self>>;

    /// Wrap a typed array in the type erased container.
    fn wrap(array: DataArray<Self>) -> IDataArray;
}

fn random_int<T, R>(rng: &mut R, low: T, high: T) -> T
where
    T: SampleUniform + PartialOrd + Copy,
    R: Rng + ?Sized,
{
    if low >= high {
        return low;
    }
    rng.gen_range(low..=high)
}

fn random_float<T, R>(rng: &mut R, low: T, high: T) -> T
where
    T: SampleUniform + num_traits::Float,
    R: Rng + ?Sized,
{
    if low >= high {
        return low;
    }
    if (high - low).is_finite() {
        return rng.gen_range(low..=high);
    }
    // Span overflows, so sample in half scale and scale back up.
    let two = T::one() + T::one();
    let half = rng.gen_range(low / two..=high / two);
    (half * two).max(low).min(high)
}

macro_rules! impl_element {
    ($t:ty, $variant:ident, $min_positive:expr, $random:ident) => {
        impl Element for $t {
            const DTYPE: DType = DType::$variant;

            fn lowest() -> Self {
                <$t as num_traits::Bounded>::min_value()
            }

            fn highest() -> Self {
                <$t as num_traits::Bounded>::max_value()
            }

            fn min_positive() -> Self {
                $min_positive
            }

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn from_f64(value: f64) -> Self {
                value as $t
            }

            fn random_in<R: Rng + ?Sized>(rng: &mut R, low: Self, high: Self) -> Self {
                $random(rng, low, high)
            }

            fn downcast(array: &IDataArray) -> Option<&DataArray<Self>> {
                match array {
                    IDataArray::$variant(a) => Some(a),
                    _ => None,
                }
            }

            fn downcast_mut(array: &mut IDataArray) -> Option<&mut DataArray<Self>> {
                match array {
                    IDataArray::$variant(a) => Some(a),
                    _ => None,
                }
            }

            fn wrap(array: DataArray<Self>) -> IDataArray {
                IDataArray::$variant(array)
            }
        }
    };
}

impl_element!(i8, Int8, 1, random_int);
impl_element!(i16, Int16, 1, random_int);
impl_element!(i32, Int32, 1, random_int);
impl_element!(i64, Int64, 1, random_int);
impl_element!(u8, Uint8, 1, random_int);
impl_element!(u16, Uint16, 1, random_int);
impl_element!(u32, Uint32, 1, random_int);
impl_element!(u64, Uint64, 1, random_int);
impl_element!(f32, Float32, f32::MIN_POSITIVE, random_float);
impl_element!(f64, Float64, f64::MIN_POSITIVE, random_float);

impl Element for bool {
    const DTYPE: DType = DType::Bool;

    fn lowest() -> Self {
        false
    }

    fn highest() -> Self {
        true
    }

    fn min_positive() -> Self {
        true
    }

    fn to_f64(self) -> f64 {
        f64::from(u8::from(self))
    }

    fn from_f64(value: f64) -> Self {
        value != 0.0
    }

    fn random_in<R: Rng + ?Sized>(rng: &mut R, low: Self, high: Self) -> Self {
        if low == high {
            return low;
        }
        rng.gen_bool(0.5)
    }

    fn downcast(array: &IDataArray) -> Option<&DataArray<Self>> {
        match array {
            IDataArray::Bool(a) => Some(a),
            _ => None,
        }
    }

    fn downcast_mut(array: &mut IDataArray) -> Option<&mut DataArray<Self>> {
        match array {
            IDataArray::Bool(a) => Some(a),
            _ => None,
        }
    }

    fn wrap(array: DataArray<Self>) -> IDataArray {
        IDataArray::Bool(array)
    }
}

/// Trait for operations selected by a runtime element type.
///
/// This forms the contract between type erased callers and generic algorithm bodies.
pub trait Operation {
    type Output;

    /// Execute the operation for the element type `dtype`.
    fn execute(self, dtype: DType) -> Self::Output;
}

/// Trait for operations written once for every element type.
///
/// This trait provides an entry point into the type system based on the runtime `dtype` value.
pub trait ElementOperation {
    type Output;

    fn execute_t<T: Element>(self) -> Self::Output;
}

impl<O: ElementOperation> Operation for O {
    type Output = O::Output;

    /// Execute the operation.
    ///
    /// This method dispatches to `execute_t` based on the `dtype`.
    fn execute(self, dtype: DType) -> Self::Output {
        // Convert runtime data type into concrete types.
        match dtype {
            DType::Int8 => self.execute_t::<i8>(),
            DType::Int16 => self.execute_t::<i16>(),
            DType::Int32 => self.execute_t::<i32>(),
            DType::Int64 => self.execute_t::<i64>(),
            DType::Uint8 => self.execute_t::<u8>(),
            DType::Uint16 => self.execute_t::<u16>(),
            DType::Uint32 => self.execute_t::<u32>(),
            DType::Uint64 => self.execute_t::<u64>(),
            DType::Float32 => self.execute_t::<f32>(),
            DType::Float64 => self.execute_t::<f64>(),
            DType::Bool => self.execute_t::<bool>(),
        }
    }
}
