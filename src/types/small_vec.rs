//! Fixed length vectors
//!
//! [SmallVec] is a value type holding exactly `N` elements. Dimensions, spacings, origins and
//! grid positions are all expressed with it.

use std::fmt;
use std::ops::{Index, IndexMut};

use serde::de::{Deserialize, Deserializer, Error as _};
use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::types::range::RangeError;

/// A fixed length sequence of `N` values.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SmallVec<T, const N: usize> {
    data: [T; N],
}

pub type IVec2<T> = SmallVec<T, 2>;
pub type IVec3<T> = SmallVec<T, 3>;
pub type IVec4<T> = SmallVec<T, 4>;
pub type IVec5<T> = SmallVec<T, 5>;
pub type IVec6<T> = SmallVec<T, 6>;
pub type IVec7<T> = SmallVec<T, 7>;

pub type SizeVec2 = IVec2<usize>;
pub type SizeVec3 = IVec3<usize>;
pub type IntVec3 = IVec3<i32>;
pub type FloatVec3 = IVec3<f32>;
pub type FloatVec6 = IVec6<f32>;

impl<T, const N: usize> SmallVec<T, N> {
    /// Return a new SmallVec holding `data`.
    pub const fn new(data: [T; N]) -> Self {
        SmallVec { data }
    }

    /// Number of elements. Always `N`.
    pub const fn size(&self) -> usize {
        N
    }

    /// Bounds checked element access.
    pub fn at(&self, index: usize) -> Result<&T, RangeError> {
        self.data.get(index).ok_or(RangeError::new(index, N))
    }

    /// Bounds checked mutable element access.
    pub fn at_mut(&mut self, index: usize) -> Result<&mut T, RangeError> {
        self.data.get_mut(index).ok_or(RangeError::new(index, N))
    }

    /// Bounds checked element assignment.
    pub fn set_value(&mut self, index: usize, value: T) -> Result<(), RangeError> {
        *self.at_mut(index)? = value;
        Ok(())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

impl<T: Copy, const N: usize> SmallVec<T, N> {
    /// Build from a slice whose length must be exactly `N`.
    pub fn from_slice(values: &[T]) -> Result<Self, RangeError> {
        let data: [T; N] = values
            .try_into()
            .map_err(|_| RangeError::new(values.len(), N))?;
        Ok(SmallVec { data })
    }

    /// Copy the elements into a new array.
    pub fn to_array(&self) -> [T; N] {
        self.data
    }

    /// Copy the elements into any collection.
    pub fn to_container<C: FromIterator<T>>(&self) -> C {
        self.data.iter().copied().collect()
    }

    /// Apply `f` to every element.
    pub fn map<U, F: FnMut(T) -> U>(&self, f: F) -> SmallVec<U, N> {
        SmallVec {
            data: self.data.map(f),
        }
    }
}

impl<const N: usize> SmallVec<usize, N> {
    /// Product of the elements, e.g. the number of cells of a dimension vector.
    pub fn product(&self) -> usize {
        self.data.iter().product()
    }

    /// Product of the elements, or `None` if it overflows.
    pub fn checked_product(&self) -> Option<usize> {
        self.data.iter().try_fold(1usize, |acc, v| acc.checked_mul(*v))
    }
}

impl<T: Default + Copy, const N: usize> Default for SmallVec<T, N> {
    fn default() -> Self {
        SmallVec {
            data: [T::default(); N],
        }
    }
}

impl<T: Copy> SmallVec<T, 2> {
    pub fn x(&self) -> T {
        self.data[0]
    }

    pub fn y(&self) -> T {
        self.data[1]
    }
}

impl<T: Copy> SmallVec<T, 3> {
    pub fn x(&self) -> T {
        self.data[0]
    }

    pub fn y(&self) -> T {
        self.data[1]
    }

    pub fn z(&self) -> T {
        self.data[2]
    }
}

impl<T: Copy> SmallVec<T, 4> {
    pub fn x(&self) -> T {
        self.data[0]
    }

    pub fn y(&self) -> T {
        self.data[1]
    }

    pub fn z(&self) -> T {
        self.data[2]
    }

    pub fn w(&self) -> T {
        self.data[3]
    }
}

impl<T, const N: usize> Index<usize> for SmallVec<T, N> {
    type Output = T;

    /// Unchecked in the API sense: panics on an out of range index like a slice does.
    fn index(&self, index: usize) -> &T {
        debug_assert!(index < N, "index {} out of range for size {}", index, N);
        &self.data[index]
    }
}

impl<T, const N: usize> IndexMut<usize> for SmallVec<T, N> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        debug_assert!(index < N, "index {} out of range for size {}", index, N);
        &mut self.data[index]
    }
}

impl<T, const N: usize> From<[T; N]> for SmallVec<T, N> {
    fn from(data: [T; N]) -> Self {
        SmallVec { data }
    }
}

impl<T, const N: usize> From<SmallVec<T, N>> for [T; N] {
    fn from(value: SmallVec<T, N>) -> Self {
        value.data
    }
}

impl<T> From<(T, T)> for SmallVec<T, 2> {
    fn from((x, y): (T, T)) -> Self {
        SmallVec { data: [x, y] }
    }
}

impl<T> From<(T, T, T)> for SmallVec<T, 3> {
    fn from((x, y, z): (T, T, T)) -> Self {
        SmallVec { data: [x, y, z] }
    }
}

impl<'a, T, const N: usize> IntoIterator for &'a SmallVec<T, N> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

impl<T: fmt::Display, const N: usize> fmt::Display for SmallVec<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.data.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, ")")
    }
}

// Serde only provides array impls up to a fixed length, so go via a sequence.
impl<T: Serialize, const N: usize> Serialize for SmallVec<T, N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(N))?;
        for value in &self.data {
            seq.serialize_element(value)?;
        }
        seq.end()
    }
}

impl<'de, T: Deserialize<'de>, const N: usize> Deserialize<'de> for SmallVec<T, N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values = Vec::<T>::deserialize(deserializer)?;
        let len = values.len();
        let data: [T; N] = values
            .try_into()
            .map_err(|_| D::Error::invalid_length(len, &format!("{} elements", N).as_str()))?;
        Ok(SmallVec { data })
    }
}
