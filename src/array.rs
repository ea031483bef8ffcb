//! Typed attribute arrays and the type erased [IDataArray].
//!
//! An array stores `num_tuples * num_components` values in tuple-major order. During preflight
//! arrays are created unallocated: they carry their declared shape but hold no values.

use ndarray::prelude::*;

use crate::error::SimplError;
use crate::models::DType;
use crate::operation::Element;
use crate::types::DValue;

/// A named, typed array of tuples.
#[derive(Clone, Debug, PartialEq)]
pub struct DataArray<T: Element> {
    name: String,
    num_tuples: usize,
    component_dims: Vec<usize>,
    allocated: bool,
    data: Vec<T>,
}

impl<T: Element> DataArray<T> {
    /// Return a new DataArray.
    ///
    /// # Arguments
    ///
    /// * `name`: Name of the array
    /// * `num_tuples`: Number of tuples
    /// * `component_dims`: Shape of a single tuple. Its product is the component count.
    /// * `allocate`: Whether to allocate zero initialised storage
    pub fn new(
        name: impl Into<String>,
        num_tuples: usize,
        component_dims: Vec<usize>,
        allocate: bool,
    ) -> Self {
        let mut array = DataArray {
            name: name.into(),
            num_tuples,
            component_dims,
            allocated: false,
            data: vec![],
        };
        if allocate {
            array.allocate();
        }
        array
    }

    /// Build an allocated array from existing values.
    ///
    /// The number of values must be a multiple of the component count.
    pub fn from_vec(
        name: impl Into<String>,
        data: Vec<T>,
        component_dims: Vec<usize>,
    ) -> Result<Self, SimplError> {
        let name = name.into();
        let num_components: usize = component_dims.iter().product();
        if num_components == 0 || data.len() % num_components != 0 {
            return Err(SimplError::TupleCountMismatch {
                name,
                expected: num_components,
                actual: data.len(),
            });
        }
        Ok(DataArray {
            name,
            num_tuples: data.len() / num_components,
            component_dims,
            allocated: true,
            data,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn num_tuples(&self) -> usize {
        self.num_tuples
    }

    pub fn component_dims(&self) -> &[usize] {
        &self.component_dims
    }

    pub fn num_components(&self) -> usize {
        self.component_dims.iter().product()
    }

    /// Declared number of values, whether or not storage is allocated.
    pub fn size(&self) -> usize {
        self.num_tuples * self.num_components()
    }

    pub fn is_allocated(&self) -> bool {
        self.allocated
    }

    /// Allocate zero initialised storage for the declared shape.
    pub fn allocate(&mut self) {
        self.data = vec![T::default(); self.size()];
        self.allocated = true;
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Value at flat index `index`, if allocated and in bounds.
    pub fn value(&self, index: usize) -> Option<T> {
        self.data.get(index).copied()
    }

    /// Components of tuple `index`.
    pub fn tuple(&self, index: usize) -> Option<&[T]> {
        let n = self.num_components();
        self.data.get(index * n..(index + 1) * n)
    }

    fn check_tuple(&self, index: usize) -> Result<(), SimplError> {
        if !self.allocated || index >= self.num_tuples {
            return Err(SimplError::TupleOutOfBounds {
                name: self.name.clone(),
                index,
                num_tuples: if self.allocated { self.num_tuples } else { 0 },
            });
        }
        Ok(())
    }

    pub fn initialize_with_zeros(&mut self) {
        self.initialize_with_value(T::default());
    }

    /// Set every value. Allocates if necessary.
    pub fn initialize_with_value(&mut self, value: T) {
        if !self.allocated {
            self.allocate();
        }
        self.data.fill(value);
    }

    /// Set every component of tuple `index` to `value`.
    pub fn initialize_tuple(&mut self, index: usize, value: T) -> Result<(), SimplError> {
        self.check_tuple(index)?;
        let n = self.num_components();
        self.data[index * n..(index + 1) * n].fill(value);
        Ok(())
    }

    /// Copy tuple `src_tuple` of `src` into tuple `dest_tuple` of this array.
    ///
    /// Both arrays must have the same component count.
    pub fn copy_tuple(
        &mut self,
        dest_tuple: usize,
        src: &DataArray<T>,
        src_tuple: usize,
    ) -> Result<(), SimplError> {
        self.check_tuple(dest_tuple)?;
        src.check_tuple(src_tuple)?;
        let n = self.num_components();
        if src.num_components() != n {
            return Err(SimplError::TupleCountMismatch {
                name: src.name.clone(),
                expected: n,
                actual: src.num_components(),
            });
        }
        self.data[dest_tuple * n..(dest_tuple + 1) * n]
            .copy_from_slice(&src.data[src_tuple * n..(src_tuple + 1) * n]);
        Ok(())
    }

    /// Change the number of tuples, keeping existing values and zero filling new ones.
    pub(crate) fn resize_tuples(&mut self, num_tuples: usize) {
        self.num_tuples = num_tuples;
        if self.allocated {
            let size = self.size();
            self.data.resize(size, T::default());
        }
    }

    /// Returns a 2D view of shape `(num_tuples, num_components)`.
    pub fn view(&self) -> Result<ArrayView2<T>, SimplError> {
        Ok(ArrayView2::from_shape(
            (self.num_tuples, self.num_components()),
            &self.data,
        )?)
    }

    /// Returns a mutable 2D view of shape `(num_tuples, num_components)`.
    pub fn view_mut(&mut self) -> Result<ArrayViewMut2<T>, SimplError> {
        let shape = (self.num_tuples, self.num_components());
        Ok(ArrayViewMut2::from_shape(shape, &mut self.data)?)
    }

    /// Copy this array, optionally dropping its values.
    pub fn deep_copy(&self, force_no_allocate: bool) -> Self {
        if force_no_allocate {
            DataArray::new(
                self.name.clone(),
                self.num_tuples,
                self.component_dims.clone(),
                false,
            )
        } else {
            self.clone()
        }
    }
}

/// Applies `$body` to the typed array inside an [IDataArray], whatever its element type.
macro_rules! with_array {
    ($array:expr, $a:ident => $body:expr) => {
        match $array {
            IDataArray::Int8($a) => $body,
            IDataArray::Int16($a) => $body,
            IDataArray::Int32($a) => $body,
            IDataArray::Int64($a) => $body,
            IDataArray::Uint8($a) => $body,
            IDataArray::Uint16($a) => $body,
            IDataArray::Uint32($a) => $body,
            IDataArray::Uint64($a) => $body,
            IDataArray::Float32($a) => $body,
            IDataArray::Float64($a) => $body,
            IDataArray::Bool($a) => $body,
        }
    };
}

/// A type erased attribute array.
///
/// This is a closed set: every supported element type has exactly one variant.
#[derive(Clone, Debug, PartialEq)]
pub enum IDataArray {
    Int8(DataArray<i8>),
    Int16(DataArray<i16>),
    Int32(DataArray<i32>),
    Int64(DataArray<i64>),
    Uint8(DataArray<u8>),
    Uint16(DataArray<u16>),
    Uint32(DataArray<u32>),
    Uint64(DataArray<u64>),
    Float32(DataArray<f32>),
    Float64(DataArray<f64>),
    Bool(DataArray<bool>),
}

struct NewArray {
    name: String,
    num_tuples: usize,
    component_dims: Vec<usize>,
    allocate: bool,
}

impl crate::operation::ElementOperation for NewArray {
    type Output = IDataArray;

    fn execute_t<T: Element>(self) -> IDataArray {
        T::wrap(DataArray::<T>::new(
            self.name,
            self.num_tuples,
            self.component_dims,
            self.allocate,
        ))
    }
}

impl IDataArray {
    /// Return a new array of element type `dtype`.
    pub fn new(
        dtype: DType,
        name: impl Into<String>,
        num_tuples: usize,
        component_dims: Vec<usize>,
        allocate: bool,
    ) -> Self {
        use crate::operation::Operation;
        NewArray {
            name: name.into(),
            num_tuples,
            component_dims,
            allocate,
        }
        .execute(dtype)
    }

    pub fn name(&self) -> &str {
        with_array!(self, a => a.name())
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        with_array!(self, a => a.set_name(name))
    }

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

    /// C type name of the elements, e.g. `int32_t`.
    pub fn type_name(&self) -> String {
        self.dtype().type_name()
    }

    pub fn num_tuples(&self) -> usize {
        with_array!(self, a => a.num_tuples())
    }

    pub fn num_components(&self) -> usize {
        with_array!(self, a => a.num_components())
    }

    pub fn component_dims(&self) -> &[usize] {
        with_array!(self, a => a.component_dims())
    }

    pub fn size(&self) -> usize {
        with_array!(self, a => a.size())
    }

    pub fn is_allocated(&self) -> bool {
        with_array!(self, a => a.is_allocated())
    }

    pub fn allocate(&mut self) {
        with_array!(self, a => a.allocate())
    }

    pub fn initialize_with_zeros(&mut self) {
        with_array!(self, a => a.initialize_with_zeros())
    }

    /// Set every component of tuple `index` to `value`.
    ///
    /// The value's tag must match the element type of the array.
    pub fn initialize_tuple(&mut self, index: usize, value: DValue) -> Result<(), SimplError> {
        use crate::types::dvalue::TryFromDValue;
        fn init<T: Element>(
            array: &mut DataArray<T>,
            index: usize,
            value: DValue,
        ) -> Result<(), SimplError> {
            array.initialize_tuple(index, T::try_from_dvalue(value)?)
        }
        with_array!(self, a => init(a, index, value))
    }

    /// Value at flat index `index` as a tagged scalar.
    pub fn value(&self, index: usize) -> Option<DValue> {
        with_array!(self, a => a.value(index).map(Into::into))
    }

    /// Copy one tuple from `src`, which must have the same element type.
    pub fn copy_tuple_from(
        &mut self,
        dest_tuple: usize,
        src: &IDataArray,
        src_tuple: usize,
    ) -> Result<(), SimplError> {
        fn copy<T: Element>(
            dest: &mut DataArray<T>,
            dest_tuple: usize,
            src: &IDataArray,
            src_tuple: usize,
        ) -> Result<(), SimplError> {
            let src = T::downcast(src).ok_or(SimplError::TypeMismatch {
                expected: T::DTYPE,
                actual: src.dtype(),
            })?;
            dest.copy_tuple(dest_tuple, src, src_tuple)
        }
        with_array!(self, a => copy(a, dest_tuple, src, src_tuple))
    }

    pub(crate) fn resize_tuples(&mut self, num_tuples: usize) {
        with_array!(self, a => a.resize_tuples(num_tuples))
    }

    /// Create an array of the same element type with a new shape and name.
    pub fn create_new_array(
        &self,
        num_tuples: usize,
        component_dims: Vec<usize>,
        name: impl Into<String>,
        allocate: bool,
    ) -> IDataArray {
        IDataArray::new(self.dtype(), name, num_tuples, component_dims, allocate)
    }

    /// Copy this array, optionally dropping its values.
    pub fn deep_copy(&self, force_no_allocate: bool) -> IDataArray {
        with_array!(self, a => IDataArray::from(a.deep_copy(force_no_allocate)))
    }

    /// Borrow the typed array, if it holds elements of type `T`.
    pub fn as_typed<T: Element>(&self) -> Option<&DataArray<T>> {
        T::downcast(self)
    }

    /// Mutably borrow the typed array, if it holds elements of type `T`.
    pub fn as_typed_mut<T: Element>(&mut self) -> Option<&mut DataArray<T>> {
        T::downcast_mut(self)
    }
}

impl<T: Element> From<DataArray<T>> for IDataArray {
    fn from(array: DataArray<T>) -> Self {
        T::wrap(array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_allocated_is_zeroed() {
        let array = DataArray::<i32>::new("Phases", 4, vec![3], true);
        assert!(array.is_allocated());
        assert_eq!(12, array.size());
        assert_eq!(vec![0; 12], array.as_slice());
    }

    #[test]
    fn new_unallocated_keeps_shape() {
        let array = IDataArray::new(DType::Float32, "Euler", 10, vec![3], false);
        assert!(!array.is_allocated());
        assert_eq!(10, array.num_tuples());
        assert_eq!(3, array.num_components());
        assert_eq!(30, array.size());
        assert_eq!(None, array.value(0));
    }

    #[test]
    fn multi_dimensional_components() {
        let array = IDataArray::new(DType::Uint8, "Rgb", 2, vec![2, 3], true);
        assert_eq!(6, array.num_components());
        assert_eq!(&[2, 3], array.component_dims());
    }

    #[test]
    fn initialize_tuple_writes_every_component() {
        let mut array = IDataArray::new(DType::Int16, "A", 3, vec![2], true);
        array.initialize_tuple(1, DValue::Int16(-7)).unwrap();
        let typed = array.as_typed::<i16>().unwrap();
        assert_eq!(&[0, 0, -7, -7, 0, 0], typed.as_slice());
    }

    #[test]
    fn initialize_tuple_rejects_mismatched_tag() {
        let mut array = IDataArray::new(DType::Int16, "A", 3, vec![1], true);
        let result = array.initialize_tuple(0, DValue::Float64(1.0));
        assert!(matches!(result, Err(SimplError::IncompatibleValue { .. })));
    }

    #[test]
    fn initialize_tuple_out_of_bounds() {
        let mut array = IDataArray::new(DType::Bool, "Mask", 2, vec![1], true);
        assert!(matches!(
            array.initialize_tuple(2, DValue::Bool(true)),
            Err(SimplError::TupleOutOfBounds { .. })
        ));
    }

    #[test]
    fn type_names() {
        let array = IDataArray::new(DType::Uint64, "A", 1, vec![1], false);
        assert_eq!("uint64_t", array.type_name());
        let array: IDataArray = DataArray::<bool>::new("B", 1, vec![1], false).into();
        assert_eq!("bool", array.type_name());
    }

    #[test]
    fn copy_tuple_from_same_type() {
        let src = DataArray::from_vec("src", vec![1.0f64, 2.0, 3.0, 4.0], vec![2]).unwrap();
        let src: IDataArray = src.into();
        let mut dest = src.create_new_array(3, vec![2], "dest", true);
        dest.copy_tuple_from(2, &src, 1).unwrap();
        assert_eq!(
            &[0.0, 0.0, 0.0, 0.0, 3.0, 4.0],
            dest.as_typed::<f64>().unwrap().as_slice()
        );
    }

    #[test]
    fn copy_tuple_from_other_type_fails() {
        let src = IDataArray::new(DType::Int8, "src", 1, vec![1], true);
        let mut dest = IDataArray::new(DType::Uint8, "dest", 1, vec![1], true);
        assert!(matches!(
            dest.copy_tuple_from(0, &src, 0),
            Err(SimplError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn resize_keeps_values() {
        let mut array = DataArray::from_vec("A", vec![1u16, 2, 3], vec![1]).unwrap();
        array.resize_tuples(5);
        assert_eq!(&[1, 2, 3, 0, 0], array.as_slice());
        array.resize_tuples(2);
        assert_eq!(&[1, 2], array.as_slice());
    }

    #[test]
    fn deep_copy_force_no_allocate() {
        let array = IDataArray::new(DType::Int64, "A", 4, vec![1], true);
        let copy = array.deep_copy(true);
        assert!(!copy.is_allocated());
        assert_eq!(4, copy.num_tuples());
        assert_eq!(array, array.deep_copy(false));
    }

    #[test]
    fn view_shape() {
        let array = DataArray::from_vec("A", (0..6).collect::<Vec<i32>>(), vec![3]).unwrap();
        let view = array.view().unwrap();
        assert_eq!(&[2, 3], view.shape());
        assert_eq!(5, view[[1, 2]]);
    }

    #[test]
    fn view_unallocated_fails() {
        let array = DataArray::<f32>::new("A", 2, vec![1], false);
        assert!(matches!(array.view(), Err(SimplError::ShapeInvalid(_))));
    }

    #[test]
    fn from_vec_rejects_partial_tuple() {
        assert!(DataArray::from_vec("A", vec![1u8, 2, 3], vec![2]).is_err());
    }
}
