//! Attribute matrices: named groups of arrays that share one tuple shape.

use std::sync::Arc;

use crate::array::IDataArray;
use crate::error::SimplError;
use crate::models::AttributeMatrixType;

/// A named collection of arrays that all have the same number of tuples.
///
/// Arrays are reference counted so that copies of a data structure share storage until one side
/// writes to an array.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeMatrix {
    name: String,
    matrix_type: AttributeMatrixType,
    tuple_dims: Vec<usize>,
    arrays: Vec<Arc<IDataArray>>,
}

impl AttributeMatrix {
    /// Return a new, empty AttributeMatrix.
    pub fn new(
        tuple_dims: Vec<usize>,
        name: impl Into<String>,
        matrix_type: AttributeMatrixType,
    ) -> Self {
        AttributeMatrix {
            name: name.into(),
            matrix_type,
            tuple_dims,
            arrays: vec![],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn matrix_type(&self) -> AttributeMatrixType {
        self.matrix_type
    }

    pub fn set_matrix_type(&mut self, matrix_type: AttributeMatrixType) {
        self.matrix_type = matrix_type;
    }

    pub fn tuple_dims(&self) -> &[usize] {
        &self.tuple_dims
    }

    /// Number of tuples every array in the matrix has.
    pub fn num_tuples(&self) -> usize {
        self.tuple_dims.iter().product()
    }

    /// Change the tuple shape and resize every array to match.
    pub fn resize_attribute_arrays(&mut self, tuple_dims: Vec<usize>) {
        self.tuple_dims = tuple_dims;
        let num_tuples = self.num_tuples();
        for array in self.arrays.iter_mut() {
            Arc::make_mut(array).resize_tuples(num_tuples);
        }
    }

    /// Add an array, replacing any array with the same name.
    ///
    /// The array's tuple count must equal the matrix's.
    pub fn insert_or_assign(&mut self, array: IDataArray) -> Result<(), SimplError> {
        if array.num_tuples() != self.num_tuples() {
            return Err(SimplError::TupleCountMismatch {
                name: array.name().to_string(),
                expected: self.num_tuples(),
                actual: array.num_tuples(),
            });
        }
        let array = Arc::new(array);
        match self.position(array.name()) {
            Some(i) => self.arrays[i] = array,
            None => self.arrays.push(array),
        }
        Ok(())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.arrays.iter().position(|a| a.name() == name)
    }

    pub fn does_attribute_array_exist(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn get_attribute_array(&self, name: &str) -> Option<&IDataArray> {
        self.position(name).map(|i| self.arrays[i].as_ref())
    }

    /// Shared handle to an array, for readers that outlive a borrow of the matrix.
    pub fn get_shared_attribute_array(&self, name: &str) -> Option<Arc<IDataArray>> {
        self.position(name).map(|i| self.arrays[i].clone())
    }

    /// Mutable access to an array. Storage shared with a copy is cloned first.
    pub fn get_attribute_array_mut(&mut self, name: &str) -> Option<&mut IDataArray> {
        let i = self.position(name)?;
        Some(Arc::make_mut(&mut self.arrays[i]))
    }

    pub fn remove_attribute_array(&mut self, name: &str) -> Option<IDataArray> {
        let i = self.position(name)?;
        let array = self.arrays.remove(i);
        Some(Arc::try_unwrap(array).unwrap_or_else(|shared| (*shared).clone()))
    }

    /// Rename an array. Fails if `old` is missing or `new` is taken.
    pub fn rename_attribute_array(&mut self, old: &str, new: &str) -> bool {
        if self.position(new).is_some() {
            return false;
        }
        match self.get_attribute_array_mut(old) {
            Some(array) => {
                array.set_name(new);
                true
            }
            None => false,
        }
    }

    /// Array names in insertion order.
    pub fn attribute_array_names(&self) -> Vec<String> {
        self.arrays.iter().map(|a| a.name().to_string()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IDataArray> {
        self.arrays.iter().map(|a| a.as_ref())
    }

    /// Whether every array has the matrix's tuple count.
    pub fn validate_attribute_array_sizes(&self) -> bool {
        let n = self.num_tuples();
        self.arrays.iter().all(|a| a.num_tuples() == n)
    }

    /// Copy the matrix. With `force_no_allocate` the arrays keep their shape but drop values.
    pub fn deep_copy(&self, force_no_allocate: bool) -> Self {
        let arrays = if force_no_allocate {
            self.arrays
                .iter()
                .map(|a| Arc::new(a.deep_copy(true)))
                .collect()
        } else {
            self.arrays.clone()
        };
        AttributeMatrix {
            name: self.name.clone(),
            matrix_type: self.matrix_type,
            tuple_dims: self.tuple_dims.clone(),
            arrays,
        }
    }

    /// Summary of the matrix for display.
    pub fn info_string(&self) -> String {
        format!(
            "Attribute Matrix {} ({}): tuple dims {:?}, {} arrays",
            self.name,
            self.matrix_type,
            self.tuple_dims,
            self.arrays.len()
        )
    }
}
