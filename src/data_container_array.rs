//! The data container array: registry of every data container and montage a pipeline works on.
//!
//! Besides plain lookups, this module provides the "prereq" and "create" idioms filters use in
//! `data_check`. These never fail loudly. On a problem they record a negative code and a message
//! on the caller's [FilterStatus] and return `None`, and the caller is expected to check
//! `error_code() < 0` before relying on anything it looked up.

use std::sync::Arc;

use crate::array::IDataArray;
use crate::attribute_matrix::AttributeMatrix;
use crate::data_container::DataContainer;
use crate::filter::FilterStatus;
use crate::geometry::{Geometry, ImageGeom};
use crate::models::{AttributeMatrixType, DType, DataArrayPath};
use crate::montage::{GridMontage, MontageId};
use crate::types::SizeVec3;

/// Registry of data containers and montages, in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataContainerArray {
    containers: Vec<DataContainer>,
    montages: Vec<GridMontage>,
}

impl DataContainerArray {
    /// Return a new, empty DataContainerArray.
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.containers.iter().position(|dc| dc.name() == name)
    }

    pub fn get_data_container(&self, name: &str) -> Option<&DataContainer> {
        self.position(name).map(|i| &self.containers[i])
    }

    pub fn get_data_container_mut(&mut self, name: &str) -> Option<&mut DataContainer> {
        self.position(name).map(|i| &mut self.containers[i])
    }

    pub fn does_data_container_exist(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Add a container, replacing any container with the same name.
    pub fn insert_or_assign(&mut self, dc: DataContainer) {
        match self.position(dc.name()) {
            Some(i) => self.containers[i] = dc,
            None => self.containers.push(dc),
        }
    }

    pub fn remove_data_container(&mut self, name: &str) -> Option<DataContainer> {
        self.position(name).map(|i| self.containers.remove(i))
    }

    /// Rename a container and every montage tile referring to it.
    ///
    /// Fails if `old` is missing or `new` is taken.
    pub fn rename_data_container(&mut self, old: &str, new: &str) -> bool {
        if self.does_data_container_exist(new) {
            return false;
        }
        let Some(dc) = self.get_data_container_mut(old) else {
            return false;
        };
        dc.set_name(new);
        for montage in self.montages.iter_mut() {
            let names = montage
                .data_container_names()
                .into_iter()
                .map(|name| match name.as_str() {
                    "" => None,
                    name if name == old => Some(new.to_string()),
                    _ => Some(name),
                })
                .collect();
            montage.set_data_containers(names);
        }
        true
    }

    /// Container names in insertion order.
    pub fn data_container_names(&self) -> Vec<String> {
        self.containers
            .iter()
            .map(|dc| dc.name().to_string())
            .collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DataContainer> {
        self.containers.iter()
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    pub fn get_attribute_matrix(&self, path: &DataArrayPath) -> Option<&AttributeMatrix> {
        self.get_data_container(&path.data_container_name)?
            .get_attribute_matrix(&path.attribute_matrix_name)
    }

    pub fn get_attribute_matrix_mut(
        &mut self,
        path: &DataArrayPath,
    ) -> Option<&mut AttributeMatrix> {
        self.get_data_container_mut(&path.data_container_name)?
            .get_attribute_matrix_mut(&path.attribute_matrix_name)
    }

    pub fn does_attribute_matrix_exist(&self, path: &DataArrayPath) -> bool {
        self.get_attribute_matrix(path).is_some()
    }

    pub fn get_array(&self, path: &DataArrayPath) -> Option<&IDataArray> {
        self.get_attribute_matrix(path)?
            .get_attribute_array(&path.data_array_name)
    }

    /// Shared handle to an array, for readers that need it alongside a mutable borrow.
    pub fn get_shared_array(&self, path: &DataArrayPath) -> Option<Arc<IDataArray>> {
        self.get_attribute_matrix(path)?
            .get_shared_attribute_array(&path.data_array_name)
    }

    pub fn get_array_mut(&mut self, path: &DataArrayPath) -> Option<&mut IDataArray> {
        self.get_attribute_matrix_mut(path)?
            .get_attribute_array_mut(&path.data_array_name)
    }

    pub fn does_attribute_array_exist(&self, path: &DataArrayPath) -> bool {
        self.get_array(path).is_some()
    }

    /// Look up a container a filter requires.
    ///
    /// Records -999 when the container is not available.
    pub fn get_prereq_data_container(
        &self,
        status: &mut FilterStatus,
        name: &str,
    ) -> Option<&DataContainer> {
        let dc = self.get_data_container(name);
        if dc.is_none() {
            status.set_error_condition(
                -999,
                format!(
                    "The DataContainer Object with the specific name '{}' was not available.",
                    name
                ),
            );
        }
        dc
    }

    /// Check the data container and attribute matrix components of `path`.
    fn check_attribute_matrix_path(&self, status: &mut FilterStatus, path: &DataArrayPath) -> bool {
        if path.data_container_name.is_empty() || path.attribute_matrix_name.is_empty() {
            status.set_error_condition(
                -80000,
                format!("The data array path '{}' is empty or incomplete", path),
            );
            return false;
        }
        if path.data_container_name.contains('/') {
            status.set_error_condition(
                -80004,
                format!(
                    "The DataContainer name '{}' contains the '/' character",
                    path.data_container_name
                ),
            );
            return false;
        }
        if path.attribute_matrix_name.contains('/') {
            status.set_error_condition(
                -80005,
                format!(
                    "The AttributeMatrix name '{}' contains the '/' character",
                    path.attribute_matrix_name
                ),
            );
            return false;
        }
        let Some(dc) = self.get_data_container(&path.data_container_name) else {
            status.set_error_condition(
                -80002,
                format!(
                    "The DataContainer '{}' was not found in the DataContainerArray",
                    path.data_container_name
                ),
            );
            return false;
        };
        if !dc.does_attribute_matrix_exist(&path.attribute_matrix_name) {
            status.set_error_condition(
                -80003,
                format!(
                    "The AttributeMatrix '{}' was not found in the DataContainer '{}'",
                    path.attribute_matrix_name, path.data_container_name
                ),
            );
            return false;
        }
        true
    }

    /// Look up the attribute matrix named by `path`.
    pub fn get_prereq_attribute_matrix(
        &self,
        status: &mut FilterStatus,
        path: &DataArrayPath,
    ) -> Option<&AttributeMatrix> {
        if !self.check_attribute_matrix_path(status, path) {
            return None;
        }
        self.get_attribute_matrix(path)
    }

    /// Look up the array named by `path`, optionally requiring a component shape.
    pub fn get_prereq_array(
        &self,
        status: &mut FilterStatus,
        path: &DataArrayPath,
        component_dims: Option<&[usize]>,
    ) -> Option<&IDataArray> {
        if !self.check_attribute_matrix_path(status, path) {
            return None;
        }
        if path.data_array_name.contains('/') {
            status.set_error_condition(
                -80006,
                format!(
                    "The AttributeArray name '{}' contains the '/' character",
                    path.data_array_name
                ),
            );
            return None;
        }
        let Some(array) = self.get_array(path) else {
            status.set_error_condition(
                -90002,
                format!(
                    "The AttributeArray '{}' was not found in the AttributeMatrix '{}'",
                    path.data_array_name, path.attribute_matrix_name
                ),
            );
            return None;
        };
        if let Some(cdims) = component_dims {
            if array.component_dims() != cdims {
                status.set_error_condition(
                    -502,
                    format!(
                        "The AttributeArray '{}' has component dimensions {:?} but {:?} are required",
                        path, array.component_dims(), cdims
                    ),
                );
                return None;
            }
        }
        Some(array)
    }

    /// Look up the image geometry of the container named `name`.
    pub fn get_prereq_image_geometry(
        &self,
        status: &mut FilterStatus,
        name: &str,
    ) -> Option<&ImageGeom> {
        let dc = self.get_prereq_data_container(status, name)?;
        match dc.geometry() {
            None => {
                status.set_error_condition(
                    -385,
                    format!("The DataContainer '{}' does not have a geometry", name),
                );
                None
            }
            Some(Geometry::Image(geom)) => Some(geom),
            Some(other) => {
                status.set_error_condition(
                    -384,
                    format!(
                        "The DataContainer '{}' has a {} geometry but an Image geometry is required",
                        name,
                        other.geometry_type()
                    ),
                );
                None
            }
        }
    }

    /// Create a container a filter produces.
    pub fn create_non_prereq_data_container(
        &mut self,
        status: &mut FilterStatus,
        name: &str,
    ) -> Option<&mut DataContainer> {
        if name.is_empty() {
            status.set_error_condition(-887, "The DataContainer Object must have a name to be created.");
            return None;
        }
        if name.contains('/') {
            status.set_error_condition(
                -888,
                format!("The DataContainer name '{}' contains the '/' character", name),
            );
            return None;
        }
        if self.does_data_container_exist(name) {
            status.set_error_condition(
                -889,
                format!("The DataContainer Object with name '{}' already exists.", name),
            );
            return None;
        }
        self.containers.push(DataContainer::new(name));
        self.containers.last_mut()
    }

    /// Create an attribute matrix a filter produces, in an existing container.
    pub fn create_non_prereq_attribute_matrix(
        &mut self,
        status: &mut FilterStatus,
        path: &DataArrayPath,
        tuple_dims: Vec<usize>,
        matrix_type: AttributeMatrixType,
    ) -> Option<&mut AttributeMatrix> {
        if path.attribute_matrix_name.is_empty() {
            status.set_error_condition(-80000, "The AttributeMatrix name must not be empty");
            return None;
        }
        if path.attribute_matrix_name.contains('/') {
            status.set_error_condition(
                -80005,
                format!(
                    "The AttributeMatrix name '{}' contains the '/' character",
                    path.attribute_matrix_name
                ),
            );
            return None;
        }
        self.get_prereq_data_container(status, &path.data_container_name)?;
        if self.does_attribute_matrix_exist(path) {
            status.set_error_condition(
                -10014,
                format!(
                    "An AttributeMatrix with name '{}' already exists in the DataContainer '{}'",
                    path.attribute_matrix_name, path.data_container_name
                ),
            );
            return None;
        }
        let dc = self.get_data_container_mut(&path.data_container_name)?;
        dc.insert_or_assign(AttributeMatrix::new(
            tuple_dims,
            &path.attribute_matrix_name,
            matrix_type,
        ));
        dc.get_attribute_matrix_mut(&path.attribute_matrix_name)
    }

    /// Create an array a filter produces, in an existing attribute matrix.
    ///
    /// The array is allocated and zero filled unless the filter is preflighting, in which case
    /// it is an unallocated placeholder of the right shape.
    pub fn create_non_prereq_array(
        &mut self,
        status: &mut FilterStatus,
        path: &DataArrayPath,
        dtype: DType,
        component_dims: Vec<usize>,
    ) -> Option<&mut IDataArray> {
        if !self.check_attribute_matrix_path(status, path) {
            return None;
        }
        if path.data_array_name.is_empty() {
            status.set_error_condition(-10001, "The AttributeArray name must not be empty");
            return None;
        }
        if path.data_array_name.contains('/') {
            status.set_error_condition(
                -80006,
                format!(
                    "The AttributeArray name '{}' contains the '/' character",
                    path.data_array_name
                ),
            );
            return None;
        }
        if self.does_attribute_array_exist(path) {
            status.set_error_condition(
                -10002,
                format!("An AttributeArray already exists at the path '{}'", path),
            );
            return None;
        }
        let allocate = !status.in_preflight();
        let am = self.get_attribute_matrix_mut(path)?;
        let array = IDataArray::new(
            dtype,
            &path.data_array_name,
            am.num_tuples(),
            component_dims,
            allocate,
        );
        // Tuple counts match by construction.
        am.insert_or_assign(array).ok()?;
        am.get_attribute_array_mut(&path.data_array_name)
    }

    /// Check that every array in `paths` exists and all have the same number of tuples.
    pub fn validate_number_of_tuples(
        &self,
        status: &mut FilterStatus,
        paths: &[DataArrayPath],
    ) -> bool {
        let Some(first) = paths.first() else {
            status.set_error_condition(-10000, "At least one DataArrayPath is required");
            return false;
        };
        let mut expected = None;
        for path in paths {
            let Some(array) = self.get_array(path) else {
                status.set_error_condition(
                    -10100,
                    format!("The AttributeArray '{}' does not exist", path),
                );
                return false;
            };
            match expected {
                None => expected = Some(array.num_tuples()),
                Some(n) if n != array.num_tuples() => {
                    status.set_error_condition(
                        -10200,
                        format!(
                            "The number of tuples for '{}' ({}) does not match '{}' ({})",
                            path,
                            array.num_tuples(),
                            first,
                            n
                        ),
                    );
                    return false;
                }
                Some(_) => (),
            }
        }
        true
    }

    fn montage_position(&self, name: &str) -> Option<usize> {
        self.montages.iter().position(|m| m.name() == name)
    }

    /// Register a montage. Returns false if a montage with the same name exists.
    pub fn add_montage(&mut self, montage: GridMontage) -> bool {
        if self.montage_position(montage.name()).is_some() {
            return false;
        }
        self.montages.push(montage);
        true
    }

    /// Register a montage, replacing any montage with the same name.
    pub fn add_or_replace_montage(&mut self, montage: GridMontage) {
        match self.montage_position(montage.name()) {
            Some(i) => self.montages[i] = montage,
            None => self.montages.push(montage),
        }
    }

    pub fn get_montage(&self, name: &str) -> Option<&GridMontage> {
        self.montage_position(name).map(|i| &self.montages[i])
    }

    pub fn get_montage_mut(&mut self, name: &str) -> Option<&mut GridMontage> {
        self.montage_position(name).map(|i| &mut self.montages[i])
    }

    pub fn get_montage_by_id(&self, id: MontageId) -> Option<&GridMontage> {
        self.montages.iter().find(|m| m.id() == id)
    }

    pub fn remove_montage(&mut self, name: &str) -> Option<GridMontage> {
        self.montage_position(name).map(|i| self.montages.remove(i))
    }

    pub fn montage_names(&self) -> Vec<String> {
        self.montages.iter().map(|m| m.name().to_string()).collect()
    }

    pub fn montages(&self) -> std::slice::Iter<'_, GridMontage> {
        self.montages.iter()
    }

    /// Look up a montage a filter requires. Records -4950 when it is missing.
    pub fn get_prereq_montage(&self, status: &mut FilterStatus, name: &str) -> Option<&GridMontage> {
        let montage = self.get_montage(name);
        if montage.is_none() {
            status.set_error_condition(
                -4950,
                format!("The Montage '{}' was not found in the DataContainerArray", name),
            );
        }
        montage
    }

    /// Create and register an empty grid montage.
    pub fn create_non_prereq_grid_montage(
        &mut self,
        status: &mut FilterStatus,
        name: &str,
        size: SizeVec3,
    ) -> Option<&mut GridMontage> {
        let Some(montage) = GridMontage::new(name, size[0], size[1], size[2]) else {
            status.set_error_condition(
                -4965,
                format!("Could not create a montage named '{}' of size {}", name, size),
            );
            return None;
        };
        if !self.add_montage(montage) {
            status.set_error_condition(
                -4960,
                format!("A Montage named '{}' already exists", name),
            );
            return None;
        }
        self.montages.last_mut()
    }

    /// Copy every container, then propagate every montage onto the copies.
    pub fn deep_copy(&self, force_no_allocate: bool) -> Self {
        let mut copy = DataContainerArray {
            containers: self
                .containers
                .iter()
                .map(|dc| dc.deep_copy(force_no_allocate))
                .collect(),
            montages: vec![],
        };
        copy.montages = self.montages.iter().map(|m| m.propagate(&copy)).collect();
        copy
    }

    /// Summary of the registry for display.
    pub fn info_string(&self) -> String {
        let mut info = format!(
            "Data Container Array: {} containers, {} montages",
            self.containers.len(),
            self.montages.len()
        );
        for dc in &self.containers {
            info.push('\n');
            info.push_str(&dc.info_string());
        }
        for montage in &self.montages {
            info.push('\n');
            info.push_str(&montage.info_string(self));
        }
        info
    }
}
