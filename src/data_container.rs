//! Data containers: a geometry plus the attribute matrices describing it.

use crate::attribute_matrix::AttributeMatrix;
use crate::geometry::{Geometry, ImageGeom};

/// A named container holding an optional geometry and attribute matrices.
#[derive(Clone, Debug, PartialEq)]
pub struct DataContainer {
    name: String,
    geometry: Option<Geometry>,
    matrices: Vec<AttributeMatrix>,
}

impl DataContainer {
    /// Return a new, empty DataContainer.
    pub fn new(name: impl Into<String>) -> Self {
        DataContainer {
            name: name.into(),
            geometry: None,
            matrices: vec![],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    pub fn geometry_mut(&mut self) -> Option<&mut Geometry> {
        self.geometry.as_mut()
    }

    pub fn set_geometry(&mut self, geometry: impl Into<Geometry>) {
        self.geometry = Some(geometry.into());
    }

    /// The geometry, if it is an image geometry.
    pub fn image_geometry(&self) -> Option<&ImageGeom> {
        self.geometry.as_ref().and_then(Geometry::as_image)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.matrices.iter().position(|am| am.name() == name)
    }

    /// Add a matrix, replacing any matrix with the same name.
    pub fn insert_or_assign(&mut self, matrix: AttributeMatrix) {
        match self.position(matrix.name()) {
            Some(i) => self.matrices[i] = matrix,
            None => self.matrices.push(matrix),
        }
    }

    pub fn does_attribute_matrix_exist(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn get_attribute_matrix(&self, name: &str) -> Option<&AttributeMatrix> {
        self.position(name).map(|i| &self.matrices[i])
    }

    pub fn get_attribute_matrix_mut(&mut self, name: &str) -> Option<&mut AttributeMatrix> {
        self.position(name).map(|i| &mut self.matrices[i])
    }

    pub fn remove_attribute_matrix(&mut self, name: &str) -> Option<AttributeMatrix> {
        self.position(name).map(|i| self.matrices.remove(i))
    }

    /// Matrix names in insertion order.
    pub fn attribute_matrix_names(&self) -> Vec<String> {
        self.matrices.iter().map(|am| am.name().to_string()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AttributeMatrix> {
        self.matrices.iter()
    }

    /// Copy the container, optionally dropping array values.
    pub fn deep_copy(&self, force_no_allocate: bool) -> Self {
        DataContainer {
            name: self.name.clone(),
            geometry: self.geometry.clone(),
            matrices: self
                .matrices
                .iter()
                .map(|am| am.deep_copy(force_no_allocate))
                .collect(),
        }
    }

    /// Summary of the container for display.
    pub fn info_string(&self) -> String {
        let geometry = match &self.geometry {
            Some(g) => g.geometry_type().to_string(),
            None => "None".to_string(),
        };
        let mut info = format!("Data Container {} (geometry: {})", self.name, geometry);
        for am in &self.matrices {
            info.push_str("\n  ");
            info.push_str(&am.info_string());
        }
        info
    }
}
