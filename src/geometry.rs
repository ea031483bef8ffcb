//! Geometries attached to data containers.
//!
//! Only the geometries needed by the pipeline core are modelled: regular image grids, which
//! montages and the tilt series filter work on, and bare vertex clouds.

use serde::{Deserialize, Serialize};

use crate::models::{GeometryType, LengthUnit};
use crate::types::{FloatVec3, FloatVec6, SizeVec3};

/// Regular grid of cells defined by dimensions, spacing and origin.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ImageGeom {
    pub dimensions: SizeVec3,
    pub spacing: FloatVec3,
    pub origin: FloatVec3,
    #[serde(default)]
    pub units: LengthUnit,
}

impl Default for ImageGeom {
    fn default() -> Self {
        ImageGeom {
            dimensions: SizeVec3::new([0, 0, 0]),
            spacing: FloatVec3::new([1.0, 1.0, 1.0]),
            origin: FloatVec3::new([0.0, 0.0, 0.0]),
            units: LengthUnit::default(),
        }
    }
}

impl ImageGeom {
    /// Return a new ImageGeom.
    pub fn new(dimensions: SizeVec3, spacing: FloatVec3, origin: FloatVec3) -> Self {
        ImageGeom {
            dimensions,
            spacing,
            origin,
            units: LengthUnit::default(),
        }
    }

    /// Number of cells.
    pub fn number_of_elements(&self) -> usize {
        self.dimensions.product()
    }

    /// Flat index of the cell at `(x, y, z)`.
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        z * self.dimensions.x() * self.dimensions.y() + y * self.dimensions.x() + x
    }

    /// Flat index of the cell containing the physical point `coords`.
    ///
    /// Returns `None` when the point lies outside the grid.
    pub fn compute_cell_index(&self, coords: [f32; 3]) -> Option<usize> {
        let mut cell = [0usize; 3];
        for axis in 0..3 {
            let offset = (coords[axis] - self.origin[axis]) / self.spacing[axis];
            if !offset.is_finite() || offset < 0.0 {
                return None;
            }
            let index = offset.floor() as usize;
            if index >= self.dimensions[axis] {
                return None;
            }
            cell[axis] = index;
        }
        Some(self.index(cell[0], cell[1], cell[2]))
    }

    /// Physical coordinates of the centre of cell `(x, y, z)`.
    pub fn cell_center(&self, x: usize, y: usize, z: usize) -> [f32; 3] {
        let ijk = [x, y, z];
        let mut coords = [0.0f32; 3];
        for axis in 0..3 {
            coords[axis] =
                self.origin[axis] + (ijk[axis] as f32 + 0.5) * self.spacing[axis];
        }
        coords
    }

    /// Bounds as `[x min, x max, y min, y max, z min, z max]`.
    pub fn bounding_box(&self) -> FloatVec6 {
        let mut bounds = [0.0f32; 6];
        for axis in 0..3 {
            bounds[2 * axis] = self.origin[axis];
            bounds[2 * axis + 1] =
                self.origin[axis] + self.dimensions[axis] as f32 * self.spacing[axis];
        }
        FloatVec6::new(bounds)
    }

    /// Physical centre of the grid.
    pub fn center(&self) -> [f32; 3] {
        let bounds = self.bounding_box();
        [
            (bounds[0] + bounds[1]) / 2.0,
            (bounds[2] + bounds[3]) / 2.0,
            (bounds[4] + bounds[5]) / 2.0,
        ]
    }
}

/// Unconnected points.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct VertexGeom {
    pub vertices: Vec<[f32; 3]>,
    #[serde(default)]
    pub units: LengthUnit,
}

impl VertexGeom {
    pub fn number_of_vertices(&self) -> usize {
        self.vertices.len()
    }
}

/// Geometry of a data container.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Geometry {
    Image(ImageGeom),
    Vertex(VertexGeom),
}

impl Geometry {
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Self::Image(_) => GeometryType::Image,
            Self::Vertex(_) => GeometryType::Vertex,
        }
    }

    pub fn length_unit(&self) -> LengthUnit {
        match self {
            Self::Image(g) => g.units,
            Self::Vertex(g) => g.units,
        }
    }

    pub fn set_length_unit(&mut self, units: LengthUnit) {
        match self {
            Self::Image(g) => g.units = units,
            Self::Vertex(g) => g.units = units,
        }
    }

    /// Number of elements the geometry's primary attribute matrix describes.
    pub fn number_of_elements(&self) -> usize {
        match self {
            Self::Image(g) => g.number_of_elements(),
            Self::Vertex(g) => g.number_of_vertices(),
        }
    }

    pub fn as_image(&self) -> Option<&ImageGeom> {
        match self {
            Self::Image(g) => Some(g),
            _ => None,
        }
    }
}

impl From<ImageGeom> for Geometry {
    fn from(geom: ImageGeom) -> Self {
        Geometry::Image(geom)
    }
}

impl From<VertexGeom> for Geometry {
    fn from(geom: VertexGeom) -> Self {
        Geometry::Vertex(geom)
    }
}
