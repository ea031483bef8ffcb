//! Resample an image volume onto a plane rotated about one axis, once per tilt angle.
//!
//! The sampling plane contains the rotation axis and passes through the centre of the volume.
//! Its width is the diagonal of the cross section perpendicular to the axis, so every rotation
//! of it stays inside the volume's bounding cylinder. Each angle produces a data container
//! `Rotation_<i>` holding an image geometry for the plane and a copy of the input array sampled
//! by nearest cell.

use ndarray::{arr1, arr2, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use tracing::{event, Level};

use crate::array::{DataArray, IDataArray};
use crate::data_container_array::DataContainerArray;
use crate::filter::{DeclaresParameters, Filter, FilterParameter, FilterStatus};
use crate::filter_parameter;
use crate::geometry::ImageGeom;
use crate::models::{AttributeMatrixType, DataArrayPath};
use crate::operation::{Element, ElementOperation, Operation};
use crate::types::{FloatVec3, Range, SizeVec3};

/// Largest number of tilts one run may generate.
pub const MAX_TILTS: usize = 100_000;

/// Name of the attribute matrix holding each resampled slice.
pub const SLICE_DATA: &str = "Slice Data";

/// Name of the data container holding the slice of tilt number `index`.
pub fn rotation_container_name(index: usize) -> String {
    format!("Rotation_{}", index)
}

/// Axis the sampling plane is rotated about
#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum RotationAxis {
    #[default]
    X,
    Y,
    Z,
}

impl RotationAxis {
    /// Axis indices as `(in plane, normal, rotation)`.
    fn frame(self) -> (usize, usize, usize) {
        match self {
            Self::X => (2, 1, 0),
            Self::Y => (0, 2, 1),
            Self::Z => (0, 1, 2),
        }
    }

    fn unit(self) -> [f32; 3] {
        match self {
            Self::X => [1.0, 0.0, 0.0],
            Self::Y => [0.0, 1.0, 0.0],
            Self::Z => [0.0, 0.0, 1.0],
        }
    }
}

/// Rotation matrix for a right handed rotation of `radians` about the unit vector `axis`.
fn rotation_matrix(axis: [f32; 3], radians: f32) -> Array2<f32> {
    let [x, y, z] = axis;
    let (s, c) = radians.sin_cos();
    let omc = 1.0 - c;
    arr2(&[
        [x * x * omc + c, x * y * omc - z * s, x * z * omc + y * s],
        [x * y * omc + z * s, y * y * omc + c, y * z * omc - x * s],
        [x * z * omc - y * s, y * z * omc + x * s, z * z * omc + c],
    ])
}

/// Image geometry of the sampling plane for `input`.
fn sampling_grid(input: &ImageGeom, axis: RotationAxis, spacing: FloatVec3) -> ImageGeom {
    let (u, v, w) = axis.frame();
    let bounds = input.bounding_box();
    let center = input.center();
    let length = |axis: usize| bounds[2 * axis + 1] - bounds[2 * axis];
    let diagonal = (length(u).powi(2) + length(v).powi(2)).sqrt();

    let mut dims = [1usize; 3];
    dims[u] = (diagonal / spacing[u]).ceil() as usize;
    dims[w] = (length(w) / input.spacing[w]).ceil() as usize;

    let mut grid_spacing = [0.0f32; 3];
    grid_spacing[u] = spacing[u];
    grid_spacing[v] = input.spacing[v];
    grid_spacing[w] = input.spacing[w];

    let mut origin = [0.0f32; 3];
    origin[u] = center[u] - dims[u] as f32 * spacing[u] / 2.0;
    origin[v] = center[v] - input.spacing[v] / 2.0;
    origin[w] = bounds[2 * w];

    let mut grid = ImageGeom::new(
        SizeVec3::new(dims),
        FloatVec3::new(grid_spacing),
        FloatVec3::new(origin),
    );
    grid.units = input.units;
    grid
}

/// Sample `input` at every cell of `grid` after rotating the cell centre about `center`.
struct Resample<'a> {
    input: &'a IDataArray,
    input_geometry: &'a ImageGeom,
    grid: &'a ImageGeom,
    rotation: &'a Array2<f32>,
    center: [f32; 3],
}

impl ElementOperation for Resample<'_> {
    type Output = Option<IDataArray>;

    fn execute_t<T: Element>(self) -> Self::Output {
        let input = self.input.as_typed::<T>()?;
        let n = input.num_components();
        let mut output = DataArray::<T>::new(
            input.name(),
            self.grid.number_of_elements(),
            input.component_dims().to_vec(),
            true,
        );
        let src = input.as_slice();
        let dst = output.as_mut_slice();
        let c = arr1(&self.center);
        let dims = self.grid.dimensions;
        for z in 0..dims.z() {
            for y in 0..dims.y() {
                for x in 0..dims.x() {
                    let point = arr1(&self.grid.cell_center(x, y, z));
                    let rotated = self.rotation.dot(&(&point - &c)) + &c;
                    let Some(in_index) = self
                        .input_geometry
                        .compute_cell_index([rotated[0], rotated[1], rotated[2]])
                    else {
                        continue;
                    };
                    let out_index = self.grid.index(x, y, z);
                    if let (Some(from), Some(to)) = (
                        src.get(in_index * n..(in_index + 1) * n),
                        dst.get_mut(out_index * n..(out_index + 1) * n),
                    ) {
                        to.copy_from_slice(from);
                    }
                }
            }
        }
        Some(T::wrap(output))
    }
}

/// Generate Tilt Series filter
#[derive(Clone, Debug)]
pub struct GenerateTiltSeries {
    status: FilterStatus,
    pub rotation_axis: RotationAxis,
    /// Degrees between successive tilts
    pub increment: f32,
    pub start_angle: f32,
    /// Exclusive upper bound of the tilt angles, in degrees
    pub stop_angle: f32,
    /// Spacing of the sampling plane along its in-plane axis
    pub spacing: FloatVec3,
    pub input_data_array_path: DataArrayPath,
}

impl Default for GenerateTiltSeries {
    fn default() -> Self {
        GenerateTiltSeries {
            status: FilterStatus::new("Generate Tilt Series"),
            rotation_axis: RotationAxis::X,
            increment: 1.0,
            start_angle: 0.0,
            stop_angle: 180.0,
            spacing: FloatVec3::new([1.0, 1.0, 1.0]),
            input_data_array_path: DataArrayPath::new(
                "DataContainer",
                "AttributeMatrix",
                "FeatureIds",
            ),
        }
    }
}

impl DeclaresParameters for GenerateTiltSeries {
    fn filter_parameters() -> Vec<FilterParameter<Self>> {
        vec![
            filter_parameter!(
                GenerateTiltSeries,
                "Rotation Axis",
                "RotationAxis",
                Parameter,
                rotation_axis
            ),
            filter_parameter!(
                GenerateTiltSeries,
                "Rotation Increment (Deg)",
                "Increment",
                Parameter,
                increment
            ),
            filter_parameter!(
                GenerateTiltSeries,
                "Start Angle (Deg)",
                "StartAngle",
                Parameter,
                start_angle
            ),
            filter_parameter!(
                GenerateTiltSeries,
                "Stop Angle (Deg)",
                "StopAngle",
                Parameter,
                stop_angle
            ),
            filter_parameter!(
                GenerateTiltSeries,
                "Resample Spacing",
                "Spacing",
                Parameter,
                spacing
            ),
            filter_parameter!(
                GenerateTiltSeries,
                "Input Data Array Path",
                "InputDataArrayPath",
                RequiredArray,
                input_data_array_path
            ),
        ]
    }
}

impl GenerateTiltSeries {
    pub fn new(
        input_data_array_path: DataArrayPath,
        rotation_axis: RotationAxis,
        increment: f32,
    ) -> Self {
        GenerateTiltSeries {
            input_data_array_path,
            rotation_axis,
            increment,
            ..Default::default()
        }
    }

    /// Number of tilts between the start and stop angles.
    ///
    /// Returns `None` when the increment is not positive or the count is not finite or exceeds
    /// [MAX_TILTS].
    pub fn angle_count(&self) -> Option<usize> {
        if !self.increment.is_finite() || self.increment <= 0.0 {
            return None;
        }
        let span = f64::from(self.stop_angle) - f64::from(self.start_angle);
        let count = (span / f64::from(self.increment)).ceil();
        if !count.is_finite() || count > MAX_TILTS as f64 {
            return None;
        }
        Some(count.max(0.0) as usize)
    }

    /// Tilt angles in degrees, from the start angle up to but excluding the stop angle.
    ///
    /// Empty when [angle_count](Self::angle_count) rejects the parameters.
    pub fn angles(&self) -> Vec<f32> {
        let count = self.angle_count().unwrap_or_default();
        (0..count)
            .map(|i| self.start_angle + i as f32 * self.increment)
            .collect()
    }

    /// Validate the parameters and input. Returns the input geometry.
    fn check_input(&mut self, dca: &DataContainerArray) -> Option<ImageGeom> {
        dca.get_prereq_array(&mut self.status, &self.input_data_array_path, None)?;
        let dc_name = &self.input_data_array_path.data_container_name;
        let geometry = dca.get_prereq_image_geometry(&mut self.status, dc_name)?.clone();
        if !self.increment.is_finite() || self.increment <= 0.0 {
            self.status.set_error_condition(
                -5600,
                format!("The rotation increment must be positive but is {}", self.increment),
            );
            return None;
        }
        if self.spacing.iter().any(|s| *s <= 0.0) {
            self.status.set_error_condition(
                -5601,
                format!("The resample spacing must be positive but is {}", self.spacing),
            );
            return None;
        }
        let Some(count) = self.angle_count() else {
            self.status.set_error_condition(
                -5604,
                format!(
                    "Rotating from {} to {} in steps of {} needs more than {} tilts",
                    self.start_angle, self.stop_angle, self.increment, MAX_TILTS
                ),
            );
            return None;
        };
        if count == 0 {
            self.status.set_error_condition(
                -5602,
                format!(
                    "The stop angle {} must be greater than the start angle {}",
                    self.stop_angle, self.start_angle
                ),
            );
            return None;
        }
        Some(geometry)
    }
}

impl Filter for GenerateTiltSeries {
    fn name_of_class(&self) -> &str {
        "GenerateTiltSeries"
    }

    fn human_label(&self) -> &str {
        self.status.human_label()
    }

    fn uuid(&self) -> &str {
        "{829da805-6d7c-5106-8209-aae1c207de15}"
    }

    fn status(&self) -> &FilterStatus {
        &self.status
    }

    fn status_mut(&mut self) -> &mut FilterStatus {
        &mut self.status
    }

    fn data_check(&mut self, dca: &mut DataContainerArray) {
        self.status.clear_error_code();
        self.status.clear_warning_code();

        let Some(geometry) = self.check_input(dca) else {
            return;
        };
        let Some(input) = dca.get_array(&self.input_data_array_path) else {
            return;
        };
        let dtype = input.dtype();
        let component_dims = input.component_dims().to_vec();
        let grid = sampling_grid(&geometry, self.rotation_axis, self.spacing);
        let tuple_dims = grid.dimensions.to_container::<Vec<usize>>();

        for index in 0..self.angle_count().unwrap_or_default() {
            let name = rotation_container_name(index);
            let Some(dc) = dca.create_non_prereq_data_container(&mut self.status, &name) else {
                return;
            };
            dc.set_geometry(grid.clone());
            let matrix_path = DataArrayPath::attribute_matrix(&name, SLICE_DATA);
            if dca
                .create_non_prereq_attribute_matrix(
                    &mut self.status,
                    &matrix_path,
                    tuple_dims.clone(),
                    AttributeMatrixType::Cell,
                )
                .is_none()
            {
                return;
            }
            let array_path = DataArrayPath::new(
                &name,
                SLICE_DATA,
                &self.input_data_array_path.data_array_name,
            );
            let cdims = component_dims.clone();
            if dca
                .create_non_prereq_array(&mut self.status, &array_path, dtype, cdims)
                .is_none()
            {
                return;
            }
        }
    }

    #[tracing::instrument(level = "DEBUG", skip(self, dca))]
    fn execute(&mut self, dca: &mut DataContainerArray) {
        self.data_check(dca);
        if self.status.error_code() < 0 || self.status.is_canceled() {
            return;
        }
        let (Some(input), Some(geometry)) = (
            dca.get_shared_array(&self.input_data_array_path),
            dca.get_data_container(&self.input_data_array_path.data_container_name)
                .and_then(|dc| dc.image_geometry())
                .cloned(),
        ) else {
            return;
        };
        let grid = sampling_grid(&geometry, self.rotation_axis, self.spacing);
        let center = geometry.center();
        let axis = self.rotation_axis.unit();
        let dtype = input.dtype();
        let angles: Vec<(usize, f32)> = self.angles().into_iter().enumerate().collect();
        let batch_size = num_cpus::get().max(1);
        let batches = Range::from(0..angles.len()).split(angles.len().div_ceil(batch_size));

        for (batch_index, range) in batches.iter().enumerate() {
            if self.status.is_canceled() {
                return;
            }
            let batch = &angles[range.min()..range.max()];
            let slices: Vec<(usize, Option<IDataArray>)> = batch
                .par_iter()
                .map(|(index, degrees)| {
                    let rotation = rotation_matrix(axis, degrees.to_radians());
                    let slice = Resample {
                        input: &input,
                        input_geometry: &geometry,
                        grid: &grid,
                        rotation: &rotation,
                        center,
                    }
                    .execute(dtype);
                    (*index, slice)
                })
                .collect();

            for (index, slice) in slices {
                let matrix_path =
                    DataArrayPath::attribute_matrix(rotation_container_name(index), SLICE_DATA);
                let stored = match (slice, dca.get_attribute_matrix_mut(&matrix_path)) {
                    (Some(slice), Some(matrix)) => matrix.insert_or_assign(slice).is_ok(),
                    _ => false,
                };
                if !stored {
                    self.status.set_error_condition(
                        -5603,
                        format!("Could not store the resampled slice in '{}'", matrix_path),
                    );
                    return;
                }
            }
            let progress = ((batch_index + 1) * 100 / batches.len()) as i32;
            let done = range.max();
            self.status
                .notify_progress(progress, format!("Resampled {} of {} tilts", done, angles.len()));
            event!(Level::DEBUG, batch = batch_index, "resampled tilt batch");
        }
    }
}
