//! Initialize a box of voxels in one or more cell arrays.
//!
//! The box is given in voxel coordinates with inclusive bounds. Voxels inside it (or, when
//! inverted, every voxel outside it) are set to a fixed value or to uniformly distributed random
//! values.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use tracing::{event, Level};

use crate::array::IDataArray;
use crate::data_container_array::DataContainerArray;
use crate::filter::{DeclaresParameters, Filter, FilterParameter, FilterStatus};
use crate::filter_parameter;
use crate::models::{DType, DataArrayPath};
use crate::operation::{Element, ElementOperation, Operation};
use crate::types::{Range3D, SizeVec3};

/// How voxels are initialized
#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum InitType {
    /// Every voxel gets `init_value`
    #[default]
    Manual,
    /// Random values over the whole range of the element type
    Random,
    /// Random values in `init_range`
    RandomWithRange,
}

/// Initialize Data filter
#[derive(Clone, Debug)]
pub struct InitializeData {
    status: FilterStatus,
    pub cell_attribute_matrix_paths: Vec<DataArrayPath>,
    pub x_min: i64,
    pub y_min: i64,
    pub z_min: i64,
    pub x_max: i64,
    pub y_max: i64,
    pub z_max: i64,
    pub init_type: InitType,
    pub init_value: f64,
    pub init_range: (f64, f64),
    pub invert_data: bool,
}

impl Default for InitializeData {
    fn default() -> Self {
        InitializeData {
            status: FilterStatus::new("Initialize Data"),
            cell_attribute_matrix_paths: vec![],
            x_min: 0,
            y_min: 0,
            z_min: 0,
            x_max: 0,
            y_max: 0,
            z_max: 0,
            init_type: InitType::Manual,
            init_value: 0.0,
            init_range: (0.0, 0.0),
            invert_data: false,
        }
    }
}

impl DeclaresParameters for InitializeData {
    fn filter_parameters() -> Vec<FilterParameter<Self>> {
        vec![
            filter_parameter!(
                InitializeData,
                "Cell Arrays",
                "CellAttributeMatrixPaths",
                RequiredArray,
                cell_attribute_matrix_paths
            ),
            filter_parameter!(InitializeData, "X Min (Column)", "XMin", Parameter, x_min),
            filter_parameter!(InitializeData, "Y Min (Row)", "YMin", Parameter, y_min),
            filter_parameter!(InitializeData, "Z Min (Plane)", "ZMin", Parameter, z_min),
            filter_parameter!(InitializeData, "X Max (Column)", "XMax", Parameter, x_max),
            filter_parameter!(InitializeData, "Y Max (Row)", "YMax", Parameter, y_max),
            filter_parameter!(InitializeData, "Z Max (Plane)", "ZMax", Parameter, z_max),
            filter_parameter!(
                InitializeData,
                "Initialization Type",
                "InitType",
                Parameter,
                init_type
            ),
            filter_parameter!(
                InitializeData,
                "Initialization Value",
                "InitValue",
                Parameter,
                init_value
            ),
            filter_parameter!(
                InitializeData,
                "Initialization Range",
                "InitRange",
                Parameter,
                init_range
            ),
            filter_parameter!(InitializeData, "Invert", "InvertData", Parameter, invert_data),
        ]
    }
}

/// Smallest and largest values a random draw over the whole type may produce.
fn full_range<T: Element>() -> (T, T) {
    if T::DTYPE.is_float() {
        (T::min_positive(), T::highest())
    } else {
        (T::lowest(), T::highest())
    }
}

/// Check the initialization parameters against one element type.
///
/// Returns the error code and message of the first problem.
struct CheckInitialization {
    init_type: InitType,
    init_value: f64,
    init_range: (f64, f64),
    array_name: String,
}

impl ElementOperation for CheckInitialization {
    type Output = Option<(i32, String)>;

    fn execute_t<T: Element>(self) -> Self::Output {
        // Booleans accept any value: zero is false, everything else true.
        if T::DTYPE == DType::Bool {
            return None;
        }
        let lowest = T::lowest().to_f64();
        let highest = T::highest().to_f64();
        let in_range = |v: f64| v >= lowest && v <= highest;
        match self.init_type {
            InitType::Manual if !in_range(self.init_value) => Some((
                -4000,
                format!(
                    "{}: The initialization value could not be converted. The valid range is {} to {}",
                    self.array_name, lowest, highest
                ),
            )),
            InitType::RandomWithRange => {
                let (min, max) = self.init_range;
                if min > max {
                    Some((
                        -5550,
                        "Invalid initialization range.  Minimum value is larger than maximum value."
                            .to_string(),
                    ))
                } else if !in_range(min) || !in_range(max) {
                    Some((
                        -4001,
                        format!(
                            "{}: The initialization range can only be from {} to {}",
                            self.array_name, lowest, highest
                        ),
                    ))
                } else if min == max {
                    Some((
                        -4002,
                        format!(
                            "{}: The initialization range must have differing values",
                            self.array_name
                        ),
                    ))
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

/// Write initial values into one array.
struct InitializeArray<'a> {
    array: &'a mut IDataArray,
    dims: SizeVec3,
    region: Range3D,
    invert: bool,
    init_type: InitType,
    init_value: f64,
    init_range: (f64, f64),
    seed: u64,
}

/// Visit the flat index of every voxel of `dims` inside `region`, or outside it when
/// `invert` is set.
fn for_each_voxel(dims: SizeVec3, region: Range3D, invert: bool, mut f: impl FnMut(usize)) {
    let (dx, dy) = (dims.x(), dims.y());
    let visited = if invert {
        Range3D::from_dims(dims.to_array())
    } else {
        region
    };
    for k in visited.z_range().iter() {
        for j in visited.y_range().iter() {
            for i in visited.x_range().iter() {
                if invert && region.contains(i, j, k) {
                    continue;
                }
                f(k * dx * dy + j * dx + i);
            }
        }
    }
}

impl ElementOperation for InitializeArray<'_> {
    type Output = ();

    fn execute_t<T: Element>(self) {
        let Some(array) = self.array.as_typed_mut::<T>() else {
            return;
        };
        let n = array.num_components();
        let data = array.as_mut_slice();
        let mut fill = |index: usize, value: T| {
            if let Some(tuple) = data.get_mut(index * n..(index + 1) * n) {
                tuple.fill(value);
            }
        };
        let (dims, region, invert) = (self.dims, self.region, self.invert);
        match self.init_type {
            InitType::Manual => {
                let value = T::from_f64(self.init_value);
                for_each_voxel(dims, region, invert, |index| fill(index, value));
            }
            InitType::Random | InitType::RandomWithRange => {
                let (low, high) = if self.init_type == InitType::Random {
                    full_range::<T>()
                } else {
                    (T::from_f64(self.init_range.0), T::from_f64(self.init_range.1))
                };
                let mut rng = StdRng::seed_from_u64(self.seed);
                for_each_voxel(dims, region, invert, |index| {
                    fill(index, T::random_in(&mut rng, low, high))
                });
            }
        }
    }
}

/// Seed for one array's generator, taken from the wall clock.
fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

impl InitializeData {
    pub fn new() -> Self {
        Self::default()
    }

    /// The voxel box as a half-open range. Only meaningful once the bounds are validated.
    fn region(&self) -> Range3D {
        let bound = |v: i64| v.max(0) as usize;
        Range3D::new(
            bound(self.x_min),
            bound(self.x_max) + 1,
            bound(self.y_min),
            bound(self.y_max) + 1,
            bound(self.z_min),
            bound(self.z_max) + 1,
        )
        .unwrap_or_default()
    }

    /// Record an error for every bound outside the grid or out of order.
    fn check_bounds(&mut self, dims: SizeVec3) {
        let axes = [
            ("X", self.x_min, self.x_max, dims.x()),
            ("Y", self.y_min, self.y_max, dims.y()),
            ("Z", self.z_min, self.z_max, dims.z()),
        ];
        for (offset, (axis, min, max, _)) in axes.iter().enumerate() {
            if max < min {
                self.status.set_error_condition(
                    -5551 - offset as i32,
                    format!("{axis} Max ({max}) less than {axis} Min ({min})"),
                );
            }
        }
        for (offset, (axis, min, _, _)) in axes.iter().enumerate() {
            if *min < 0 {
                self.status.set_error_condition(
                    -5554 - offset as i32,
                    format!("{axis} Min ({min}) less than 0"),
                );
            }
        }
        for (offset, (axis, _, max, dim)) in axes.iter().enumerate() {
            let last = *dim as i64 - 1;
            if *max > last {
                self.status.set_error_condition(
                    -5557 - offset as i32,
                    format!(
                        "The {axis} Max you entered of {max} is greater than your Max {axis} Point of {last}"
                    ),
                );
            }
        }
    }
}

impl Filter for InitializeData {
    fn name_of_class(&self) -> &str {
        "InitializeData"
    }

    fn human_label(&self) -> &str {
        self.status.human_label()
    }

    fn uuid(&self) -> &str {
        "{dfab9921-fea3-521c-99ba-48db98e43ff8}"
    }

    fn group_name(&self) -> &str {
        "Processing"
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

        let Some(first) = self.cell_attribute_matrix_paths.first() else {
            self.status
                .set_error_condition(-5550, "At least one data array must be selected.");
            return;
        };
        let matrix_path = first.attribute_matrix_path();
        let Some(matrix) = dca.get_prereq_attribute_matrix(&mut self.status, &matrix_path) else {
            return;
        };
        let num_tuples = matrix.num_tuples();
        let Some(geometry) =
            dca.get_prereq_image_geometry(&mut self.status, &matrix_path.data_container_name)
        else {
            return;
        };
        let dims = geometry.dimensions;
        if num_tuples != geometry.number_of_elements() {
            self.status.set_error_condition(
                -5560,
                format!(
                    "The attribute matrix '{}' has {} tuples but the image geometry has {} cells",
                    matrix_path,
                    num_tuples,
                    geometry.number_of_elements()
                ),
            );
            return;
        }

        self.check_bounds(dims);

        for path in &self.cell_attribute_matrix_paths {
            let Some(array) = dca.get_prereq_array(&mut self.status, path, None) else {
                continue;
            };
            let check = CheckInitialization {
                init_type: self.init_type,
                init_value: self.init_value,
                init_range: self.init_range,
                array_name: path.data_array_name.clone(),
            };
            if let Some((code, message)) = check.execute(array.dtype()) {
                self.status.set_error_condition(code, message);
            }
        }
        if self.status.error_code() < 0 {
            return;
        }
        dca.validate_number_of_tuples(&mut self.status, &self.cell_attribute_matrix_paths);
    }

    #[tracing::instrument(level = "DEBUG", skip(self, dca))]
    fn execute(&mut self, dca: &mut DataContainerArray) {
        self.data_check(dca);
        if self.status.error_code() < 0 || self.status.is_canceled() {
            return;
        }
        let Some(dims) = self
            .cell_attribute_matrix_paths
            .first()
            .and_then(|p| dca.get_data_container(&p.data_container_name))
            .and_then(|dc| dc.image_geometry())
            .map(|g| g.dimensions)
        else {
            return;
        };
        let region = self.region();

        for path in &self.cell_attribute_matrix_paths {
            if self.status.is_canceled() {
                return;
            }
            let Some(array) = dca.get_array_mut(path) else {
                continue;
            };
            let dtype = array.dtype();
            event!(Level::DEBUG, array = %path, %dtype, init_type = %self.init_type, "initializing");
            InitializeArray {
                array,
                dims,
                region,
                invert: self.invert_data,
                init_type: self.init_type,
                init_value: self.init_value,
                init_range: self.init_range,
                seed: clock_seed(),
            }
            .execute(dtype);
            // Successive arrays must not share a clock seed.
            std::thread::sleep(Duration::from_millis(1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::ParameterIo;
    use crate::test_utils;

    /// Dimensions of the grid built by `test_utils::cell_data_structure`.
    fn dims(dca: &DataContainerArray) -> SizeVec3 {
        dca.get_data_container("DataContainer")
            .and_then(|dc| dc.image_geometry())
            .unwrap()
            .dimensions
    }

    fn filter(paths: &[&str]) -> InitializeData {
        InitializeData {
            cell_attribute_matrix_paths: paths
                .iter()
                .map(|name| test_utils::cell_array_path(name))
                .collect(),
            x_min: 1,
            y_min: 1,
            z_min: 0,
            x_max: 2,
            y_max: 2,
            z_max: 0,
            ..Default::default()
        }
    }

    fn phases(dca: &DataContainerArray) -> Vec<i32> {
        dca.get_array(&test_utils::cell_array_path("Phases"))
            .and_then(|a| a.as_typed::<i32>())
            .unwrap()
            .as_slice()
            .to_vec()
    }

    #[test]
    fn no_arrays_selected() {
        let mut dca = test_utils::cell_data_structure();
        let mut filter = InitializeData::new();
        filter.preflight(&mut dca);
        assert_eq!(-5550, filter.error_code());
    }

    #[test]
    fn bounds_are_all_checked() {
        let mut dca = test_utils::cell_data_structure();
        let d = dims(&dca);
        let mut filter = filter(&["Phases"]);
        filter.x_min = 3;
        filter.x_max = 2;
        filter.y_min = -1;
        filter.z_max = d.z() as i64;
        filter.preflight(&mut dca);
        let codes: Vec<i32> = filter
            .status()
            .messages()
            .iter()
            .filter(|m| m.is_error())
            .map(|m| m.code)
            .collect();
        assert_eq!(vec![-5551, -5555, -5559], codes);
        assert_eq!(-5559, filter.error_code());
    }

    #[test]
    fn manual_value_out_of_range() {
        let mut dca = test_utils::cell_data_structure();
        let mut filter = filter(&["Phases"]);
        filter.init_value = 1e12;
        filter.preflight(&mut dca);
        assert_eq!(-4000, filter.error_code());
    }

    #[test]
    fn random_range_checks() {
        let mut dca = test_utils::cell_data_structure();
        let mut filter = filter(&["Phases"]);
        filter.init_type = InitType::RandomWithRange;
        filter.init_range = (5.0, 1.0);
        filter.preflight(&mut dca);
        assert_eq!(-5550, filter.error_code());
        filter.init_range = (0.0, 1e12);
        filter.preflight(&mut dca);
        assert_eq!(-4001, filter.error_code());
        filter.init_range = (3.0, 3.0);
        filter.preflight(&mut dca);
        assert_eq!(-4002, filter.error_code());
        filter.init_range = (3.0, 4.0);
        filter.preflight(&mut dca);
        assert_eq!(0, filter.error_code());
    }

    #[test]
    fn missing_array() {
        let mut dca = test_utils::cell_data_structure();
        let mut filter = filter(&["Phases", "Missing"]);
        filter.preflight(&mut dca);
        assert_eq!(-90002, filter.error_code());
    }

    #[test]
    fn manual_fills_inclusive_box() {
        let mut dca = test_utils::cell_data_structure();
        let d = dims(&dca);
        let mut filter = filter(&["Phases"]);
        filter.init_value = 7.0;
        filter.execute(&mut dca);
        assert_eq!(0, filter.error_code());
        let values = phases(&dca);
        for (index, value) in values.iter().enumerate() {
            let i = index % d.x();
            let j = (index / d.x()) % d.y();
            let k = index / (d.x() * d.y());
            let inside = (1..=2).contains(&i) && (1..=2).contains(&j) && k == 0;
            assert_eq!(if inside { 7 } else { 0 }, *value, "voxel {} {} {}", i, j, k);
        }
    }

    #[test]
    fn inverted_fills_outside_box() {
        let mut dca = test_utils::cell_data_structure();
        let mut filter = filter(&["Phases"]);
        filter.init_value = -2.0;
        filter.invert_data = true;
        filter.execute(&mut dca);
        let values = phases(&dca);
        assert_eq!(values.len() - 4, values.iter().filter(|v| **v == -2).count());
        assert_eq!(4, values.iter().filter(|v| **v == 0).count());
    }

    #[test]
    fn random_with_range_fills_every_component() {
        let mut dca = test_utils::cell_data_structure();
        let d = dims(&dca);
        let mut filter = filter(&["Euler", "Phases"]);
        filter.init_type = InitType::RandomWithRange;
        filter.init_range = (10.0, 20.0);
        filter.x_min = 0;
        filter.y_min = 0;
        filter.x_max = d.x() as i64 - 1;
        filter.y_max = d.y() as i64 - 1;
        filter.z_max = d.z() as i64 - 1;
        filter.execute(&mut dca);
        assert_eq!(0, filter.error_code());
        let euler = dca
            .get_array(&test_utils::cell_array_path("Euler"))
            .and_then(|a| a.as_typed::<f32>())
            .unwrap();
        for tuple in euler.as_slice().chunks(3) {
            assert!((10.0..=20.0).contains(&tuple[0]));
            // One draw per tuple.
            assert_eq!(tuple[0], tuple[1]);
            assert_eq!(tuple[0], tuple[2]);
        }
        assert!(phases(&dca).iter().all(|v| (10..=20).contains(v)));
    }

    #[test]
    fn random_full_range_float() {
        let mut dca = test_utils::cell_data_structure();
        let mut filter = filter(&["Euler"]);
        filter.init_type = InitType::Random;
        filter.execute(&mut dca);
        assert_eq!(0, filter.error_code());
        let euler = dca
            .get_array(&test_utils::cell_array_path("Euler"))
            .and_then(|a| a.as_typed::<f32>())
            .unwrap();
        assert!(euler.as_slice().iter().all(|v| v.is_finite() && *v >= 0.0));
    }

    #[test]
    fn voxels_visited_in_order() {
        let dims = SizeVec3::new([3, 2, 2]);
        let region = Range3D::new(1, 3, 0, 1, 1, 2).unwrap();
        let mut inside = vec![];
        for_each_voxel(dims, region, false, |index| inside.push(index));
        assert_eq!(vec![7, 8], inside);
        let mut outside = vec![];
        for_each_voxel(dims, region, true, |index| outside.push(index));
        assert_eq!(10, outside.len());
        assert!(outside.windows(2).all(|w| w[0] < w[1]));
        assert!(!outside.contains(&7) && !outside.contains(&8));
    }

    #[test]
    fn canceled_before_execute() {
        let mut dca = test_utils::cell_data_structure();
        let mut filter = filter(&["Phases"]);
        filter.init_value = 7.0;
        filter.status().cancel_token().cancel();
        filter.execute(&mut dca);
        assert!(phases(&dca).iter().all(|v| *v == 0));
    }

    #[test]
    fn parameters_round_trip() {
        let mut filter = filter(&["Phases"]);
        filter.init_type = InitType::RandomWithRange;
        filter.init_range = (1.0, 2.5);
        let json = filter.write_parameters();
        let mut other = InitializeData::new();
        other.read_parameters(&json).unwrap();
        assert_eq!(filter.cell_attribute_matrix_paths, other.cell_attribute_matrix_paths);
        assert_eq!(InitType::RandomWithRange, other.init_type);
        assert_eq!((1.0, 2.5), other.init_range);
        assert_eq!(2, other.x_max);
    }
}
