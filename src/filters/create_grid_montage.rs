//! Register a grid montage over existing data containers.

use crate::data_container_array::DataContainerArray;
use crate::filter::{DeclaresParameters, Filter, FilterParameter, FilterStatus};
use crate::filter_parameter;
use crate::montage::CollectionMethod;
use crate::types::SizeVec3;

/// Create Grid Montage filter
///
/// The container names are listed in collection order and placed onto a grid of `dims`
/// (rows, columns, depth) following `collection_method`.
#[derive(Clone, Debug)]
pub struct CreateGridMontage {
    status: FilterStatus,
    pub montage_name: String,
    pub dims: SizeVec3,
    pub data_container_names: Vec<String>,
    pub collection_method: CollectionMethod,
}

impl Default for CreateGridMontage {
    fn default() -> Self {
        CreateGridMontage {
            status: FilterStatus::new("Create Grid Montage"),
            montage_name: "Grid Montage".to_string(),
            dims: SizeVec3::new([1, 1, 1]),
            data_container_names: vec![],
            collection_method: CollectionMethod::CombOrder,
        }
    }
}

impl CreateGridMontage {
    pub fn new(name: impl Into<String>, dims: SizeVec3, data_container_names: Vec<String>) -> Self {
        CreateGridMontage {
            montage_name: name.into(),
            dims,
            data_container_names,
            ..Default::default()
        }
    }
}

impl DeclaresParameters for CreateGridMontage {
    fn filter_parameters() -> Vec<FilterParameter<Self>> {
        vec![
            filter_parameter!(CreateGridMontage, "Dimensions", "Dims", Parameter, dims),
            filter_parameter!(
                CreateGridMontage,
                "Data Container Grid",
                "DataContainerNames",
                RequiredArray,
                data_container_names
            ),
            filter_parameter!(
                CreateGridMontage,
                "Collection Method",
                "CollectionMethod",
                Parameter,
                collection_method
            ),
            filter_parameter!(
                CreateGridMontage,
                "Created Montage Name",
                "MontageName",
                CreatedArray,
                montage_name
            ),
        ]
    }
}

impl Filter for CreateGridMontage {
    fn name_of_class(&self) -> &str {
        "CreateGridMontage"
    }

    fn human_label(&self) -> &str {
        self.status.human_label()
    }

    fn uuid(&self) -> &str {
        "{5b3a6e12-94f1-5d0c-a7e8-3c2d1b0f6a47}"
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

        let tiles = self.dims.checked_product();
        if tiles != Some(self.data_container_names.len()) {
            self.status.set_error_condition(
                -4966,
                format!(
                    "The grid of size {} needs {} data containers but {} were given",
                    self.dims,
                    tiles.map_or_else(|| "too many".to_string(), |n| n.to_string()),
                    self.data_container_names.len()
                ),
            );
            return;
        }
        for name in &self.data_container_names {
            dca.get_prereq_data_container(&mut self.status, name);
        }
        if self.status.error_code() < 0 {
            return;
        }
        let positions = self.collection_method.positions(self.dims);
        let Some(montage) =
            dca.create_non_prereq_grid_montage(&mut self.status, &self.montage_name, self.dims)
        else {
            return;
        };
        for (pos, name) in positions.into_iter().zip(&self.data_container_names) {
            if let Some(index) = montage.get_tile_index(pos[0], pos[1], pos[2]) {
                montage.set_data_container(&index, Some(name.clone()));
            }
        }
    }

    fn execute(&mut self, dca: &mut DataContainerArray) {
        self.data_check(dca);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn comb_order() {
        let mut dca = test_utils::image_tiles(&["A", "B", "C", "D", "E", "F"]);
        let mut filter = CreateGridMontage::new(
            "Montage",
            SizeVec3::new([2, 3, 1]),
            names(&["A", "B", "C", "D", "E", "F"]),
        );
        filter.execute(&mut dca);
        assert_eq!(0, filter.error_code());
        let montage = dca.get_montage("Montage").unwrap();
        let at = |r, c| {
            let index = montage.get_tile_index(r, c, 0).unwrap();
            montage.get_data_container_name(&index).unwrap().to_string()
        };
        assert_eq!(["A", "B", "C"], [at(0, 0), at(0, 1), at(0, 2)]);
        assert_eq!(["D", "E", "F"], [at(1, 0), at(1, 1), at(1, 2)]);
        assert!(montage.is_valid(&dca));
    }

    #[test]
    fn snake_order() {
        let mut dca = test_utils::image_tiles(&["A", "B", "C", "D", "E", "F"]);
        let mut filter = CreateGridMontage::new(
            "Montage",
            SizeVec3::new([3, 2, 1]),
            names(&["A", "B", "C", "D", "E", "F"]),
        );
        filter.collection_method = CollectionMethod::SnakeOrder;
        filter.execute(&mut dca);
        let montage = dca.get_montage("Montage").unwrap();
        let at = |r, c| {
            let index = montage.get_tile_index(r, c, 0).unwrap();
            montage.get_data_container_name(&index).unwrap().to_string()
        };
        assert_eq!(["A", "B"], [at(0, 0), at(0, 1)]);
        assert_eq!(["D", "C"], [at(1, 0), at(1, 1)]);
        assert_eq!(["E", "F"], [at(2, 0), at(2, 1)]);
    }

    #[test]
    fn missing_container() {
        let mut dca = test_utils::image_tiles(&["A"]);
        let mut filter =
            CreateGridMontage::new("Montage", SizeVec3::new([2, 1, 1]), names(&["A", "Z"]));
        filter.preflight(&mut dca);
        assert_eq!(-999, filter.error_code());
        assert!(dca.get_montage("Montage").is_none());
    }

    #[test]
    fn wrong_count_and_duplicate() {
        let mut dca = test_utils::image_tiles(&["A", "B"]);
        let mut filter =
            CreateGridMontage::new("Montage", SizeVec3::new([2, 2, 1]), names(&["A", "B"]));
        filter.preflight(&mut dca);
        assert_eq!(-4966, filter.error_code());
        filter.dims = SizeVec3::new([1, 2, 1]);
        filter.preflight(&mut dca);
        assert_eq!(0, filter.error_code());
        filter.preflight(&mut dca);
        assert_eq!(-4960, filter.error_code());
    }

    #[test]
    fn overflowing_dims() {
        let mut dca = test_utils::image_tiles(&["A", "B"]);
        let mut filter = CreateGridMontage::new(
            "Montage",
            SizeVec3::new([usize::MAX, 2, 1]),
            names(&["A", "B"]),
        );
        filter.preflight(&mut dca);
        assert_eq!(-4966, filter.error_code());
    }
}
