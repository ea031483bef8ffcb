//! Attach an image geometry to an existing data container.

use crate::data_container_array::DataContainerArray;
use crate::filter::{DeclaresParameters, Filter, FilterParameter, FilterStatus};
use crate::filter_parameter;
use crate::geometry::ImageGeom;
use crate::models::LengthUnit;
use crate::types::{FloatVec3, SizeVec3};

#[derive(Clone, Debug)]
pub struct CreateImageGeometry {
    status: FilterStatus,
    pub selected_data_container: String,
    pub dimensions: SizeVec3,
    pub spacing: FloatVec3,
    pub origin: FloatVec3,
    pub length_unit: LengthUnit,
}

impl Default for CreateImageGeometry {
    fn default() -> Self {
        CreateImageGeometry {
            status: FilterStatus::new("Create Geometry (Image)"),
            selected_data_container: String::new(),
            dimensions: SizeVec3::new([0, 0, 0]),
            spacing: FloatVec3::new([1.0, 1.0, 1.0]),
            origin: FloatVec3::new([0.0, 0.0, 0.0]),
            length_unit: LengthUnit::default(),
        }
    }
}

impl CreateImageGeometry {
    pub fn new(data_container: impl Into<String>, geometry: &ImageGeom) -> Self {
        CreateImageGeometry {
            selected_data_container: data_container.into(),
            dimensions: geometry.dimensions,
            spacing: geometry.spacing,
            origin: geometry.origin,
            length_unit: geometry.units,
            ..Default::default()
        }
    }
}

impl DeclaresParameters for CreateImageGeometry {
    fn filter_parameters() -> Vec<FilterParameter<Self>> {
        vec![
            filter_parameter!(
                CreateImageGeometry,
                "Data Container Destination",
                "SelectedDataContainer",
                RequiredArray,
                selected_data_container
            ),
            filter_parameter!(
                CreateImageGeometry,
                "Dimensions",
                "Dimensions",
                Parameter,
                dimensions
            ),
            filter_parameter!(CreateImageGeometry, "Spacing", "Spacing", Parameter, spacing),
            filter_parameter!(CreateImageGeometry, "Origin", "Origin", Parameter, origin),
            filter_parameter!(
                CreateImageGeometry,
                "Length Unit",
                "LengthUnit",
                Parameter,
                length_unit
            ),
        ]
    }
}

impl Filter for CreateImageGeometry {
    fn name_of_class(&self) -> &str {
        "CreateImageGeometry"
    }

    fn human_label(&self) -> &str {
        self.status.human_label()
    }

    fn uuid(&self) -> &str {
        "{f2132744-3abb-5d66-9cd9-c9a233b5c4aa}"
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

        if self.dimensions.iter().any(|d| *d == 0) {
            self.status.set_error_condition(
                -390,
                "One of the dimensions has a size less than or equal to zero. The minimum size must be positive",
            );
        }
        if self.selected_data_container.is_empty() {
            self.status
                .set_error_condition(-391, "The Data Container must have a name");
            return;
        }
        if dca
            .get_prereq_data_container(&mut self.status, &self.selected_data_container)
            .is_none()
            || self.status.error_code() < 0
        {
            return;
        }
        let mut geometry = ImageGeom::new(self.dimensions, self.spacing, self.origin);
        geometry.units = self.length_unit;
        if let Some(dc) = dca.get_data_container_mut(&self.selected_data_container) {
            dc.set_geometry(geometry);
        }
    }

    fn execute(&mut self, dca: &mut DataContainerArray) {
        self.data_check(dca);
    }
}
