//! Create an empty attribute matrix in an existing data container.

use crate::data_container_array::DataContainerArray;
use crate::filter::{DeclaresParameters, Filter, FilterParameter, FilterStatus};
use crate::filter_parameter;
use crate::models::{AttributeMatrixType, DataArrayPath};

#[derive(Clone, Debug)]
pub struct CreateAttributeMatrix {
    status: FilterStatus,
    pub created_attribute_matrix: DataArrayPath,
    pub attribute_matrix_type: AttributeMatrixType,
    pub tuple_dimensions: Vec<usize>,
}

impl Default for CreateAttributeMatrix {
    fn default() -> Self {
        CreateAttributeMatrix {
            status: FilterStatus::new("Create Attribute Matrix"),
            created_attribute_matrix: DataArrayPath::default(),
            attribute_matrix_type: AttributeMatrixType::Generic,
            tuple_dimensions: vec![1],
        }
    }
}

impl CreateAttributeMatrix {
    pub fn new(
        path: DataArrayPath,
        attribute_matrix_type: AttributeMatrixType,
        tuple_dimensions: Vec<usize>,
    ) -> Self {
        CreateAttributeMatrix {
            created_attribute_matrix: path,
            attribute_matrix_type,
            tuple_dimensions,
            ..Default::default()
        }
    }
}

impl DeclaresParameters for CreateAttributeMatrix {
    fn filter_parameters() -> Vec<FilterParameter<Self>> {
        vec![
            filter_parameter!(
                CreateAttributeMatrix,
                "Created Attribute Matrix",
                "CreatedAttributeMatrix",
                CreatedArray,
                created_attribute_matrix
            ),
            filter_parameter!(
                CreateAttributeMatrix,
                "Attribute Matrix Type",
                "AttributeMatrixType",
                Parameter,
                attribute_matrix_type
            ),
            filter_parameter!(
                CreateAttributeMatrix,
                "Tuple Dimensions",
                "TupleDimensions",
                Parameter,
                tuple_dimensions
            ),
        ]
    }
}

impl Filter for CreateAttributeMatrix {
    fn name_of_class(&self) -> &str {
        "CreateAttributeMatrix"
    }

    fn human_label(&self) -> &str {
        self.status.human_label()
    }

    fn uuid(&self) -> &str {
        "{93375ef0-7367-5372-addc-baa019b1b341}"
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

        let path = &self.created_attribute_matrix;
        if dca
            .get_prereq_data_container(&mut self.status, &path.data_container_name)
            .is_none()
        {
            return;
        }
        if self.tuple_dimensions.is_empty() {
            self.status.set_error_condition(
                -11000,
                "The tuple dimensions must contain at least one value",
            );
            return;
        }
        dca.create_non_prereq_attribute_matrix(
            &mut self.status,
            path,
            self.tuple_dimensions.clone(),
            self.attribute_matrix_type,
        );
    }

    fn execute(&mut self, dca: &mut DataContainerArray) {
        self.data_check(dca);
    }
}
