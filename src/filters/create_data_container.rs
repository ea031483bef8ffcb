//! Create an empty data container.

use crate::data_container_array::DataContainerArray;
use crate::filter::{DeclaresParameters, Filter, FilterParameter, FilterStatus};
use crate::filter_parameter;

#[derive(Clone, Debug)]
pub struct CreateDataContainer {
    status: FilterStatus,
    pub created_data_container: String,
}

impl Default for CreateDataContainer {
    fn default() -> Self {
        CreateDataContainer {
            status: FilterStatus::new("Create Data Container"),
            created_data_container: "DataContainer".to_string(),
        }
    }
}

impl CreateDataContainer {
    pub fn new(name: impl Into<String>) -> Self {
        CreateDataContainer {
            created_data_container: name.into(),
            ..Default::default()
        }
    }
}

impl DeclaresParameters for CreateDataContainer {
    fn filter_parameters() -> Vec<FilterParameter<Self>> {
        vec![filter_parameter!(
            CreateDataContainer,
            "Data Container Name",
            "CreatedDataContainer",
            CreatedArray,
            created_data_container
        )]
    }
}

impl Filter for CreateDataContainer {
    fn name_of_class(&self) -> &str {
        "CreateDataContainer"
    }

    fn human_label(&self) -> &str {
        self.status.human_label()
    }

    fn uuid(&self) -> &str {
        "{816fbe6b-7c38-581b-b149-3f839fb65b93}"
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
        dca.create_non_prereq_data_container(&mut self.status, &self.created_data_container);
    }

    fn execute(&mut self, dca: &mut DataContainerArray) {
        self.data_check(dca);
    }
}
