//! Placeholder for a filter a pipeline document names but no factory provides.

use crate::data_container_array::DataContainerArray;
use crate::filter::{DeclaresParameters, Filter, FilterParameter, FilterStatus};
use crate::filter_parameter;

/// Error code recorded by every check of an [EmptyFilter].
pub const EMPTY_FILTER_CODE: i32 = -9999;

/// Does nothing except fail its checks, so a pipeline holding an enabled placeholder never runs.
#[derive(Clone, Debug)]
pub struct EmptyFilter {
    status: FilterStatus,
    original_filter_name: String,
}

impl EmptyFilter {
    pub fn new(original_filter_name: &str) -> Self {
        EmptyFilter {
            status: FilterStatus::new(format!("UNKNOWN FILTER: {}", original_filter_name)),
            original_filter_name: original_filter_name.to_string(),
        }
    }

    /// Class name of the filter this one stands in for.
    pub fn original_filter_name(&self) -> &str {
        &self.original_filter_name
    }
}

impl DeclaresParameters for EmptyFilter {
    fn filter_parameters() -> Vec<FilterParameter<Self>> {
        vec![filter_parameter!(
            EmptyFilter,
            "Original Filter",
            "OriginalFilterName",
            Parameter,
            original_filter_name
        )]
    }
}

impl Filter for EmptyFilter {
    fn name_of_class(&self) -> &str {
        "EmptyFilter"
    }

    fn human_label(&self) -> &str {
        self.status.human_label()
    }

    fn uuid(&self) -> &str {
        "{0af0e81f-1f98-5734-a38a-74cfccd6e6f8}"
    }

    fn status(&self) -> &FilterStatus {
        &self.status
    }

    fn status_mut(&mut self) -> &mut FilterStatus {
        &mut self.status
    }

    fn data_check(&mut self, _dca: &mut DataContainerArray) {
        let message = format!(
            "This filter does nothing and was inserted as a place holder for filter '{}' that does not exist anymore.",
            self.original_filter_name
        );
        self.status.set_error_condition(EMPTY_FILTER_CODE, message);
    }

    fn execute(&mut self, dca: &mut DataContainerArray) {
        self.data_check(dca);
    }
}
