//! Replace every occurrence of one value in a scalar array.

use crate::array::IDataArray;
use crate::data_container_array::DataContainerArray;
use crate::filter::{DeclaresParameters, Filter, FilterParameter, FilterStatus};
use crate::filter_parameter;
use crate::models::{DType, DataArrayPath};
use crate::operation::{Element, ElementOperation, Operation};

/// Replace Value filter
#[derive(Clone, Debug)]
pub struct ReplaceValueInArray {
    status: FilterStatus,
    pub selected_array: DataArrayPath,
    pub remove_value: f64,
    pub replace_value: f64,
}

impl Default for ReplaceValueInArray {
    fn default() -> Self {
        ReplaceValueInArray {
            status: FilterStatus::new("Replace Value"),
            selected_array: DataArrayPath::default(),
            remove_value: 0.0,
            replace_value: 0.0,
        }
    }
}

impl ReplaceValueInArray {
    pub fn new(selected_array: DataArrayPath, remove_value: f64, replace_value: f64) -> Self {
        ReplaceValueInArray {
            selected_array,
            remove_value,
            replace_value,
            ..Default::default()
        }
    }
}

impl DeclaresParameters for ReplaceValueInArray {
    fn filter_parameters() -> Vec<FilterParameter<Self>> {
        vec![
            filter_parameter!(
                ReplaceValueInArray,
                "Value to Replace",
                "RemoveValue",
                Parameter,
                remove_value
            ),
            filter_parameter!(
                ReplaceValueInArray,
                "New Value",
                "ReplaceValue",
                Parameter,
                replace_value
            ),
            filter_parameter!(
                ReplaceValueInArray,
                "Attribute Array",
                "SelectedArray",
                RequiredArray,
                selected_array
            ),
        ]
    }
}

/// Check that a user value is representable by the element type.
///
/// Returns the error code when it is not.
struct CheckValue(f64);

impl ElementOperation for CheckValue {
    type Output = Option<i32>;

    fn execute_t<T: Element>(self) -> Option<i32> {
        let value = self.0;
        match T::DTYPE {
            DType::Bool => None,
            DType::Float32 | DType::Float64 => {
                let min = T::min_positive().to_f64();
                let max = T::highest().to_f64();
                let magnitude = value.abs();
                let valid = value == 0.0 || (magnitude >= min && magnitude <= max);
                (!valid).then_some(-101)
            }
            _ => {
                let valid = value >= T::lowest().to_f64() && value <= T::highest().to_f64();
                (!valid).then_some(-100)
            }
        }
    }
}

/// Replace exact matches in place. Returns the number of values replaced.
struct Replace<'a> {
    array: &'a mut IDataArray,
    remove_value: f64,
    replace_value: f64,
}

impl ElementOperation for Replace<'_> {
    type Output = usize;

    fn execute_t<T: Element>(self) -> usize {
        let Some(array) = self.array.as_typed_mut::<T>() else {
            return 0;
        };
        let remove = T::from_f64(self.remove_value);
        let replace = T::from_f64(self.replace_value);
        let mut count = 0;
        for value in array.as_mut_slice().iter_mut().filter(|v| **v == remove) {
            *value = replace;
            count += 1;
        }
        count
    }
}

impl Filter for ReplaceValueInArray {
    fn name_of_class(&self) -> &str {
        "ReplaceValueInArray"
    }

    fn human_label(&self) -> &str {
        self.status.human_label()
    }

    fn uuid(&self) -> &str {
        "{a37f2e24-7400-5005-b9a7-b2224570cbe9}"
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

        let Some(array) = dca.get_prereq_array(&mut self.status, &self.selected_array, None) else {
            return;
        };
        if array.num_components() > 1 {
            self.status.set_error_condition(
                -11002,
                format!(
                    "Selected array '{}' must be a scalar array (1 component). The number of components is {}",
                    self.selected_array.data_array_name,
                    array.num_components()
                ),
            );
            return;
        }
        let dtype = array.dtype();
        for (label, value) in [("remove", self.remove_value), ("replace", self.replace_value)] {
            if let Some(code) = CheckValue(value).execute(dtype) {
                self.status.set_error_condition(
                    code,
                    format!("The {} {} value {} was invalid", dtype, label, value),
                );
            }
        }
    }

    fn execute(&mut self, dca: &mut DataContainerArray) {
        self.data_check(dca);
        if self.status.error_code() < 0 {
            return;
        }
        let Some(array) = dca.get_array_mut(&self.selected_array) else {
            return;
        };
        let dtype = array.dtype();
        let replaced = Replace {
            array,
            remove_value: self.remove_value,
            replace_value: self.replace_value,
        }
        .execute(dtype);
        tracing::debug!(array = %self.selected_array, replaced, "replaced values");
    }
}
