//! Create an array in an existing attribute matrix, filled with one value.

use crate::array::IDataArray;
use crate::data_container_array::DataContainerArray;
use crate::filter::{DeclaresParameters, Filter, FilterParameter, FilterStatus};
use crate::filter_parameter;
use crate::models::{DType, DataArrayPath};
use crate::operation::{Element, ElementOperation, Operation};

#[derive(Clone, Debug)]
pub struct CreateDataArray {
    status: FilterStatus,
    pub new_array: DataArrayPath,
    pub scalar_type: DType,
    pub number_of_components: usize,
    pub initialization_value: f64,
}

impl Default for CreateDataArray {
    fn default() -> Self {
        CreateDataArray {
            status: FilterStatus::new("Create Data Array"),
            new_array: DataArrayPath::default(),
            scalar_type: DType::Int8,
            number_of_components: 1,
            initialization_value: 0.0,
        }
    }
}

impl CreateDataArray {
    pub fn new(new_array: DataArrayPath, scalar_type: DType, number_of_components: usize) -> Self {
        CreateDataArray {
            new_array,
            scalar_type,
            number_of_components,
            ..Default::default()
        }
    }
}

impl DeclaresParameters for CreateDataArray {
    fn filter_parameters() -> Vec<FilterParameter<Self>> {
        vec![
            filter_parameter!(CreateDataArray, "Scalar Type", "ScalarType", Parameter, scalar_type),
            filter_parameter!(
                CreateDataArray,
                "Number of Components",
                "NumberOfComponents",
                Parameter,
                number_of_components
            ),
            filter_parameter!(
                CreateDataArray,
                "Initialization Value",
                "InitializationValue",
                Parameter,
                initialization_value
            ),
            filter_parameter!(
                CreateDataArray,
                "Created Attribute Array",
                "NewArray",
                CreatedArray,
                new_array
            ),
        ]
    }
}

/// Whether `value` is representable by the element type.
struct ValueInRange(f64);

impl ElementOperation for ValueInRange {
    type Output = bool;

    fn execute_t<T: Element>(self) -> bool {
        T::DTYPE == DType::Bool
            || (self.0 >= T::lowest().to_f64() && self.0 <= T::highest().to_f64())
    }
}

struct Fill<'a>(&'a mut IDataArray, f64);

impl ElementOperation for Fill<'_> {
    type Output = ();

    fn execute_t<T: Element>(self) {
        if let Some(array) = self.0.as_typed_mut::<T>() {
            array.initialize_with_value(T::from_f64(self.1));
        }
    }
}

impl Filter for CreateDataArray {
    fn name_of_class(&self) -> &str {
        "CreateDataArray"
    }

    fn human_label(&self) -> &str {
        self.status.human_label()
    }

    fn uuid(&self) -> &str {
        "{77f392fb-c1eb-57da-a1b1-e7acf9239fb8}"
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

        if self.number_of_components == 0 {
            self.status.set_error_condition(
                -8051,
                "The number of components is Zero. This will result in an array that has no memory allocated.",
            );
            return;
        }
        if !ValueInRange(self.initialization_value).execute(self.scalar_type) {
            self.status.set_error_condition(
                -4050,
                format!(
                    "{}: The initialization value {} can not be represented as {}",
                    self.new_array.data_array_name, self.initialization_value, self.scalar_type
                ),
            );
            return;
        }
        dca.create_non_prereq_array(
            &mut self.status,
            &self.new_array,
            self.scalar_type,
            vec![self.number_of_components],
        );
    }

    fn execute(&mut self, dca: &mut DataContainerArray) {
        self.data_check(dca);
        if self.status.error_code() < 0 {
            return;
        }
        if let Some(array) = dca.get_array_mut(&self.new_array) {
            Fill(array, self.initialization_value).execute(self.scalar_type);
        }
    }
}
