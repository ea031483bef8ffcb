//! Filter implementations.
//!
//! Each module holds one [Filter](crate::filter::Filter). [core_filter_factory] registers all
//! of them except the [EmptyFilter](empty_filter::EmptyFilter) placeholder, which is only ever
//! created when a pipeline document names a filter no factory provides.

pub mod create_attribute_matrix;
pub mod create_data_array;
pub mod create_data_container;
pub mod create_grid_montage;
pub mod create_image_geometry;
pub mod empty_filter;
pub mod generate_tilt_series;
pub mod initialize_data;
pub mod replace_value_in_array;

use crate::filter_pipeline::FilterFactory;

/// Return a factory that can create every filter in this crate.
pub fn core_filter_factory() -> FilterFactory {
    let mut factory = FilterFactory::new();
    factory.register(|| Box::new(create_attribute_matrix::CreateAttributeMatrix::default()));
    factory.register(|| Box::new(create_data_array::CreateDataArray::default()));
    factory.register(|| Box::new(create_data_container::CreateDataContainer::default()));
    factory.register(|| Box::new(create_grid_montage::CreateGridMontage::default()));
    factory.register(|| Box::new(create_image_geometry::CreateImageGeometry::default()));
    factory.register(|| Box::new(generate_tilt_series::GenerateTiltSeries::default()));
    factory.register(|| Box::new(initialize_data::InitializeData::default()));
    factory.register(|| Box::new(replace_value_in_array::ReplaceValueInArray::default()));
    factory
}
