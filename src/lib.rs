//! This crate provides the core of a filter pipeline engine for volumetric materials data.
//!
//! Data lives in a [DataContainerArray](data_container_array::DataContainerArray): named data
//! containers, each holding an optional geometry and named attribute matrices of typed,
//! multi-component [arrays](array). Grid montages group data containers into a 3D arrangement of
//! tiles.
//!
//! A [FilterPipeline](filter_pipeline::FilterPipeline) runs an ordered list of
//! [filters](filter::Filter) against that structure in two phases. Preflight checks every filter
//! against placeholders without touching data; execute then runs each filter for real. Filters
//! report problems as negative error codes and messages, and pipelines can be saved to and read
//! from JSON documents.
//!
//! The crate is built on top of a number of open source components.
//!
//! * [ndarray] provides n-dimensional views of array data and the rotation matrices used when
//!   resampling.
//! * [Rayon](rayon) runs the parallel parts of filters.
//! * [Serde](serde) performs (de)serialisation of pipeline documents and montage records.
//! * [tracing] emits structured logs from pipelines, filters and the runner.

pub mod array;
pub mod attribute_matrix;
pub mod cli;
pub mod data_container;
pub mod data_container_array;
pub mod error;
pub mod filter;
pub mod filter_pipeline;
pub mod filters;
pub mod geometry;
pub mod messages;
pub mod models;
pub mod montage;
pub mod operation;
pub mod runner;
#[cfg(test)]
pub mod test_utils;
pub mod tracing;
pub mod types;
