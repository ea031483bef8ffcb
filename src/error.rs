//! Error handling.
//!
//! Filters do not return errors from `data_check` or `execute`: they record a negative code and a
//! message on their [FilterStatus](crate::filter::FilterStatus), which the pipeline aggregates.
//! [SimplError] covers everything else: `Result`-returning helpers on the data structure, the
//! JSON and record readers, and the command line runner.

use thiserror::Error;
use tracing::{event, Level};

use crate::models::DType;
use crate::types::range::RangeError;
use crate::types::DValue;

/// Pipeline library error type
///
/// This type encapsulates the various errors that may occur outside of the filter status
/// reporting path.
#[derive(Debug, Error)]
pub enum SimplError {
    /// Index outside of a fixed size vector or range
    #[error(transparent)]
    Range(#[from] RangeError),

    /// A value whose kind does not match the array it is written to
    #[error("incompatible value {value:?} for array of type {dtype}")]
    IncompatibleValue { value: DValue, dtype: DType },

    /// Attempt to add an array whose tuple count differs from its owning attribute matrix
    #[error("array {name} has {actual} tuples but the attribute matrix expects {expected}")]
    TupleCountMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Attempt to combine two arrays with different element types
    #[error("type mismatch: expected {expected}, found {actual}")]
    TypeMismatch { expected: DType, actual: DType },

    /// Tuple index beyond the end of an array
    #[error("tuple index {index} out of bounds for array {name} with {num_tuples} tuples")]
    TupleOutOfBounds {
        name: String,
        index: usize,
        num_tuples: usize,
    },

    /// Error creating ndarray ArrayView from Shape
    #[error("failed to create array from shape")]
    ShapeInvalid(#[from] ndarray::ShapeError),

    /// Error (de)serialising JSON
    #[error("failed to (de)serialise JSON")]
    Json(#[from] serde_json::Error),

    /// Error reading or writing a file
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// Montage record failed validation on read back
    #[error("montage record is not valid")]
    MontageRecordInvalid(#[from] validator::ValidationErrors),

    /// Montage record is structurally broken
    #[error("montage record is not valid: {reason}")]
    MontageRecord { reason: String },

    /// Pipeline document is structurally broken
    #[error("pipeline document is not valid: {reason}")]
    PipelineDocument { reason: String },

    /// Attempt to edit or start a pipeline that is not idle
    #[error("pipeline {name} is busy")]
    PipelineBusy { name: String },

    /// Worker thread of a pipeline runner panicked
    #[error("pipeline worker thread panicked")]
    WorkerPanicked,

    /// A run was requested from a runner that has nothing in flight
    #[error("no pipeline is running")]
    NotRunning,
}

impl SimplError {
    /// Log this error with its chain of causes.
    pub fn log(&self) {
        let mut causes = vec![];
        let mut current = std::error::Error::source(self);
        while let Some(source) = current {
            causes.push(source.to_string());
            current = source.source();
        }
        if causes.is_empty() {
            event!(Level::ERROR, "{}", self);
        } else {
            event!(Level::ERROR, "{} caused by: {}", self, causes.join(": "));
        }
    }
}
