//! The filter contract.
//!
//! A filter runs in two phases against a [DataContainerArray]:
//!
//! * `preflight` validates parameters and creates unallocated placeholders for everything it
//!   will create, so later filters can be validated without moving any data.
//! * `execute` re-runs the same checks, then does the work on allocated arrays.
//!
//! Problems are not returned as errors. A filter records a negative code and a message on its
//! [FilterStatus]; callers check `error_code() < 0` after every step.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;
use serde_json::{Map, Value};
use strum_macros::Display;
use tracing::{event, Level};

use crate::data_container_array::DataContainerArray;
use crate::error::SimplError;
use crate::messages::PipelineMessage;

/// Shared cancellation flag.
///
/// Cloning yields a handle to the same flag. Filters poll it between units of work.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Lifecycle state of a filter within a pipeline
#[derive(Clone, Copy, Debug, Default, Display, Eq, PartialEq)]
pub enum FilterState {
    #[default]
    Idle,
    /// Preflight passed
    Ready,
    Executing,
    Completed,
    Cancelled,
    Disabled,
    Error,
}

/// Error and message bookkeeping shared by every filter.
#[derive(Clone, Debug)]
pub struct FilterStatus {
    human_label: String,
    error_code: i32,
    warning_code: i32,
    messages: Vec<PipelineMessage>,
    in_preflight: bool,
    enabled: bool,
    pipeline_index: usize,
    state: FilterState,
    cancel: CancelToken,
    sender: Option<Sender<PipelineMessage>>,
}

impl FilterStatus {
    /// Return a new FilterStatus for a filter with the given human label.
    pub fn new(human_label: impl Into<String>) -> Self {
        FilterStatus {
            human_label: human_label.into(),
            error_code: 0,
            warning_code: 0,
            messages: vec![],
            in_preflight: false,
            enabled: true,
            pipeline_index: 0,
            state: FilterState::Idle,
            cancel: CancelToken::new(),
            sender: None,
        }
    }

    pub fn human_label(&self) -> &str {
        &self.human_label
    }

    pub fn set_human_label(&mut self, label: impl Into<String>) {
        self.human_label = label.into();
    }

    pub fn error_code(&self) -> i32 {
        self.error_code
    }

    pub fn warning_code(&self) -> i32 {
        self.warning_code
    }

    /// Record an error and notify observers.
    pub fn set_error_condition(&mut self, code: i32, message: impl Into<String>) {
        let message = message.into();
        event!(Level::DEBUG, label = %self.human_label, code, "{}", message);
        self.error_code = code;
        self.notify(PipelineMessage::error(&self.human_label, message, code));
    }

    /// Record a warning and notify observers.
    pub fn set_warning_condition(&mut self, code: i32, message: impl Into<String>) {
        self.warning_code = code;
        let message = PipelineMessage::warning(&self.human_label, message, code);
        self.notify(message);
    }

    pub fn clear_error_code(&mut self) {
        self.error_code = 0;
    }

    pub fn clear_warning_code(&mut self) {
        self.warning_code = 0;
    }

    pub fn notify_status_message(&mut self, message: impl Into<String>) {
        let message = PipelineMessage::status(&self.human_label, message);
        self.notify(message);
    }

    pub fn notify_progress(&mut self, progress: i32, message: impl Into<String>) {
        let message = PipelineMessage::progress(&self.human_label, message, progress);
        self.notify(message);
    }

    fn notify(&mut self, message: PipelineMessage) {
        let message = message.at_index(self.pipeline_index);
        if let Some(sender) = &self.sender {
            // A dropped receiver only means nobody is listening.
            let _ = sender.send(message.clone());
        }
        self.messages.push(message);
    }

    /// Messages recorded since the last call to `clear_messages`.
    pub fn messages(&self) -> &[PipelineMessage] {
        &self.messages
    }

    /// Most recent error message, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.is_error())
            .map(|m| m.text.as_str())
    }

    pub fn clear_messages(&mut self) {
        self.messages.clear();
    }

    pub fn in_preflight(&self) -> bool {
        self.in_preflight
    }

    pub fn set_in_preflight(&mut self, in_preflight: bool) {
        self.in_preflight = in_preflight;
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn pipeline_index(&self) -> usize {
        self.pipeline_index
    }

    pub fn set_pipeline_index(&mut self, index: usize) {
        self.pipeline_index = index;
    }

    pub fn state(&self) -> FilterState {
        self.state
    }

    pub fn set_state(&mut self, state: FilterState) {
        self.state = state;
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Share a pipeline wide cancellation flag with this filter.
    pub fn set_cancel_token(&mut self, cancel: CancelToken) {
        self.cancel = cancel;
    }

    pub fn is_canceled(&self) -> bool {
        self.cancel.is_canceled()
    }

    /// Forward every future message to `sender` as well as recording it.
    pub fn set_message_sender(&mut self, sender: Option<Sender<PipelineMessage>>) {
        self.sender = sender;
    }
}

/// Grouping of a parameter in a filter's user interface
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum ParameterCategory {
    Parameter,
    RequiredArray,
    CreatedArray,
    Uncategorized,
}

/// A user facing filter parameter.
///
/// The getter and setter translate between the filter's field and its JSON form.
pub struct FilterParameter<F> {
    pub human_label: &'static str,
    pub property_name: &'static str,
    pub category: ParameterCategory,
    pub getter: fn(&F) -> Value,
    pub setter: fn(&mut F, &Value) -> Result<(), serde_json::Error>,
}

/// Declare a [FilterParameter] backed by a serde (de)serialisable field.
///
/// # Arguments
///
/// * `$filter`: Filter type
/// * `$label`: Human label
/// * `$property`: Property name used in pipeline documents
/// * `$category`: [ParameterCategory] variant
/// * `$field`: Field of the filter holding the value
#[macro_export]
macro_rules! filter_parameter {
    ($filter:ty, $label:expr, $property:expr, $category:ident, $field:ident) => {
        $crate::filter::FilterParameter::<$filter> {
            human_label: $label,
            property_name: $property,
            category: $crate::filter::ParameterCategory::$category,
            getter: |f| serde_json::to_value(&f.$field).unwrap_or(serde_json::Value::Null),
            setter: |f, v| {
                f.$field = serde_json::from_value(v.clone())?;
                Ok(())
            },
        }
    };
}

/// Filters that declare their parameters.
pub trait DeclaresParameters: Sized {
    fn filter_parameters() -> Vec<FilterParameter<Self>>;
}

/// Reading and writing parameters in pipeline documents.
pub trait ParameterIo {
    /// Returns `property name -> value` for every declared parameter.
    fn write_parameters(&self) -> Map<String, Value>;

    /// Set every declared parameter present in `parameters`. Absent ones keep their value.
    fn read_parameters(&mut self, parameters: &Map<String, Value>) -> Result<(), SimplError>;

    /// Returns `(human label, property name, category)` for every declared parameter.
    fn parameter_descriptions(&self) -> Vec<(&'static str, &'static str, ParameterCategory)>;
}

impl<F: DeclaresParameters> ParameterIo for F {
    fn write_parameters(&self) -> Map<String, Value> {
        F::filter_parameters()
            .into_iter()
            .map(|p| (p.property_name.to_string(), (p.getter)(self)))
            .collect()
    }

    fn read_parameters(&mut self, parameters: &Map<String, Value>) -> Result<(), SimplError> {
        for p in F::filter_parameters() {
            if let Some(value) = parameters.get(p.property_name) {
                (p.setter)(self, value)?;
            }
        }
        Ok(())
    }

    fn parameter_descriptions(&self) -> Vec<(&'static str, &'static str, ParameterCategory)> {
        F::filter_parameters()
            .into_iter()
            .map(|p| (p.human_label, p.property_name, p.category))
            .collect()
    }
}

/// Trait for pipeline filters.
///
/// This forms the contract between the pipeline engine and individual algorithms.
pub trait Filter: ParameterIo + Send {
    /// Stable class name used in pipeline documents.
    fn name_of_class(&self) -> &str;

    /// Display name.
    fn human_label(&self) -> &str;

    /// Stable unique identifier of the filter class.
    fn uuid(&self) -> &str;

    fn group_name(&self) -> &str {
        "Core"
    }

    fn status(&self) -> &FilterStatus;

    fn status_mut(&mut self) -> &mut FilterStatus;

    /// Validate parameters against `dca` and create placeholders for outputs.
    ///
    /// # Arguments
    ///
    /// * `dca`: The data structure built by preceding filters
    fn data_check(&mut self, dca: &mut DataContainerArray);

    /// Run the algorithm.
    ///
    /// Implementations call `data_check` first and return if it records an error.
    fn execute(&mut self, dca: &mut DataContainerArray);

    /// Validate without touching any data.
    fn preflight(&mut self, dca: &mut DataContainerArray) {
        self.status_mut().set_in_preflight(true);
        self.data_check(dca);
        self.status_mut().set_in_preflight(false);
    }

    fn error_code(&self) -> i32 {
        self.status().error_code()
    }

    fn warning_code(&self) -> i32 {
        self.status().warning_code()
    }

    fn enabled(&self) -> bool {
        self.status().enabled()
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.status_mut().set_enabled(enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[derive(Default)]
    struct Counter {
        status: Option<FilterStatus>,
        count: u32,
        label: String,
    }

    impl DeclaresParameters for Counter {
        fn filter_parameters() -> Vec<FilterParameter<Self>> {
            vec![
                filter_parameter!(Counter, "Count", "Count", Parameter, count),
                filter_parameter!(Counter, "Label", "Label", Uncategorized, label),
            ]
        }
    }

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_canceled());
        token.cancel();
        assert!(other.is_canceled());
        other.reset();
        assert!(!token.is_canceled());
    }

    #[test]
    fn status_records_and_forwards_messages() {
        let (tx, rx) = unbounded();
        let mut status = FilterStatus::new("Test Filter");
        status.set_pipeline_index(4);
        status.set_message_sender(Some(tx));
        status.set_error_condition(-5550, "no arrays");
        status.set_warning_condition(-1, "careful");
        assert_eq!(-5550, status.error_code());
        assert_eq!(-1, status.warning_code());
        assert_eq!(Some("no arrays"), status.error_message());
        let forwarded: Vec<_> = rx.try_iter().collect();
        assert_eq!(2, forwarded.len());
        assert_eq!(Some(4), forwarded[0].pipeline_index);
        assert_eq!("Test Filter", forwarded[0].prefix);
        status.clear_error_code();
        status.clear_warning_code();
        assert_eq!((0, 0), (status.error_code(), status.warning_code()));
    }

    #[test]
    fn status_without_sender() {
        let mut status = FilterStatus::new("Quiet");
        status.notify_status_message("hello");
        status.notify_progress(10, "working");
        assert_eq!(2, status.messages().len());
        status.clear_messages();
        assert!(status.messages().is_empty());
    }

    #[test]
    fn parameters_round_trip() {
        let counter = Counter {
            count: 3,
            label: "abc".to_string(),
            ..Default::default()
        };
        let json = counter.write_parameters();
        assert_eq!(Some(&Value::from(3)), json.get("Count"));
        let mut other = Counter::default();
        other.read_parameters(&json).unwrap();
        assert_eq!(3, other.count);
        assert_eq!("abc", other.label);
        assert!(other.status.is_none());
    }

    #[test]
    fn read_parameters_keeps_absent_values() {
        let mut counter = Counter {
            count: 9,
            ..Default::default()
        };
        let mut json = Map::new();
        json.insert("Label".to_string(), Value::from("x"));
        counter.read_parameters(&json).unwrap();
        assert_eq!(9, counter.count);
        assert_eq!("x", counter.label);
    }

    #[test]
    fn read_parameters_bad_value() {
        let mut counter = Counter::default();
        let mut json = Map::new();
        json.insert("Count".to_string(), Value::from("not a number"));
        assert!(matches!(
            counter.read_parameters(&json),
            Err(SimplError::Json(_))
        ));
    }

    #[test]
    fn parameter_descriptions() {
        let descriptions = Counter::default().parameter_descriptions();
        assert_eq!(
            vec![
                ("Count", "Count", ParameterCategory::Parameter),
                ("Label", "Label", ParameterCategory::Uncategorized)
            ],
            descriptions
        );
    }
}
