//! Filter pipeline.
//!
//! A [FilterPipeline] owns an ordered list of filters and runs them in two phases against a
//! [DataContainerArray] it is handed or creates:
//!
//! * preflight runs every enabled filter's `data_check` against a structure of placeholders and
//!   collects every error, never stopping early;
//! * execute runs every enabled filter in order, stopping at the first error or when the shared
//!   [CancelToken] is tripped.
//!
//! [FilterPipeline::run] gates execute on a clean preflight.

use crossbeam_channel::Sender;
use hashbrown::HashMap;
use serde_json::{json, Map, Value};
use strum_macros::Display;
use tracing::{event, Level};

use crate::data_container_array::DataContainerArray;
use crate::error::SimplError;
use crate::filter::{CancelToken, Filter, FilterState, ParameterIo};
use crate::filters::empty_filter::EmptyFilter;
use crate::messages::PipelineMessage;

/// Version written to pipeline documents.
pub const PIPELINE_VERSION: i64 = 6;

const PIPELINE_BUILDER: &str = "PipelineBuilder";
const PIPELINE_NAME: &str = "Name";
const NUMBER_FILTERS: &str = "Number_Filters";
const VERSION: &str = "Version";
const FILTER_NAME: &str = "Filter_Name";
const FILTER_UUID: &str = "Filter_Uuid";
const FILTER_ENABLED: &str = "Filter_Enabled";
const FILTER_HUMAN_LABEL: &str = "Filter_Human_Label";

/// Largest number of filters a pipeline document may declare.
pub const MAX_FILTERS: usize = 10_000;

/// Error code of the message emitted for a filter a pipeline document names but no factory
/// provides.
pub const UNKNOWN_FILTER_CODE: i32 = -66066;

/// Execution state of a pipeline
#[derive(Clone, Copy, Debug, Default, Display, Eq, PartialEq)]
pub enum ExecutionState {
    #[default]
    Idle,
    Executing,
    Canceling,
}

/// Outcome of the most recent execution
#[derive(Clone, Copy, Debug, Default, Display, Eq, PartialEq)]
pub enum ExecutionResult {
    /// No execution has finished yet
    #[default]
    Invalid,
    Completed,
    Canceled,
    Failed,
}

/// Run state of a pipeline as shown to a user
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum PipelineState {
    Running,
    Stopped,
    /// Front ends may hold a pipeline between runs. The engine itself reports only Running or
    /// Stopped.
    Paused,
}

/// State of a filter as shown to a user
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum WidgetState {
    Ready,
    Executing,
    Completed,
    Disabled,
}

impl WidgetState {
    pub fn of(filter: &dyn Filter) -> Self {
        if !filter.enabled() {
            return Self::Disabled;
        }
        match filter.status().state() {
            FilterState::Executing => Self::Executing,
            FilterState::Completed => Self::Completed,
            FilterState::Disabled => Self::Disabled,
            _ => Self::Ready,
        }
    }
}

/// Error condition of a filter as shown to a user
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum ErrorState {
    Ok,
    Error,
    Warning,
}

impl ErrorState {
    pub fn of(filter: &dyn Filter) -> Self {
        if filter.error_code() < 0 {
            Self::Error
        } else if filter.warning_code() < 0 {
            Self::Warning
        } else {
            Self::Ok
        }
    }
}

/// Result of a preflight.
#[derive(Debug)]
pub struct PreflightResult {
    /// Most negative error code of any filter, or zero
    pub error_code: i32,
    /// The placeholder structure built by the filters
    pub data_container_array: DataContainerArray,
}

impl PreflightResult {
    pub fn is_ok(&self) -> bool {
        self.error_code >= 0
    }
}

/// Constructor of a boxed filter.
pub type FilterConstructor = fn() -> Box<dyn Filter>;

/// Creates filters by uuid or class name, for reading pipeline documents.
#[derive(Clone, Debug, Default)]
pub struct FilterFactory {
    by_uuid: HashMap<String, FilterConstructor>,
    by_class_name: HashMap<String, FilterConstructor>,
}

impl FilterFactory {
    /// Return a new, empty FilterFactory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a filter under its uuid and class name.
    pub fn register(&mut self, constructor: FilterConstructor) {
        let prototype = constructor();
        self.by_uuid
            .insert(prototype.uuid().to_string(), constructor);
        self.by_class_name
            .insert(prototype.name_of_class().to_string(), constructor);
    }

    pub fn create_from_uuid(&self, uuid: &str) -> Option<Box<dyn Filter>> {
        self.by_uuid.get(uuid).map(|constructor| constructor())
    }

    pub fn create_from_class_name(&self, name: &str) -> Option<Box<dyn Filter>> {
        self.by_class_name.get(name).map(|constructor| constructor())
    }

    /// Class names of every registered filter, sorted.
    pub fn class_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.by_class_name.keys().cloned().collect();
        names.sort();
        names
    }
}

/// An ordered list of filters that run together against one data structure.
pub struct FilterPipeline {
    name: String,
    filters: Vec<Box<dyn Filter>>,
    state: ExecutionState,
    execution_result: ExecutionResult,
    error_code: i32,
    messages: Vec<PipelineMessage>,
    sender: Option<Sender<PipelineMessage>>,
    cancel: CancelToken,
}

impl std::fmt::Debug for FilterPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let labels: Vec<_> = self.filters.iter().map(|f| f.human_label()).collect();
        f.debug_struct("FilterPipeline")
            .field("name", &self.name)
            .field("filters", &labels)
            .field("state", &self.state)
            .field("execution_result", &self.execution_result)
            .field("error_code", &self.error_code)
            .finish()
    }
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self::new("Untitled Pipeline")
    }
}

impl FilterPipeline {
    /// Return a new, empty FilterPipeline.
    pub fn new(name: impl Into<String>) -> Self {
        FilterPipeline {
            name: name.into(),
            filters: vec![],
            state: ExecutionState::Idle,
            execution_result: ExecutionResult::Invalid,
            error_code: 0,
            messages: vec![],
            sender: None,
            cancel: CancelToken::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    pub fn pipeline_state(&self) -> PipelineState {
        match self.state {
            ExecutionState::Idle => PipelineState::Stopped,
            ExecutionState::Executing | ExecutionState::Canceling => PipelineState::Running,
        }
    }

    pub fn execution_result(&self) -> ExecutionResult {
        self.execution_result
    }

    pub fn error_code(&self) -> i32 {
        self.error_code
    }

    /// Messages generated by the pipeline itself. Filter messages stay on each filter's status.
    pub fn messages(&self) -> &[PipelineMessage] {
        &self.messages
    }

    pub fn clear_messages(&mut self) {
        self.messages.clear();
    }

    /// Forward every pipeline and filter message to `sender`.
    pub fn set_message_sender(&mut self, sender: Option<Sender<PipelineMessage>>) {
        for filter in self.filters.iter_mut() {
            filter.status_mut().set_message_sender(sender.clone());
        }
        self.sender = sender;
    }

    /// Handle on the flag every filter of this pipeline polls.
    ///
    /// Tripping it from another thread cancels a running execute.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn filters(&self) -> &[Box<dyn Filter>] {
        &self.filters
    }

    pub fn filter(&self, index: usize) -> Option<&dyn Filter> {
        self.filters.get(index).map(|f| f.as_ref())
    }

    pub fn filter_mut(&mut self, index: usize) -> Option<&mut Box<dyn Filter>> {
        self.filters.get_mut(index)
    }

    fn emit(&mut self, message: PipelineMessage) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(message.clone());
        }
        self.messages.push(message);
    }

    fn set_error_condition(&mut self, code: i32, text: String) {
        event!(Level::WARN, pipeline = %self.name, code, "{}", text);
        self.error_code = code;
        let message = PipelineMessage::error(&self.name, text, code);
        self.emit(message);
    }

    /// Refuse an edit unless idle, recording `code`.
    fn check_idle(&mut self, code: i32, text: impl FnOnce(&str) -> String) -> bool {
        if self.state == ExecutionState::Idle {
            return true;
        }
        let text = text(&self.name);
        self.set_error_condition(code, text);
        false
    }

    /// Renumber every filter and share the pipeline's cancel flag and message sender with it.
    fn update_filters(&mut self) {
        for (index, filter) in self.filters.iter_mut().enumerate() {
            let status = filter.status_mut();
            status.set_pipeline_index(index);
            status.set_cancel_token(self.cancel.clone());
            status.set_message_sender(self.sender.clone());
        }
    }

    fn added_while_executing(label: &str) -> impl FnOnce(&str) -> String + '_ {
        move |name| {
            format!(
                "Filter '{}' could not be added to pipeline '{}' because the pipeline is already executing.",
                label, name
            )
        }
    }

    fn removed_while_executing(label: &str) -> impl FnOnce(&str) -> String + '_ {
        move |name| {
            format!(
                "Filter '{}' could not be removed from pipeline '{}' because the pipeline is already executing.",
                label, name
            )
        }
    }

    pub fn push_front(&mut self, filter: Box<dyn Filter>) -> bool {
        let label = filter.human_label().to_string();
        if !self.check_idle(-202, Self::added_while_executing(&label)) {
            return false;
        }
        self.filters.insert(0, filter);
        self.update_filters();
        true
    }

    pub fn pop_front(&mut self) -> Option<Box<dyn Filter>> {
        let label = self.filters.first()?.human_label().to_string();
        if !self.check_idle(-203, Self::removed_while_executing(&label)) {
            return None;
        }
        let filter = self.filters.remove(0);
        self.update_filters();
        Some(filter)
    }

    pub fn push_back(&mut self, filter: Box<dyn Filter>) -> bool {
        let label = filter.human_label().to_string();
        if !self.check_idle(-204, Self::added_while_executing(&label)) {
            return false;
        }
        self.filters.push(filter);
        self.update_filters();
        true
    }

    pub fn pop_back(&mut self) -> Option<Box<dyn Filter>> {
        let label = self.filters.last()?.human_label().to_string();
        if !self.check_idle(-205, Self::removed_while_executing(&label)) {
            return None;
        }
        let filter = self.filters.pop();
        self.update_filters();
        filter
    }

    /// Insert a filter before `index`. An index past the end appends.
    pub fn insert(&mut self, index: usize, filter: Box<dyn Filter>) -> bool {
        let label = filter.human_label().to_string();
        if !self.check_idle(-206, Self::added_while_executing(&label)) {
            return false;
        }
        let index = index.min(self.filters.len());
        self.filters.insert(index, filter);
        self.update_filters();
        true
    }

    pub fn erase(&mut self, index: usize) -> Option<Box<dyn Filter>> {
        let label = self.filters.get(index)?.human_label().to_string();
        if !self.check_idle(-207, Self::removed_while_executing(&label)) {
            return None;
        }
        let filter = self.filters.remove(index);
        self.update_filters();
        Some(filter)
    }

    pub fn clear(&mut self) -> bool {
        if !self.check_idle(-208, |name| {
            format!("Pipeline '{}' could not be cleared because it is executing.", name)
        }) {
            return false;
        }
        self.filters.clear();
        true
    }

    /// Remove the first filter whose human label is `label`.
    pub fn remove_first_filter_by_name(&mut self, label: &str) -> Option<Box<dyn Filter>> {
        if !self.check_idle(-209, Self::removed_while_executing(label)) {
            return None;
        }
        let index = self.filters.iter().position(|f| f.human_label() == label)?;
        let filter = self.filters.remove(index);
        self.update_filters();
        Some(filter)
    }

    /// Request cancellation of a running execute.
    ///
    /// Only valid while executing; otherwise records -201.
    pub fn cancel(&mut self) -> bool {
        match self.state {
            ExecutionState::Executing => {
                self.state = ExecutionState::Canceling;
                self.cancel.cancel();
                true
            }
            ExecutionState::Idle => {
                let text = format!(
                    "Pipeline '{}' could not be canceled because it is not executing.",
                    self.name
                );
                self.set_error_condition(-201, text);
                false
            }
            ExecutionState::Canceling => {
                let text = format!(
                    "Pipeline '{}' could not be canceled because it is already canceling.",
                    self.name
                );
                self.set_error_condition(-201, text);
                false
            }
        }
    }

    /// Preflight against a new, empty data structure.
    pub fn preflight(&mut self) -> PreflightResult {
        self.preflight_with(DataContainerArray::new())
    }

    /// Preflight against `dca`, which receives the placeholders every filter creates.
    ///
    /// Every enabled filter is checked even after one reports an error.
    #[tracing::instrument(level = "DEBUG", skip(self, dca), fields(pipeline = %self.name))]
    pub fn preflight_with(&mut self, mut dca: DataContainerArray) -> PreflightResult {
        if !self.check_idle(-210, |name| {
            format!(
                "Pipeline '{}' could not be preflighted because it is already executing.",
                name
            )
        }) {
            return PreflightResult {
                error_code: self.error_code,
                data_container_array: dca,
            };
        }
        self.error_code = 0;
        self.update_filters();
        let mut error_code = 0;
        for filter in self.filters.iter_mut() {
            if !filter.enabled() {
                filter.status_mut().set_state(FilterState::Disabled);
                continue;
            }
            let status = filter.status_mut();
            status.clear_error_code();
            status.clear_warning_code();
            status.clear_messages();
            filter.preflight(&mut dca);
            let code = filter.error_code();
            let state = if code < 0 {
                FilterState::Error
            } else {
                FilterState::Ready
            };
            filter.status_mut().set_state(state);
            error_code = error_code.min(code);
        }
        if error_code < 0 {
            event!(Level::DEBUG, error_code, "preflight reported errors");
        }
        PreflightResult {
            error_code,
            data_container_array: dca,
        }
    }

    /// Execute against a new, empty data structure.
    pub fn execute(&mut self) -> DataContainerArray {
        self.execute_with(DataContainerArray::new())
    }

    /// Execute every enabled filter in order against `dca` and return the resulting structure.
    ///
    /// Stops at the first filter reporting an error, or before the next filter once
    /// cancellation is requested.
    #[tracing::instrument(level = "DEBUG", skip(self, dca), fields(pipeline = %self.name))]
    pub fn execute_with(&mut self, mut dca: DataContainerArray) -> DataContainerArray {
        if !self.check_idle(-200, |name| {
            format!(
                "Pipeline '{}' could not be executed because it is already executing.",
                name
            )
        }) {
            return dca;
        }
        self.error_code = 0;
        self.execution_result = ExecutionResult::Invalid;
        self.state = ExecutionState::Executing;
        self.update_filters();

        let count = self.filters.len();
        for index in 0..count {
            if self.cancel.is_canceled() {
                self.state = ExecutionState::Canceling;
                break;
            }
            let label = self.filters[index].human_label().to_string();
            let position = index + 1;
            let progress = (position as f32 / (count + 1) as f32 * 100.0) as i32;
            let text = format!("[{}/{}] {}", position, count, label);
            self.emit(PipelineMessage::progress(&self.name, &text, progress));
            self.emit(PipelineMessage::status(&self.name, &text));

            let filter = &mut self.filters[index];
            if !filter.enabled() {
                filter.status_mut().set_state(FilterState::Disabled);
                continue;
            }
            let status = filter.status_mut();
            status.clear_error_code();
            status.clear_warning_code();
            status.set_state(FilterState::Executing);
            filter.execute(&mut dca);
            let code = filter.error_code();
            if code < 0 {
                filter.status_mut().set_state(FilterState::Error);
                let text = format!(
                    "[{}/{}] {} caused an error during execution.",
                    position, count, label
                );
                self.set_error_condition(code, text);
                self.cancel.reset();
                self.state = ExecutionState::Idle;
                self.execution_result = ExecutionResult::Failed;
                return dca;
            }
            if self.cancel.is_canceled() {
                filter.status_mut().set_state(FilterState::Cancelled);
                self.state = ExecutionState::Canceling;
                break;
            }
            filter.status_mut().set_state(FilterState::Completed);
        }

        let text = if self.state == ExecutionState::Canceling {
            self.execution_result = ExecutionResult::Canceled;
            "Pipeline Canceled"
        } else {
            self.execution_result = ExecutionResult::Completed;
            "Pipeline Complete"
        };
        tracing::info!("{}: {}", self.name, text);
        self.emit(PipelineMessage::status(&self.name, text));
        self.cancel.reset();
        self.state = ExecutionState::Idle;
        dca
    }

    /// Preflight, then execute if the preflight found no errors.
    pub fn run(&mut self) -> DataContainerArray {
        self.run_with(DataContainerArray::new())
    }

    /// Preflight against a copy of `dca`, then execute against `dca` itself if no filter
    /// reported an error. A failed preflight returns `dca` untouched.
    pub fn run_with(&mut self, dca: DataContainerArray) -> DataContainerArray {
        let preflight = self.preflight_with(dca.deep_copy(true));
        if !preflight.is_ok() {
            let text = format!(
                "Pipeline '{}' was not executed because preflight failed.",
                self.name
            );
            self.set_error_condition(preflight.error_code, text);
            self.execution_result = ExecutionResult::Failed;
            return dca;
        }
        self.execute_with(dca)
    }

    /// Write the pipeline as a JSON document.
    pub fn to_json(&self) -> Value {
        let mut document = Map::new();
        document.insert(
            PIPELINE_BUILDER.to_string(),
            json!({
                PIPELINE_NAME: self.name,
                NUMBER_FILTERS: self.filters.len(),
                VERSION: PIPELINE_VERSION,
            }),
        );
        for (index, filter) in self.filters.iter().enumerate() {
            let mut object = filter.write_parameters();
            object.insert(FILTER_NAME.to_string(), filter.name_of_class().into());
            object.insert(FILTER_UUID.to_string(), filter.uuid().into());
            object.insert(FILTER_ENABLED.to_string(), filter.enabled().into());
            object.insert(FILTER_HUMAN_LABEL.to_string(), filter.human_label().into());
            document.insert(index.to_string(), Value::Object(object));
        }
        Value::Object(document)
    }

    /// Read a pipeline from a JSON document.
    ///
    /// Filters are created by uuid, falling back to class name. A filter no factory provides is
    /// replaced by an [EmptyFilter] and reported with an error message.
    pub fn from_json(document: &Value, factory: &FilterFactory) -> Result<Self, SimplError> {
        let builder = document
            .get(PIPELINE_BUILDER)
            .and_then(Value::as_object)
            .ok_or_else(|| SimplError::PipelineDocument {
                reason: format!("missing {} object", PIPELINE_BUILDER),
            })?;
        let count = builder
            .get(NUMBER_FILTERS)
            .and_then(Value::as_u64)
            .ok_or_else(|| SimplError::PipelineDocument {
                reason: format!("missing or invalid {}", NUMBER_FILTERS),
            })?;
        if count > MAX_FILTERS as u64 {
            return Err(SimplError::PipelineDocument {
                reason: format!(
                    "{} is {} but at most {} filters are supported",
                    NUMBER_FILTERS, count, MAX_FILTERS
                ),
            });
        }
        let count = count as usize;
        let name = builder
            .get(PIPELINE_NAME)
            .and_then(Value::as_str)
            .unwrap_or_default();
        let mut pipeline = FilterPipeline::new(name);
        let width = count.to_string().len();
        for index in 0..count {
            let object = document
                .get(index.to_string())
                .or_else(|| document.get(format!("{:0width$}", index, width = width)))
                .and_then(Value::as_object);
            let Some(object) = object else {
                pipeline.push_unknown_filter("", true);
                continue;
            };
            let enabled = object
                .get(FILTER_ENABLED)
                .and_then(Value::as_bool)
                .unwrap_or(true);
            let class_name = object
                .get(FILTER_NAME)
                .and_then(Value::as_str)
                .unwrap_or_default();
            let filter = object
                .get(FILTER_UUID)
                .and_then(Value::as_str)
                .and_then(|uuid| factory.create_from_uuid(uuid))
                .or_else(|| factory.create_from_class_name(class_name));
            match filter {
                Some(mut filter) => {
                    filter.read_parameters(object)?;
                    filter.set_enabled(enabled);
                    pipeline.push_back(filter);
                }
                None => pipeline.push_unknown_filter(class_name, enabled),
            }
        }
        Ok(pipeline)
    }

    fn push_unknown_filter(&mut self, class_name: &str, enabled: bool) {
        let mut filter = EmptyFilter::new(class_name);
        filter.set_enabled(enabled);
        self.push_back(Box::new(filter));
        let text = format!(
            "An attempt to instantiate a filter from the pipeline file resulted in an error. \
             Possible reasons include a name change of the filter, plugin not loading or a \
             simple spelling mistake? A blank filter has been inserted in its place. \
             Possible error message is: {}",
            class_name
        );
        let message = PipelineMessage::error(class_name, text, UNKNOWN_FILTER_CODE)
            .at_index(self.filters.len() - 1);
        self.emit(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{Stub, StubCounters};
    use crossbeam_channel::unbounded;
    use regex::Regex;
    use std::sync::Arc;

    /// A pipeline of `n` stubs labelled "Stub 0", "Stub 1", ...
    fn stubs_with(
        n: usize,
        configure: impl Fn(usize, &mut Stub),
    ) -> (FilterPipeline, Vec<Arc<StubCounters>>) {
        let mut pipeline = FilterPipeline::new("Stubs");
        let mut counters = vec![];
        for i in 0..n {
            let mut stub = Stub::new(&format!("Stub {}", i));
            configure(i, &mut stub);
            counters.push(stub.counters());
            pipeline.push_back(Box::new(stub));
        }
        (pipeline, counters)
    }

    fn stubs(n: usize) -> (FilterPipeline, Vec<Arc<StubCounters>>) {
        stubs_with(n, |_, _| ())
    }

    #[test]
    fn edits_renumber_filters() {
        let (mut pipeline, _) = stubs(2);
        pipeline.push_front(Box::new(Stub::new("First")));
        pipeline.insert(2, Box::new(Stub::new("Middle")));
        let labels: Vec<_> = pipeline.filters().iter().map(|f| f.human_label()).collect();
        assert_eq!(vec!["First", "Stub 0", "Middle", "Stub 1"], labels);
        for (i, filter) in pipeline.filters().iter().enumerate() {
            assert_eq!(i, filter.status().pipeline_index());
        }
        assert_eq!("Middle", pipeline.erase(2).unwrap().human_label());
        assert_eq!("First", pipeline.pop_front().unwrap().human_label());
        assert_eq!("Stub 1", pipeline.pop_back().unwrap().human_label());
        assert!(pipeline.remove_first_filter_by_name("Stub 0").is_some());
        assert!(pipeline.remove_first_filter_by_name("Stub 0").is_none());
        assert!(pipeline.is_empty());
        assert!(pipeline.erase(0).is_none());
    }

    #[test]
    fn edits_refused_while_executing() {
        let (mut pipeline, _) = stubs(1);
        pipeline.state = ExecutionState::Executing;
        assert!(!pipeline.push_front(Box::new(Stub::new("x"))));
        assert_eq!(-202, pipeline.error_code());
        assert!(pipeline.pop_front().is_none());
        assert_eq!(-203, pipeline.error_code());
        assert!(!pipeline.push_back(Box::new(Stub::new("x"))));
        assert_eq!(-204, pipeline.error_code());
        assert!(pipeline.pop_back().is_none());
        assert_eq!(-205, pipeline.error_code());
        assert!(!pipeline.insert(0, Box::new(Stub::new("x"))));
        assert_eq!(-206, pipeline.error_code());
        assert!(pipeline.erase(0).is_none());
        assert_eq!(-207, pipeline.error_code());
        assert!(!pipeline.clear());
        assert_eq!(-208, pipeline.error_code());
        assert!(pipeline.remove_first_filter_by_name("Stub 0").is_none());
        assert_eq!(-209, pipeline.error_code());
        assert_eq!(1, pipeline.len());
        assert_eq!(8, pipeline.messages().len());
        assert!(pipeline.messages()[0].text.contains("already executing"));
        assert_eq!(PipelineState::Running, pipeline.pipeline_state());
        pipeline.preflight();
        assert_eq!(-210, pipeline.error_code());
        pipeline.execute();
        assert_eq!(-200, pipeline.error_code());
    }

    #[test]
    fn cancel_requires_executing() {
        let (mut pipeline, _) = stubs(1);
        assert!(!pipeline.cancel());
        assert_eq!(-201, pipeline.error_code());
        assert!(pipeline.messages()[0].text.contains("not executing"));
        pipeline.state = ExecutionState::Canceling;
        assert!(!pipeline.cancel());
        assert!(pipeline.messages()[1].text.contains("already canceling"));
        pipeline.state = ExecutionState::Executing;
        assert!(pipeline.cancel());
        assert_eq!(ExecutionState::Canceling, pipeline.state());
        assert!(pipeline.cancel_token().is_canceled());
    }

    #[test]
    fn preflight_collects_every_error() {
        let (mut pipeline, counters) = stubs_with(3, |i, stub| match i {
            0 => stub.preflight_error = -10,
            2 => stub.preflight_error = -30,
            _ => (),
        });
        let result = pipeline.preflight();
        assert_eq!(-30, result.error_code);
        assert!(!result.is_ok());
        for c in &counters {
            assert_eq!(1, c.data_checks());
            assert_eq!(0, c.executions());
        }
        assert_eq!(FilterState::Error, pipeline.filter(0).unwrap().status().state());
        assert_eq!(FilterState::Ready, pipeline.filter(1).unwrap().status().state());
        assert_eq!(ErrorState::Error, ErrorState::of(pipeline.filter(2).unwrap()));
        assert_eq!(ErrorState::Ok, ErrorState::of(pipeline.filter(1).unwrap()));
    }

    #[test]
    fn preflight_builds_placeholders() {
        let (mut pipeline, _) = stubs(2);
        let result = pipeline.preflight();
        assert!(result.is_ok());
        let dca = result.data_container_array;
        assert_eq!(vec!["Stub 0", "Stub 1"], dca.data_container_names());
        assert!(pipeline.filters().iter().all(|f| !f.status().in_preflight()));
    }

    #[test]
    fn run_does_not_execute_after_failed_preflight() {
        let (mut pipeline, counters) = stubs_with(3, |i, stub| {
            if i == 1 {
                stub.preflight_error = -5;
            }
        });
        let dca = pipeline.run();
        assert!(dca.is_empty());
        assert_eq!(ExecutionResult::Failed, pipeline.execution_result());
        assert!(pipeline.error_code() < 0);
        assert!(counters.iter().all(|c| c.executions() == 0));
    }

    #[test]
    fn run_executes_in_order() {
        let (mut pipeline, counters) = stubs(3);
        let (tx, rx) = unbounded();
        pipeline.set_message_sender(Some(tx));
        let dca = pipeline.run();
        assert_eq!(ExecutionResult::Completed, pipeline.execution_result());
        assert_eq!(ExecutionState::Idle, pipeline.state());
        assert_eq!(PipelineState::Stopped, pipeline.pipeline_state());
        assert_eq!(3, dca.len());
        for (i, c) in counters.iter().enumerate() {
            assert_eq!(1, c.executions());
            assert_eq!(
                WidgetState::Completed,
                WidgetState::of(pipeline.filter(i).unwrap())
            );
        }
        let status = Regex::new(r"^\[(\d)/3\] Stub (\d)$").unwrap();
        let texts: Vec<_> = rx
            .try_iter()
            .filter(|m| m.prefix == "Stubs")
            .map(|m| m.text)
            .collect();
        let steps: Vec<(usize, usize)> = texts
            .iter()
            .filter_map(|t| status.captures(t))
            .map(|c| (c[1].parse().unwrap(), c[2].parse().unwrap()))
            .collect();
        // Each step is reported as progress and as status.
        assert_eq!(6, steps.len());
        for (position, index) in steps {
            assert_eq!(position, index + 1);
        }
        assert_eq!(Some("Pipeline Complete"), texts.last().map(String::as_str));
    }

    #[test]
    fn execute_stops_at_first_error() {
        let (mut pipeline, counters) = stubs_with(3, |i, stub| {
            if i == 1 {
                stub.execute_error = -77;
            }
        });
        pipeline.execute();
        assert_eq!(ExecutionResult::Failed, pipeline.execution_result());
        assert_eq!(-77, pipeline.error_code());
        assert_eq!(1, counters[0].executions());
        assert_eq!(1, counters[1].executions());
        assert_eq!(0, counters[2].executions());
        let last = pipeline.messages().last().unwrap();
        assert_eq!("[2/3] Stub 1 caused an error during execution.", last.text);
        assert_eq!(ExecutionState::Idle, pipeline.state());
    }

    #[test]
    fn failed_execute_clears_cancel() {
        let (mut pipeline, counters) = stubs_with(2, |i, stub| {
            if i == 0 {
                stub.execute_error = -5;
                stub.cancel_after_execute = true;
            }
        });
        pipeline.execute();
        assert_eq!(ExecutionResult::Failed, pipeline.execution_result());
        assert!(!pipeline.cancel_token().is_canceled());
        pipeline.filter_mut(0).unwrap().set_enabled(false);
        pipeline.execute();
        assert_eq!(ExecutionResult::Completed, pipeline.execution_result());
        assert_eq!(1, counters[1].executions());
    }

    #[test]
    fn disabled_filters_are_skipped() {
        let (mut pipeline, counters) = stubs(2);
        pipeline.filter_mut(0).unwrap().set_enabled(false);
        let dca = pipeline.run();
        assert_eq!(0, counters[0].data_checks());
        assert_eq!(0, counters[0].executions());
        assert_eq!(1, counters[1].executions());
        assert_eq!(vec!["Stub 1"], dca.data_container_names());
        assert_eq!(WidgetState::Disabled, WidgetState::of(pipeline.filter(0).unwrap()));
    }

    #[test]
    fn cancel_before_next_filter() {
        let (mut pipeline, counters) = stubs_with(3, |i, stub| {
            stub.cancel_after_execute = i == 0;
        });
        let dca = pipeline.execute();
        assert_eq!(ExecutionResult::Canceled, pipeline.execution_result());
        assert_eq!(0, pipeline.error_code());
        assert_eq!(1, counters[0].executions());
        assert_eq!(0, counters[1].executions());
        assert_eq!(1, dca.len());
        assert_eq!(
            FilterState::Cancelled,
            pipeline.filter(0).unwrap().status().state()
        );
        assert_eq!("Pipeline Canceled", pipeline.messages().last().unwrap().text);
        // The flag is cleared so the pipeline can run again.
        assert!(!pipeline.cancel_token().is_canceled());
        pipeline.filter_mut(0).unwrap().set_enabled(false);
        pipeline.execute();
        assert_eq!(ExecutionResult::Completed, pipeline.execution_result());
    }

    #[test]
    fn cancel_before_execute_runs_nothing() {
        let (mut pipeline, counters) = stubs(2);
        pipeline.cancel_token().cancel();
        let dca = pipeline.execute();
        assert!(dca.is_empty());
        assert_eq!(ExecutionResult::Canceled, pipeline.execution_result());
        assert_eq!(0, counters[0].executions());
    }

    #[test]
    fn json_round_trip() {
        let mut pipeline = crate::test_utils::montage_pipeline();
        pipeline.filter_mut(1).unwrap().set_enabled(false);
        let document = pipeline.to_json();
        assert_eq!(
            Some(pipeline.len() as u64),
            document[PIPELINE_BUILDER][NUMBER_FILTERS].as_u64()
        );
        assert_eq!("CreateDataContainer", document["0"][FILTER_NAME]);
        let factory = crate::filters::core_filter_factory();
        let read = FilterPipeline::from_json(&document, &factory).unwrap();
        assert_eq!(pipeline.name(), read.name());
        assert_eq!(pipeline.len(), read.len());
        for (a, b) in pipeline.filters().iter().zip(read.filters()) {
            assert_eq!(a.name_of_class(), b.name_of_class());
            assert_eq!(a.enabled(), b.enabled());
            assert_eq!(a.write_parameters(), b.write_parameters());
        }
        assert!(read.messages().is_empty());
    }

    #[test]
    fn json_unknown_filter_becomes_empty_filter() {
        let document = json!({
            "PipelineBuilder": {"Name": "Old", "Number_Filters": 2, "Version": 6},
            "0": {
                "Filter_Name": "RemovedFilter",
                "Filter_Uuid": "{00000000-0000-0000-0000-000000000000}",
                "Filter_Enabled": false
            },
            "1": {"Filter_Name": "CreateDataContainer", "CreatedDataContainer": "DC"}
        });
        let factory = crate::filters::core_filter_factory();
        let mut pipeline = FilterPipeline::from_json(&document, &factory).unwrap();
        assert_eq!(2, pipeline.len());
        let unknown = pipeline.filter(0).unwrap();
        assert_eq!("EmptyFilter", unknown.name_of_class());
        assert_eq!("UNKNOWN FILTER: RemovedFilter", unknown.human_label());
        assert!(!unknown.enabled());
        let message = &pipeline.messages()[0];
        assert_eq!(UNKNOWN_FILTER_CODE, message.code);
        assert_eq!(Some(0), message.pipeline_index);
        // The second filter was found by class name.
        let dca = pipeline.run();
        assert!(dca.does_data_container_exist("DC"));
    }

    #[test]
    fn json_enabled_empty_filter_fails_preflight() {
        let document = json!({
            "PipelineBuilder": {"Name": "Old", "Number_Filters": 1, "Version": 6},
            "0": {"Filter_Name": "RemovedFilter"}
        });
        let mut pipeline =
            FilterPipeline::from_json(&document, &crate::filters::core_filter_factory()).unwrap();
        assert!(pipeline.preflight().error_code < 0);
    }

    #[test]
    fn json_padded_indices() {
        let document = json!({
            "PipelineBuilder": {"Name": "Padded", "Number_Filters": 10, "Version": 6},
            "00": {"Filter_Name": "CreateDataContainer", "CreatedDataContainer": "DC"}
        });
        let pipeline =
            FilterPipeline::from_json(&document, &crate::filters::core_filter_factory()).unwrap();
        assert_eq!(10, pipeline.len());
        assert_eq!("CreateDataContainer", pipeline.filter(0).unwrap().name_of_class());
        assert_eq!("EmptyFilter", pipeline.filter(9).unwrap().name_of_class());
    }

    #[test]
    fn json_missing_builder() {
        let factory = FilterFactory::new();
        assert!(matches!(
            FilterPipeline::from_json(&json!({}), &factory),
            Err(SimplError::PipelineDocument { .. })
        ));
        assert!(matches!(
            FilterPipeline::from_json(&json!({"PipelineBuilder": {"Name": "x"}}), &factory),
            Err(SimplError::PipelineDocument { .. })
        ));
    }

    #[test]
    fn json_filter_count_is_limited() {
        let factory = crate::filters::core_filter_factory();
        let document = json!({
            "PipelineBuilder": {
                "Name": "Huge",
                "Number_Filters": 1_000_000_000_000_000_000u64,
                "Version": 6
            }
        });
        assert!(matches!(
            FilterPipeline::from_json(&document, &factory),
            Err(SimplError::PipelineDocument { .. })
        ));
        let document = json!({
            "PipelineBuilder": {"Name": "Limit", "Number_Filters": MAX_FILTERS + 1, "Version": 6}
        });
        assert!(FilterPipeline::from_json(&document, &factory).is_err());
    }

    #[test]
    fn json_bad_parameter() {
        let document = json!({
            "PipelineBuilder": {"Name": "Bad", "Number_Filters": 1, "Version": 6},
            "0": {"Filter_Name": "CreateDataContainer", "CreatedDataContainer": 5}
        });
        let factory = crate::filters::core_filter_factory();
        assert!(matches!(
            FilterPipeline::from_json(&document, &factory),
            Err(SimplError::Json(_))
        ));
    }

    #[test]
    fn factory_lookup() {
        let factory = crate::filters::core_filter_factory();
        assert!(factory.create_from_class_name("InitializeData").is_some());
        assert!(factory.create_from_class_name("Nope").is_none());
        let filter = factory.create_from_class_name("ReplaceValueInArray").unwrap();
        assert!(factory.create_from_uuid(filter.uuid()).is_some());
        assert!(factory
            .class_names()
            .contains(&"GenerateTiltSeries".to_string()));
    }
}
