//! Messages emitted by filters and pipelines while they run.

use std::fmt;

use serde::Serialize;
use strum_macros::Display;

/// Kind of a pipeline message
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize)]
pub enum MessageKind {
    Error,
    Warning,
    StatusMessage,
    ProgressValue,
    StandardOutput,
}

/// A message from a filter or pipeline.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PipelineMessage {
    pub kind: MessageKind,
    /// Human label of the emitting filter or name of the emitting pipeline
    pub prefix: String,
    pub text: String,
    /// Error or warning code, zero otherwise
    pub code: i32,
    /// Percentage for progress messages
    pub progress: Option<i32>,
    /// Position of the emitting filter in its pipeline
    pub pipeline_index: Option<usize>,
}

impl PipelineMessage {
    pub fn error(prefix: impl Into<String>, text: impl Into<String>, code: i32) -> Self {
        Self::with_kind(MessageKind::Error, prefix, text, code)
    }

    pub fn warning(prefix: impl Into<String>, text: impl Into<String>, code: i32) -> Self {
        Self::with_kind(MessageKind::Warning, prefix, text, code)
    }

    pub fn status(prefix: impl Into<String>, text: impl Into<String>) -> Self {
        Self::with_kind(MessageKind::StatusMessage, prefix, text, 0)
    }

    pub fn progress(prefix: impl Into<String>, text: impl Into<String>, progress: i32) -> Self {
        PipelineMessage {
            progress: Some(progress),
            ..Self::with_kind(MessageKind::ProgressValue, prefix, text, 0)
        }
    }

    fn with_kind(
        kind: MessageKind,
        prefix: impl Into<String>,
        text: impl Into<String>,
        code: i32,
    ) -> Self {
        PipelineMessage {
            kind,
            prefix: prefix.into(),
            text: text.into(),
            code,
            progress: None,
            pipeline_index: None,
        }
    }

    /// Attach the position of the emitting filter.
    pub fn at_index(mut self, index: usize) -> Self {
        self.pipeline_index = Some(index);
        self
    }

    pub fn is_error(&self) -> bool {
        self.kind == MessageKind::Error
    }
}

impl fmt::Display for PipelineMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            MessageKind::Error | MessageKind::Warning => write!(
                f,
                "{} {} ({}): {}",
                self.prefix, self.kind, self.code, self.text
            ),
            MessageKind::ProgressValue => write!(
                f,
                "{} {}% {}",
                self.prefix,
                self.progress.unwrap_or_default(),
                self.text
            ),
            _ => write!(f, "{} {}", self.prefix, self.text),
        }
    }
}
