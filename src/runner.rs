//! Run pipelines on a worker thread.
//!
//! A [PipelineRunner] moves a [FilterPipeline] onto its own thread, runs preflight and execute
//! there and hands both the pipeline and the resulting structure back from [PipelineRunner::wait].
//! Messages produced during the run arrive on the runner's channel as they happen. A copy of the
//! structure taken before the run is returned alongside the result, so a caller can restore it
//! before the next preflight.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{event, Level};

use crate::data_container_array::DataContainerArray;
use crate::error::SimplError;
use crate::filter::CancelToken;
use crate::filter_pipeline::{ExecutionResult, ExecutionState, FilterPipeline};
use crate::messages::PipelineMessage;

/// Everything a finished run hands back
#[derive(Debug)]
pub struct RunOutcome {
    /// The pipeline, with the filter states and messages of the run
    pub pipeline: FilterPipeline,
    pub result: ExecutionResult,
    pub error_code: i32,
    /// The structure after the run. Untouched when preflight failed.
    pub data_container_array: DataContainerArray,
    /// Copy of the structure taken when the run started
    pub snapshot: DataContainerArray,
}

struct Run {
    worker: JoinHandle<(FilterPipeline, DataContainerArray)>,
    cancel: CancelToken,
    snapshot: DataContainerArray,
}

/// Runs one pipeline at a time on a background thread.
pub struct PipelineRunner {
    run: Option<Run>,
    sender: Sender<PipelineMessage>,
    receiver: Receiver<PipelineMessage>,
}

impl Default for PipelineRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineRunner {
    /// Return a new, idle PipelineRunner.
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        PipelineRunner {
            run: None,
            sender,
            receiver,
        }
    }

    /// Receiving end of the channel every run forwards its messages to.
    pub fn messages(&self) -> Receiver<PipelineMessage> {
        self.receiver.clone()
    }

    /// Whether a run has been started and not yet collected with [wait](Self::wait).
    pub fn has_run(&self) -> bool {
        self.run.is_some()
    }

    /// Whether the worker thread is still working.
    pub fn is_running(&self) -> bool {
        self.run
            .as_ref()
            .map_or(false, |run| !run.worker.is_finished())
    }

    /// Start running `pipeline` against `dca`.
    ///
    /// Blocks until any previous run has finished and returns its outcome if it was never
    /// collected.
    pub fn start(
        &mut self,
        mut pipeline: FilterPipeline,
        dca: DataContainerArray,
    ) -> Result<Option<RunOutcome>, SimplError> {
        if pipeline.state() != ExecutionState::Idle {
            return Err(SimplError::PipelineBusy {
                name: pipeline.name().to_string(),
            });
        }
        let previous = match self.run {
            Some(_) => Some(self.wait()?),
            None => None,
        };

        let snapshot = dca.deep_copy(false);
        let cancel = pipeline.cancel_token();
        let sender = self.sender.clone();
        event!(Level::DEBUG, pipeline = pipeline.name(), "starting pipeline worker");
        let worker = thread::Builder::new()
            .name(format!("pipeline {}", pipeline.name()))
            .spawn(move || {
                pipeline.set_message_sender(Some(sender));
                let dca = pipeline.run_with(dca);
                pipeline.set_message_sender(None);
                (pipeline, dca)
            })?;
        self.run = Some(Run {
            worker,
            cancel,
            snapshot,
        });
        Ok(previous)
    }

    /// Ask the running pipeline to stop before its next filter.
    ///
    /// Returns false if no run is in flight.
    pub fn cancel(&self) -> bool {
        match &self.run {
            Some(run) if !run.worker.is_finished() => {
                run.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    /// Wait for the current run to finish and collect its outcome.
    pub fn wait(&mut self) -> Result<RunOutcome, SimplError> {
        let run = self.run.take().ok_or(SimplError::NotRunning)?;
        let (pipeline, data_container_array) = run
            .worker
            .join()
            .map_err(|_| SimplError::WorkerPanicked)?;
        let outcome = RunOutcome {
            result: pipeline.execution_result(),
            error_code: pipeline.error_code(),
            pipeline,
            data_container_array,
            snapshot: run.snapshot,
        };
        event!(
            Level::INFO,
            pipeline = outcome.pipeline.name(),
            result = %outcome.result,
            error_code = outcome.error_code,
            "pipeline run finished"
        );
        Ok(outcome)
    }
}

impl Drop for PipelineRunner {
    fn drop(&mut self) {
        if let Some(run) = self.run.take() {
            run.cancel.cancel();
            let _ = run.worker.join();
        }
    }
}
