//! This file defines the simpl-pipeline binary entry point.

use std::fs;
use std::path::PathBuf;
use std::process::exit;
use std::time::Duration;

use expanduser::expanduser;
use serde_json::Value;
use tracing::{event, Level};

use simpl_pipeline::cli;
use simpl_pipeline::data_container_array::DataContainerArray;
use simpl_pipeline::error::SimplError;
use simpl_pipeline::filter_pipeline::{ExecutionResult, FilterPipeline};
use simpl_pipeline::filters;
use simpl_pipeline::messages::{MessageKind, PipelineMessage};
use simpl_pipeline::montage::MontageRecord;
use simpl_pipeline::runner::PipelineRunner;
use simpl_pipeline::tracing as logging;

/// Application entry point
fn main() {
    let args = cli::parse();
    logging::init_tracing();
    match run(&args) {
        Ok(code) => exit(code),
        Err(err) => {
            err.log();
            exit(1)
        }
    }
}

fn log_message(message: &PipelineMessage) {
    match message.kind {
        MessageKind::Error => event!(Level::ERROR, code = message.code, "{}", message),
        MessageKind::Warning => event!(Level::WARN, code = message.code, "{}", message),
        MessageKind::ProgressValue => event!(Level::DEBUG, "{}", message),
        MessageKind::StatusMessage | MessageKind::StandardOutput => {
            event!(Level::INFO, "{}", message)
        }
    }
}

fn expand(path: &str) -> Result<PathBuf, SimplError> {
    Ok(expanduser(path)?)
}

/// Load, preflight and optionally execute the pipeline. Returns the process exit code.
fn run(args: &cli::CommandLineArgs) -> Result<i32, SimplError> {
    if let Some(threads) = args.threads {
        if let Err(err) = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
        {
            event!(Level::WARN, "could not size the thread pool: {}", err);
        }
    }

    let document: Value = serde_json::from_str(&fs::read_to_string(expand(&args.pipeline)?)?)?;
    let mut pipeline = FilterPipeline::from_json(&document, &filters::core_filter_factory())?;
    pipeline.messages().iter().for_each(log_message);
    event!(Level::INFO, pipeline = pipeline.name(), filters = pipeline.len(), "loaded pipeline");

    if args.preflight_only {
        let result = pipeline.preflight();
        for filter in pipeline.filters() {
            filter.status().messages().iter().for_each(log_message);
        }
        event!(Level::INFO, error_code = result.error_code, "preflight finished");
        return Ok(if result.is_ok() { 0 } else { 2 });
    }

    let mut runner = PipelineRunner::new();
    let messages = runner.messages();
    runner.start(pipeline, DataContainerArray::new())?;
    while runner.is_running() {
        if let Ok(message) = messages.recv_timeout(Duration::from_millis(100)) {
            log_message(&message);
        }
    }
    messages.try_iter().for_each(|message| log_message(&message));
    let outcome = runner.wait()?;

    if let Some(path) = &args.montage_record {
        let records: Vec<MontageRecord> = outcome
            .data_container_array
            .montages()
            .map(|montage| montage.to_record())
            .collect();
        fs::write(expand(path)?, serde_json::to_string_pretty(&records)?)?;
        event!(Level::INFO, montages = records.len(), "wrote montage records");
    }

    Ok(match outcome.result {
        ExecutionResult::Completed => 0,
        _ => 1,
    })
}
