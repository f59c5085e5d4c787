//! Bounded-concurrency batch runner.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{info, warn};

use super::config::ProcessorConfig;
use super::types::{BatchOutcome, BatchRequest};
use crate::converter::{Dispatcher, SourceFile};
use crate::format::FormatTag;
use crate::metrics::{BATCHES_TOTAL, BATCH_FILE_FAILURES, BATCH_SIZE};

/// Runs every file of a batch through the dispatcher, at most
/// `concurrency` at a time.
///
/// A failing file never stops its siblings. Progress is reported after each
/// job reaches a terminal state and is computed only from job states, in the
/// single loop that owns the [`BatchRequest`].
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    dispatcher: Arc<Dispatcher>,
    config: ProcessorConfig,
}

impl BatchProcessor {
    pub fn new(dispatcher: Arc<Dispatcher>, config: ProcessorConfig) -> Self {
        Self { dispatcher, config }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Converts `files` to `target`, calling `on_progress` with a percentage
    /// after every finished job.
    pub async fn run<F>(&self, files: Vec<SourceFile>, target: FormatTag, mut on_progress: F) -> BatchOutcome
    where
        F: FnMut(f32),
    {
        let mut request = BatchRequest::new(files, target, self.config.concurrency);
        let total = request.len();
        let started_at = Utc::now();
        let start = Instant::now();

        BATCHES_TOTAL.inc();
        BATCH_SIZE.observe(total as f64);
        info!(
            batch_id = %request.batch_id,
            files = total,
            target = %target,
            concurrency = request.concurrency(),
            "Starting batch"
        );

        let queue: Vec<(usize, SourceFile)> = request
            .jobs()
            .iter()
            .enumerate()
            .map(|(i, job)| (i, job.file.clone()))
            .collect();
        let mut queue = queue.into_iter();
        let mut in_flight = FuturesUnordered::new();
        let mut artifacts = Vec::new();
        let mut failures = Vec::new();

        request.start();
        if request.is_empty() {
            on_progress(request.progress());
        }

        loop {
            while in_flight.len() < request.concurrency() {
                let Some((index, file)) = queue.next() else {
                    break;
                };
                request.start_job(index);
                let dispatcher = Arc::clone(&self.dispatcher);
                in_flight.push(async move { (index, dispatcher.dispatch(&file, target).await) });
            }

            let Some((index, result)) = in_flight.next().await else {
                break;
            };
            request.finish_job(index, result.is_ok());
            match result {
                Ok(artifact) => artifacts.push(artifact),
                Err(err) => {
                    BATCH_FILE_FAILURES.inc();
                    warn!(
                        batch_id = %request.batch_id,
                        file = %err.file_name,
                        kind = ?err.kind,
                        error = %err.message,
                        "File failed in batch"
                    );
                    failures.push(err);
                }
            }
            on_progress(request.progress());
        }

        info!(
            batch_id = %request.batch_id,
            succeeded = artifacts.len(),
            failed = failures.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Batch finished"
        );

        BatchOutcome {
            batch_id: request.batch_id,
            target,
            total,
            artifacts,
            failures,
            started_at,
            finished_at: Utc::now(),
        }
    }
}
