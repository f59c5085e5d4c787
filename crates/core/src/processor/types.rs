//! Types for the processor module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::converter::{ConversionArtifact, ConversionError, ConversionJob, JobStatus, SourceFile};
use crate::format::FormatTag;

/// Lifecycle state of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    Pending,
    Running,
    Completed,
}

/// Percentage of `jobs` in a terminal state.
///
/// Exactly `100.0` once every job is terminal, including the empty case.
pub fn progress(jobs: &[ConversionJob]) -> f32 {
    let done = jobs.iter().filter(|j| j.status().is_terminal()).count();
    if done == jobs.len() {
        return 100.0;
    }
    done as f32 * 100.0 / jobs.len() as f32
}

/// One user-initiated "convert" action over many files.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    /// Unique batch ID.
    pub batch_id: String,
    jobs: Vec<ConversionJob>,
    target: FormatTag,
    concurrency: usize,
    state: BatchState,
}

impl BatchRequest {
    /// Creates a pending batch with one pending job per file.
    pub fn new(files: Vec<SourceFile>, target: FormatTag, concurrency: usize) -> Self {
        Self {
            batch_id: uuid::Uuid::new_v4().to_string(),
            jobs: files
                .into_iter()
                .map(|file| ConversionJob::new(file, target))
                .collect(),
            target,
            concurrency: concurrency.max(1),
            state: BatchState::Pending,
        }
    }

    pub fn jobs(&self) -> &[ConversionJob] {
        &self.jobs
    }

    pub fn target(&self) -> FormatTag {
        self.target
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Current progress in percent.
    pub fn progress(&self) -> f32 {
        progress(&self.jobs)
    }

    /// Moves the batch from pending to running. An empty batch completes immediately.
    pub fn start(&mut self) -> bool {
        if self.state != BatchState::Pending {
            return false;
        }
        self.state = if self.jobs.is_empty() {
            BatchState::Completed
        } else {
            BatchState::Running
        };
        true
    }

    /// Marks job `index` as running.
    pub fn start_job(&mut self, index: usize) -> bool {
        self.state == BatchState::Running && self.jobs.get_mut(index).is_some_and(|j| j.start())
    }

    /// Records the outcome of job `index`. The batch completes with its last job.
    pub fn finish_job(&mut self, index: usize, succeeded: bool) -> bool {
        if self.state != BatchState::Running {
            return false;
        }
        let Some(job) = self.jobs.get_mut(index) else {
            return false;
        };
        if !job.finish(succeeded) {
            return false;
        }
        if self.jobs.iter().all(|j| j.status().is_terminal()) {
            self.state = BatchState::Completed;
        }
        true
    }

    /// Number of jobs in `status`.
    pub fn count(&self, status: JobStatus) -> usize {
        self.jobs.iter().filter(|j| j.status() == status).count()
    }
}

/// Result of running a batch to completion.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Batch ID.
    pub batch_id: String,
    /// Requested target format.
    pub target: FormatTag,
    /// Number of files submitted.
    pub total: usize,
    /// Successful conversions, in completion order.
    pub artifacts: Vec<ConversionArtifact>,
    /// Failed conversions, in completion order.
    pub failures: Vec<ConversionError>,
    /// When the batch started.
    pub started_at: DateTime<Utc>,
    /// When the last job finished.
    pub finished_at: DateTime<Utc>,
}

impl BatchOutcome {
    pub fn succeeded(&self) -> usize {
        self.artifacts.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Wall-clock time the batch took.
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(n: usize) -> BatchRequest {
        let files = (0..n)
            .map(|i| SourceFile::new(format!("f{}.txt", i), "x"))
            .collect();
        BatchRequest::new(files, FormatTag::Pdf, 3)
    }

    #[test]
    fn test_progress_is_fraction_of_terminal_jobs() {
        let mut batch = request(4);
        assert_eq!(batch.progress(), 0.0);
        assert!(batch.start());

        assert!(batch.start_job(0));
        assert_eq!(batch.progress(), 0.0);
        assert!(batch.finish_job(0, true));
        assert_eq!(batch.progress(), 25.0);
        assert!(batch.finish_job(3, false));
        assert_eq!(batch.progress(), 50.0);
        assert_eq!(batch.state(), BatchState::Running);
    }

    #[test]
    fn test_last_job_completes_batch_at_exactly_100() {
        let mut batch = request(3);
        batch.start();
        let mut last = 0.0;
        for i in 0..3 {
            batch.finish_job(i, i != 1);
            assert!(batch.progress() > last);
            last = batch.progress();
        }
        assert_eq!(last, 100.0);
        assert_eq!(batch.state(), BatchState::Completed);
        assert_eq!(batch.count(JobStatus::Completed), 2);
        assert_eq!(batch.count(JobStatus::Failed), 1);
    }

    #[test]
    fn test_transitions_are_forward_only() {
        let mut batch = request(1);
        assert!(!batch.finish_job(0, true));
        batch.start();
        assert!(!batch.start());
        assert!(batch.finish_job(0, true));
        assert!(!batch.finish_job(0, false));
        assert!(!batch.start_job(0));
        assert!(!batch.finish_job(7, true));
    }

    #[test]
    fn test_empty_batch() {
        let mut batch = request(0);
        assert!(batch.start());
        assert_eq!(batch.state(), BatchState::Completed);
        assert_eq!(batch.progress(), 100.0);
    }

    #[test]
    fn test_concurrency_is_at_least_one() {
        let batch = BatchRequest::new(Vec::new(), FormatTag::Pdf, 0);
        assert_eq!(batch.concurrency(), 1);
    }
}
