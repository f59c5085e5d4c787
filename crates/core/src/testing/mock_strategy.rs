//! Mock strategy for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::converter::{SourceFile, Strategy, StrategyError};
use crate::format::FormatTag;

/// Mock implementation of the Strategy trait.
///
/// Provides controllable behavior for testing:
/// - Count calls and the peak number of concurrent calls
/// - Fail every call, or only calls for named files
/// - Simulate slow conversions
///
/// Successful calls return `"<file name> -> <target>"` as bytes.
///
/// # Example
///
/// ```rust,ignore
/// use docshift_core::testing::MockStrategy;
///
/// let mock = MockStrategy::new(vec![(FormatTag::PlainText, FormatTag::Pdf)]);
/// mock.fail_file("broken.txt");
///
/// let mut registry = StrategyRegistry::new();
/// registry.register(Arc::new(mock.clone()));
///
/// // ... run conversions ...
/// assert_eq!(mock.call_count(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct MockStrategy {
    edges: Vec<(FormatTag, FormatTag)>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    fail_all: Arc<AtomicBool>,
    failing_files: Arc<Mutex<HashSet<String>>>,
}

impl MockStrategy {
    /// Create a mock serving the given edges.
    pub fn new(edges: Vec<(FormatTag, FormatTag)>) -> Self {
        Self {
            edges,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            fail_all: Arc::new(AtomicBool::new(false)),
            failing_files: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Set the simulated conversion duration.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make every call fail with [`StrategyError::NoContent`].
    pub fn fail_with_no_content(&self) {
        self.fail_all.store(true, Ordering::SeqCst);
    }

    /// Make calls for `file_name` fail with [`StrategyError::CorruptInput`].
    pub fn fail_file(&self, file_name: impl Into<String>) {
        if let Ok(mut files) = self.failing_files.lock() {
            files.insert(file_name.into());
        }
    }

    /// Number of convert calls received.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Peak number of convert calls running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn should_fail(&self, file_name: &str) -> bool {
        self.failing_files
            .lock()
            .map(|files| files.contains(file_name))
            .unwrap_or(false)
    }
}

#[async_trait]
impl Strategy for MockStrategy {
    fn name(&self) -> &str {
        "mock"
    }

    fn edges(&self) -> Vec<(FormatTag, FormatTag)> {
        self.edges.clone()
    }

    async fn convert(
        &self,
        file: &SourceFile,
        from: FormatTag,
        to: FormatTag,
    ) -> Result<Vec<u8>, StrategyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if !self.edges.contains(&(from, to)) {
            return Err(StrategyError::UnsupportedPair { from, to });
        }
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(StrategyError::NoContent);
        }
        if self.should_fail(&file.name) {
            return Err(StrategyError::corrupt(format!("mock failure for {}", file.name)));
        }
        Ok(format!("{} -> {}", file.name, to).into_bytes())
    }
}
