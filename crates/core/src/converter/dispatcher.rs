//! Routes a file to the strategy serving its (source, target) pair.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::capabilities::CapabilityRegistry;
use super::config::ConverterConfig;
use super::error::ConversionError;
use super::registry::StrategyRegistry;
use super::types::{ConversionArtifact, SourceFile};
use crate::format::{classify, FormatTag};
use crate::metrics;

/// Classifies files, checks capabilities and invokes strategies.
///
/// Conversion is deterministic, so failures are never retried.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    strategies: Arc<StrategyRegistry>,
}

impl Dispatcher {
    /// Creates a dispatcher over the given strategies.
    pub fn new(strategies: StrategyRegistry) -> Self {
        Self {
            strategies: Arc::new(strategies),
        }
    }

    /// Creates a dispatcher with every built-in strategy.
    pub fn with_defaults(config: &ConverterConfig) -> Self {
        Self::new(StrategyRegistry::with_defaults(config))
    }

    /// Returns the strategy registry.
    pub fn strategies(&self) -> &StrategyRegistry {
        &self.strategies
    }

    /// Classifies `file` and checks that it may become `target`.
    ///
    /// Does not look at the file contents.
    pub fn check(&self, file: &SourceFile, target: FormatTag) -> Result<FormatTag, ConversionError> {
        let source = classify(&file.name, file.content_type.as_deref()).map_err(|e| {
            metrics::FILES_REJECTED
                .with_label_values(&["classification"])
                .inc();
            ConversionError::classification(&file.name, target, &e)
        })?;

        if !CapabilityRegistry::can_convert(source, target) {
            metrics::FILES_REJECTED.with_label_values(&["capability"]).inc();
            return Err(ConversionError::capability(&file.name, source, target));
        }

        Ok(source)
    }

    /// Converts `file` into `target`.
    pub async fn dispatch(
        &self,
        file: &SourceFile,
        target: FormatTag,
    ) -> Result<ConversionArtifact, ConversionError> {
        let source = match self.check(file, target) {
            Ok(source) => source,
            Err(e) => {
                warn!(file = %file.name, target = %target, error = %e, "Conversion rejected");
                return Err(e);
            }
        };

        let strategy = self.strategies.get(source, target).ok_or_else(|| {
            warn!(file = %file.name, source = %source, target = %target, "No strategy registered");
            ConversionError::capability(&file.name, source, target)
        })?;

        debug!(
            file = %file.name,
            source = %source,
            target = %target,
            strategy = strategy.name(),
            size_bytes = file.len(),
            "Dispatching conversion"
        );

        let start = Instant::now();
        let result = strategy.convert(file, source, target).await;
        let elapsed = start.elapsed();

        metrics::CONVERSION_DURATION
            .with_label_values(&[source.extension(), target.extension()])
            .observe(elapsed.as_secs_f64());

        match result {
            Ok(bytes) => {
                metrics::CONVERSIONS_TOTAL
                    .with_label_values(&[source.extension(), target.extension(), "completed"])
                    .inc();
                let artifact = ConversionArtifact::new(file, target, bytes);
                info!(
                    file = %file.name,
                    output = %artifact.file_name,
                    md5 = %artifact.source_md5,
                    output_bytes = artifact.len(),
                    duration_ms = elapsed.as_millis() as u64,
                    "Conversion completed"
                );
                Ok(artifact)
            }
            Err(e) => {
                metrics::CONVERSIONS_TOTAL
                    .with_label_values(&[source.extension(), target.extension(), "failed"])
                    .inc();
                warn!(
                    file = %file.name,
                    source = %source,
                    target = %target,
                    error = %e,
                    "Conversion failed"
                );
                Err(ConversionError::from_strategy(&file.name, source, target, &e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::ErrorKind;
    use crate::testing::MockStrategy;

    fn mock_dispatcher(mock: &MockStrategy) -> Dispatcher {
        let mut registry = StrategyRegistry::new();
        registry.register(Arc::new(mock.clone()));
        Dispatcher::new(registry)
    }

    #[tokio::test]
    async fn test_unknown_type_fails_classification() {
        let mock = MockStrategy::new(vec![(FormatTag::PlainText, FormatTag::Pdf)]);
        let dispatcher = mock_dispatcher(&mock);

        let err = dispatcher
            .dispatch(&SourceFile::new("tool.exe", "MZ"), FormatTag::Pdf)
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Classification);
        assert_eq!(err.file_name, "tool.exe");
        assert!(err.source_format.is_none());
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_edge_fails_fast() {
        let mock = MockStrategy::new(vec![(FormatTag::Json, FormatTag::Csv)]);
        let dispatcher = mock_dispatcher(&mock);

        let err = dispatcher
            .dispatch(&SourceFile::new("data.json", "[]"), FormatTag::Webp)
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Capability);
        assert_eq!(err.source_format, Some(FormatTag::Json));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_edge_without_strategy_is_a_capability_failure() {
        let dispatcher = Dispatcher::new(StrategyRegistry::new());
        let err = dispatcher
            .dispatch(&SourceFile::new("data.json", "[]"), FormatTag::Csv)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Capability);
    }

    #[tokio::test]
    async fn test_successful_dispatch_builds_artifact() {
        let mock = MockStrategy::new(vec![(FormatTag::Json, FormatTag::Csv)]);
        let dispatcher = mock_dispatcher(&mock);

        let artifact = dispatcher
            .dispatch(&SourceFile::new("data.json", "[]"), FormatTag::Csv)
            .await
            .unwrap();

        assert_eq!(artifact.file_name, "data.csv");
        assert_eq!(artifact.mime_type, "text/csv");
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_strategy_failure_is_normalized() {
        let mock = MockStrategy::new(vec![(FormatTag::PlainText, FormatTag::Pdf)]);
        mock.fail_with_no_content();
        let dispatcher = mock_dispatcher(&mock);

        let err = dispatcher
            .dispatch(&SourceFile::new("notes.txt", "  "), FormatTag::Pdf)
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Extraction);
        assert_eq!(err.message, "No content found");
        assert_eq!(err.source_format, Some(FormatTag::PlainText));
        assert_eq!(err.target_format, FormatTag::Pdf);
    }

    #[test]
    fn test_check_uses_content_type_fallback() {
        let dispatcher = Dispatcher::new(StrategyRegistry::new());
        let file = SourceFile::new("upload", "{}").with_content_type("application/json");
        assert_eq!(dispatcher.check(&file, FormatTag::Csv).unwrap(), FormatTag::Json);
    }
}
