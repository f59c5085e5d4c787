//! Library facade tying classification, batching and packaging together.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::converter::{
    CapabilityRegistry, ConversionError, Dispatcher, ErrorReport, SourceFile, StrategyRegistry,
    MIXED_SELECTION_DEFAULTS,
};
use crate::format::{classify, FormatTag};
use crate::metrics::DELIVERIES_TOTAL;
use crate::packager::{BatchDelivery, BatchSummary, Delivery, PackageError, Packager};
use crate::processor::BatchProcessor;

/// Advisory shown when a mixed selection has no target in common.
const MIXED_ADVISORY: &str =
    "The selected files have different types; some of them may not convert to the chosen format.";

/// Targets to offer for a selection of files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetOptions {
    /// Formats to offer, in display order.
    pub targets: Vec<FormatTag>,
    /// Caveat to show next to the choice, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
}

/// Entry point for callers: offers targets and converts files.
#[derive(Debug, Clone)]
pub struct ConversionEngine {
    dispatcher: Arc<Dispatcher>,
    processor: BatchProcessor,
    packager: Packager,
}

impl ConversionEngine {
    /// Creates an engine with every built-in strategy.
    pub fn new(config: Config) -> Self {
        let strategies = StrategyRegistry::with_defaults(&config.converter);
        Self::with_strategies(config, strategies)
    }

    /// Creates an engine over a custom strategy registry.
    pub fn with_strategies(config: Config, strategies: StrategyRegistry) -> Self {
        let missing = strategies.missing_edges();
        if !missing.is_empty() {
            warn!(missing = missing.len(), "Some capability edges have no strategy");
        }
        let dispatcher = Arc::new(Dispatcher::new(strategies));
        Self {
            processor: BatchProcessor::new(Arc::clone(&dispatcher), config.processor.clone()),
            packager: Packager::new(config.processor.archive_name),
            dispatcher,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Formats the selection can be converted to.
    ///
    /// A single type offers its own targets. Several types offer the targets
    /// they share, or a default list with an advisory when they share none.
    /// Files of unknown type are left out.
    pub fn valid_targets(&self, files: &[SourceFile]) -> TargetOptions {
        let mut sources = Vec::new();
        let mut unknown = 0;
        for file in files {
            match classify(&file.name, file.content_type.as_deref()) {
                Ok(tag) if !sources.contains(&tag) => sources.push(tag),
                Ok(_) => {}
                Err(_) => unknown += 1,
            }
        }

        let unknown_advisory = (unknown > 0)
            .then(|| format!("{} file(s) have an unsupported type and will be skipped.", unknown));

        if sources.len() <= 1 {
            let targets = sources
                .first()
                .map(|s| CapabilityRegistry::valid_targets(*s).to_vec())
                .unwrap_or_default();
            return TargetOptions {
                targets,
                advisory: unknown_advisory,
            };
        }

        let common = CapabilityRegistry::common_targets(&sources);
        if !common.is_empty() {
            return TargetOptions {
                targets: common,
                advisory: unknown_advisory,
            };
        }

        let advisory = match unknown_advisory {
            Some(extra) => format!("{} {}", MIXED_ADVISORY, extra),
            None => MIXED_ADVISORY.to_string(),
        };
        TargetOptions {
            targets: MIXED_SELECTION_DEFAULTS.to_vec(),
            advisory: Some(advisory),
        }
    }

    /// Converts one file and delivers it directly.
    pub async fn convert_single(&self, file: SourceFile, target: FormatTag) -> Result<Delivery, ErrorReport> {
        let artifact = self.dispatcher.dispatch(&file, target).await?;
        DELIVERIES_TOTAL.with_label_values(&["file"]).inc();
        Ok(Delivery::File(artifact))
    }

    /// Converts many files, reporting progress in percent after each one.
    ///
    /// Fails only when nothing could be converted; otherwise skipped files
    /// are listed in [`BatchDelivery::failures`].
    pub async fn convert_batch<F>(
        &self,
        files: Vec<SourceFile>,
        target: FormatTag,
        on_progress: F,
    ) -> Result<BatchDelivery, ErrorReport>
    where
        F: FnMut(f32),
    {
        if files.is_empty() {
            return Err(ErrorReport::general("No files selected"));
        }

        let outcome = self.processor.run(files, target, on_progress).await;
        let batch_id = outcome.batch_id.clone();
        let summary = BatchSummary {
            total: outcome.total,
            succeeded: outcome.succeeded(),
            failed: outcome.failed(),
            started_at: outcome.started_at,
            finished_at: outcome.finished_at,
        };

        match self.packager.package(outcome) {
            Ok(delivery) => {
                info!(
                    batch_id = %batch_id,
                    succeeded = summary.succeeded,
                    failed = summary.failed,
                    "Batch delivered"
                );
                Ok(BatchDelivery {
                    batch_id,
                    failures: delivery.failures().iter().map(ErrorReport::from).collect(),
                    delivery,
                    summary,
                })
            }
            Err(PackageError::NothingConverted { failures }) => Err(nothing_converted(failures)),
            Err(e) => Err(ErrorReport::general(e.to_string())),
        }
    }
}

/// Reports a batch in which every file failed.
fn nothing_converted(mut failures: Vec<ConversionError>) -> ErrorReport {
    if failures.len() == 1 {
        return ErrorReport::from(failures.remove(0));
    }
    let details: Vec<String> = failures
        .iter()
        .map(|f| format!("{}: {}", f.file_name, f.message))
        .collect();
    ErrorReport::general(format!(
        "None of the {} files could be converted ({})",
        failures.len(),
        details.join("; ")
    ))
}

impl Default for ConversionEngine {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
