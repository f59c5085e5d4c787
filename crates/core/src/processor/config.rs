//! Configuration for the processor module.

use serde::{Deserialize, Serialize};

/// Configuration for batch runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Maximum conversions in flight per batch.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// File name of the archive produced for multi-file deliveries.
    #[serde(default = "default_archive_name")]
    pub archive_name: String,
}

fn default_concurrency() -> usize {
    3
}

fn default_archive_name() -> String {
    "converted_files.zip".to_string()
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            archive_name: default_archive_name(),
        }
    }
}

impl ProcessorConfig {
    /// Set the number of concurrent conversions.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the archive file name.
    pub fn with_archive_name(mut self, name: impl Into<String>) -> Self {
        self.archive_name = name.into();
        self
    }
}
