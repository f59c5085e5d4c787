//! Types for the packager module.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::converter::{ConversionArtifact, ConversionError, ErrorReport};

/// What the caller receives for download.
#[derive(Debug, Clone)]
pub enum Delivery {
    /// A single converted file, delivered as-is.
    File(ConversionArtifact),
    /// A zip of every successful artifact, plus the files that were skipped.
    Archive {
        artifact: ConversionArtifact,
        failures: Vec<ConversionError>,
    },
}

impl Delivery {
    /// The downloadable payload.
    pub fn artifact(&self) -> &ConversionArtifact {
        match self {
            Self::File(artifact) | Self::Archive { artifact, .. } => artifact,
        }
    }

    /// Consumes the delivery, returning the downloadable payload.
    pub fn into_artifact(self) -> ConversionArtifact {
        match self {
            Self::File(artifact) | Self::Archive { artifact, .. } => artifact,
        }
    }

    /// Files that could not be converted.
    pub fn failures(&self) -> &[ConversionError] {
        match self {
            Self::File(_) => &[],
            Self::Archive { failures, .. } => failures,
        }
    }

    pub fn is_archive(&self) -> bool {
        matches!(self, Self::Archive { .. })
    }

    /// Label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Archive { .. } => "archive",
        }
    }
}

/// Result of a batch conversion as surfaced to callers.
#[derive(Debug, Clone)]
pub struct BatchDelivery {
    /// Batch ID.
    pub batch_id: String,
    /// The downloadable output.
    pub delivery: Delivery,
    /// Skipped files and why, for display next to the download.
    pub failures: Vec<ErrorReport>,
    /// Counts and timing.
    pub summary: BatchSummary,
}

/// Counts and timing of a finished batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Errors that can occur while packaging.
#[derive(Debug, Error)]
pub enum PackageError {
    /// Every job failed.
    #[error("None of the {} file(s) could be converted", failures.len())]
    NothingConverted { failures: Vec<ConversionError> },

    /// The archive could not be written.
    #[error("Failed to build archive: {reason}")]
    Archive { reason: String },
}

impl From<zip::result::ZipError> for PackageError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::Archive {
            reason: e.to_string(),
        }
    }
}
