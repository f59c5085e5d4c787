//! Error types for the converter module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::format::{ClassifyError, FormatTag};

/// Errors raised inside a conversion strategy.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// Extraction produced nothing but whitespace.
    #[error("No content found")]
    NoContent,

    /// Source bytes could not be decoded.
    #[error("Corrupt or unreadable input: {reason}")]
    CorruptInput { reason: String },

    /// The strategy was asked for a pair it does not serve.
    #[error("Unsupported conversion pair: {from} -> {to}")]
    UnsupportedPair { from: FormatTag, to: FormatTag },

    /// The intermediate representation could not be serialized.
    #[error("Encoding failed: {reason}")]
    Encoding { reason: String },

    /// External tool binary not found.
    #[error("Tool not found at path: {path}")]
    ToolNotFound { path: PathBuf },

    /// External tool did not finish in time.
    #[error("Conversion timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// I/O error while staging files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StrategyError {
    /// Creates a new corrupt input error.
    pub fn corrupt(reason: impl Into<String>) -> Self {
        Self::CorruptInput {
            reason: reason.into(),
        }
    }

    /// Creates a new encoding error.
    pub fn encoding(reason: impl Into<String>) -> Self {
        Self::Encoding {
            reason: reason.into(),
        }
    }

    /// Maps this error onto the engine's error taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoContent | Self::CorruptInput { .. } => ErrorKind::Extraction,
            Self::UnsupportedPair { .. } => ErrorKind::Capability,
            Self::Encoding { .. }
            | Self::ToolNotFound { .. }
            | Self::Timeout { .. }
            | Self::Io(_) => ErrorKind::Encoding,
        }
    }
}

impl From<zip::result::ZipError> for StrategyError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::encoding(format!("archive error: {}", e))
    }
}

impl From<quick_xml::Error> for StrategyError {
    fn from(e: quick_xml::Error) -> Self {
        Self::corrupt(format!("XML parsing error: {}", e))
    }
}

/// Category of a conversion failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The file type was not recognised.
    Classification,
    /// The file type is known but cannot become the requested target.
    Capability,
    /// The source bytes could not be decoded.
    Extraction,
    /// The target format could not be produced.
    Encoding,
}

/// Uniform failure shape returned by the dispatcher.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ConversionError {
    /// Failure category.
    pub kind: ErrorKind,
    /// Human readable cause.
    pub message: String,
    /// Name of the file that failed.
    pub file_name: String,
    /// Detected source format, if classification succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_format: Option<FormatTag>,
    /// Requested target format.
    pub target_format: FormatTag,
}

impl ConversionError {
    /// Wraps a classification failure.
    pub fn classification(file_name: &str, target: FormatTag, err: &ClassifyError) -> Self {
        Self {
            kind: ErrorKind::Classification,
            message: err.to_string(),
            file_name: file_name.to_string(),
            source_format: None,
            target_format: target,
        }
    }

    /// Creates a capability failure for a pair with no registered edge.
    pub fn capability(file_name: &str, source: FormatTag, target: FormatTag) -> Self {
        Self {
            kind: ErrorKind::Capability,
            message: format!(
                "Format not supported for this target: {} cannot be converted to {}",
                source.label(),
                target.extension().to_uppercase()
            ),
            file_name: file_name.to_string(),
            source_format: Some(source),
            target_format: target,
        }
    }

    /// Wraps a strategy failure.
    pub fn from_strategy(
        file_name: &str,
        source: FormatTag,
        target: FormatTag,
        err: &StrategyError,
    ) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            file_name: file_name.to_string(),
            source_format: Some(source),
            target_format: target,
        }
    }
}

/// Error shape surfaced to UI callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl ErrorReport {
    /// Creates a report that is not tied to a particular file.
    pub fn general(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            file_name: None,
        }
    }
}

impl From<ConversionError> for ErrorReport {
    fn from(err: ConversionError) -> Self {
        Self {
            message: err.message,
            file_name: Some(err.file_name),
        }
    }
}

impl From<&ConversionError> for ErrorReport {
    fn from(err: &ConversionError) -> Self {
        Self {
            message: err.message.clone(),
            file_name: Some(err.file_name.clone()),
        }
    }
}
