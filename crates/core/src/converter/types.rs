//! Types for the converter module.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::format::{base_name, FormatTag};

/// A file handed to the engine by a caller.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Original file name, including its extension.
    pub name: String,
    /// Content type declared by the uploader (advisory only).
    pub content_type: Option<String>,
    /// File contents.
    pub bytes: Arc<[u8]>,
}

impl SourceFile {
    /// Creates a source file without a declared content type.
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            bytes: Arc::from(bytes.into()),
        }
    }

    /// Sets the declared content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Returns the size of the file in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the file is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the file name without directory components or extension.
    pub fn base_name(&self) -> &str {
        base_name(&self.name)
    }

    /// Hex md5 digest of the contents.
    pub fn md5_hex(&self) -> String {
        format!("{:x}", md5::compute(&self.bytes))
    }
}

/// Lifecycle state of a conversion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Whether the job has reached a final state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One file's conversion request.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    /// Unique job ID.
    pub job_id: String,
    /// File to convert.
    pub file: SourceFile,
    /// Requested target format.
    pub target: FormatTag,
    status: JobStatus,
}

impl ConversionJob {
    /// Creates a pending job.
    pub fn new(file: SourceFile, target: FormatTag) -> Self {
        Self {
            job_id: uuid::Uuid::new_v4().to_string(),
            file,
            target,
            status: JobStatus::Pending,
        }
    }

    /// Returns the current status.
    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Moves the job from pending to running. Returns false if it was not pending.
    pub fn start(&mut self) -> bool {
        if self.status != JobStatus::Pending {
            return false;
        }
        self.status = JobStatus::Running;
        true
    }

    /// Moves the job to a terminal state. Returns false if it already was terminal.
    pub fn finish(&mut self, succeeded: bool) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = if succeeded {
            JobStatus::Completed
        } else {
            JobStatus::Failed
        };
        true
    }
}

/// Result of a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionArtifact {
    /// Derived file name (original base name + target extension).
    pub file_name: String,
    /// MIME type of the payload.
    pub mime_type: String,
    /// Format of the payload. For archives, the format of the archived entries.
    pub format: FormatTag,
    /// Converted bytes.
    pub bytes: Vec<u8>,
    /// Name of the file this artifact was produced from.
    pub source_name: String,
    /// Hex md5 digest of the source bytes (of the archive itself for archives).
    pub source_md5: String,
}

impl ConversionArtifact {
    /// Builds the artifact for `source` converted to `format`.
    pub fn new(source: &SourceFile, format: FormatTag, bytes: Vec<u8>) -> Self {
        Self {
            file_name: format!("{}.{}", source.base_name(), format.extension()),
            mime_type: format.mime_type().to_string(),
            format,
            bytes,
            source_name: source.name.clone(),
            source_md5: source.md5_hex(),
        }
    }

    /// Returns the payload size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
