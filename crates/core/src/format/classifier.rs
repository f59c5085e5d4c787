//! Resolves a file name (and optional declared content type) to a format tag.

use thiserror::Error;

use super::tag::FormatTag;

/// Errors returned by [`classify`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    /// Neither the extension nor the content type is recognised.
    #[error("Unsupported file type: \"{}\"", display_extension(.extension))]
    Unsupported {
        file_name: String,
        extension: Option<String>,
    },
}

fn display_extension(extension: &Option<String>) -> String {
    match extension {
        Some(ext) => format!(".{}", ext),
        None => "(no extension)".to_string(),
    }
}

/// Returns the lower-cased extension of a file name, if it has one.
///
/// Directory components are ignored, and a leading dot (`.bashrc`) does not
/// count as an extension separator.
pub fn extension_of(file_name: &str) -> Option<String> {
    let name = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Returns the file name without directory components and without its extension.
pub fn base_name(file_name: &str) -> &str {
    let name = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => stem,
        _ => name,
    }
}

/// Classifies a file.
///
/// The extension is authoritative; the declared content type is only
/// consulted when the extension is missing or unknown.
pub fn classify(file_name: &str, content_type: Option<&str>) -> Result<FormatTag, ClassifyError> {
    let extension = extension_of(file_name);

    if let Some(tag) = extension.as_deref().and_then(FormatTag::from_extension) {
        return Ok(tag);
    }

    if let Some(tag) = content_type.and_then(FormatTag::from_mime) {
        return Ok(tag);
    }

    Err(ClassifyError::Unsupported {
        file_name: file_name.to_string(),
        extension,
    })
}
