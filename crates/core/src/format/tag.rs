//! Canonical format tags and their static properties.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Broad family a format belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatFamily {
    /// Word processing documents.
    Document,
    /// Plain or lightly marked-up text.
    Text,
    /// Fixed-layout pages (PDF).
    Page,
    /// Slide decks.
    Presentation,
    /// Decoded-to-bitmap images.
    Raster,
    /// Vector drawings.
    Vector,
    /// Row/column data.
    Tabular,
    /// Tree-shaped data (JSON, XML).
    Structured,
    /// Video containers.
    Video,
}

/// Identifies the kind of a file flowing through the engine.
///
/// Serialized as the canonical lower-case extension (`"docx"`, `"txt"`, `"jpg"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FormatTag {
    #[serde(rename = "docx")]
    Docx,
    #[serde(rename = "txt")]
    PlainText,
    #[serde(rename = "html")]
    Html,
    #[serde(rename = "pdf")]
    Pdf,
    #[serde(rename = "pptx")]
    Pptx,
    #[serde(rename = "png")]
    Png,
    #[serde(rename = "jpg", alias = "jpeg")]
    Jpeg,
    #[serde(rename = "webp")]
    Webp,
    #[serde(rename = "json")]
    Json,
    #[serde(rename = "csv")]
    Csv,
    #[serde(rename = "xlsx")]
    Xlsx,
    #[serde(rename = "md", alias = "markdown")]
    Markdown,
    #[serde(rename = "svg")]
    Svg,
    #[serde(rename = "xml")]
    Xml,
    #[serde(rename = "mov")]
    Mov,
    #[serde(rename = "mp4")]
    Mp4,
}

impl FormatTag {
    /// Every tag, in declaration order.
    pub const ALL: [FormatTag; 16] = [
        Self::Docx,
        Self::PlainText,
        Self::Html,
        Self::Pdf,
        Self::Pptx,
        Self::Png,
        Self::Jpeg,
        Self::Webp,
        Self::Json,
        Self::Csv,
        Self::Xlsx,
        Self::Markdown,
        Self::Svg,
        Self::Xml,
        Self::Mov,
        Self::Mp4,
    ];

    /// Returns the canonical file extension (without the dot).
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Docx => "docx",
            Self::PlainText => "txt",
            Self::Html => "html",
            Self::Pdf => "pdf",
            Self::Pptx => "pptx",
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
            Self::Markdown => "md",
            Self::Svg => "svg",
            Self::Xml => "xml",
            Self::Mov => "mov",
            Self::Mp4 => "mp4",
        }
    }

    /// Returns the MIME type used when delivering an artifact of this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::PlainText => "text/plain",
            Self::Html => "text/html",
            Self::Pdf => "application/pdf",
            Self::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
            Self::Json => "application/json",
            Self::Csv => "text/csv",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Markdown => "text/markdown",
            Self::Svg => "image/svg+xml",
            Self::Xml => "application/xml",
            Self::Mov => "video/quicktime",
            Self::Mp4 => "video/mp4",
        }
    }

    /// Human readable label, e.g. for a format picker.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Docx => "Word document",
            Self::PlainText => "Plain text",
            Self::Html => "HTML",
            Self::Pdf => "PDF",
            Self::Pptx => "PowerPoint presentation",
            Self::Png => "PNG image",
            Self::Jpeg => "JPEG image",
            Self::Webp => "WebP image",
            Self::Json => "JSON",
            Self::Csv => "CSV",
            Self::Xlsx => "Excel spreadsheet",
            Self::Markdown => "Markdown",
            Self::Svg => "SVG drawing",
            Self::Xml => "XML",
            Self::Mov => "QuickTime video",
            Self::Mp4 => "MP4 video",
        }
    }

    /// Returns the family this format belongs to.
    pub fn family(&self) -> FormatFamily {
        match self {
            Self::Docx => FormatFamily::Document,
            Self::PlainText | Self::Html | Self::Markdown => FormatFamily::Text,
            Self::Pdf => FormatFamily::Page,
            Self::Pptx => FormatFamily::Presentation,
            Self::Png | Self::Jpeg | Self::Webp => FormatFamily::Raster,
            Self::Svg => FormatFamily::Vector,
            Self::Csv | Self::Xlsx => FormatFamily::Tabular,
            Self::Json | Self::Xml => FormatFamily::Structured,
            Self::Mov | Self::Mp4 => FormatFamily::Video,
        }
    }

    /// Whether this format decodes to a bitmap.
    pub fn is_raster(&self) -> bool {
        self.family() == FormatFamily::Raster
    }

    /// Looks up a tag by file extension (case-insensitive, leading dot allowed).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
        let tag = match ext.as_str() {
            "docx" => Self::Docx,
            "txt" | "text" => Self::PlainText,
            "html" | "htm" => Self::Html,
            "pdf" => Self::Pdf,
            "pptx" => Self::Pptx,
            "png" => Self::Png,
            "jpg" | "jpeg" => Self::Jpeg,
            "webp" => Self::Webp,
            "json" => Self::Json,
            "csv" => Self::Csv,
            "xlsx" => Self::Xlsx,
            "md" | "markdown" => Self::Markdown,
            "svg" => Self::Svg,
            "xml" => Self::Xml,
            "mov" => Self::Mov,
            "mp4" => Self::Mp4,
            _ => return None,
        };
        Some(tag)
    }

    /// Looks up a tag by declared content type.
    ///
    /// Parameters (`; charset=...`) are ignored.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if let Some(tag) = Self::ALL.iter().find(|t| t.mime_type() == essence) {
            return Some(*tag);
        }

        let tag = match essence.as_str() {
            "image/jpg" | "image/pjpeg" => Self::Jpeg,
            "text/xml" => Self::Xml,
            "text/x-markdown" => Self::Markdown,
            "application/vnd.ms-excel" => Self::Xlsx,
            "text/json" => Self::Json,
            "application/csv" => Self::Csv,
            "application/xhtml+xml" => Self::Html,
            _ => return None,
        };
        Some(tag)
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Error returned when parsing an unknown format name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown format: {0}")]
pub struct UnknownFormat(pub String);

impl FromStr for FormatTag {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| UnknownFormat(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_round_trips_through_lookup() {
        for tag in FormatTag::ALL {
            assert_eq!(FormatTag::from_extension(tag.extension()), Some(tag));
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!(FormatTag::from_extension("JPEG"), Some(FormatTag::Jpeg));
        assert_eq!(FormatTag::from_extension(".htm"), Some(FormatTag::Html));
        assert_eq!(FormatTag::from_extension("markdown"), Some(FormatTag::Markdown));
        assert_eq!(FormatTag::from_extension("exe"), None);
    }

    #[test]
    fn test_mime_lookup() {
        assert_eq!(FormatTag::from_mime("image/png"), Some(FormatTag::Png));
        assert_eq!(
            FormatTag::from_mime("text/csv; charset=utf-8"),
            Some(FormatTag::Csv)
        );
        assert_eq!(FormatTag::from_mime("TEXT/XML"), Some(FormatTag::Xml));
        assert_eq!(FormatTag::from_mime("application/octet-stream"), None);
    }

    #[test]
    fn test_serde_uses_extensions() {
        let json = serde_json::to_string(&FormatTag::PlainText).unwrap();
        assert_eq!(json, "\"txt\"");
        let parsed: FormatTag = serde_json::from_str("\"jpeg\"").unwrap();
        assert_eq!(parsed, FormatTag::Jpeg);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("webp".parse::<FormatTag>(), Ok(FormatTag::Webp));
        assert!("exe".parse::<FormatTag>().is_err());
    }

    #[test]
    fn test_families() {
        assert!(FormatTag::Png.is_raster());
        assert!(!FormatTag::Svg.is_raster());
        assert_eq!(FormatTag::Xlsx.family(), FormatFamily::Tabular);
        assert_eq!(FormatTag::Mov.family(), FormatFamily::Video);
    }
}
