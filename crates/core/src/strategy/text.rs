//! Plain text to PDF, DOCX and HTML.

use async_trait::async_trait;

use super::{decode_text, run_blocking};
use crate::converter::{ensure_pair, SourceFile, Strategy, StrategyError};
use crate::format::FormatTag;
use crate::markup::Markup;
use crate::render::{docx, html, pdf};

/// Reflows plain text into document formats.
#[derive(Debug, Clone, Default)]
pub struct TextStrategy;

impl TextStrategy {
    pub fn new() -> Self {
        Self
    }
}

fn extract(bytes: &[u8]) -> Result<String, StrategyError> {
    let text = decode_text(bytes);
    if text.trim().is_empty() {
        return Err(StrategyError::NoContent);
    }
    Ok(text)
}

fn encode(text: &str, title: &str, to: FormatTag) -> Result<Vec<u8>, StrategyError> {
    match to {
        FormatTag::Pdf => pdf::render_text(text),
        FormatTag::Docx => docx::render_markup(&Markup::from_lines(text)),
        FormatTag::Html => Ok(html::render_text(title, text).into_bytes()),
        other => Err(StrategyError::UnsupportedPair {
            from: FormatTag::PlainText,
            to: other,
        }),
    }
}

#[async_trait]
impl Strategy for TextStrategy {
    fn name(&self) -> &str {
        "text"
    }

    fn edges(&self) -> Vec<(FormatTag, FormatTag)> {
        vec![
            (FormatTag::PlainText, FormatTag::Pdf),
            (FormatTag::PlainText, FormatTag::Docx),
            (FormatTag::PlainText, FormatTag::Html),
        ]
    }

    async fn convert(
        &self,
        file: &SourceFile,
        from: FormatTag,
        to: FormatTag,
    ) -> Result<Vec<u8>, StrategyError> {
        ensure_pair(self, from, to)?;

        let bytes = file.bytes.clone();
        let text = run_blocking(move || extract(&bytes)).await?;

        let title = file.base_name().to_string();
        run_blocking(move || encode(&text, &title, to)).await
    }
}
