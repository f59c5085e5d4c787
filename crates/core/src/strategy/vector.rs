//! SVG rasterisation.

use async_trait::async_trait;

use super::{decode_text, run_blocking};
use crate::converter::{ensure_pair, SourceFile, Strategy, StrategyError};
use crate::format::FormatTag;

/// Renders an SVG drawing to PNG at its intrinsic size, keeping transparency.
#[derive(Debug, Clone, Default)]
pub struct VectorStrategy;

impl VectorStrategy {
    pub fn new() -> Self {
        Self
    }
}

/// Checks the input is an XML document rooted at `<svg>`.
fn inspect(bytes: &[u8]) -> Result<(), StrategyError> {
    let text = decode_text(bytes);
    if text.trim().is_empty() {
        return Err(StrategyError::NoContent);
    }
    let document = roxmltree::Document::parse(&text)
        .map_err(|e| StrategyError::corrupt(format!("SVG: {}", e)))?;
    if document.root_element().tag_name().name() != "svg" {
        return Err(StrategyError::corrupt("root element is not <svg>"));
    }
    Ok(())
}

fn rasterize(bytes: &[u8]) -> Result<Vec<u8>, StrategyError> {
    let image = super::pdf::render::first_page(bytes, "image/svg+xml", 1.0, true)?;
    super::raster::encode_image(&image, FormatTag::Png, 100)
}

#[async_trait]
impl Strategy for VectorStrategy {
    fn name(&self) -> &str {
        "vector"
    }

    fn edges(&self) -> Vec<(FormatTag, FormatTag)> {
        vec![(FormatTag::Svg, FormatTag::Png)]
    }

    async fn convert(
        &self,
        file: &SourceFile,
        from: FormatTag,
        to: FormatTag,
    ) -> Result<Vec<u8>, StrategyError> {
        ensure_pair(self, from, to)?;

        let bytes = file.bytes.clone();
        run_blocking(move || {
            inspect(&bytes)?;
            rasterize(&bytes)
        })
        .await
    }
}
