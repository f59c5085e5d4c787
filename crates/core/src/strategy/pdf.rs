//! First-page PDF rasterisation.

use async_trait::async_trait;
use image::DynamicImage;

use super::raster::encode_image;
use super::run_blocking;
use crate::converter::{ensure_pair, SourceFile, Strategy, StrategyError};
use crate::format::FormatTag;

/// Renders page one of a PDF to PNG or JPEG at `raster_scale` times its
/// natural size.
#[derive(Debug, Clone)]
pub struct PdfStrategy {
    raster_scale: f32,
    jpeg_quality: u8,
}

impl PdfStrategy {
    pub fn new(raster_scale: f32, jpeg_quality: u8) -> Self {
        Self {
            raster_scale,
            jpeg_quality,
        }
    }
}

/// Checks the document parses and has at least one page.
fn inspect(bytes: &[u8]) -> Result<usize, StrategyError> {
    let document = lopdf::Document::load_mem(bytes)
        .map_err(|e| StrategyError::corrupt(format!("PDF: {}", e)))?;
    let pages = document.get_pages().len();
    if pages == 0 {
        return Err(StrategyError::NoContent);
    }
    Ok(pages)
}

pub(crate) mod render {
    use image::{DynamicImage, RgbaImage};
    use mupdf::{Colorspace, Document, Matrix, Pixmap};

    use crate::converter::StrategyError;

    fn pixmap_to_image(pixmap: &Pixmap) -> Result<DynamicImage, StrategyError> {
        let width = pixmap.width() as u32;
        let height = pixmap.height() as u32;
        let samples = pixmap.samples();
        let n = pixmap.n() as usize;

        let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
        for pixel in samples.chunks(n).take(width as usize * height as usize) {
            let alpha = if n >= 4 { pixel[3] } else { 255 };
            rgba.extend_from_slice(&[pixel[0], pixel[1], pixel[2], alpha]);
        }

        RgbaImage::from_raw(width, height, rgba)
            .map(DynamicImage::ImageRgba8)
            .ok_or_else(|| StrategyError::encoding("rendered pixmap has an unexpected size"))
    }

    /// Rasterises the first page of a MuPDF-readable document.
    pub(crate) fn first_page(
        bytes: &[u8],
        mime: &str,
        scale: f32,
        alpha: bool,
    ) -> Result<DynamicImage, StrategyError> {
        let document = Document::from_bytes(bytes, mime)
            .map_err(|e| StrategyError::corrupt(format!("{}: {}", mime, e)))?;
        if document.page_count().map_err(|e| StrategyError::corrupt(e.to_string()))? == 0 {
            return Err(StrategyError::NoContent);
        }
        let page = document
            .load_page(0)
            .map_err(|e| StrategyError::corrupt(e.to_string()))?;
        let pixmap = page
            .to_pixmap(&Matrix::new_scale(scale, scale), &Colorspace::device_rgb(), alpha, false)
            .map_err(|e| StrategyError::encoding(format!("render failed: {}", e)))?;
        pixmap_to_image(&pixmap)
    }
}

fn rasterize(bytes: &[u8], scale: f32) -> Result<DynamicImage, StrategyError> {
    render::first_page(bytes, "application/pdf", scale, false)
}

#[async_trait]
impl Strategy for PdfStrategy {
    fn name(&self) -> &str {
        "pdf"
    }

    fn edges(&self) -> Vec<(FormatTag, FormatTag)> {
        vec![
            (FormatTag::Pdf, FormatTag::Png),
            (FormatTag::Pdf, FormatTag::Jpeg),
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
        let scale = self.raster_scale;
        let quality = self.jpeg_quality;
        run_blocking(move || {
            let pages = inspect(&bytes)?;
            tracing::debug!(pages, scale, "Rendering first PDF page");
            let image = rasterize(&bytes, scale)?;
            encode_image(&image, to, quality)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::pdf;

    #[test]
    fn test_inspect_counts_pages() {
        let doc = pdf::render_text("hello").unwrap();
        assert_eq!(inspect(&doc).unwrap(), 1);
        assert!(matches!(inspect(b"%PDF-nope"), Err(StrategyError::CorruptInput { .. })));
    }

    #[tokio::test]
    async fn test_renders_first_page_at_scale() {
        let doc = pdf::render_text("hello").unwrap();
        let png = PdfStrategy::new(2.0, 90)
            .convert(&SourceFile::new("a.pdf", doc), FormatTag::Pdf, FormatTag::Png)
            .await
            .unwrap();
        let image = image::load_from_memory_with_format(&png, image::ImageFormat::Png).unwrap();
        // A4 is 595.28 x 841.89 pt.
        assert!((1190..=1192).contains(&image.width()));
        assert!((1683..=1685).contains(&image.height()));
    }

    #[tokio::test]
    async fn test_renders_jpeg_without_alpha() {
        let doc = pdf::render_text("hello").unwrap();
        let jpeg = PdfStrategy::new(1.0, 80)
            .convert(&SourceFile::new("a.pdf", doc), FormatTag::Pdf, FormatTag::Jpeg)
            .await
            .unwrap();
        let image = image::load_from_memory_with_format(&jpeg, image::ImageFormat::Jpeg).unwrap();
        assert!((595..=596).contains(&image.width()));
        assert!(!image.color().has_alpha());
    }

    #[tokio::test]
    async fn test_garbage_is_corrupt() {
        let err = PdfStrategy::new(2.0, 90)
            .convert(&SourceFile::new("a.pdf", "garbage"), FormatTag::Pdf, FormatTag::Jpeg)
            .await
            .unwrap_err();
        assert!(matches!(err, StrategyError::CorruptInput { .. }));
    }
}
