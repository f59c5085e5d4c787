//! Raster images to other raster formats, PDF and DOCX.

use std::io::Cursor;

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbImage};

use super::run_blocking;
use crate::converter::{ensure_pair, SourceFile, Strategy, StrategyError};
use crate::format::FormatTag;
use crate::render::{docx, pdf};

const RASTERS: [FormatTag; 3] = [FormatTag::Png, FormatTag::Jpeg, FormatTag::Webp];

/// Re-encodes bitmaps at their original pixel dimensions.
#[derive(Debug, Clone)]
pub struct RasterStrategy {
    jpeg_quality: u8,
}

impl RasterStrategy {
    pub fn new(jpeg_quality: u8) -> Self {
        Self { jpeg_quality }
    }
}

/// Composites the image over a white background, dropping alpha.
pub(crate) fn flatten_on_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut rgb = RgbImage::new(width, height);
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let blend = |c: u8| ((u32::from(c) * u32::from(a) + 255 * (255 - u32::from(a))) / 255) as u8;
        rgb.put_pixel(x, y, image::Rgb([blend(r), blend(g), blend(b)]));
    }
    rgb
}

/// Encodes a decoded bitmap into `to`.
pub(crate) fn encode_image(
    image: &DynamicImage,
    to: FormatTag,
    jpeg_quality: u8,
) -> Result<Vec<u8>, StrategyError> {
    let mut bytes = Vec::new();
    match to {
        FormatTag::Png => image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| StrategyError::encoding(format!("PNG: {}", e)))?,
        FormatTag::Jpeg => {
            let rgb = DynamicImage::ImageRgb8(flatten_on_white(image));
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, jpeg_quality))
                .map_err(|e| StrategyError::encoding(format!("JPEG: {}", e)))?
        }
        FormatTag::Webp => DynamicImage::ImageRgba8(image.to_rgba8())
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::WebP)
            .map_err(|e| StrategyError::encoding(format!("WebP: {}", e)))?,
        FormatTag::Pdf => {
            let rgb = flatten_on_white(image);
            let (width, height) = rgb.dimensions();
            return pdf::render_image_page(width, height, rgb.into_raw());
        }
        FormatTag::Docx => {
            let png = encode_image(image, FormatTag::Png, jpeg_quality)?;
            return docx::render_image(&png, image.width(), image.height());
        }
        other => {
            return Err(StrategyError::encoding(format!(
                "{} is not an image target",
                other
            )))
        }
    }
    Ok(bytes)
}

fn extract(bytes: &[u8]) -> Result<DynamicImage, StrategyError> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| StrategyError::corrupt(format!("image decode failed: {}", e)))?;
    if image.width() == 0 || image.height() == 0 {
        return Err(StrategyError::NoContent);
    }
    Ok(image)
}

#[async_trait]
impl Strategy for RasterStrategy {
    fn name(&self) -> &str {
        "raster"
    }

    fn edges(&self) -> Vec<(FormatTag, FormatTag)> {
        let mut edges = Vec::new();
        for from in RASTERS {
            edges.push((from, FormatTag::Pdf));
            edges.push((from, FormatTag::Docx));
            for to in RASTERS {
                if to != from {
                    edges.push((from, to));
                }
            }
        }
        edges
    }

    async fn convert(
        &self,
        file: &SourceFile,
        from: FormatTag,
        to: FormatTag,
    ) -> Result<Vec<u8>, StrategyError> {
        ensure_pair(self, from, to)?;

        let bytes = file.bytes.clone();
        let image = run_blocking(move || extract(&bytes)).await?;
        tracing::debug!(
            file = %file.name,
            width = image.width(),
            height = image.height(),
            "Decoded image"
        );

        let quality = self.jpeg_quality;
        run_blocking(move || encode_image(&image, to, quality)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    async fn convert(name: &str, bytes: Vec<u8>, from: FormatTag, to: FormatTag) -> Result<Vec<u8>, StrategyError> {
        RasterStrategy::new(90)
            .convert(&SourceFile::new(name, bytes), from, to)
            .await
    }

    #[test]
    fn test_flatten_on_white() {
        let mut rgba = image::RgbaImage::new(2, 1);
        rgba.put_pixel(0, 0, image::Rgba([0, 0, 0, 0]));
        rgba.put_pixel(1, 0, image::Rgba([10, 20, 30, 255]));
        let rgb = flatten_on_white(&DynamicImage::ImageRgba8(rgba));
        assert_eq!(rgb.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(rgb.get_pixel(1, 0).0, [10, 20, 30]);
    }

    #[tokio::test]
    async fn test_raster_targets_keep_dimensions() {
        let png = fixtures::png(7, 3);
        for to in [FormatTag::Jpeg, FormatTag::Webp] {
            let out = convert("photo.png", png.clone(), FormatTag::Png, to).await.unwrap();
            let decoded = image::load_from_memory(&out).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (7, 3), "{}", to);
        }
    }

    #[tokio::test]
    async fn test_png_to_pdf_and_docx() {
        let png = fixtures::png(40, 20);
        let pdf = convert("photo.png", png.clone(), FormatTag::Png, FormatTag::Pdf).await.unwrap();
        assert!(pdf.starts_with(b"%PDF"));
        let docx = convert("photo.png", png, FormatTag::Png, FormatTag::Docx).await.unwrap();
        assert!(docx.starts_with(b"PK"));
    }

    #[tokio::test]
    async fn test_corrupt_image() {
        let err = convert("photo.png", b"not an image".to_vec(), FormatTag::Png, FormatTag::Jpeg)
            .await
            .unwrap_err();
        assert!(matches!(err, StrategyError::CorruptInput { .. }));
    }

    #[test]
    fn test_edges() {
        let edges = RasterStrategy::new(90).edges();
        assert_eq!(edges.len(), 12);
        assert!(!edges.contains(&(FormatTag::Png, FormatTag::Png)));
    }
}
