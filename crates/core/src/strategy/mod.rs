//! Built-in conversion strategies.
//!
//! Every strategy is extract then encode. The synchronous work of each phase
//! runs on the blocking pool, so a strategy only yields at phase boundaries.

mod document;
mod markdown;
mod ooxml;
mod pdf;
mod raster;
mod tabular;
mod text;
mod vector;
mod video;
mod xml;

pub use document::DocumentStrategy;
pub use markdown::MarkdownStrategy;
pub use pdf::PdfStrategy;
pub use raster::RasterStrategy;
pub use tabular::TabularStrategy;
pub use text::TextStrategy;
pub use vector::VectorStrategy;
pub use video::VideoStrategy;
pub use xml::XmlStrategy;

use crate::converter::StrategyError;

/// Runs a CPU-bound phase on the blocking pool.
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T, StrategyError>
where
    F: FnOnce() -> Result<T, StrategyError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| StrategyError::encoding(format!("worker task failed: {}", e)))?
}

/// Decodes bytes as UTF-8, replacing invalid sequences.
pub(crate) fn decode_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.strip_prefix('\u{feff}').unwrap_or(&text).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_blocking_propagates_errors() {
        let ok = run_blocking(|| Ok(2 + 2)).await.unwrap();
        assert_eq!(ok, 4);

        let err = run_blocking(|| Err::<(), _>(StrategyError::NoContent))
            .await
            .unwrap_err();
        assert!(matches!(err, StrategyError::NoContent));
    }

    #[test]
    fn test_decode_text_strips_bom() {
        assert_eq!(decode_text(b"\xEF\xBB\xBFhi"), "hi");
        assert_eq!(decode_text(b"a\xFFb"), "a\u{fffd}b");
    }
}
