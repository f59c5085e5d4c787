//! Trait definitions for the converter module.

use async_trait::async_trait;

use super::error::StrategyError;
use super::types::SourceFile;
use crate::format::FormatTag;

/// A conversion routine for one source format family.
///
/// Implementations extract an intermediate representation from the source
/// bytes and encode it into the requested target.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Returns the name of this strategy.
    fn name(&self) -> &str;

    /// Returns every (source, target) pair this strategy serves.
    fn edges(&self) -> Vec<(FormatTag, FormatTag)>;

    /// Whether this strategy serves the given pair.
    fn supports(&self, from: FormatTag, to: FormatTag) -> bool {
        self.edges().contains(&(from, to))
    }

    /// Converts `file` (already classified as `from`) into `to`.
    async fn convert(
        &self,
        file: &SourceFile,
        from: FormatTag,
        to: FormatTag,
    ) -> Result<Vec<u8>, StrategyError>;
}

/// Fails with [`StrategyError::UnsupportedPair`] when `strategy` does not serve the pair.
pub(crate) fn ensure_pair(
    strategy: &dyn Strategy,
    from: FormatTag,
    to: FormatTag,
) -> Result<(), StrategyError> {
    if strategy.supports(from, to) {
        Ok(())
    } else {
        Err(StrategyError::UnsupportedPair { from, to })
    }
}
