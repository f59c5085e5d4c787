//! Strategy map keyed by (source, target).

use std::collections::HashMap;
use std::sync::Arc;

use super::capabilities::CapabilityRegistry;
use super::config::ConverterConfig;
use super::traits::Strategy;
use crate::format::FormatTag;
use crate::strategy::{
    DocumentStrategy, MarkdownStrategy, PdfStrategy, RasterStrategy, TabularStrategy,
    TextStrategy, VectorStrategy, VideoStrategy, XmlStrategy,
};

/// Maps every capability edge to the strategy that serves it.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: HashMap<(FormatTag, FormatTag), Arc<dyn Strategy>>,
}

impl StrategyRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in strategy.
    pub fn with_defaults(config: &ConverterConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(TextStrategy::new()));
        registry.register(Arc::new(DocumentStrategy::new(config.slide_char_limit)));
        registry.register(Arc::new(RasterStrategy::new(config.jpeg_quality)));
        registry.register(Arc::new(TabularStrategy::new()));
        registry.register(Arc::new(MarkdownStrategy::new()));
        registry.register(Arc::new(PdfStrategy::new(
            config.raster_scale,
            config.jpeg_quality,
        )));
        registry.register(Arc::new(VectorStrategy::new()));
        registry.register(Arc::new(XmlStrategy::new()));
        registry.register(Arc::new(VideoStrategy::new(config.clone())));
        registry
    }

    /// Registers `strategy` for every edge it declares, replacing earlier entries.
    pub fn register(&mut self, strategy: Arc<dyn Strategy>) {
        for edge in strategy.edges() {
            if let Some(previous) = self.strategies.insert(edge, Arc::clone(&strategy)) {
                tracing::debug!(
                    from = %edge.0,
                    to = %edge.1,
                    previous = previous.name(),
                    replacement = strategy.name(),
                    "Replacing strategy"
                );
            }
        }
    }

    /// Returns the strategy serving the pair, if any.
    pub fn get(&self, from: FormatTag, to: FormatTag) -> Option<Arc<dyn Strategy>> {
        self.strategies.get(&(from, to)).cloned()
    }

    /// Capability edges that no registered strategy serves.
    pub fn missing_edges(&self) -> Vec<(FormatTag, FormatTag)> {
        CapabilityRegistry::edges()
            .filter(|edge| !self.strategies.contains_key(edge))
            .collect()
    }

    /// Number of registered edges.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Whether no strategy is registered.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut edges: Vec<_> = self
            .strategies
            .iter()
            .map(|((from, to), s)| format!("{}->{}:{}", from, to, s.name()))
            .collect();
        edges.sort();
        f.debug_struct("StrategyRegistry").field("edges", &edges).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_edge_has_a_strategy() {
        let registry = StrategyRegistry::with_defaults(&ConverterConfig::default());
        assert!(registry.missing_edges().is_empty(), "{:?}", registry.missing_edges());
    }

    #[test]
    fn test_strategies_only_declare_capability_edges() {
        let registry = StrategyRegistry::with_defaults(&ConverterConfig::default());
        for (from, to) in registry.strategies.keys() {
            assert!(CapabilityRegistry::can_convert(*from, *to), "{} -> {}", from, to);
        }
        assert_eq!(registry.len(), CapabilityRegistry::edges().count());
    }

    #[test]
    fn test_empty_registry_reports_all_edges_missing() {
        let registry = StrategyRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(
            registry.missing_edges().len(),
            CapabilityRegistry::edges().count()
        );
    }

    #[test]
    fn test_lookup() {
        let registry = StrategyRegistry::with_defaults(&ConverterConfig::default());
        let strategy = registry.get(FormatTag::Docx, FormatTag::Pdf).unwrap();
        assert_eq!(strategy.name(), "document");
        assert!(registry.get(FormatTag::Json, FormatTag::Webp).is_none());
    }
}
