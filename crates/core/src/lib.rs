//! Capability-aware document and media conversion.
//!
//! Files are classified into a [`FormatTag`], checked against a static
//! capability graph, converted by the strategy registered for their
//! (source, target) pair, and delivered either directly or as a zip archive.

pub mod config;
pub mod converter;
pub mod engine;
pub mod format;
pub mod markup;
pub mod metrics;
pub mod packager;
pub mod processor;
pub mod render;
pub mod strategy;
pub mod table;
pub mod testing;

pub use config::{load_config, load_config_from_str, validate_config, Config, ConfigError};
pub use converter::{
    CapabilityRegistry, ConversionArtifact, ConversionError, ConverterConfig, Dispatcher,
    ErrorKind, ErrorReport, SourceFile, Strategy, StrategyError, StrategyRegistry,
};
pub use engine::{ConversionEngine, TargetOptions};
pub use format::{classify, ClassifyError, FormatFamily, FormatTag};
pub use packager::{BatchDelivery, BatchSummary, Delivery, PackageError, Packager};
pub use processor::{BatchOutcome, BatchProcessor, BatchRequest, BatchState, ProcessorConfig};
