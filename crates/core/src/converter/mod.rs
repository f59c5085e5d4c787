//! Converter module: capability graph, strategy map and dispatcher.
//!
//! The dispatcher classifies each incoming file, checks that the requested
//! target is reachable, and hands the bytes to the strategy registered for
//! the (source, target) pair.
//!
//! # Example
//!
//! ```ignore
//! use docshift_core::converter::{ConverterConfig, Dispatcher, SourceFile};
//! use docshift_core::format::FormatTag;
//!
//! let dispatcher = Dispatcher::with_defaults(&ConverterConfig::default());
//! let file = SourceFile::new("data.json", r#"[{"a":1}]"#);
//!
//! let artifact = dispatcher.dispatch(&file, FormatTag::Csv).await?;
//! assert_eq!(artifact.file_name, "data.csv");
//! ```

mod capabilities;
mod config;
mod dispatcher;
mod error;
mod registry;
mod traits;
mod types;

pub use capabilities::{CapabilityRegistry, MIXED_SELECTION_DEFAULTS};
pub use config::ConverterConfig;
pub use dispatcher::Dispatcher;
pub use error::{ConversionError, ErrorKind, ErrorReport, StrategyError};
pub use registry::StrategyRegistry;
pub use traits::Strategy;
pub(crate) use traits::ensure_pair;
pub use types::{ConversionArtifact, ConversionJob, JobStatus, SourceFile};
