//! Batch orchestration.
//!
//! A [`BatchRequest`] is a small state machine (pending, running, completed)
//! over its jobs; [`BatchProcessor`] drives one through the dispatcher with
//! bounded concurrency and reports progress as a pure function of job states.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use docshift_core::converter::{ConverterConfig, Dispatcher};
//! use docshift_core::processor::{BatchProcessor, ProcessorConfig};
//!
//! let dispatcher = Arc::new(Dispatcher::with_defaults(&ConverterConfig::default()));
//! let processor = BatchProcessor::new(dispatcher, ProcessorConfig::default());
//!
//! let outcome = processor
//!     .run(files, FormatTag::Pdf, |percent| println!("{percent:.0}%"))
//!     .await;
//! println!("{} converted, {} failed", outcome.succeeded(), outcome.failed());
//! ```

mod batch;
mod config;
mod types;

pub use batch::BatchProcessor;
pub use config::ProcessorConfig;
pub use types::{progress, BatchOutcome, BatchRequest, BatchState};
