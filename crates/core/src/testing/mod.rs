//! Testing utilities: a controllable mock strategy and in-memory fixtures.
//!
//! # Example
//!
//! ```rust,ignore
//! use docshift_core::testing::{fixtures, MockStrategy};
//!
//! let mock = MockStrategy::new(vec![(FormatTag::Docx, FormatTag::PlainText)]);
//! let docx = fixtures::docx_from_paragraphs(&["Hello", "World"]);
//! ```

pub mod fixtures;
mod mock_strategy;

pub use mock_strategy::MockStrategy;
