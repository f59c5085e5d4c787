//! Format classification.
//!
//! Every file entering the engine resolves to exactly one [`FormatTag`] or is
//! rejected with [`ClassifyError`] before any of its bytes are read.

mod classifier;
mod tag;

pub use classifier::{base_name, classify, extension_of, ClassifyError};
pub use tag::{FormatFamily, FormatTag, UnknownFormat};
