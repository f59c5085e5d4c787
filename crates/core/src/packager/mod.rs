//! Output packaging: one converted file is delivered directly, anything else
//! becomes a zip archive with the list of skipped files alongside it.

mod archive;
mod types;

pub use archive::{unique_name, Packager};
pub use types::{BatchDelivery, BatchSummary, Delivery, PackageError};
