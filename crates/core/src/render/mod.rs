//! Target format encoders.
//!
//! Each encoder turns an intermediate representation (markup tree, table,
//! text or pixels) into the bytes of one target format.

pub mod docx;
pub mod html;
pub mod package;
pub mod pdf;
pub mod pptx;
pub mod xlsx;
pub mod xml;

pub use package::ZipPackage;
