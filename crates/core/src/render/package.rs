//! Deterministic zip writer shared by the OOXML encoders and the archive packager.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// In-memory zip archive whose entries all carry the same fixed timestamp.
pub struct ZipPackage {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
}

impl ZipPackage {
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .last_modified_time(DateTime::default()),
        }
    }

    /// Adds an entry.
    pub fn add(&mut self, name: &str, bytes: &[u8]) -> zip::result::ZipResult<()> {
        self.writer.start_file(name, self.options)?;
        self.writer.write_all(bytes)?;
        Ok(())
    }

    /// Adds an XML part.
    pub fn add_xml(&mut self, name: &str, xml: &str) -> zip::result::ZipResult<()> {
        self.add(name, xml.as_bytes())
    }

    /// Finishes the archive and returns its bytes.
    pub fn finish(self) -> zip::result::ZipResult<Vec<u8>> {
        Ok(self.writer.finish()?.into_inner())
    }
}

impl Default for ZipPackage {
    fn default() -> Self {
        Self::new()
    }
}

/// XML declaration prefixed to every OOXML part.
pub const XML_HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n";

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_entries_round_trip() {
        let mut package = ZipPackage::new();
        package.add("a.txt", b"alpha").unwrap();
        package.add_xml("dir/b.xml", "<b/>").unwrap();
        let bytes = package.finish().unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);
        let mut content = String::new();
        archive
            .by_name("dir/b.xml")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "<b/>");
    }

    #[test]
    fn test_output_is_deterministic() {
        let build = || {
            let mut package = ZipPackage::new();
            package.add("x", b"same").unwrap();
            package.finish().unwrap()
        };
        assert_eq!(build(), build());
    }
}
