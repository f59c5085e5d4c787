//! Event-based XML part writer used by the OOXML encoders.

use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::converter::StrategyError;

/// Writes one XML part, starting with the standalone UTF-8 declaration.
pub struct PartWriter {
    writer: Writer<Cursor<Vec<u8>>>,
}

fn element<'a>(name: &'a str, attrs: &[(&str, &str)]) -> BytesStart<'a> {
    let mut start = BytesStart::new(name);
    for attr in attrs {
        start.push_attribute(*attr);
    }
    start
}

impl PartWriter {
    pub fn new() -> Result<Self, StrategyError> {
        let mut part = Self {
            writer: Writer::new(Cursor::new(Vec::new())),
        };
        part.write(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        part.raw("\n")?;
        Ok(part)
    }

    fn write(&mut self, event: Event<'_>) -> Result<(), StrategyError> {
        self.writer
            .write_event(event)
            .map_err(|e| StrategyError::encoding(format!("XML: {}", e)))
    }

    /// Opens `name` with the given attributes.
    pub fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), StrategyError> {
        self.write(Event::Start(element(name, attrs)))
    }

    /// Writes a self-closing `name` element.
    pub fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), StrategyError> {
        self.write(Event::Empty(element(name, attrs)))
    }

    pub fn end(&mut self, name: &str) -> Result<(), StrategyError> {
        self.write(Event::End(BytesEnd::new(name)))
    }

    /// Writes escaped character data.
    pub fn text(&mut self, text: &str) -> Result<(), StrategyError> {
        self.write(Event::Text(BytesText::new(text)))
    }

    /// Writes `<name attrs>text</name>`.
    pub fn text_element(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
        text: &str,
    ) -> Result<(), StrategyError> {
        self.start(name, attrs)?;
        self.text(text)?;
        self.end(name)
    }

    /// Writes markup that is already well formed, such as static part templates.
    pub fn raw(&mut self, xml: &str) -> Result<(), StrategyError> {
        self.write(Event::Text(BytesText::from_escaped(xml)))
    }

    pub fn finish(self) -> Result<String, StrategyError> {
        String::from_utf8(self.writer.into_inner().into_inner())
            .map_err(|e| StrategyError::encoding(format!("XML: {}", e)))
    }
}

/// Builds a part that is only a fixed template after the declaration.
pub fn static_part(xml: &str) -> Result<String, StrategyError> {
    let mut part = PartWriter::new()?;
    part.raw(xml)?;
    part.finish()
}

/// Writes a package relationships part.
///
/// Each entry is `(id, type, target, external)`.
pub fn relationships(rels: &[(&str, &str, &str, bool)]) -> Result<String, StrategyError> {
    let mut part = PartWriter::new()?;
    part.start(
        "Relationships",
        &[("xmlns", "http://schemas.openxmlformats.org/package/2006/relationships")],
    )?;
    for (id, kind, target, external) in rels {
        let mut attrs = vec![("Id", *id), ("Type", *kind), ("Target", *target)];
        if *external {
            attrs.push(("TargetMode", "External"));
        }
        part.empty("Relationship", &attrs)?;
    }
    part.end("Relationships")?;
    part.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_escapes_text_and_attributes() {
        let mut part = PartWriter::new().unwrap();
        part.start("a", &[("href", "x?q=1&r=2")]).unwrap();
        part.text_element("t", &[], "1 < 2").unwrap();
        part.empty("br", &[]).unwrap();
        part.end("a").unwrap();
        assert_eq!(
            part.finish().unwrap(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<a href=\"x?q=1&amp;r=2\"><t>1 &lt; 2</t><br/></a>"
        );
    }

    #[test]
    fn test_relationships_mark_external_targets() {
        let xml = relationships(&[
            ("rId1", "urn:styles", "styles.xml", false),
            ("rId2", "urn:link", "https://example.com/?a=1&b=2", true),
        ])
        .unwrap();
        assert!(xml.contains("<Relationship Id=\"rId1\" Type=\"urn:styles\" Target=\"styles.xml\"/>"));
        assert!(xml.contains("Target=\"https://example.com/?a=1&amp;b=2\" TargetMode=\"External\"/>"));
    }
}
