//! Helpers for reading Office Open XML packages.

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::Arc;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::converter::StrategyError;

/// A zip-based OOXML package opened from memory.
pub(crate) struct Package {
    archive: ZipArchive<Cursor<Arc<[u8]>>>,
}

impl Package {
    pub fn open(bytes: Arc<[u8]>) -> Result<Self, StrategyError> {
        let archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| StrategyError::corrupt(format!("not a valid Office package: {}", e)))?;
        Ok(Self { archive })
    }

    /// Reads a part as UTF-8, or `None` when the package lacks it.
    pub fn part(&mut self, name: &str) -> Result<Option<String>, StrategyError> {
        let mut entry = match self.archive.by_name(name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(StrategyError::corrupt(format!("{}: {}", name, e))),
        };
        let mut content = String::new();
        entry
            .read_to_string(&mut content)
            .map_err(|e| StrategyError::corrupt(format!("{}: {}", name, e)))?;
        Ok(Some(content))
    }

    /// Reads a part that must exist.
    pub fn require(&mut self, name: &str) -> Result<String, StrategyError> {
        self.part(name)?
            .ok_or_else(|| StrategyError::corrupt(format!("missing part {}", name)))
    }
}

/// Returns the unescaped value of the attribute whose local name is `local`.
pub(crate) fn attr(element: &BytesStart<'_>, local: &[u8]) -> Result<Option<String>, StrategyError> {
    for attribute in element.attributes() {
        let attribute = attribute.map_err(quick_xml::Error::from)?;
        if attribute.key.local_name().as_ref() == local {
            return Ok(Some(attribute.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Parses a relationships part into an `Id -> Target` map.
pub(crate) fn relationships(xml: &str) -> Result<HashMap<String, String>, StrategyError> {
    let mut reader = Reader::from_str(xml);
    let mut rels = HashMap::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attr(&e, b"Id")?, attr(&e, b"Target")?) {
                    rels.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rels)
}

/// Whether an on/off property such as `<w:b/>` or `<w:b w:val="0"/>` is on.
pub(crate) fn toggle(element: &BytesStart<'_>) -> Result<bool, StrategyError> {
    Ok(!matches!(
        attr(element, b"val")?.as_deref(),
        Some("0") | Some("false") | Some("off") | Some("none")
    ))
}
