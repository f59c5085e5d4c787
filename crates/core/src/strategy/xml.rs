//! XML to JSON.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use roxmltree::{Document, Node, ParsingOptions};
use serde_json::map::Entry;
use serde_json::{Map, Number, Value};

use super::{decode_text, run_blocking};
use crate::converter::{ensure_pair, SourceFile, Strategy, StrategyError};
use crate::format::FormatTag;

static INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?(0|[1-9][0-9]*)$").unwrap());
static DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?(0|[1-9][0-9]*)(\.[0-9]+)?([eE][+-]?[0-9]+)?$").unwrap());

/// Key under which an element's own text is kept when it also has children.
const TEXT_KEY: &str = "#text";

/// Maps an XML tree onto JSON objects.
///
/// Attributes are dropped. Repeated sibling tags collapse into an array, and
/// leaf text is typed as a number or boolean when it reads as one.
#[derive(Debug, Clone, Default)]
pub struct XmlStrategy;

impl XmlStrategy {
    pub fn new() -> Self {
        Self
    }
}

fn scalar(text: &str) -> Value {
    match text {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if INTEGER.is_match(text) {
        if let Ok(n) = text.parse::<i64>() {
            return Value::Number(n.into());
        }
    } else if DECIMAL.is_match(text) {
        if let Some(n) = text.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(n);
        }
    }
    Value::String(text.to_string())
}

fn qualified_name(node: Node<'_, '_>) -> String {
    let tag = node.tag_name();
    match tag.namespace().and_then(|uri| node.lookup_prefix(uri)) {
        Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, tag.name()),
        _ => tag.name().to_string(),
    }
}

fn element_value(node: Node<'_, '_>) -> Value {
    let text: String = node
        .children()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .collect();
    let text = text.trim();

    let mut children = node.children().filter(Node::is_element).peekable();
    if children.peek().is_none() {
        return if text.is_empty() {
            Value::String(String::new())
        } else {
            scalar(text)
        };
    }

    let mut object = Map::new();
    if !text.is_empty() {
        object.insert(TEXT_KEY.to_string(), scalar(text));
    }
    for child in children {
        let value = element_value(child);
        match object.entry(qualified_name(child)) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(mut slot) => match slot.get_mut() {
                Value::Array(items) => items.push(value),
                existing => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
            },
        }
    }
    Value::Object(object)
}

fn xml_to_json(bytes: &[u8]) -> Result<Vec<u8>, StrategyError> {
    let text = decode_text(bytes);
    if text.trim().is_empty() {
        return Err(StrategyError::NoContent);
    }
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let document = Document::parse_with_options(&text, options)
        .map_err(|e| StrategyError::corrupt(format!("XML: {}", e)))?;

    let root = document.root_element();
    let mut wrapper = Map::new();
    wrapper.insert(qualified_name(root), element_value(root));
    serde_json::to_vec_pretty(&Value::Object(wrapper))
        .map_err(|e| StrategyError::encoding(format!("JSON: {}", e)))
}

#[async_trait]
impl Strategy for XmlStrategy {
    fn name(&self) -> &str {
        "xml"
    }

    fn edges(&self) -> Vec<(FormatTag, FormatTag)> {
        vec![(FormatTag::Xml, FormatTag::Json)]
    }

    async fn convert(
        &self,
        file: &SourceFile,
        from: FormatTag,
        to: FormatTag,
    ) -> Result<Vec<u8>, StrategyError> {
        ensure_pair(self, from, to)?;

        let bytes = file.bytes.clone();
        run_blocking(move || xml_to_json(&bytes)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn convert(xml: &str) -> Value {
        serde_json::from_slice(&xml_to_json(xml.as_bytes()).unwrap()).unwrap()
    }

    #[test]
    fn test_scalars() {
        assert_eq!(scalar("42"), json!(42));
        assert_eq!(scalar("-3.5"), json!(-3.5));
        assert_eq!(scalar("1e3"), json!(1000.0));
        assert_eq!(scalar("true"), json!(true));
        assert_eq!(scalar("007"), json!("007"));
        assert_eq!(scalar("1.2.3"), json!("1.2.3"));
        assert_eq!(scalar("99999999999999999999"), json!("99999999999999999999"));
    }

    #[test]
    fn test_repeated_tags_become_arrays() {
        let value = convert(
            r#"<?xml version="1.0"?>
            <library name="ignored">
                <book><title>Dune</title><year>1965</year></book>
                <book><title>Emma</title><year>1815</year></book>
                <book><title>Ulysses</title></book>
                <empty/>
            </library>"#,
        );
        assert_eq!(
            value,
            json!({
                "library": {
                    "book": [
                        {"title": "Dune", "year": 1965},
                        {"title": "Emma", "year": 1815},
                        {"title": "Ulysses"}
                    ],
                    "empty": ""
                }
            })
        );
    }

    #[test]
    fn test_mixed_content_and_prefixes() {
        let value = convert(r#"<a:note xmlns:a="urn:x">hello <a:b>bold</a:b> world</a:note>"#);
        assert_eq!(value, json!({"a:note": {"#text": "hello  world", "a:b": "bold"}}));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(xml_to_json(b"  \n"), Err(StrategyError::NoContent)));
        assert!(matches!(
            xml_to_json(b"<open>"),
            Err(StrategyError::CorruptInput { .. })
        ));
    }

    #[test]
    fn test_doctype_is_accepted() {
        let value = convert("<!DOCTYPE note><note>hi</note>");
        assert_eq!(value, json!({"note": "hi"}));
    }
}
