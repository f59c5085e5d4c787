//! JSON, CSV and XLSX conversions over a flat grid.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex_lite::Regex;
use serde_json::{Map, Value};

use super::ooxml::{attr, relationships, Package};
use super::{decode_text, run_blocking};
use crate::converter::{ensure_pair, SourceFile, Strategy, StrategyError};
use crate::format::FormatTag;
use crate::render::xlsx;
use crate::table::Table;

static CELL_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\$?([A-Za-z]{1,3})\$?([0-9]+)$").unwrap());

/// Worksheet bounds of the XLSX format.
const MAX_ROWS: usize = 1_048_576;
const MAX_COLUMNS: usize = 16_384;

/// Converts between structured JSON, CSV and XLSX.
///
/// Only the JSON direction carries a header: object keys become the first
/// CSV row, and the first CSV row becomes object keys. CSV to CSV
/// normalises the grid (blank rows dropped, RFC 4180 quoting, CRLF).
#[derive(Debug, Clone, Default)]
pub struct TabularStrategy;

impl TabularStrategy {
    pub fn new() -> Self {
        Self
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string(value).unwrap_or_default()
        }
    }
}

fn objects_to_table(objects: &[&Map<String, Value>]) -> Table {
    let mut header: Vec<String> = Vec::new();
    let mut seen = HashSet::new();
    for object in objects {
        for key in object.keys() {
            if seen.insert(key.as_str()) {
                header.push(key.clone());
            }
        }
    }

    let mut table = Table::new(vec![header.clone()]);
    for object in objects {
        table.push_row(
            header
                .iter()
                .map(|key| object.get(key).map(cell_text).unwrap_or_default())
                .collect(),
        );
    }
    table
}

/// Flattens parsed JSON into a grid.
fn json_to_table(value: &Value) -> Result<Table, StrategyError> {
    match value {
        Value::Object(object) => Ok(objects_to_table(&[object])),
        Value::Array(items) if items.is_empty() => Err(StrategyError::NoContent),
        Value::Array(items) => {
            if let Some(objects) = items
                .iter()
                .map(Value::as_object)
                .collect::<Option<Vec<_>>>()
            {
                return Ok(objects_to_table(&objects));
            }
            if let Some(rows) = items.iter().map(Value::as_array).collect::<Option<Vec<_>>>() {
                return Ok(Table::new(
                    rows.iter()
                        .map(|row| row.iter().map(cell_text).collect())
                        .collect(),
                ));
            }
            if items.iter().all(|item| !item.is_array() && !item.is_object()) {
                let mut table = Table::new(vec![vec!["value".to_string()]]);
                for item in items {
                    table.push_row(vec![cell_text(item)]);
                }
                return Ok(table);
            }
            Err(StrategyError::corrupt(
                "JSON array mixes objects, arrays and scalar values",
            ))
        }
        _ => Err(StrategyError::corrupt("JSON must be an array or an object")),
    }
}

/// Interprets the first row as the header and every other row as a record.
fn table_to_json(table: &Table) -> Result<Value, StrategyError> {
    let Some((header, records)) = table.rows().split_first() else {
        return Err(StrategyError::NoContent);
    };

    let objects = records
        .iter()
        .map(|record| {
            let mut object = Map::new();
            for (i, key) in header.iter().enumerate() {
                let value = record.get(i).cloned().unwrap_or_default();
                object.insert(key.clone(), Value::String(value));
            }
            Value::Object(object)
        })
        .collect();
    Ok(Value::Array(objects))
}

fn read_csv(bytes: &[u8]) -> Result<Table, StrategyError> {
    let text = decode_text(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut table = Table::default();
    for record in reader.records() {
        let record = record.map_err(|e| StrategyError::corrupt(format!("CSV: {}", e)))?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        table.push_row(record.iter().map(str::to_string).collect());
    }

    if table.is_blank() {
        return Err(StrategyError::NoContent);
    }
    Ok(table)
}

fn write_csv(table: &Table) -> Result<Vec<u8>, StrategyError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());
    for row in table.rows() {
        writer
            .write_record(row)
            .map_err(|e| StrategyError::encoding(format!("CSV: {}", e)))?;
    }
    writer
        .into_inner()
        .map_err(|e| StrategyError::encoding(format!("CSV: {}", e)))
}

/// Parses `A1`-style references into zero-based (row, column).
fn parse_cell_ref(reference: &str) -> Option<(usize, usize)> {
    let caps = CELL_REF.captures(reference)?;
    let column = caps[1]
        .bytes()
        .fold(0usize, |acc, b| acc * 26 + usize::from(b.to_ascii_uppercase() - b'A' + 1));
    let row: usize = caps[2].parse().ok()?;
    Some((row.checked_sub(1)?, column - 1))
}

fn shared_strings(xml: &str) -> Result<Vec<String>, StrategyError> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut phonetic = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"rPh" => phonetic += 1,
                b"t" => in_text = phonetic == 0,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(current.take().unwrap_or_default()),
                b"rPh" => phonetic = phonetic.saturating_sub(1),
                b"t" => in_text = false,
                _ => {}
            },
            Event::Text(t) if in_text => {
                if let Some(current) = &mut current {
                    current.push_str(&t.unescape()?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}

fn put(
    rows: &mut Vec<Vec<String>>,
    row: usize,
    column: usize,
    value: String,
) -> Result<(), StrategyError> {
    if row >= MAX_ROWS || column >= MAX_COLUMNS {
        return Err(StrategyError::corrupt(format!(
            "cell at row {}, column {} is outside the worksheet",
            row + 1,
            column + 1
        )));
    }
    if rows.len() <= row {
        rows.resize(row + 1, Vec::new());
    }
    let cells = &mut rows[row];
    if cells.len() <= column {
        cells.resize(column + 1, String::new());
    }
    cells[column] = value;
    Ok(())
}

fn read_sheet(xml: &str, shared: &[String]) -> Result<Table, StrategyError> {
    let mut reader = Reader::from_str(xml);
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut next_row = 0;
    let mut row = 0;
    let mut next_column = 0;
    let mut cell: Option<(usize, usize, Option<String>, String)> = None;
    let mut capture = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    row = attr(&e, b"r")?
                        .and_then(|r| r.parse::<usize>().ok())
                        .and_then(|r| r.checked_sub(1))
                        .unwrap_or(next_row);
                    next_column = 0;
                }
                b"c" => {
                    let (r, c) = attr(&e, b"r")?
                        .and_then(|r| parse_cell_ref(&r))
                        .unwrap_or((row, next_column));
                    cell = Some((r, c, attr(&e, b"t")?, String::new()));
                }
                b"v" | b"t" => capture = cell.is_some(),
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                let (_, c) = attr(&e, b"r")?
                    .and_then(|r| parse_cell_ref(&r))
                    .unwrap_or((row, next_column));
                next_column = c + 1;
            }
            Event::Text(t) if capture => {
                if let Some((_, _, _, value)) = &mut cell {
                    value.push_str(&t.unescape()?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => capture = false,
                b"c" => {
                    if let Some((r, c, kind, raw)) = cell.take() {
                        let value = match kind.as_deref() {
                            Some("s") => raw
                                .trim()
                                .parse::<usize>()
                                .ok()
                                .and_then(|i| shared.get(i))
                                .cloned()
                                .ok_or_else(|| {
                                    StrategyError::corrupt(format!("bad shared string index {:?}", raw))
                                })?,
                            Some("b") => {
                                if raw.trim() == "1" { "TRUE" } else { "FALSE" }.to_string()
                            }
                            _ => raw,
                        };
                        if !value.is_empty() {
                            put(&mut rows, r, c, value)?;
                        }
                        next_column = c + 1;
                    }
                }
                b"row" => next_row = row + 1,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    let table = Table::new(rows).padded();
    if table.is_blank() {
        return Err(StrategyError::NoContent);
    }
    Ok(table)
}

/// Locates the first worksheet in workbook order.
fn first_sheet_path(package: &mut Package) -> Result<String, StrategyError> {
    const FALLBACK: &str = "xl/worksheets/sheet1.xml";

    let Some(workbook) = package.part("xl/workbook.xml")? else {
        return Ok(FALLBACK.to_string());
    };
    let mut reader = Reader::from_str(&workbook);
    let mut rel_id = None;
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                rel_id = attr(&e, b"id")?;
                break;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let rels = package
        .part("xl/_rels/workbook.xml.rels")?
        .map(|xml| relationships(&xml))
        .transpose()?
        .unwrap_or_default();
    let target = rel_id.and_then(|id| rels.get(&id).cloned());

    Ok(match target {
        Some(target) if target.starts_with('/') => target.trim_start_matches('/').to_string(),
        Some(target) => format!("xl/{}", target),
        None => FALLBACK.to_string(),
    })
}

fn read_xlsx(bytes: Arc<[u8]>) -> Result<Table, StrategyError> {
    let mut package = Package::open(bytes)?;
    let shared = package
        .part("xl/sharedStrings.xml")?
        .map(|xml| shared_strings(&xml))
        .transpose()?
        .unwrap_or_default();
    let path = first_sheet_path(&mut package)?;
    let sheet = package.require(&path)?;
    read_sheet(&sheet, &shared)
}

fn extract(bytes: Arc<[u8]>, from: FormatTag) -> Result<Table, StrategyError> {
    match from {
        FormatTag::Json => {
            let text = decode_text(&bytes);
            if text.trim().is_empty() {
                return Err(StrategyError::NoContent);
            }
            let value: Value = serde_json::from_str(&text)
                .map_err(|e| StrategyError::corrupt(format!("JSON: {}", e)))?;
            json_to_table(&value)
        }
        FormatTag::Csv => read_csv(&bytes),
        FormatTag::Xlsx => read_xlsx(bytes),
        other => Err(StrategyError::corrupt(format!("{} is not tabular", other))),
    }
}

fn encode(table: &Table, to: FormatTag) -> Result<Vec<u8>, StrategyError> {
    match to {
        FormatTag::Csv => write_csv(table),
        FormatTag::Json => serde_json::to_vec_pretty(&table_to_json(table)?)
            .map_err(|e| StrategyError::encoding(format!("JSON: {}", e))),
        FormatTag::Xlsx => xlsx::render_table(table),
        other => Err(StrategyError::encoding(format!("{} is not tabular", other))),
    }
}

#[async_trait]
impl Strategy for TabularStrategy {
    fn name(&self) -> &str {
        "tabular"
    }

    fn edges(&self) -> Vec<(FormatTag, FormatTag)> {
        vec![
            (FormatTag::Json, FormatTag::Csv),
            (FormatTag::Csv, FormatTag::Json),
            (FormatTag::Csv, FormatTag::Csv),
            (FormatTag::Csv, FormatTag::Xlsx),
            (FormatTag::Xlsx, FormatTag::Csv),
        ]
    }

    async fn convert(
        &self,
        file: &SourceFile,
        from: FormatTag,
        to: FormatTag,
    ) -> Result<Vec<u8>, StrategyError> {
        ensure_pair(self, from, to)?;

        let bytes = file.bytes.clone();
        let table = run_blocking(move || extract(bytes, from)).await?;
        tracing::debug!(
            file = %file.name,
            rows = table.height(),
            columns = table.width(),
            "Extracted table"
        );

        run_blocking(move || encode(&table, to)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use serde_json::json;

    fn rows(table: &Table) -> Vec<Vec<&str>> {
        table
            .rows()
            .iter()
            .map(|row| row.iter().map(String::as_str).collect())
            .collect()
    }

    #[test]
    fn test_objects_union_header() {
        let value = json!([
            {"name": "a", "n": 1},
            {"n": 2, "extra": null, "nested": {"k": [1, 2]}},
        ]);
        let table = json_to_table(&value).unwrap();
        assert_eq!(
            rows(&table),
            vec![
                vec!["name", "n", "extra", "nested"],
                vec!["a", "1", "", ""],
                vec!["", "2", "", r#"{"k":[1,2]}"#],
            ]
        );
    }

    #[test]
    fn test_array_shapes() {
        let table = json_to_table(&json!([[1, "x"], [true]])).unwrap();
        assert_eq!(rows(&table), vec![vec!["1", "x"], vec!["true"]]);

        let table = json_to_table(&json!(["a", 2])).unwrap();
        assert_eq!(rows(&table), vec![vec!["value"], vec!["a"], vec!["2"]]);

        let table = json_to_table(&json!({"k": "v"})).unwrap();
        assert_eq!(rows(&table), vec![vec!["k"], vec!["v"]]);

        assert!(matches!(json_to_table(&json!([])), Err(StrategyError::NoContent)));
        assert!(json_to_table(&json!(5)).is_err());
        assert!(json_to_table(&json!([{"a": 1}, 2])).is_err());
    }

    #[test]
    fn test_csv_to_json_records() {
        let table = read_csv(b"name,age\r\nann,31\n\nbob\n,,\ncid,40,extra\n").unwrap();
        let json = table_to_json(&table).unwrap();
        assert_eq!(
            json,
            json!([
                {"name": "ann", "age": "31"},
                {"name": "bob", "age": ""},
                {"name": "cid", "age": "40"},
            ])
        );
    }

    #[test]
    fn test_csv_quoting_round_trip() {
        let table = Table::new(vec![vec!["a,b".to_string(), "say \"hi\"".to_string()]]);
        let csv = write_csv(&table).unwrap();
        assert_eq!(csv, b"\"a,b\",\"say \"\"hi\"\"\"\r\n");
        assert_eq!(read_csv(&csv).unwrap(), table);
    }

    #[test]
    fn test_blank_csv_has_no_content() {
        assert!(matches!(read_csv(b"\n , \n"), Err(StrategyError::NoContent)));
    }

    #[test]
    fn test_cell_refs() {
        assert_eq!(parse_cell_ref("A1"), Some((0, 0)));
        assert_eq!(parse_cell_ref("AB12"), Some((11, 27)));
        assert_eq!(parse_cell_ref("$C$3"), Some((2, 2)));
        assert_eq!(parse_cell_ref("A0"), None);
        assert_eq!(parse_cell_ref("1A"), None);
    }

    #[test]
    fn test_shared_strings_skip_phonetic_runs() {
        let xml = r#"<sst><si><t>plain</t></si><si><r><t>ri</t></r><r><t>ch</t></r><rPh><t>skip</t></rPh></si><si/></sst>"#;
        assert_eq!(shared_strings(xml).unwrap(), vec!["plain", "rich", ""]);
    }

    #[test]
    fn test_sheet_cells() {
        let xml = r#"<worksheet><sheetData>
            <row r="1"><c r="A1" t="s"><v>0</v></c><c r="C1" t="inlineStr"><is><t>inline</t></is></c></row>
            <row r="3"><c r="A3" t="b"><v>1</v></c><c r="B3"><f>1+1</f><v>2</v></c></row>
        </sheetData></worksheet>"#;
        let table = read_sheet(xml, &["shared".to_string()]).unwrap();
        assert_eq!(
            rows(&table),
            vec![
                vec!["shared", "", "inline"],
                vec!["", "", ""],
                vec!["TRUE", "2", ""],
            ]
        );
    }

    #[test]
    fn test_cells_outside_worksheet_are_corrupt() {
        let far_row = r#"<worksheet><sheetData><row r="4294967295"><c><v>1</v></c></row></sheetData></worksheet>"#;
        assert!(matches!(read_sheet(far_row, &[]), Err(StrategyError::CorruptInput { .. })));

        let far_cell = r#"<worksheet><sheetData><row r="1"><c r="A4000000000"><v>1</v></c></row></sheetData></worksheet>"#;
        assert!(matches!(read_sheet(far_cell, &[]), Err(StrategyError::CorruptInput { .. })));

        let far_column = r#"<worksheet><sheetData><row r="1"><c r="ZZZ1"><v>1</v></c></row></sheetData></worksheet>"#;
        assert!(matches!(read_sheet(far_column, &[]), Err(StrategyError::CorruptInput { .. })));

        let last = r#"<worksheet><sheetData><row r="1"><c r="XFD1"><v>1</v></c></row></sheetData></worksheet>"#;
        assert_eq!(read_sheet(last, &[]).unwrap().width(), MAX_COLUMNS);
    }

    #[tokio::test]
    async fn test_csv_to_csv_normalises_grid() {
        let out = TabularStrategy::new()
            .convert(
                &SourceFile::new("cities.csv", "city,country\n\nOslo,Norway\n\"Rome\",Italy,EU\n"),
                FormatTag::Csv,
                FormatTag::Csv,
            )
            .await
            .unwrap();
        assert_eq!(out, b"city,country\r\nOslo,Norway\r\nRome,Italy,EU\r\n");
    }

    #[test]
    fn test_bad_shared_index() {
        let xml = r#"<worksheet><sheetData><row r="1"><c r="A1" t="s"><v>4</v></c></row></sheetData></worksheet>"#;
        assert!(matches!(read_sheet(xml, &[]), Err(StrategyError::CorruptInput { .. })));
    }

    #[tokio::test]
    async fn test_xlsx_to_csv_reads_first_sheet() {
        let xlsx = fixtures::xlsx(&[&["id", "name"], &["1", "ann"]]);
        let out = TabularStrategy::new()
            .convert(&SourceFile::new("book.xlsx", xlsx), FormatTag::Xlsx, FormatTag::Csv)
            .await
            .unwrap();
        assert_eq!(out, b"id,name\r\n1,ann\r\n");
    }

    #[tokio::test]
    async fn test_csv_to_xlsx_and_back() {
        let strategy = TabularStrategy::new();
        let xlsx = strategy
            .convert(&SourceFile::new("t.csv", "a,b\n1,\n"), FormatTag::Csv, FormatTag::Xlsx)
            .await
            .unwrap();
        let csv = strategy
            .convert(&SourceFile::new("t.xlsx", xlsx), FormatTag::Xlsx, FormatTag::Csv)
            .await
            .unwrap();
        assert_eq!(csv, b"a,b\r\n1,\r\n");
    }

    #[tokio::test]
    async fn test_invalid_json_is_corrupt() {
        let err = TabularStrategy::new()
            .convert(&SourceFile::new("d.json", "{nope"), FormatTag::Json, FormatTag::Csv)
            .await
            .unwrap_err();
        assert!(matches!(err, StrategyError::CorruptInput { .. }));
    }
}
