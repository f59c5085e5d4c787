//! SpreadsheetML (XLSX) encoder writing a single sheet of inline strings.

use super::package::ZipPackage;
use super::xml::{static_part, PartWriter};
use crate::converter::StrategyError;
use crate::table::Table;

const CONTENT_TYPES: &str = r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK: &str = r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#;

const WORKBOOK_RELS: &str = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const STYLES: &str = r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs></styleSheet>"#;

/// Spreadsheet column name for a zero-based index (`0` is `A`, `26` is `AA`).
pub fn column_name(index: usize) -> String {
    let mut name = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        name.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

fn sheet_xml(table: &Table) -> Result<String, StrategyError> {
    let mut xml = PartWriter::new()?;
    xml.start(
        "worksheet",
        &[("xmlns", "http://schemas.openxmlformats.org/spreadsheetml/2006/main")],
    )?;
    xml.start("sheetData", &[])?;
    for (r, row) in table.rows().iter().enumerate() {
        let row_number = (r + 1).to_string();
        xml.start("row", &[("r", row_number.as_str())])?;
        for (c, cell) in row.iter().enumerate() {
            if cell.is_empty() {
                continue;
            }
            let reference = format!("{}{}", column_name(c), row_number);
            xml.start("c", &[("r", reference.as_str()), ("t", "inlineStr")])?;
            xml.start("is", &[])?;
            xml.text_element("t", &[("xml:space", "preserve")], cell)?;
            xml.end("is")?;
            xml.end("c")?;
        }
        xml.end("row")?;
    }
    xml.end("sheetData")?;
    xml.end("worksheet")?;
    xml.finish()
}

/// Encodes a flat grid as a one-sheet workbook.
pub fn render_table(table: &Table) -> Result<Vec<u8>, StrategyError> {
    let mut package = ZipPackage::new();
    package.add_xml("[Content_Types].xml", &static_part(CONTENT_TYPES)?)?;
    package.add_xml("_rels/.rels", &static_part(ROOT_RELS)?)?;
    package.add_xml("xl/workbook.xml", &static_part(WORKBOOK)?)?;
    package.add_xml("xl/_rels/workbook.xml.rels", &static_part(WORKBOOK_RELS)?)?;
    package.add_xml("xl/styles.xml", &static_part(STYLES)?)?;
    package.add_xml("xl/worksheets/sheet1.xml", &sheet_xml(table)?)?;
    Ok(package.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_names() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
        assert_eq!(column_name(701), "ZZ");
        assert_eq!(column_name(702), "AAA");
    }

    #[test]
    fn test_sheet_cells() {
        let table = Table::new(vec![
            vec!["name".to_string(), "note".to_string()],
            vec!["a<b".to_string(), String::new()],
        ]);
        let xml = sheet_xml(&table).unwrap();
        assert!(xml.contains("<c r=\"B1\" t=\"inlineStr\"><is><t xml:space=\"preserve\">note</t></is></c>"));
        assert!(xml.contains("a&lt;b"));
        assert!(!xml.contains("r=\"B2\""));
    }
}
