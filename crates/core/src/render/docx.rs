//! WordprocessingML (DOCX) encoder.

use super::package::ZipPackage;
use super::xml::{relationships, static_part, PartWriter};
use crate::converter::StrategyError;
use crate::markup::{Block, Cell, Inline, Markup, Style};

/// Width of the text column on a Letter page with 1in margins, in EMU.
pub const CONTENT_WIDTH_EMU: u64 = 5_486_400;

const REL_HYPERLINK: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";
const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
const REL_STYLES: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";

const CONTENT_TYPES: &str = r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const STYLES: &str = r#"<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Calibri" w:hAnsi="Calibri"/><w:sz w:val="22"/></w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:after="120"/></w:pPr></w:pPrDefault></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style><w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:basedOn w:val="Normal"/><w:rPr><w:b/><w:sz w:val="56"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:pPr><w:outlineLvl w:val="0"/></w:pPr><w:rPr><w:b/><w:sz w:val="36"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/><w:basedOn w:val="Normal"/><w:pPr><w:outlineLvl w:val="1"/></w:pPr><w:rPr><w:b/><w:sz w:val="32"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading3"><w:name w:val="heading 3"/><w:basedOn w:val="Normal"/><w:pPr><w:outlineLvl w:val="2"/></w:pPr><w:rPr><w:b/><w:sz w:val="28"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading4"><w:name w:val="heading 4"/><w:basedOn w:val="Normal"/><w:pPr><w:outlineLvl w:val="3"/></w:pPr><w:rPr><w:b/><w:sz w:val="24"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading5"><w:name w:val="heading 5"/><w:basedOn w:val="Normal"/><w:pPr><w:outlineLvl w:val="4"/></w:pPr><w:rPr><w:b/><w:sz w:val="22"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading6"><w:name w:val="heading 6"/><w:basedOn w:val="Normal"/><w:pPr><w:outlineLvl w:val="5"/></w:pPr><w:rPr><w:b/><w:i/><w:sz w:val="22"/></w:rPr></w:style><w:style w:type="character" w:styleId="Hyperlink"><w:name w:val="Hyperlink"/><w:rPr><w:color w:val="0563C1"/><w:u w:val="single"/></w:rPr></w:style><w:style w:type="table" w:styleId="TableGrid"><w:name w:val="Table Grid"/><w:tblPr><w:tblBorders><w:top w:val="single" w:sz="4" w:space="0" w:color="auto"/><w:left w:val="single" w:sz="4" w:space="0" w:color="auto"/><w:bottom w:val="single" w:sz="4" w:space="0" w:color="auto"/><w:right w:val="single" w:sz="4" w:space="0" w:color="auto"/><w:insideH w:val="single" w:sz="4" w:space="0" w:color="auto"/><w:insideV w:val="single" w:sz="4" w:space="0" w:color="auto"/></w:tblBorders></w:tblPr></w:style></w:styles>"#;

const SECTION: &str = r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720" w:gutter="0"/></w:sectPr>"#;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const WP_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const A_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const PIC_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";

/// Run properties, written in schema order.
#[derive(Debug, Clone, Copy, Default)]
struct RunProps {
    hyperlink: bool,
    code: bool,
    style: Style,
}

/// Streams the document body and collects the relationships it references.
struct BodyWriter {
    xml: PartWriter,
    rels: Vec<(String, &'static str, String, bool)>,
}

impl BodyWriter {
    fn new() -> Result<Self, StrategyError> {
        let mut xml = PartWriter::new()?;
        xml.start("w:document", &[("xmlns:w", W_NS), ("xmlns:r", R_NS), ("xmlns:wp", WP_NS)])?;
        xml.start("w:body", &[])?;
        Ok(Self {
            xml,
            rels: Vec::new(),
        })
    }

    fn relationship(&mut self, kind: &'static str, target: &str, external: bool) -> String {
        let id = format!("rId{}", self.rels.len() + 2);
        self.rels
            .push((id.clone(), kind, target.to_string(), external));
        id
    }

    fn block(&mut self, block: &Block, indent: u32) -> Result<(), StrategyError> {
        match block {
            Block::Heading { level, inlines } => {
                let style = format!("Heading{}", level);
                self.paragraph(Some(style.as_str()), indent, inlines, Style::PLAIN)
            }
            Block::Paragraph(inlines) => self.paragraph(None, indent, inlines, Style::PLAIN),
            Block::List { ordered, items } => {
                for (n, item) in items.iter().enumerate() {
                    let marker = if *ordered {
                        format!("{}.\t", n + 1)
                    } else {
                        "\u{2022}\t".to_string()
                    };
                    let mut blocks = item.iter();
                    let mut inlines = vec![Inline::text(marker)];
                    if let Some(Block::Paragraph(first)) = item.first() {
                        blocks.next();
                        inlines.extend(first.iter().cloned());
                    }
                    self.paragraph(None, indent + 720, &inlines, Style::PLAIN)?;
                    for inner in blocks {
                        self.block(inner, indent + 720)?;
                    }
                }
                Ok(())
            }
            Block::Table(rows) => self.table(rows),
            Block::CodeBlock(code) => {
                for line in code.trim_end_matches('\n').lines() {
                    self.paragraph(None, indent, &[Inline::Code(line.to_string())], Style::PLAIN)?;
                }
                Ok(())
            }
            Block::Quote(blocks) => {
                for inner in blocks {
                    self.block(inner, indent + 567)?;
                }
                Ok(())
            }
            Block::Rule => {
                let xml = &mut self.xml;
                xml.start("w:p", &[])?;
                xml.start("w:pPr", &[])?;
                xml.start("w:pBdr", &[])?;
                xml.empty(
                    "w:bottom",
                    &[("w:val", "single"), ("w:sz", "6"), ("w:space", "1"), ("w:color", "auto")],
                )?;
                xml.end("w:pBdr")?;
                xml.end("w:pPr")?;
                xml.end("w:p")
            }
        }
    }

    fn paragraph(
        &mut self,
        style: Option<&str>,
        indent: u32,
        inlines: &[Inline],
        base: Style,
    ) -> Result<(), StrategyError> {
        self.xml.start("w:p", &[])?;
        if style.is_some() || indent > 0 {
            self.xml.start("w:pPr", &[])?;
            if let Some(style) = style {
                self.xml.empty("w:pStyle", &[("w:val", style)])?;
            }
            if indent > 0 {
                self.xml.empty("w:ind", &[("w:left", indent.to_string().as_str())])?;
            }
            self.xml.end("w:pPr")?;
        }
        for inline in inlines {
            self.inline(inline, base)?;
        }
        self.xml.end("w:p")
    }

    fn inline(&mut self, inline: &Inline, base: Style) -> Result<(), StrategyError> {
        match inline {
            Inline::Text { text, style } => {
                let style = Style {
                    bold: base.bold || style.bold,
                    italic: base.italic || style.italic,
                    strike: base.strike || style.strike,
                };
                self.run(RunProps { style, ..RunProps::default() }, text)
            }
            Inline::Link { text, href } => {
                let id = self.relationship(REL_HYPERLINK, href, true);
                self.xml.start("w:hyperlink", &[("r:id", id.as_str())])?;
                self.run(RunProps { hyperlink: true, ..RunProps::default() }, text)?;
                self.xml.end("w:hyperlink")
            }
            Inline::Code(code) => self.run(RunProps { code: true, ..RunProps::default() }, code),
            Inline::LineBreak => {
                self.xml.start("w:r", &[])?;
                self.xml.empty("w:br", &[])?;
                self.xml.end("w:r")
            }
        }
    }

    fn run(&mut self, props: RunProps, text: &str) -> Result<(), StrategyError> {
        let xml = &mut self.xml;
        xml.start("w:r", &[])?;
        let style = props.style;
        if props.hyperlink || props.code || style.bold || style.italic || style.strike {
            xml.start("w:rPr", &[])?;
            if props.hyperlink {
                xml.empty("w:rStyle", &[("w:val", "Hyperlink")])?;
            }
            if props.code {
                xml.empty("w:rFonts", &[("w:ascii", "Courier New"), ("w:hAnsi", "Courier New")])?;
            }
            if style.bold {
                xml.empty("w:b", &[])?;
            }
            if style.italic {
                xml.empty("w:i", &[])?;
            }
            if style.strike {
                xml.empty("w:strike", &[])?;
            }
            xml.end("w:rPr")?;
        }
        for (i, segment) in text.split('\t').enumerate() {
            if i > 0 {
                xml.empty("w:tab", &[])?;
            }
            if !segment.is_empty() {
                xml.text_element("w:t", &[("xml:space", "preserve")], segment)?;
            }
        }
        xml.end("w:r")
    }

    fn table(&mut self, rows: &[Vec<Cell>]) -> Result<(), StrategyError> {
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        if columns == 0 {
            return Ok(());
        }
        let column_width = (9360 / columns).to_string();

        self.xml.start("w:tbl", &[])?;
        self.xml.start("w:tblPr", &[])?;
        self.xml.empty("w:tblStyle", &[("w:val", "TableGrid")])?;
        self.xml.empty("w:tblW", &[("w:w", "0"), ("w:type", "auto")])?;
        self.xml.end("w:tblPr")?;
        self.xml.start("w:tblGrid", &[])?;
        for _ in 0..columns {
            self.xml.empty("w:gridCol", &[("w:w", column_width.as_str())])?;
        }
        self.xml.end("w:tblGrid")?;
        for row in rows {
            self.xml.start("w:tr", &[])?;
            for column in 0..columns {
                self.xml.start("w:tc", &[])?;
                match row.get(column) {
                    Some(cell) => {
                        let base = if cell.header { Style::bold() } else { Style::PLAIN };
                        self.paragraph(None, 0, &cell.inlines, base)?;
                    }
                    None => self.xml.empty("w:p", &[])?,
                }
                self.xml.end("w:tc")?;
            }
            self.xml.end("w:tr")?;
        }
        self.xml.end("w:tbl")
    }

    fn image(&mut self, target: &str, width: u32, height: u32) -> Result<(), StrategyError> {
        let id = self.relationship(REL_IMAGE, target, false);
        let cx = CONTENT_WIDTH_EMU.to_string();
        let cy = (CONTENT_WIDTH_EMU * u64::from(height) / u64::from(width.max(1))).to_string();
        let extent = [("cx", cx.as_str()), ("cy", cy.as_str())];

        let xml = &mut self.xml;
        xml.start("w:p", &[])?;
        xml.start("w:r", &[])?;
        xml.start("w:drawing", &[])?;
        xml.start(
            "wp:inline",
            &[("distT", "0"), ("distB", "0"), ("distL", "0"), ("distR", "0")],
        )?;
        xml.empty("wp:extent", &extent)?;
        xml.empty("wp:docPr", &[("id", "1"), ("name", "Picture 1")])?;
        xml.start("a:graphic", &[("xmlns:a", A_NS)])?;
        xml.start("a:graphicData", &[("uri", PIC_NS)])?;
        xml.start("pic:pic", &[("xmlns:pic", PIC_NS)])?;

        xml.start("pic:nvPicPr", &[])?;
        xml.empty("pic:cNvPr", &[("id", "0"), ("name", "image1.png")])?;
        xml.empty("pic:cNvPicPr", &[])?;
        xml.end("pic:nvPicPr")?;

        xml.start("pic:blipFill", &[])?;
        xml.empty("a:blip", &[("r:embed", id.as_str())])?;
        xml.start("a:stretch", &[])?;
        xml.empty("a:fillRect", &[])?;
        xml.end("a:stretch")?;
        xml.end("pic:blipFill")?;

        xml.start("pic:spPr", &[])?;
        xml.start("a:xfrm", &[])?;
        xml.empty("a:off", &[("x", "0"), ("y", "0")])?;
        xml.empty("a:ext", &extent)?;
        xml.end("a:xfrm")?;
        xml.start("a:prstGeom", &[("prst", "rect")])?;
        xml.empty("a:avLst", &[])?;
        xml.end("a:prstGeom")?;
        xml.end("pic:spPr")?;

        xml.end("pic:pic")?;
        xml.end("a:graphicData")?;
        xml.end("a:graphic")?;
        xml.end("wp:inline")?;
        xml.end("w:drawing")?;
        xml.end("w:r")?;
        xml.end("w:p")
    }

    fn rels_xml(&self) -> Result<String, StrategyError> {
        let mut rels = vec![("rId1", REL_STYLES, "styles.xml", false)];
        rels.extend(
            self.rels
                .iter()
                .map(|(id, kind, target, external)| (id.as_str(), *kind, target.as_str(), *external)),
        );
        relationships(&rels)
    }

    fn finish(mut self, media: Option<&[u8]>) -> Result<Vec<u8>, StrategyError> {
        let rels = self.rels_xml()?;
        self.xml.raw(SECTION)?;
        self.xml.end("w:body")?;
        self.xml.end("w:document")?;
        let document = self.xml.finish()?;

        let mut package = ZipPackage::new();
        package.add_xml("[Content_Types].xml", &static_part(CONTENT_TYPES)?)?;
        package.add_xml("_rels/.rels", &static_part(ROOT_RELS)?)?;
        package.add_xml("word/document.xml", &document)?;
        package.add_xml("word/styles.xml", &static_part(STYLES)?)?;
        package.add_xml("word/_rels/document.xml.rels", &rels)?;
        if let Some(png) = media {
            package.add("word/media/image1.png", png)?;
        }
        Ok(package.finish()?)
    }
}

/// Encodes a markup tree as a DOCX package.
pub fn render_markup(markup: &Markup) -> Result<Vec<u8>, StrategyError> {
    let mut writer = BodyWriter::new()?;
    for block in &markup.blocks {
        writer.block(block, 0)?;
    }
    writer.finish(None)
}

/// Encodes a DOCX package holding one PNG image scaled to the text column width.
pub fn render_image(png: &[u8], width: u32, height: u32) -> Result<Vec<u8>, StrategyError> {
    let mut writer = BodyWriter::new()?;
    writer.image("media/image1.png", width, height)?;
    writer.finish(Some(png))
}
