//! Word documents to text, HTML, PDF and slides.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::ooxml::{attr, relationships, toggle, Package};
use super::run_blocking;
use crate::converter::{ensure_pair, SourceFile, Strategy, StrategyError};
use crate::format::FormatTag;
use crate::markup::{Block, Cell, Inline, Markup, Style};
use crate::render::{html, pdf, pptx};

/// Converts DOCX files by way of a markup tree.
#[derive(Debug, Clone)]
pub struct DocumentStrategy {
    slide_char_limit: usize,
}

impl DocumentStrategy {
    pub fn new(slide_char_limit: usize) -> Self {
        Self { slide_char_limit }
    }
}

/// Numbering definitions: which list levels are ordered.
#[derive(Debug, Default)]
struct Numbering {
    abstract_ids: HashMap<String, String>,
    formats: HashMap<(String, u32), String>,
}

impl Numbering {
    fn parse(xml: &str) -> Result<Self, StrategyError> {
        let mut numbering = Self::default();
        let mut reader = Reader::from_str(xml);
        let mut abstract_id: Option<String> = None;
        let mut level: Option<u32> = None;
        let mut num_id: Option<String> = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                    b"abstractNum" => abstract_id = attr(&e, b"abstractNumId")?,
                    b"lvl" => level = attr(&e, b"ilvl")?.and_then(|v| v.parse().ok()),
                    b"numFmt" => {
                        if let (Some(id), Some(lvl), Some(fmt)) =
                            (&abstract_id, level, attr(&e, b"val")?)
                        {
                            numbering.formats.insert((id.clone(), lvl), fmt);
                        }
                    }
                    b"num" => num_id = attr(&e, b"numId")?,
                    b"abstractNumId" => {
                        if let (Some(num), Some(target)) = (&num_id, attr(&e, b"val")?) {
                            numbering.abstract_ids.insert(num.clone(), target);
                        }
                    }
                    _ => {}
                },
                Event::End(e) => match e.local_name().as_ref() {
                    b"abstractNum" => abstract_id = None,
                    b"lvl" => level = None,
                    b"num" => num_id = None,
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(numbering)
    }

    fn is_ordered(&self, num_id: &str, level: u32) -> bool {
        self.abstract_ids
            .get(num_id)
            .and_then(|abstract_id| self.formats.get(&(abstract_id.clone(), level)))
            .is_some_and(|fmt| fmt != "bullet" && fmt != "none")
    }
}

#[derive(Debug, Default)]
struct Paragraph {
    style: Option<String>,
    num_id: Option<String>,
    level: u32,
    inlines: Vec<Inline>,
}

#[derive(Debug)]
struct ListEntry {
    level: u32,
    ordered: bool,
    inlines: Vec<Inline>,
}

#[derive(Debug, Default)]
struct TableState {
    rows: Vec<Vec<Cell>>,
    row: Vec<Cell>,
    cell: Vec<Inline>,
    header_row: bool,
}

/// Maps `Title` and `HeadingN` paragraph styles to heading levels.
fn heading_level(style: Option<&str>) -> Option<u8> {
    let style = style?.to_ascii_lowercase().replace(' ', "");
    if style == "title" {
        return Some(1);
    }
    style
        .strip_prefix("heading")?
        .parse::<u8>()
        .ok()
        .filter(|level| (1..=6).contains(level))
}

struct ListFrame {
    level: u32,
    ordered: bool,
    items: Vec<Vec<Block>>,
}

impl ListFrame {
    fn close(self) -> Block {
        Block::List {
            ordered: self.ordered,
            items: self.items,
        }
    }
}

/// Nests consecutive numbered paragraphs by their indentation level.
fn build_list(entries: Vec<ListEntry>) -> Option<Block> {
    let mut stack: Vec<ListFrame> = Vec::new();

    for entry in entries {
        while let Some(top) = stack.last() {
            if top.level <= entry.level {
                break;
            }
            let Some(done) = stack.pop() else { break };
            let block = done.close();
            match stack.last_mut() {
                Some(parent) => match parent.items.last_mut() {
                    Some(item) => item.push(block),
                    None => parent.items.push(vec![block]),
                },
                None => stack.push(ListFrame {
                    level: entry.level,
                    ordered: entry.ordered,
                    items: vec![vec![block]],
                }),
            }
        }

        if stack.last().map_or(true, |top| top.level < entry.level) {
            stack.push(ListFrame {
                level: entry.level,
                ordered: entry.ordered,
                items: Vec::new(),
            });
        }
        if let Some(top) = stack.last_mut() {
            top.items.push(vec![Block::Paragraph(entry.inlines)]);
        }
    }

    while let Some(done) = stack.pop() {
        let block = done.close();
        match stack.last_mut().and_then(|parent| parent.items.last_mut()) {
            Some(item) => item.push(block),
            None => return Some(block),
        }
    }
    None
}

/// Streaming reader for `word/document.xml`.
struct DocumentParser<'a> {
    rels: &'a HashMap<String, String>,
    numbering: &'a Numbering,
    blocks: Vec<Block>,
    pending_list: Vec<ListEntry>,
    paragraph: Option<Paragraph>,
    run: Option<Style>,
    in_text: bool,
    link: Option<(String, String)>,
    table: Option<TableState>,
    table_depth: usize,
}

impl<'a> DocumentParser<'a> {
    fn new(rels: &'a HashMap<String, String>, numbering: &'a Numbering) -> Self {
        Self {
            rels,
            numbering,
            blocks: Vec::new(),
            pending_list: Vec::new(),
            paragraph: None,
            run: None,
            in_text: false,
            link: None,
            table: None,
            table_depth: 0,
        }
    }

    fn parse(mut self, xml: &str) -> Result<Markup, StrategyError> {
        let mut reader = Reader::from_str(xml);
        loop {
            match reader.read_event()? {
                Event::Start(e) => self.open(&e)?,
                Event::Empty(e) => {
                    self.open(&e)?;
                    self.close(e.local_name().as_ref());
                }
                Event::End(e) => self.close(e.local_name().as_ref()),
                Event::Text(t) if self.in_text => {
                    let text = t.unescape()?;
                    self.push_text(&text);
                }
                Event::Eof => break,
                _ => {}
            }
        }
        self.flush_list();
        Ok(Markup::new(self.blocks))
    }

    fn open(&mut self, e: &BytesStart<'_>) -> Result<(), StrategyError> {
        match e.local_name().as_ref() {
            b"p" => self.paragraph = Some(Paragraph::default()),
            b"pStyle" => {
                if let Some(paragraph) = &mut self.paragraph {
                    paragraph.style = attr(e, b"val")?;
                }
            }
            b"numId" => {
                if let Some(paragraph) = &mut self.paragraph {
                    paragraph.num_id = attr(e, b"val")?;
                }
            }
            b"ilvl" => {
                if let Some(paragraph) = &mut self.paragraph {
                    paragraph.level = attr(e, b"val")?.and_then(|v| v.parse().ok()).unwrap_or(0);
                }
            }
            b"r" => self.run = Some(Style::PLAIN),
            b"b" => {
                if let Some(style) = &mut self.run {
                    style.bold = toggle(e)?;
                }
            }
            b"i" => {
                if let Some(style) = &mut self.run {
                    style.italic = toggle(e)?;
                }
            }
            b"strike" | b"dstrike" => {
                if let Some(style) = &mut self.run {
                    style.strike = toggle(e)?;
                }
            }
            b"t" => self.in_text = self.run.is_some(),
            b"tab" if self.run.is_some() => self.push_text("\t"),
            b"br" | b"cr" if self.run.is_some() => self.push_inline(Inline::LineBreak),
            b"hyperlink" => {
                let href = match attr(e, b"id")? {
                    Some(id) => self.rels.get(&id).cloned(),
                    None => attr(e, b"anchor")?.map(|anchor| format!("#{}", anchor)),
                };
                self.link = href.map(|href| (href, String::new()));
            }
            b"tbl" => {
                self.table_depth += 1;
                if self.table_depth == 1 {
                    self.flush_list();
                    self.table = Some(TableState::default());
                }
            }
            b"tr" if self.table_depth == 1 => {
                if let Some(table) = &mut self.table {
                    table.row.clear();
                    table.header_row = false;
                }
            }
            b"tblHeader" if self.table_depth == 1 => {
                if let Some(table) = &mut self.table {
                    table.header_row = toggle(e)?;
                }
            }
            b"tc" if self.table_depth == 1 => {
                if let Some(table) = &mut self.table {
                    table.cell.clear();
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"t" => self.in_text = false,
            b"r" => self.run = None,
            b"hyperlink" => {
                if let Some((href, text)) = self.link.take() {
                    if !text.is_empty() {
                        self.push_inline(Inline::Link { text, href });
                    }
                }
            }
            b"p" => self.finish_paragraph(),
            b"tc" if self.table_depth == 1 => {
                if let Some(table) = &mut self.table {
                    let inlines = std::mem::take(&mut table.cell);
                    let cell = if table.header_row {
                        Cell::header(inlines)
                    } else {
                        Cell::new(inlines)
                    };
                    table.row.push(cell);
                }
            }
            b"tr" if self.table_depth == 1 => {
                if let Some(table) = &mut self.table {
                    let row = std::mem::take(&mut table.row);
                    table.rows.push(row);
                }
            }
            b"tbl" => {
                self.table_depth = self.table_depth.saturating_sub(1);
                if self.table_depth == 0 {
                    if let Some(table) = self.table.take() {
                        self.blocks.push(Block::Table(table.rows));
                    }
                }
            }
            _ => {}
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some((_, link_text)) = &mut self.link {
            link_text.push_str(text);
            return;
        }
        let style = self.run.unwrap_or_default();
        if let Some(paragraph) = &mut self.paragraph {
            if let Some(Inline::Text { text: last, style: last_style }) = paragraph.inlines.last_mut() {
                if *last_style == style {
                    last.push_str(text);
                    return;
                }
            }
            paragraph.inlines.push(Inline::styled(text, style));
        }
    }

    fn push_inline(&mut self, inline: Inline) {
        if let Some(paragraph) = &mut self.paragraph {
            paragraph.inlines.push(inline);
        }
    }

    fn finish_paragraph(&mut self) {
        let Some(paragraph) = self.paragraph.take() else {
            return;
        };

        if self.table_depth > 0 {
            if let Some(table) = &mut self.table {
                if !table.cell.is_empty() && !paragraph.inlines.is_empty() {
                    table.cell.push(Inline::LineBreak);
                }
                table.cell.extend(paragraph.inlines);
            }
            return;
        }

        match paragraph.num_id.filter(|id| id != "0") {
            Some(num_id) => {
                let ordered = self.numbering.is_ordered(&num_id, paragraph.level);
                self.pending_list.push(ListEntry {
                    level: paragraph.level,
                    ordered,
                    inlines: paragraph.inlines,
                });
            }
            None => {
                self.flush_list();
                let block = match heading_level(paragraph.style.as_deref()) {
                    Some(level) => Block::heading(level, paragraph.inlines),
                    None => Block::Paragraph(paragraph.inlines),
                };
                self.blocks.push(block);
            }
        }
    }

    fn flush_list(&mut self) {
        if self.pending_list.is_empty() {
            return;
        }
        if let Some(list) = build_list(std::mem::take(&mut self.pending_list)) {
            self.blocks.push(list);
        }
    }
}

/// Parses a DOCX package into a markup tree.
fn extract(bytes: Arc<[u8]>) -> Result<Markup, StrategyError> {
    let mut package = Package::open(bytes)?;
    let document = package.require("word/document.xml")?;
    let rels = package
        .part("word/_rels/document.xml.rels")?
        .map(|xml| relationships(&xml))
        .transpose()?
        .unwrap_or_default();
    let numbering = package
        .part("word/numbering.xml")?
        .map(|xml| Numbering::parse(&xml))
        .transpose()?
        .unwrap_or_default();

    let markup = DocumentParser::new(&rels, &numbering).parse(&document)?;
    if markup.is_blank() {
        return Err(StrategyError::NoContent);
    }
    Ok(markup)
}

fn encode(
    markup: &Markup,
    title: &str,
    to: FormatTag,
    slide_char_limit: usize,
) -> Result<Vec<u8>, StrategyError> {
    match to {
        FormatTag::PlainText => Ok(markup.plain_text().into_bytes()),
        FormatTag::Html => Ok(html::render_markup(title, markup).into_bytes()),
        FormatTag::Pdf => pdf::render_markup(markup),
        FormatTag::Pptx => {
            pptx::render_slides(&pptx::chunk_slides(markup.text_blocks(), slide_char_limit))
        }
        other => Err(StrategyError::UnsupportedPair {
            from: FormatTag::Docx,
            to: other,
        }),
    }
}

#[async_trait]
impl Strategy for DocumentStrategy {
    fn name(&self) -> &str {
        "document"
    }

    fn edges(&self) -> Vec<(FormatTag, FormatTag)> {
        vec![
            (FormatTag::Docx, FormatTag::PlainText),
            (FormatTag::Docx, FormatTag::Html),
            (FormatTag::Docx, FormatTag::Pdf),
            (FormatTag::Docx, FormatTag::Pptx),
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
        let markup = run_blocking(move || extract(bytes)).await?;
        tracing::debug!(file = %file.name, blocks = markup.blocks.len(), "Extracted document");

        let title = file.base_name().to_string();
        let limit = self.slide_char_limit;
        run_blocking(move || encode(&markup, &title, to, limit)).await
    }
}
