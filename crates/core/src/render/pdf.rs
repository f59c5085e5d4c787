//! Fixed-page PDF encoder built on lopdf.
//!
//! Text is laid out top to bottom on A4 pages using the standard Helvetica
//! fonts, so no font data is embedded. Output carries no timestamps or
//! document IDs and is byte-identical for identical input.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::converter::StrategyError;
use crate::markup::{Block, Cell, Inline, Markup, Style};

const MM: f32 = 72.0 / 25.4;

/// A4 width in points.
pub const PAGE_WIDTH: f32 = 595.28;
/// A4 height in points.
pub const PAGE_HEIGHT: f32 = 841.89;

const MARGIN_X: f32 = 10.0 * MM;
const MARGIN_Y: f32 = 20.0 * MM;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN_X;
const USABLE_HEIGHT: f32 = PAGE_HEIGHT - 2.0 * MARGIN_Y;
const BASE_LINE: f32 = 6.0 * MM;
const BODY_SIZE: f32 = 12.0;
const CODE_SIZE: f32 = 10.0;
const PARAGRAPH_GAP: f32 = 3.0 * MM;
const HEADING_GAP: f32 = 2.0 * MM;
const LIST_INDENT: f32 = 5.0 * MM;
const QUOTE_INDENT: f32 = 8.0 * MM;
const ROW_HEIGHT: f32 = 8.0 * MM;
const CELL_PAD: f32 = 1.5 * MM;
const HEADER_SIZE: f32 = 10.0;
const CELL_SIZE: f32 = 9.0;

/// Helvetica advance widths for 0x20..=0x7E, in 1/1000 em.
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0..?
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // @..O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // P.._
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // `..o
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // p..~
];

/// Helvetica-Bold advance widths for 0x20..=0x7E, in 1/1000 em.
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // 0..?
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // @..O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // P.._
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // `..o
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // p..~
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Regular,
    Bold,
    Italic,
    BoldItalic,
    Mono,
}

impl Font {
    const ALL: [Font; 5] = [
        Font::Regular,
        Font::Bold,
        Font::Italic,
        Font::BoldItalic,
        Font::Mono,
    ];

    fn from_style(style: Style) -> Self {
        match (style.bold, style.italic) {
            (false, false) => Font::Regular,
            (true, false) => Font::Bold,
            (false, true) => Font::Italic,
            (true, true) => Font::BoldItalic,
        }
    }

    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
            Font::Italic => "F3",
            Font::BoldItalic => "F4",
            Font::Mono => "F5",
        }
    }

    fn base_font(self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
            Font::Italic => "Helvetica-Oblique",
            Font::BoldItalic => "Helvetica-BoldOblique",
            Font::Mono => "Courier",
        }
    }

    fn glyph_width(self, byte: u8) -> u16 {
        let table = match self {
            Font::Mono => return 600,
            Font::Regular | Font::Italic => &HELVETICA,
            Font::Bold | Font::BoldItalic => &HELVETICA_BOLD,
        };
        match byte {
            0x20..=0x7E => table[(byte - 0x20) as usize],
            _ => 556,
        }
    }

    fn text_width(self, text: &str, size: f32) -> f32 {
        let units: u32 = encode_win_ansi(text)
            .into_iter()
            .map(|b| u32::from(self.glyph_width(b)))
            .sum();
        units as f32 * size / 1000.0
    }
}

/// Encodes text for the standard fonts' WinAnsiEncoding.
///
/// Characters outside the code page become `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\t' => b' ',
            '\u{a0}'..='\u{ff}' => c as u32 as u8,
            '\u{20ac}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201c}' => 0x93,
            '\u{201d}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2122}' => 0x99,
            _ => b'?',
        })
        .collect()
}

fn line_height(size: f32) -> f32 {
    BASE_LINE.max(size * 1.2)
}

#[derive(Debug, Clone)]
struct Word {
    text: String,
    font: Font,
    size: f32,
    link: Option<String>,
    space_before: bool,
}

impl Word {
    fn width(&self) -> f32 {
        self.font.text_width(&self.text, self.size)
    }

    fn space_width(&self) -> f32 {
        self.font.text_width(" ", self.size)
    }
}

enum Piece {
    Word(Word),
    Break,
}

fn merge_style(base: Style, style: Style) -> Style {
    Style {
        bold: base.bold || style.bold,
        italic: base.italic || style.italic,
        strike: base.strike || style.strike,
    }
}

/// Splits runs into words, remembering whether whitespace preceded each one.
fn pieces(inlines: &[Inline], size: f32, base: Style) -> Vec<Piece> {
    let mut out = Vec::new();
    let mut pending_space = false;

    for inline in inlines {
        let (text, font, link) = match inline {
            Inline::Text { text, style } => {
                (text.as_str(), Font::from_style(merge_style(base, *style)), None)
            }
            Inline::Link { text, href } => (text.as_str(), Font::from_style(base), Some(href)),
            Inline::Code(code) => (code.as_str(), Font::Mono, None),
            Inline::LineBreak => {
                out.push(Piece::Break);
                pending_space = false;
                continue;
            }
        };

        let mut word = String::new();
        let flush = |word: &mut String, pending_space: &mut bool, out: &mut Vec<Piece>| {
            if !word.is_empty() {
                out.push(Piece::Word(Word {
                    text: std::mem::take(word),
                    font,
                    size,
                    link: link.cloned(),
                    space_before: *pending_space,
                }));
                *pending_space = false;
            }
        };
        for c in text.chars() {
            if c.is_whitespace() {
                flush(&mut word, &mut pending_space, &mut out);
                pending_space = true;
            } else {
                word.push(c);
            }
        }
        flush(&mut word, &mut pending_space, &mut out);
    }

    out
}

/// Breaks a word wider than `max_width` into chunks that fit.
fn split_word(word: Word, max_width: f32) -> Vec<Word> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for c in word.text.chars() {
        let mut candidate = current.clone();
        candidate.push(c);
        if !current.is_empty() && word.font.text_width(&candidate, word.size) > max_width {
            chunks.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
        .into_iter()
        .enumerate()
        .map(|(i, text)| Word {
            text,
            space_before: i == 0 && word.space_before,
            link: word.link.clone(),
            ..word
        })
        .collect()
}

/// Greedy line filling.
fn wrap(pieces: Vec<Piece>, max_width: f32) -> Vec<Vec<Word>> {
    let mut lines = Vec::new();
    let mut line: Vec<Word> = Vec::new();
    let mut width = 0.0;

    for piece in pieces {
        let word = match piece {
            Piece::Break => {
                lines.push(std::mem::take(&mut line));
                width = 0.0;
                continue;
            }
            Piece::Word(word) => word,
        };

        let parts = if word.width() > max_width {
            split_word(word, max_width)
        } else {
            vec![word]
        };

        for word in parts {
            let space = if word.space_before && !line.is_empty() {
                word.space_width()
            } else {
                0.0
            };
            let w = word.width();
            if !line.is_empty() && width + space + w > max_width {
                lines.push(std::mem::take(&mut line));
                width = w;
            } else {
                width += space + w;
            }
            line.push(word);
        }
    }

    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

#[derive(Debug, Clone, Copy)]
struct Rect {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

#[derive(Default)]
struct Page {
    ops: Vec<Operation>,
    links: Vec<(Rect, String)>,
}

/// Cursor-based page layout. `y` is the distance of the cursor from the top edge.
struct Layout {
    pages: Vec<Page>,
    y: f32,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: vec![Page::default()],
            y: MARGIN_Y,
        }
    }

    fn page(&mut self) -> &mut Page {
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    /// Starts a new page when `height` no longer fits above the bottom margin.
    fn ensure(&mut self, height: f32) {
        if self.y + height > PAGE_HEIGHT - MARGIN_Y && self.y > MARGIN_Y {
            self.pages.push(Page::default());
            self.y = MARGIN_Y;
        }
    }

    fn skip(&mut self, gap: f32) {
        self.y += gap;
    }

    /// Draws `text` with its baseline `baseline` points below the top edge.
    fn text(&mut self, text: &str, font: Font, size: f32, x: f32, baseline: f32) {
        let ops = &mut self.page().ops;
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![font.resource().into(), size.into()],
        ));
        ops.push(Operation::new(
            "Td",
            vec![x.into(), (PAGE_HEIGHT - baseline).into()],
        ));
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
        ));
        ops.push(Operation::new("ET", vec![]));
    }

    fn set_color(&mut self, rgb: [f32; 3]) {
        self.page().ops.push(Operation::new(
            "rg",
            rgb.iter().map(|c| (*c).into()).collect(),
        ));
    }

    /// Draws one wrapped line starting at `x` with its top at `top`.
    fn draw_words(&mut self, words: &[Word], x: f32, top: f32, height: f32) {
        let mut cursor = x;
        let mut i = 0;
        while i < words.len() {
            let first = &words[i];
            let mut text = String::new();
            let mut j = i;
            while j < words.len()
                && words[j].font == first.font
                && words[j].size == first.size
                && words[j].link == first.link
            {
                if words[j].space_before && j > 0 {
                    text.push(' ');
                }
                text.push_str(&words[j].text);
                j += 1;
            }

            let baseline = top + height * 0.75;
            let width = first.font.text_width(&text, first.size);
            match &first.link {
                Some(href) => {
                    self.set_color([0.0, 0.0, 1.0]);
                    self.text(&text, first.font, first.size, cursor, baseline);
                    self.set_color([0.0, 0.0, 0.0]);
                    let rect = Rect {
                        x: cursor,
                        y: PAGE_HEIGHT - baseline - first.size * 0.25,
                        width,
                        height: first.size * 1.1,
                    };
                    self.page().links.push((rect, href.clone()));
                }
                None => self.text(&text, first.font, first.size, cursor, baseline),
            }
            cursor += width;
            i = j;
        }
    }

    /// Lays out wrapped lines; the optional marker is drawn on the first line.
    fn lines(&mut self, lines: Vec<Vec<Word>>, x: f32, marker: Option<(&str, f32)>) {
        let mut marker = marker;
        for words in lines {
            let size = words.iter().map(|w| w.size).fold(BODY_SIZE, f32::max);
            let height = line_height(size);
            self.ensure(height);
            if let Some((text, marker_x)) = marker.take() {
                self.text(text, Font::Regular, size, marker_x, self.y + height * 0.75);
            }
            self.draw_words(&words, x, self.y, height);
            self.skip(height);
        }
    }

    fn rule(&mut self, x: f32) {
        self.ensure(BASE_LINE);
        let y = PAGE_HEIGHT - (self.y + BASE_LINE / 2.0);
        let ops = &mut self.page().ops;
        ops.push(Operation::new("w", vec![0.5_f32.into()]));
        ops.push(Operation::new("m", vec![x.into(), y.into()]));
        ops.push(Operation::new(
            "l",
            vec![(PAGE_WIDTH - MARGIN_X).into(), y.into()],
        ));
        ops.push(Operation::new("S", vec![]));
        self.skip(BASE_LINE);
    }

    fn block(&mut self, block: &Block, indent: f32, depth: usize) {
        let x = MARGIN_X + indent;
        let width = CONTENT_WIDTH - indent;
        match block {
            Block::Heading { level, inlines } => {
                let size = match level {
                    1 => 18.0,
                    2 => 16.0,
                    3 => 14.0,
                    _ => BODY_SIZE,
                };
                let lines = wrap(pieces(inlines, size, Style::bold()), width);
                self.lines(lines, x, None);
                self.skip(HEADING_GAP);
            }
            Block::Paragraph(inlines) => {
                let lines = wrap(pieces(inlines, BODY_SIZE, Style::PLAIN), width);
                if lines.is_empty() {
                    self.ensure(BASE_LINE);
                    self.skip(BASE_LINE);
                } else {
                    self.lines(lines, x, None);
                }
                if depth == 0 {
                    self.skip(PARAGRAPH_GAP);
                }
            }
            Block::List { ordered, items } => {
                for (n, item) in items.iter().enumerate() {
                    let marker = if *ordered {
                        format!("{}.", n + 1)
                    } else if depth == 0 {
                        "\u{2022}".to_string()
                    } else {
                        "-".to_string()
                    };
                    self.list_item(item, indent, depth, &marker);
                }
                if depth == 0 {
                    self.skip(PARAGRAPH_GAP);
                }
            }
            Block::Table(rows) => {
                self.table(rows, x, width);
                self.skip(PARAGRAPH_GAP);
            }
            Block::CodeBlock(code) => {
                for line in code.trim_end_matches('\n').lines() {
                    let words = wrap(pieces(&[Inline::Code(line.to_string())], CODE_SIZE, Style::PLAIN), width);
                    if words.is_empty() {
                        self.ensure(line_height(CODE_SIZE));
                        self.skip(line_height(CODE_SIZE));
                    } else {
                        self.lines(words, x, None);
                    }
                }
                self.skip(PARAGRAPH_GAP);
            }
            Block::Quote(blocks) => {
                for inner in blocks {
                    self.block(inner, indent + QUOTE_INDENT, depth);
                }
            }
            Block::Rule => self.rule(x),
        }
    }

    fn list_item(&mut self, item: &[Block], indent: f32, depth: usize, marker: &str) {
        let text_indent = indent + LIST_INDENT;
        let mut blocks = item.iter();
        match item.first() {
            Some(Block::Paragraph(inlines)) => {
                blocks.next();
                let lines = wrap(
                    pieces(inlines, BODY_SIZE, Style::PLAIN),
                    CONTENT_WIDTH - text_indent,
                );
                let lines = if lines.is_empty() { vec![Vec::new()] } else { lines };
                self.lines(lines, MARGIN_X + text_indent, Some((marker, MARGIN_X + indent)));
            }
            _ => {
                self.lines(vec![Vec::new()], MARGIN_X + text_indent, Some((marker, MARGIN_X + indent)));
            }
        }
        for block in blocks {
            self.block(block, text_indent, depth + 1);
        }
    }

    fn table(&mut self, rows: &[Vec<Cell>], x: f32, width: f32) {
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        if columns == 0 {
            return;
        }
        let column_width = width / columns as f32;

        for row in rows {
            let cells: Vec<(Vec<Vec<Word>>, f32)> = row
                .iter()
                .map(|cell| {
                    let (size, style) = if cell.header {
                        (HEADER_SIZE, Style::bold())
                    } else {
                        (CELL_SIZE, Style::PLAIN)
                    };
                    let lines = wrap(
                        pieces(&cell.inlines, size, style),
                        column_width - 2.0 * CELL_PAD,
                    );
                    (lines, size)
                })
                .collect();

            // A row taller than the free space continues on the next page.
            let mut next = vec![0usize; cells.len()];
            loop {
                let remaining = slice_height(
                    cells.iter().zip(&next).map(|((lines, size), start)| (lines.len() - start, *size)),
                );
                self.ensure(remaining.min(USABLE_HEIGHT));

                let available = PAGE_HEIGHT - MARGIN_Y - self.y;
                let taken: Vec<usize> = cells
                    .iter()
                    .zip(&next)
                    .map(|((lines, size), start)| {
                        let fit = ((available - 2.0 * CELL_PAD) / (size * 1.2)).floor().max(1.0) as usize;
                        (lines.len() - start).min(fit)
                    })
                    .collect();
                let height = slice_height(cells.iter().zip(&taken).map(|((_, size), n)| (*n, *size)));

                let top = self.y;
                for column in 0..columns {
                    let cell_x = x + column as f32 * column_width;
                    let ops = &mut self.page().ops;
                    ops.push(Operation::new("w", vec![0.5_f32.into()]));
                    ops.push(Operation::new(
                        "re",
                        vec![
                            cell_x.into(),
                            (PAGE_HEIGHT - top - height).into(),
                            column_width.into(),
                            height.into(),
                        ],
                    ));
                    ops.push(Operation::new("S", vec![]));

                    if let Some((lines, size)) = cells.get(column) {
                        let line_h = size * 1.2;
                        let start = next[column];
                        for (k, words) in lines[start..start + taken[column]].iter().enumerate() {
                            let line_top = top + CELL_PAD + k as f32 * line_h;
                            self.draw_words(words, cell_x + CELL_PAD, line_top, line_h);
                        }
                    }
                }
                self.skip(height);

                for (start, n) in next.iter_mut().zip(&taken) {
                    *start += n;
                }
                if cells.iter().zip(&next).all(|((lines, _), start)| *start == lines.len()) {
                    break;
                }
            }
        }
    }

    fn finish(self) -> Result<Vec<u8>, StrategyError> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut fonts = lopdf::Dictionary::new();
        for font in Font::ALL {
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => font.base_font(),
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(font.resource(), font_id);
        }
        let resources_id = doc.add_object(dictionary! { "Font" => fonts });

        let mut kids: Vec<Object> = Vec::new();
        for page in self.pages {
            let content = Content { operations: page.ops };
            let content_id = doc.add_object(Stream::new(dictionary! {}, encode(&content)?));

            let mut page_dict = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            };
            if !page.links.is_empty() {
                let annots: Vec<Object> = page
                    .links
                    .into_iter()
                    .map(|(rect, href)| link_annotation(&mut doc, rect, &href).into())
                    .collect();
                page_dict.set("Annots", annots);
            }
            kids.push(doc.add_object(page_dict).into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => media_box(PAGE_WIDTH, PAGE_HEIGHT),
            }),
        );

        save(doc, pages_id)
    }
}

/// Height of a table row slice holding `(line count, font size)` per cell.
fn slice_height(cells: impl Iterator<Item = (usize, f32)>) -> f32 {
    cells
        .map(|(lines, size)| lines as f32 * size * 1.2 + 2.0 * CELL_PAD)
        .fold(ROW_HEIGHT, f32::max)
}

fn link_annotation(doc: &mut Document, rect: Rect, href: &str) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Link",
        "Rect" => vec![
            Object::from(rect.x),
            Object::from(rect.y),
            Object::from(rect.x + rect.width),
            Object::from(rect.y + rect.height),
        ],
        "Border" => vec![Object::from(0), Object::from(0), Object::from(0)],
        "A" => dictionary! {
            "S" => "URI",
            "URI" => Object::string_literal(href),
        },
    })
}

fn media_box(width: f32, height: f32) -> Vec<Object> {
    vec![0.into(), 0.into(), width.into(), height.into()]
}

fn encode(content: &Content) -> Result<Vec<u8>, StrategyError> {
    content
        .encode()
        .map_err(|e| StrategyError::encoding(format!("PDF content: {}", e)))
}

fn save(mut doc: Document, pages_id: ObjectId) -> Result<Vec<u8>, StrategyError> {
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| StrategyError::encoding(format!("PDF write: {}", e)))?;
    Ok(bytes)
}

fn layout_markup(markup: &Markup) -> Layout {
    let mut layout = Layout::new();
    for block in &markup.blocks {
        layout.block(block, 0.0, 0);
    }
    layout
}

fn layout_text(text: &str) -> Layout {
    let mut layout = Layout::new();
    for line in text.lines() {
        let lines = wrap(pieces(&[Inline::text(line)], BODY_SIZE, Style::PLAIN), CONTENT_WIDTH);
        if lines.is_empty() {
            layout.ensure(BASE_LINE);
            layout.skip(BASE_LINE);
        } else {
            layout.lines(lines, MARGIN_X, None);
        }
    }
    layout
}

/// Lays out a markup tree on A4 pages.
pub fn render_markup(markup: &Markup) -> Result<Vec<u8>, StrategyError> {
    layout_markup(markup).finish()
}

/// Reflows plain text on A4 pages, one source line per paragraph.
pub fn render_text(text: &str) -> Result<Vec<u8>, StrategyError> {
    layout_text(text).finish()
}

/// Builds a one-page PDF filled by an RGB image.
///
/// The page is A4 wide and as tall as the image's aspect ratio requires.
pub fn render_image_page(width: u32, height: u32, rgb: Vec<u8>) -> Result<Vec<u8>, StrategyError> {
    if width == 0 || height == 0 {
        return Err(StrategyError::corrupt("image has no pixels"));
    }
    let page_height = PAGE_WIDTH * height as f32 / width as f32;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(width),
            "Height" => i64::from(height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        rgb,
    ));

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    PAGE_WIDTH.into(),
                    0.into(),
                    0.into(),
                    page_height.into(),
                    0.into(),
                    0.into(),
                ],
            ),
            Operation::new("Do", vec!["Im1".into()]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, encode(&content)?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "MediaBox" => media_box(PAGE_WIDTH, page_height),
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im1" => image_id },
        },
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::from(page_id)],
            "Count" => 1,
        }),
    );

    save(doc, pages_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shown_text(layout: &Layout) -> Vec<String> {
        layout
            .pages
            .iter()
            .flat_map(|page| page.ops.iter())
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| match op.operands.first() {
                Some(Object::String(bytes, _)) => Some(bytes.iter().map(|b| *b as char).collect()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_win_ansi_encoding() {
        assert_eq!(encode_win_ansi("Az~"), b"Az~");
        assert_eq!(encode_win_ansi("\u{e9}"), vec![0xE9]);
        assert_eq!(encode_win_ansi("\u{2022}\u{20ac}"), vec![0x95, 0x80]);
        assert_eq!(encode_win_ansi("\u{4e2d}"), b"?");
    }

    #[test]
    fn test_text_width() {
        assert_eq!(Font::Regular.text_width("i", 1000.0), 222.0);
        assert_eq!(Font::Bold.text_width("i", 1000.0), 278.0);
        assert_eq!(Font::Mono.text_width("iW", 10.0), 12.0);
    }

    #[test]
    fn test_wrap_respects_width() {
        let text = "lorem ipsum dolor sit amet ".repeat(40);
        let lines = wrap(pieces(&[Inline::text(text)], BODY_SIZE, Style::PLAIN), CONTENT_WIDTH);
        assert!(lines.len() > 1);
        for line in &lines {
            let width: f32 = line
                .iter()
                .enumerate()
                .map(|(i, w)| w.width() + if i > 0 && w.space_before { w.space_width() } else { 0.0 })
                .sum();
            assert!(width <= CONTENT_WIDTH + 0.01, "{}", width);
        }
    }

    #[test]
    fn test_long_word_is_split() {
        let word = "x".repeat(500);
        let lines = wrap(pieces(&[Inline::text(word)], BODY_SIZE, Style::PLAIN), 100.0);
        assert!(lines.len() > 1);
        let joined: String = lines.iter().flatten().map(|w| w.text.as_str()).collect();
        assert_eq!(joined.len(), 500);
    }

    #[test]
    fn test_runs_without_whitespace_join() {
        let inlines = vec![Inline::text("foo"), Inline::styled("bar", Style::bold())];
        let lines = wrap(pieces(&inlines, BODY_SIZE, Style::PLAIN), CONTENT_WIDTH);
        assert_eq!(lines.len(), 1);
        assert!(!lines[0][1].space_before);
        assert_eq!(lines[0][1].font, Font::Bold);
    }

    #[test]
    fn test_text_layout_paginates() {
        let text = (0..200).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n");
        let layout = layout_text(&text);
        assert!(layout.pages.len() > 1);
        let shown = shown_text(&layout);
        assert_eq!(shown.len(), 200);
        assert_eq!(shown[0], "line 0");
        assert_eq!(shown[199], "line 199");
    }

    #[test]
    fn test_markup_layout() {
        let markup = Markup::new(vec![
            Block::heading(1, vec![Inline::text("Title")]),
            Block::Paragraph(vec![Inline::text("see "), Inline::link("docs", "https://example.com")]),
            Block::List {
                ordered: false,
                items: vec![vec![Block::Paragraph(vec![Inline::text("item")])]],
            },
            Block::Table(vec![vec![Cell::header(vec![Inline::text("h")])]]),
        ]);
        let layout = layout_markup(&markup);
        let shown = shown_text(&layout);
        assert_eq!(shown, vec!["Title", "see", " docs", "\u{95}", "item", "h"]);
        assert_eq!(layout.pages[0].links.len(), 1);
        assert_eq!(layout.pages[0].links[0].1, "https://example.com");
    }

    #[test]
    fn test_tall_table_row_continues_on_next_page() {
        let text = (0..1500).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        let markup = Markup::new(vec![
            Block::Paragraph(vec![Inline::text("before")]),
            Block::Table(vec![vec![
                Cell::header(vec![Inline::text("short")]),
                Cell::new(vec![Inline::text(text)]),
            ]]),
        ]);
        let layout = layout_markup(&markup);
        assert!(layout.pages.len() > 1);

        for op in layout.pages.iter().flat_map(|page| page.ops.iter()) {
            let bottom = match op.operator.as_str() {
                "re" => op.operands[1].as_float().unwrap(),
                "Td" => op.operands[1].as_float().unwrap(),
                _ => continue,
            };
            assert!(bottom >= MARGIN_Y - 0.01, "{} drawn at {}", op.operator, bottom);
        }

        let shown = shown_text(&layout);
        assert_eq!(shown.iter().filter(|s| s.as_str() == "short").count(), 1);
        assert!(shown.last().unwrap().ends_with("w1499"));
    }

    #[test]
    fn test_output_loads_and_is_deterministic() {
        let first = render_text("hello\nworld").unwrap();
        let second = render_text("hello\nworld").unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&first).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_link_annotation_written() {
        let markup = Markup::new(vec![Block::Paragraph(vec![Inline::link("x", "https://e.com")])]);
        let doc = Document::load_mem(&render_markup(&markup).unwrap()).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();
        let page = doc.get_dictionary(page_id).unwrap();
        assert!(page.get(b"Annots").is_ok());
    }

    #[test]
    fn test_image_page_keeps_aspect_ratio() {
        let rgb = vec![255u8; 40 * 20 * 3];
        let bytes = render_image_page(40, 20, rgb).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();
        let media_box = doc
            .get_dictionary(page_id)
            .unwrap()
            .get(b"MediaBox")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o.as_float().unwrap())
            .collect::<Vec<_>>();
        assert!((media_box[2] / media_box[3] - 2.0).abs() < 0.01);
        assert!((media_box[2] - PAGE_WIDTH).abs() < 0.01);
    }

    #[test]
    fn test_image_page_rejects_empty_image() {
        assert!(render_image_page(0, 10, vec![]).is_err());
    }
}
