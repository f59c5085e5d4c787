//! Markdown to HTML and PDF.

use async_trait::async_trait;
use pulldown_cmark::{html as cmark_html, Event, Options, Parser, Tag, TagEnd};

use super::{decode_text, run_blocking};
use crate::converter::{ensure_pair, SourceFile, Strategy, StrategyError};
use crate::format::FormatTag;
use crate::markup::{Block, Cell, Inline, Markup, Style};
use crate::render::{html, pdf};

/// Renders GitHub-flavoured Markdown. Soft line breaks become hard breaks.
#[derive(Debug, Clone, Default)]
pub struct MarkdownStrategy;

impl MarkdownStrategy {
    pub fn new() -> Self {
        Self
    }
}

fn options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}

fn events(source: &str) -> impl Iterator<Item = Event<'_>> {
    Parser::new_ext(source, options()).map(|event| match event {
        Event::SoftBreak => Event::HardBreak,
        other => other,
    })
}

/// Renders the body fragment with pulldown-cmark's HTML writer.
fn to_html_body(source: &str) -> String {
    let mut body = String::new();
    cmark_html::push_html(&mut body, events(source));
    body
}

enum Frame {
    Root(Vec<Block>),
    Quote(Vec<Block>),
    List { ordered: bool, items: Vec<Vec<Block>> },
    Item(Vec<Block>),
}

#[derive(Default)]
struct TableState {
    rows: Vec<Vec<Cell>>,
    row: Vec<Cell>,
    in_head: bool,
}

/// Folds pulldown-cmark events into a markup tree.
struct MarkupBuilder {
    frames: Vec<Frame>,
    inlines: Vec<Inline>,
    style: Style,
    link: Option<(String, String)>,
    code: Option<String>,
    table: Option<TableState>,
}

impl MarkupBuilder {
    fn new() -> Self {
        Self {
            frames: vec![Frame::Root(Vec::new())],
            inlines: Vec::new(),
            style: Style::PLAIN,
            link: None,
            code: None,
            table: None,
        }
    }

    fn push_block(&mut self, block: Block) {
        match self.frames.last_mut() {
            Some(Frame::Root(blocks)) | Some(Frame::Quote(blocks)) | Some(Frame::Item(blocks)) => {
                blocks.push(block)
            }
            Some(Frame::List { items, .. }) => items.push(vec![block]),
            None => {}
        }
    }

    /// Tight list items carry text without a paragraph; wrap it here.
    fn flush_loose_inlines(&mut self) {
        if !self.inlines.is_empty() {
            let inlines = std::mem::take(&mut self.inlines);
            self.push_block(Block::Paragraph(inlines));
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(code) = &mut self.code {
            code.push_str(text);
        } else if let Some((_, link_text)) = &mut self.link {
            link_text.push_str(text);
        } else if let Some(Inline::Text { text: last, style }) = self.inlines.last_mut() {
            if *style == self.style {
                last.push_str(text);
            } else {
                self.inlines.push(Inline::styled(text, self.style));
            }
        } else {
            self.inlines.push(Inline::styled(text, self.style));
        }
    }

    fn pop_frame(&mut self) -> Option<Frame> {
        if self.frames.len() > 1 {
            self.frames.pop()
        } else {
            None
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.push_text(&text),
            Event::Code(code) => self.inlines.push(Inline::Code(code.into_string())),
            Event::SoftBreak | Event::HardBreak => self.inlines.push(Inline::LineBreak),
            Event::Rule => {
                self.flush_loose_inlines();
                self.push_block(Block::Rule);
            }
            Event::TaskListMarker(checked) => {
                self.inlines
                    .push(Inline::text(if checked { "[x] " } else { "[ ] " }))
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph | Tag::Heading { .. } => self.flush_loose_inlines(),
            Tag::BlockQuote(_) => {
                self.flush_loose_inlines();
                self.frames.push(Frame::Quote(Vec::new()));
            }
            Tag::List(start) => {
                self.flush_loose_inlines();
                self.frames.push(Frame::List {
                    ordered: start.is_some(),
                    items: Vec::new(),
                });
            }
            Tag::Item => self.frames.push(Frame::Item(Vec::new())),
            Tag::CodeBlock(_) => {
                self.flush_loose_inlines();
                self.code = Some(String::new());
            }
            Tag::Table(_) => self.table = Some(TableState::default()),
            Tag::TableHead => {
                if let Some(table) = &mut self.table {
                    table.in_head = true;
                    table.row.clear();
                }
            }
            Tag::TableRow => {
                if let Some(table) = &mut self.table {
                    table.row.clear();
                }
            }
            Tag::TableCell => self.inlines.clear(),
            Tag::Emphasis => self.style.italic = true,
            Tag::Strong => self.style.bold = true,
            Tag::Strikethrough => self.style.strike = true,
            Tag::Link { dest_url, .. } => self.link = Some((dest_url.into_string(), String::new())),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                let inlines = std::mem::take(&mut self.inlines);
                self.push_block(Block::Paragraph(inlines));
            }
            TagEnd::Heading(level) => {
                let inlines = std::mem::take(&mut self.inlines);
                self.push_block(Block::heading(level as u8, inlines));
            }
            TagEnd::BlockQuote(_) => {
                self.flush_loose_inlines();
                if let Some(Frame::Quote(blocks)) = self.pop_frame() {
                    self.push_block(Block::Quote(blocks));
                }
            }
            TagEnd::List(_) => {
                if let Some(Frame::List { ordered, items }) = self.pop_frame() {
                    self.push_block(Block::List { ordered, items });
                }
            }
            TagEnd::Item => {
                self.flush_loose_inlines();
                if let Some(Frame::Item(blocks)) = self.pop_frame() {
                    if let Some(Frame::List { items, .. }) = self.frames.last_mut() {
                        items.push(blocks);
                    }
                }
            }
            TagEnd::CodeBlock => {
                if let Some(code) = self.code.take() {
                    self.push_block(Block::CodeBlock(code));
                }
            }
            TagEnd::TableCell => {
                let inlines = std::mem::take(&mut self.inlines);
                if let Some(table) = &mut self.table {
                    let cell = if table.in_head {
                        Cell::header(inlines)
                    } else {
                        Cell::new(inlines)
                    };
                    table.row.push(cell);
                }
            }
            TagEnd::TableHead | TagEnd::TableRow => {
                if let Some(table) = &mut self.table {
                    let row = std::mem::take(&mut table.row);
                    table.rows.push(row);
                    table.in_head = false;
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    self.push_block(Block::Table(table.rows));
                }
            }
            TagEnd::Emphasis => self.style.italic = false,
            TagEnd::Strong => self.style.bold = false,
            TagEnd::Strikethrough => self.style.strike = false,
            TagEnd::Link => {
                if let Some((href, text)) = self.link.take() {
                    self.inlines.push(Inline::Link { text, href });
                }
            }
            _ => {}
        }
    }

    fn finish(mut self) -> Markup {
        self.flush_loose_inlines();
        while self.frames.len() > 1 {
            match self.frames.pop() {
                Some(Frame::Quote(blocks)) => self.push_block(Block::Quote(blocks)),
                Some(Frame::List { ordered, items }) => self.push_block(Block::List { ordered, items }),
                Some(Frame::Item(blocks)) => {
                    if let Some(Frame::List { items, .. }) = self.frames.last_mut() {
                        items.push(blocks);
                    }
                }
                Some(Frame::Root(_)) | None => {}
            }
        }
        match self.frames.pop() {
            Some(Frame::Root(blocks)) => Markup::new(blocks),
            _ => Markup::default(),
        }
    }
}

fn to_markup(source: &str) -> Markup {
    let mut builder = MarkupBuilder::new();
    for event in events(source) {
        builder.event(event);
    }
    builder.finish()
}

fn extract(bytes: &[u8]) -> Result<String, StrategyError> {
    let source = decode_text(bytes);
    if source.trim().is_empty() {
        return Err(StrategyError::NoContent);
    }
    Ok(source)
}

fn encode(source: &str, title: &str, to: FormatTag) -> Result<Vec<u8>, StrategyError> {
    match to {
        FormatTag::Html => Ok(html::document(title, &to_html_body(source)).into_bytes()),
        FormatTag::Pdf => {
            let markup = to_markup(source);
            if markup.is_blank() {
                return Err(StrategyError::NoContent);
            }
            pdf::render_markup(&markup)
        }
        other => Err(StrategyError::UnsupportedPair {
            from: FormatTag::Markdown,
            to: other,
        }),
    }
}

#[async_trait]
impl Strategy for MarkdownStrategy {
    fn name(&self) -> &str {
        "markdown"
    }

    fn edges(&self) -> Vec<(FormatTag, FormatTag)> {
        vec![
            (FormatTag::Markdown, FormatTag::Html),
            (FormatTag::Markdown, FormatTag::Pdf),
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
        let source = run_blocking(move || extract(&bytes)).await?;

        let title = file.base_name().to_string();
        run_blocking(move || encode(&source, &title, to)).await
    }
}
