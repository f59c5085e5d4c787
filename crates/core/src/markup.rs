//! DOM-like document tree shared by the document and markdown strategies.
//!
//! Extractors build a [`Markup`]; the HTML, PDF and DOCX encoders consume it.

/// Inline formatting flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Style {
    pub bold: bool,
    pub italic: bool,
    pub strike: bool,
}

impl Style {
    pub const PLAIN: Style = Style {
        bold: false,
        italic: false,
        strike: false,
    };

    pub fn bold() -> Self {
        Self {
            bold: true,
            ..Self::PLAIN
        }
    }

    pub fn italic() -> Self {
        Self {
            italic: true,
            ..Self::PLAIN
        }
    }
}

/// A run of inline content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text { text: String, style: Style },
    Link { text: String, href: String },
    Code(String),
    LineBreak,
}

impl Inline {
    /// Creates an unstyled text run.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            style: Style::PLAIN,
        }
    }

    /// Creates a styled text run.
    pub fn styled(text: impl Into<String>, style: Style) -> Self {
        Self::Text {
            text: text.into(),
            style,
        }
    }

    /// Creates a hyperlink.
    pub fn link(text: impl Into<String>, href: impl Into<String>) -> Self {
        Self::Link {
            text: text.into(),
            href: href.into(),
        }
    }

    fn push_plain(&self, out: &mut String) {
        match self {
            Self::Text { text, .. } | Self::Link { text, .. } | Self::Code(text) => {
                out.push_str(text)
            }
            Self::LineBreak => out.push('\n'),
        }
    }
}

/// Plain text of a run sequence.
pub fn inline_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        inline.push_plain(&mut out);
    }
    out
}

/// One table cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub header: bool,
    pub inlines: Vec<Inline>,
}

impl Cell {
    pub fn new(inlines: Vec<Inline>) -> Self {
        Self {
            header: false,
            inlines,
        }
    }

    pub fn header(inlines: Vec<Inline>) -> Self {
        Self {
            header: true,
            inlines,
        }
    }

    pub fn text(&self) -> String {
        inline_text(&self.inlines)
    }
}

/// A block-level element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Heading with level 1-6.
    Heading { level: u8, inlines: Vec<Inline> },
    Paragraph(Vec<Inline>),
    /// Each item is itself a sequence of blocks, which may include nested lists.
    List { ordered: bool, items: Vec<Vec<Block>> },
    Table(Vec<Vec<Cell>>),
    CodeBlock(String),
    Quote(Vec<Block>),
    Rule,
}

impl Block {
    /// Creates a heading, clamping the level into 1-6.
    pub fn heading(level: u8, inlines: Vec<Inline>) -> Self {
        Self::Heading {
            level: level.clamp(1, 6),
            inlines,
        }
    }

    fn push_plain(&self, out: &mut Vec<String>) {
        match self {
            Self::Heading { inlines, .. } | Self::Paragraph(inlines) => {
                out.push(inline_text(inlines))
            }
            Self::List { items, .. } => {
                for item in items {
                    for block in item {
                        block.push_plain(out);
                    }
                }
            }
            Self::Table(rows) => {
                for row in rows {
                    let cells: Vec<String> = row.iter().map(Cell::text).collect();
                    out.push(cells.join("\t"));
                }
            }
            Self::CodeBlock(code) => out.push(code.trim_end_matches('\n').to_string()),
            Self::Quote(blocks) => {
                for block in blocks {
                    block.push_plain(out);
                }
            }
            Self::Rule => {}
        }
    }
}

/// A parsed document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Markup {
    pub blocks: Vec<Block>,
}

impl Markup {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// One paragraph per input line.
    pub fn from_lines(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(|line| Block::Paragraph(vec![Inline::text(line)]))
                .collect(),
        )
    }

    /// Block texts joined by newlines. Rules contribute nothing.
    pub fn plain_text(&self) -> String {
        let mut lines = Vec::new();
        for block in &self.blocks {
            block.push_plain(&mut lines);
        }
        lines.join("\n")
    }

    /// Text chunks used to fill slides: one per paragraph-like block.
    pub fn text_blocks(&self) -> Vec<String> {
        let mut chunks = Vec::new();
        for block in &self.blocks {
            block.push_plain(&mut chunks);
        }
        chunks
            .into_iter()
            .map(|chunk| chunk.trim().to_string())
            .filter(|chunk| !chunk.is_empty())
            .collect()
    }

    /// Whether the document carries no visible text.
    pub fn is_blank(&self) -> bool {
        self.plain_text().trim().is_empty()
    }
}
