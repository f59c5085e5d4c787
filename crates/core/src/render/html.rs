//! HTML encoder.

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::markup::{Block, Cell, Inline, Markup};

/// Renders a complete HTML document for `markup`.
pub fn render_markup(title: &str, markup: &Markup) -> String {
    let mut body = String::new();
    for block in &markup.blocks {
        write_block(&mut body, block);
    }
    document(title, &body)
}

/// Renders plain text as one paragraph, newlines becoming `<br/>`.
pub fn render_text(title: &str, text: &str) -> String {
    let lines: Vec<_> = text.lines().map(|line| encode_text(line).into_owned()).collect();
    document(title, &format!("<p>{}</p>\n", lines.join("<br/>")))
}

/// Wraps an HTML body fragment into a complete document.
pub fn document(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
        encode_text(title),
        body
    )
}

fn write_block(out: &mut String, block: &Block) {
    match block {
        Block::Heading { level, inlines } => {
            out.push_str(&format!("<h{}>", level));
            write_inlines(out, inlines);
            out.push_str(&format!("</h{}>\n", level));
        }
        Block::Paragraph(inlines) => {
            out.push_str("<p>");
            write_inlines(out, inlines);
            out.push_str("</p>\n");
        }
        Block::List { ordered, items } => {
            let tag = if *ordered { "ol" } else { "ul" };
            out.push_str(&format!("<{}>\n", tag));
            for item in items {
                out.push_str("<li>");
                write_list_item(out, item);
                out.push_str("</li>\n");
            }
            out.push_str(&format!("</{}>\n", tag));
        }
        Block::Table(rows) => write_table(out, rows),
        Block::CodeBlock(code) => {
            out.push_str("<pre><code>");
            out.push_str(&encode_text(code));
            out.push_str("</code></pre>\n");
        }
        Block::Quote(blocks) => {
            out.push_str("<blockquote>\n");
            for block in blocks {
                write_block(out, block);
            }
            out.push_str("</blockquote>\n");
        }
        Block::Rule => out.push_str("<hr/>\n"),
    }
}

/// A single-paragraph item renders inline, anything richer renders as blocks.
fn write_list_item(out: &mut String, item: &[Block]) {
    match item {
        [Block::Paragraph(inlines)] => write_inlines(out, inlines),
        [Block::Paragraph(inlines), rest @ ..] => {
            write_inlines(out, inlines);
            out.push('\n');
            for block in rest {
                write_block(out, block);
            }
        }
        blocks => {
            for block in blocks {
                write_block(out, block);
            }
        }
    }
}

fn write_table(out: &mut String, rows: &[Vec<Cell>]) {
    out.push_str("<table>\n");
    for row in rows {
        out.push_str("<tr>");
        for cell in row {
            let tag = if cell.header { "th" } else { "td" };
            out.push_str(&format!("<{}>", tag));
            write_inlines(out, &cell.inlines);
            out.push_str(&format!("</{}>", tag));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</table>\n");
}

fn write_inlines(out: &mut String, inlines: &[Inline]) {
    for inline in inlines {
        match inline {
            Inline::Text { text, style } => {
                let mut open = String::new();
                let mut close = String::new();
                for (on, tag) in [(style.bold, "strong"), (style.italic, "em"), (style.strike, "del")] {
                    if on {
                        open.push_str(&format!("<{}>", tag));
                        close.insert_str(0, &format!("</{}>", tag));
                    }
                }
                out.push_str(&open);
                out.push_str(&encode_text(text));
                out.push_str(&close);
            }
            Inline::Link { text, href } => {
                out.push_str(&format!(
                    "<a href=\"{}\">{}</a>",
                    encode_double_quoted_attribute(href),
                    encode_text(text)
                ));
            }
            Inline::Code(code) => {
                out.push_str("<code>");
                out.push_str(&encode_text(code));
                out.push_str("</code>");
            }
            Inline::LineBreak => out.push_str("<br/>"),
        }
    }
}
