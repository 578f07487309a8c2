//! Small Markdown subset used by the journal editor: headings, `**bold**` /
//! `__bold__` spans, `-`/`*` lists and plain paragraphs.
//!
//! Parsing is line oriented. A line that cannot be parsed is kept as escaped
//! plain text and the rest of the document is unaffected; `parse` never fails.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

/// Lines longer than this are not inline-parsed.
pub const MAX_LINE_CHARS: usize = 10_000;
/// Documents longer than this are returned escaped, as a whole.
pub const MAX_DOCUMENT_CHARS: usize = 1_000_000;

static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*]\s+(.+)$").expect("list item pattern"));
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").expect("heading pattern"));
static BOLD_STARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("bold pattern"));
static BOLD_UNDERSCORES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__(.+?)__").expect("bold pattern"));

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MarkdownError {
    #[error("line has {0} characters, limit is {}", MAX_LINE_CHARS)]
    LineTooLong(usize),
    #[error("document has {0} characters, limit is {}", MAX_DOCUMENT_CHARS)]
    DocumentTooLong(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Strong(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, content: Vec<Inline> },
    List(Vec<Vec<Inline>>),
    Paragraph(Vec<Inline>),
    /// Whitespace-only line.
    Break,
    /// A line whose inline parsing failed; shown verbatim.
    Plain(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Document {
    Blocks(Vec<Block>),
    /// The whole input, unparsed.
    Escaped(String),
}

impl Document {
    pub fn is_empty(&self) -> bool {
        match self {
            Document::Blocks(blocks) => blocks.is_empty(),
            Document::Escaped(text) => text.is_empty(),
        }
    }

    pub fn to_html(&self) -> String {
        match self {
            Document::Escaped(text) => escape_html(text),
            Document::Blocks(blocks) => blocks
                .iter()
                .map(block_to_html)
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownParser;

impl MarkdownParser {
    pub fn new() -> Self {
        Self
    }

    /// Markdown to HTML. Pure function of its input.
    pub fn parse(&self, markdown: &str) -> String {
        self.parse_document(markdown).to_html()
    }

    pub fn parse_document(&self, markdown: &str) -> Document {
        if markdown.is_empty() {
            return Document::Blocks(Vec::new());
        }
        match self.parse_blocks(markdown) {
            Ok(blocks) => Document::Blocks(blocks),
            Err(err) => {
                warn!(error = %err, "markdown parse failed, showing source text");
                Document::Escaped(markdown.to_string())
            }
        }
    }

    fn parse_blocks(&self, markdown: &str) -> Result<Vec<Block>, MarkdownError> {
        let total = markdown.chars().count();
        if total > MAX_DOCUMENT_CHARS {
            return Err(MarkdownError::DocumentTooLong(total));
        }

        let lines: Vec<&str> = markdown.split('\n').collect();
        let mut blocks = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i];

            if is_list_item(line) {
                let mut items = Vec::new();
                while i < lines.len() && is_list_item(lines[i]) {
                    items.push(self.parse_list_item(lines[i], i));
                    i += 1;
                }
                blocks.push(Block::List(items));
                continue;
            }

            let block = match self.parse_line(line) {
                Ok(block) => block,
                Err(err) => {
                    warn!(line = i + 1, error = %err, "markdown line kept as plain text");
                    Block::Plain(line.to_string())
                }
            };
            blocks.push(block);
            i += 1;
        }

        Ok(blocks)
    }

    fn parse_line(&self, line: &str) -> Result<Block, MarkdownError> {
        if let Some(caps) = HEADING.captures(line) {
            let level = caps[1].len() as u8;
            return Ok(Block::Heading {
                level,
                content: parse_bold(&caps[2])?,
            });
        }
        if line.trim().is_empty() {
            return Ok(Block::Break);
        }
        Ok(Block::Paragraph(parse_bold(line)?))
    }

    fn parse_list_item(&self, line: &str, index: usize) -> Vec<Inline> {
        let text = LIST_ITEM
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .unwrap_or(line);
        parse_bold(text).unwrap_or_else(|err| {
            warn!(line = index + 1, error = %err, "list item kept as plain text");
            vec![Inline::Text(text.to_string())]
        })
    }
}

fn is_list_item(line: &str) -> bool {
    LIST_ITEM.is_match(line)
}

/// `**` spans are matched first and `__` only in the text between them, so
/// strong spans never nest: `__a **b** c__` keeps its underscores.
fn parse_bold(text: &str) -> Result<Vec<Inline>, MarkdownError> {
    let len = text.chars().count();
    if len > MAX_LINE_CHARS {
        return Err(MarkdownError::LineTooLong(len));
    }

    let mut spans = Vec::new();
    for span in split_strong(text, &BOLD_STARS) {
        match span {
            Inline::Text(t) => spans.extend(split_strong(&t, &BOLD_UNDERSCORES)),
            strong => spans.push(strong),
        }
    }
    Ok(spans)
}

fn split_strong(text: &str, pattern: &Regex) -> Vec<Inline> {
    let mut spans = Vec::new();
    let mut last = 0;
    for caps in pattern.captures_iter(text) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            spans.push(Inline::Text(text[last..whole.start()].to_string()));
        }
        spans.push(Inline::Strong(inner.as_str().to_string()));
        last = whole.end();
    }
    if last < text.len() {
        spans.push(Inline::Text(text[last..].to_string()));
    }
    spans
}

fn inline_to_html(spans: &[Inline]) -> String {
    spans
        .iter()
        .map(|span| match span {
            Inline::Text(t) => escape_html(t),
            Inline::Strong(t) => format!("<strong class=\"md-strong\">{}</strong>", escape_html(t)),
        })
        .collect()
}

fn block_to_html(block: &Block) -> String {
    match block {
        Block::Heading { level, content } => {
            format!("<h{level} class=\"md-h{level}\">{}</h{level}>", inline_to_html(content))
        }
        Block::List(items) => {
            let items = items
                .iter()
                .map(|item| format!("<li class=\"md-item\">{}</li>", inline_to_html(item)))
                .collect::<Vec<_>>()
                .join("\n");
            format!("<ul class=\"md-list\">{items}</ul>")
        }
        Block::Paragraph(spans) => format!("<p class=\"md-paragraph\">{}</p>", inline_to_html(spans)),
        Block::Break => "<br>".to_string(),
        Block::Plain(text) => format!("<p class=\"md-paragraph\">{}</p>", escape_html(text)),
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
