/// Inline content inside a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Code(String),
    Link {
        url: String,
        title: Option<String>,
        content: Vec<Inline>,
    },
    Image {
        url: String,
        alt: String,
        title: Option<String>,
    },
    /// `<https://…>`, `<me@example.com>` or a bare URL/email in running text
    Autolink { url: String, email: bool },
    /// Raw inline HTML, subject to sanitization at render time
    Html(String),
    LineBreak,
    SoftBreak,
}

impl Inline {
    /// Plain text of this inline and its children, used for image `alt` text.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.push_plain_text(&mut out);
        out
    }

    fn push_plain_text(&self, out: &mut String) {
        match self {
            Inline::Text(text) | Inline::Code(text) => out.push_str(text),
            Inline::Emphasis(inner) | Inline::Strong(inner) | Inline::Strikethrough(inner) => {
                for inline in inner {
                    inline.push_plain_text(out);
                }
            }
            Inline::Link { content, .. } => {
                for inline in content {
                    inline.push_plain_text(out);
                }
            }
            Inline::Image { alt, .. } => out.push_str(alt),
            Inline::Autolink { url, .. } => out.push_str(url),
            Inline::Html(_) => {}
            Inline::LineBreak | Inline::SoftBreak => out.push(' '),
        }
    }
}

/// A single list item, which can contain nested blocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    pub blocks: Vec<Block>,
    /// For task lists: None = not a task, Some(false) = unchecked, Some(true) = checked
    pub checked: Option<bool>,
}

/// A list (ordered or unordered)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct List {
    pub ordered: bool,
    /// First number of an ordered list
    pub start: u32,
    /// Tight lists render item paragraphs without `<p>` wrappers
    pub tight: bool,
    pub items: Vec<ListItem>,
}

/// Column alignment from a table delimiter row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    None,
    Left,
    Center,
    Right,
}

impl Alignment {
    pub fn as_css(self) -> Option<&'static str> {
        match self {
            Alignment::None => None,
            Alignment::Left => Some("left"),
            Alignment::Center => Some("center"),
            Alignment::Right => Some("right"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub alignments: Vec<Alignment>,
    pub headers: Vec<Vec<Inline>>,
    pub rows: Vec<Vec<Vec<Inline>>>,
}

/// Block-level elements parsed from Markdown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading {
        level: u8,
        content: Vec<Inline>,
    },
    Paragraph {
        content: Vec<Inline>,
    },
    CodeBlock {
        language: Option<String>,
        content: String,
    },
    List(List),
    BlockQuote(Document),
    Table(Table),
    /// Raw HTML block, kept verbatim unless safe mode drops it
    Html(String),
    Rule,
}

/// Root of a parsed Markdown tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
