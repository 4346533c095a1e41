use crate::block::{Alignment, Block, Document, List, ListItem, Table};
use crate::inline::{self, InlineContext, RefMap};
use crate::math::Delimiter;

/// Tags that open an HTML block ending at the next blank line.
const HTML_BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "caption", "center", "col", "colgroup",
    "dd", "details", "dialog", "dir", "div", "dl", "dt", "fieldset", "figcaption", "figure",
    "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "head", "header", "hr", "html", "iframe",
    "legend", "li", "link", "main", "menu", "menuitem", "nav", "noframes", "ol", "optgroup",
    "option", "p", "param", "section", "summary", "table", "tbody", "td", "tfoot", "th", "thead",
    "title", "tr", "track", "ul",
];

/// Tags whose HTML block runs until the matching closing tag.
const HTML_RAW_TAGS: &[&str] = &["script", "pre", "style", "textarea"];

/// Block quotes and list items nested deeper than this are read as
/// paragraph text.
const MAX_NESTING: usize = 64;

/// Parse markdown text into a document.
///
/// Block structure is resolved first over the whole input so that link
/// reference definitions are known before any inline text is parsed.
pub fn parse(markdown: &str, delimiters: &[Delimiter]) -> Document {
    let lines = normalize(markdown);
    let mut refs = RefMap::new();
    let nodes = parse_lines(&lines, &mut refs, 0).nodes;

    let ctx = InlineContext {
        refs: &refs,
        delimiters,
    };
    let blocks = build(nodes, &ctx);
    tracing::debug!(
        blocks = blocks.len(),
        references = refs.len(),
        "parsed markdown"
    );
    Document::new(blocks)
}

/// Block tree with inline text still unparsed
#[derive(Debug)]
enum Node {
    Paragraph(String),
    Heading {
        level: u8,
        text: String,
    },
    Code {
        language: Option<String>,
        content: String,
    },
    Html(String),
    Rule,
    Quote(Vec<Node>),
    List {
        ordered: bool,
        start: u32,
        tight: bool,
        items: Vec<ItemNode>,
    },
    Table {
        alignments: Vec<Alignment>,
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
}

/// Result of parsing one container's lines
struct Parsed {
    nodes: Vec<Node>,
    /// A blank line separated two of the nodes
    gap: bool,
    /// The last line belongs to a paragraph that is still open, so a lazy
    /// continuation line may extend it
    open: bool,
}

#[derive(Debug)]
struct ItemNode {
    children: Vec<Node>,
    checked: Option<bool>,
}

struct Fence {
    ch: u8,
    len: usize,
    indent: usize,
    info: String,
}

#[derive(Clone, Copy)]
struct Marker {
    ordered: bool,
    /// Bullet character, or `.`/`)` after an ordered number
    symbol: u8,
    start: u32,
    /// Column where the item's content starts
    content_offset: usize,
    empty: bool,
}

impl Marker {
    fn same_list(&self, other: &Marker) -> bool {
        self.ordered == other.ordered && self.symbol == other.symbol
    }
}

#[derive(Clone, Copy, PartialEq)]
enum HtmlKind {
    /// `<script>`, `<pre>`, `<style>`, `<textarea>`: ends at the closing tag
    Raw(&'static str),
    /// `<!-- ... -->`
    Comment,
    /// Known block-level tag: ends at a blank line
    Block,
    /// Any other complete tag alone on its line: ends at a blank line
    Other,
}

/// Unify line endings, expand tabs and split into lines.
fn normalize(markdown: &str) -> Vec<String> {
    let text = markdown
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\0', "\u{FFFD}");
    text.split('\n').map(expand_tabs).collect()
}

/// Tabs advance to the next multiple-of-4 column.
fn expand_tabs(line: &str) -> String {
    if !line.contains('\t') {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len() + 8);
    let mut column = 0;
    for ch in line.chars() {
        if ch == '\t' {
            let width = 4 - column % 4;
            out.extend(std::iter::repeat_n(' ', width));
            column += width;
        } else {
            out.push(ch);
            column += 1;
        }
    }
    out
}

fn indent(line: &str) -> usize {
    line.bytes().take_while(|&b| b == b' ').count()
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Parse a container's lines into nodes.
///
/// `depth` counts the block quotes and list items around these lines.
fn parse_lines(lines: &[String], refs: &mut RefMap, depth: usize) -> Parsed {
    let mut nodes = Vec::new();
    let mut i = 0;
    let mut saw_blank = false;
    let mut gap = false;
    let mut open = false;
    let nest = depth < MAX_NESTING;

    while i < lines.len() {
        let line = &lines[i];
        if is_blank(line) {
            saw_blank = !nodes.is_empty();
            open = false;
            i += 1;
            continue;
        }
        if saw_blank {
            gap = true;
            saw_blank = false;
        }

        open = false;
        if let Some(fence) = fence_open(line) {
            i = parse_fenced_code(lines, i, &fence, &mut nodes);
        } else if is_thematic_break(line) {
            nodes.push(Node::Rule);
            i += 1;
        } else if let Some((level, text)) = atx_heading(line) {
            nodes.push(Node::Heading { level, text });
            i += 1;
        } else if nest && strip_quote_marker(line).is_some() {
            (i, open) = parse_quote(lines, i, &mut nodes, refs, depth + 1);
        } else if let Some(marker) = list_marker(line).filter(|_| nest) {
            (i, open) = parse_list(lines, i, marker, &mut nodes, refs, depth + 1);
        } else if indent(line) >= 4 {
            i = parse_indented_code(lines, i, &mut nodes);
        } else if let Some(kind) = html_block_start(line) {
            i = parse_html_block(lines, i, kind, &mut nodes);
        } else if is_table_start(lines, i) {
            i = parse_table(lines, i, &mut nodes);
        } else {
            (i, open) = parse_paragraph(lines, i, &mut nodes, refs);
        }
    }

    Parsed { nodes, gap, open }
}

/// Whether a line ends an open paragraph by starting another block.
fn interrupts_paragraph(line: &str) -> bool {
    fence_open(line).is_some()
        || is_thematic_break(line)
        || atx_heading(line).is_some()
        || strip_quote_marker(line).is_some()
        || list_marker(line).is_some_and(|m| !m.empty && (!m.ordered || m.start == 1))
        || html_block_start(line).is_some_and(|kind| kind != HtmlKind::Other)
}

fn fence_open(line: &str) -> Option<Fence> {
    let indent = indent(line);
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];
    let ch = *rest.as_bytes().first()?;
    if ch != b'`' && ch != b'~' {
        return None;
    }
    let len = rest.bytes().take_while(|&b| b == ch).count();
    if len < 3 {
        return None;
    }
    let info = rest[len..].trim();
    if ch == b'`' && info.contains('`') {
        return None;
    }
    Some(Fence {
        ch,
        len,
        indent,
        info: info.to_string(),
    })
}

fn is_fence_close(line: &str, fence: &Fence) -> bool {
    let indent = indent(line);
    if indent > 3 {
        return false;
    }
    let rest = &line[indent..];
    let len = rest.bytes().take_while(|&b| b == fence.ch).count();
    len >= fence.len && rest[len..].trim().is_empty()
}

fn parse_fenced_code(lines: &[String], start: usize, fence: &Fence, nodes: &mut Vec<Node>) -> usize {
    let mut content = String::new();
    let mut i = start + 1;
    while i < lines.len() {
        let line = &lines[i];
        i += 1;
        if is_fence_close(line, fence) {
            break;
        }
        let strip = indent(line).min(fence.indent);
        content.push_str(&line[strip..]);
        content.push('\n');
    }

    let language = fence
        .info
        .split_whitespace()
        .next()
        .map(inline::unescape);
    nodes.push(Node::Code { language, content });
    i
}

fn is_thematic_break(line: &str) -> bool {
    if indent(line) > 3 {
        return false;
    }
    let rest = line.trim();
    let Some(ch) = rest.chars().next() else {
        return false;
    };
    if !matches!(ch, '-' | '_' | '*') {
        return false;
    }
    let mut count = 0;
    for c in rest.chars() {
        if c == ch {
            count += 1;
        } else if c != ' ' {
            return false;
        }
    }
    count >= 3
}

fn atx_heading(line: &str) -> Option<(u8, String)> {
    let indent = indent(line);
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];
    let level = rest.bytes().take_while(|&b| b == b'#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let after = &rest[level..];
    if !after.is_empty() && !after.starts_with(' ') {
        return None;
    }

    let mut text = after.trim();
    // Optional closing sequence: `## Title ##`
    let without_hashes = text.trim_end_matches('#');
    if without_hashes.is_empty() {
        text = "";
    } else if without_hashes.ends_with(' ') {
        text = without_hashes.trim_end();
    }
    Some((level as u8, text.to_string()))
}

fn setext_underline(line: &str) -> Option<u8> {
    if indent(line) > 3 {
        return None;
    }
    let rest = line.trim();
    if !rest.is_empty() && rest.bytes().all(|b| b == b'=') {
        Some(1)
    } else if !rest.is_empty() && rest.bytes().all(|b| b == b'-') {
        Some(2)
    } else {
        None
    }
}

/// Content of a `>` line with the marker and one following space removed.
fn strip_quote_marker(line: &str) -> Option<&str> {
    let indent = indent(line);
    if indent > 3 {
        return None;
    }
    let rest = line[indent..].strip_prefix('>')?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

fn parse_quote(
    lines: &[String],
    start: usize,
    nodes: &mut Vec<Node>,
    refs: &mut RefMap,
    depth: usize,
) -> (usize, bool) {
    let mut inner: Vec<String> = Vec::new();
    let mut lazy = LazyState::default();
    let mut i = start;
    while i < lines.len() {
        let line = &lines[i];
        if let Some(rest) = strip_quote_marker(line) {
            inner.push(rest.to_string());
            lazy.reset();
        } else if lazy.accepts(&inner, line, depth) {
            inner.push(line.trim_start().to_string());
        } else {
            break;
        }
        i += 1;
    }

    let parsed = parse_lines(&inner, refs, depth);
    nodes.push(Node::Quote(parsed.nodes));
    (i, parsed.open)
}

/// Decides whether a line without the container's marker continues the
/// container lazily.
///
/// That is only allowed when the container's content so far ends in an open
/// paragraph. The answer stays valid until a line with the marker is added.
#[derive(Default)]
struct LazyState {
    open: Option<bool>,
}

impl LazyState {
    fn reset(&mut self) {
        self.open = None;
    }

    fn accepts(&mut self, container: &[String], line: &str, depth: usize) -> bool {
        if container.is_empty()
            || is_blank(line)
            || interrupts_paragraph(line)
            || list_marker(line).is_some()
        {
            return false;
        }
        *self
            .open
            .get_or_insert_with(|| parse_lines(container, &mut RefMap::new(), depth).open)
    }
}

fn list_marker(line: &str) -> Option<Marker> {
    let marker_indent = indent(line);
    if marker_indent > 3 {
        return None;
    }
    let rest = &line[marker_indent..];
    let bytes = rest.as_bytes();

    let (ordered, symbol, start, marker_len) = match bytes.first()? {
        b @ (b'-' | b'+' | b'*') => (false, *b, 1, 1),
        b if b.is_ascii_digit() => {
            let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
            if digits > 9 {
                return None;
            }
            let delimiter = *bytes.get(digits)?;
            if delimiter != b'.' && delimiter != b')' {
                return None;
            }
            let start = rest[..digits].parse().ok()?;
            (true, delimiter, start, digits + 1)
        }
        _ => return None,
    };

    let after = &rest[marker_len..];
    if !after.is_empty() && !after.starts_with(' ') {
        return None;
    }
    let marker_end = marker_indent + marker_len;
    let spaces = indent(after);
    let empty = after.trim().is_empty();
    let content_offset = if empty || spaces > 4 {
        marker_end + 1
    } else {
        marker_end + spaces
    };

    Some(Marker {
        ordered,
        symbol,
        start,
        content_offset,
        empty,
    })
}

fn parse_list(
    lines: &[String],
    start: usize,
    first: Marker,
    nodes: &mut Vec<Node>,
    refs: &mut RefMap,
    depth: usize,
) -> (usize, bool) {
    let mut items = Vec::new();
    let mut tight = true;
    let mut open = false;
    let mut i = start;
    let mut marker = first;

    loop {
        let first_line = &lines[i];
        let mut item_lines = vec![first_line.get(marker.content_offset..).unwrap_or("").to_string()];
        let mut lazy = LazyState::default();
        i += 1;

        while i < lines.len() {
            let line = &lines[i];
            if is_blank(line) {
                item_lines.push(String::new());
                lazy.reset();
            } else if indent(line) >= marker.content_offset {
                item_lines.push(line[marker.content_offset..].to_string());
                lazy.reset();
            } else if list_marker(line).is_some_and(|next| next.same_list(&first)) {
                // A sibling marker always starts the next item
                break;
            } else if lazy.accepts(&item_lines, line, depth) {
                item_lines.push(line.trim_start().to_string());
            } else {
                break;
            }
            i += 1;
        }

        // Trailing blank lines belong to whatever comes after the item
        let trailing = item_lines[1..].iter().rev().take_while(|l| is_blank(l)).count();
        item_lines.truncate(item_lines.len() - trailing);

        let parsed = parse_lines(&item_lines, refs, depth);
        if parsed.gap {
            tight = false;
        }
        open = parsed.open && trailing == 0;
        let mut children = parsed.nodes;
        let checked = take_task_marker(&mut children);
        items.push(ItemNode { children, checked });

        let next = lines
            .get(i)
            .filter(|line| !is_thematic_break(line))
            .and_then(|line| list_marker(line))
            .filter(|next| next.same_list(&first));
        match next {
            Some(next) => {
                if trailing > 0 {
                    tight = false;
                }
                marker = next;
            }
            None => {
                i -= trailing;
                break;
            }
        }
    }

    nodes.push(Node::List {
        ordered: first.ordered,
        start: first.start,
        tight,
        items,
    });
    (i, open)
}

/// Strip a leading `[ ]`/`[x]` from an item's first paragraph.
fn take_task_marker(children: &mut [Node]) -> Option<bool> {
    let Some(Node::Paragraph(text)) = children.first_mut() else {
        return None;
    };
    let checked = match text.get(..4)? {
        "[ ] " => false,
        "[x] " | "[X] " => true,
        _ => return None,
    };
    text.replace_range(..4, "");
    Some(checked)
}

fn parse_indented_code(lines: &[String], start: usize, nodes: &mut Vec<Node>) -> usize {
    let mut code_lines: Vec<&str> = Vec::new();
    let mut i = start;
    while i < lines.len() {
        let line = &lines[i];
        if is_blank(line) {
            code_lines.push(line.get(4..).unwrap_or(""));
        } else if indent(line) >= 4 {
            code_lines.push(&line[4..]);
        } else {
            break;
        }
        i += 1;
    }

    let trailing = code_lines.iter().rev().take_while(|l| is_blank(l)).count();
    code_lines.truncate(code_lines.len() - trailing);

    let mut content = code_lines.join("\n");
    content.push('\n');
    nodes.push(Node::Code {
        language: None,
        content,
    });
    i - trailing
}

fn html_block_start(line: &str) -> Option<HtmlKind> {
    let indent = indent(line);
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];
    if !rest.starts_with('<') {
        return None;
    }
    if rest.starts_with("<!--") {
        return Some(HtmlKind::Comment);
    }

    let lower = rest.to_ascii_lowercase();
    let tag_ends = |after: &str| {
        after.is_empty()
            || after.starts_with(' ')
            || after.starts_with('>')
            || after.starts_with("/>")
    };

    for tag in HTML_RAW_TAGS {
        if let Some(after) = lower[1..].strip_prefix(tag) {
            if tag_ends(after) {
                return Some(HtmlKind::Raw(*tag));
            }
        }
    }

    let name_start = if lower[1..].starts_with('/') { 2 } else { 1 };
    let name_len = lower[name_start..]
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric())
        .count();
    let name = &lower[name_start..name_start + name_len];
    if HTML_BLOCK_TAGS.contains(&name) && tag_ends(&lower[name_start + name_len..]) {
        return Some(HtmlKind::Block);
    }

    match inline::scan_tag(rest.as_bytes()) {
        Some(len) if rest[len..].trim().is_empty() => Some(HtmlKind::Other),
        _ => None,
    }
}

fn parse_html_block(lines: &[String], start: usize, kind: HtmlKind, nodes: &mut Vec<Node>) -> usize {
    let mut html = String::new();
    let mut i = start;
    while i < lines.len() {
        let line = &lines[i];
        html.push_str(line);
        html.push('\n');
        i += 1;

        let done = match kind {
            HtmlKind::Raw(tag) => line.to_ascii_lowercase().contains(&format!("</{tag}>")),
            HtmlKind::Comment => line.contains("-->"),
            HtmlKind::Block | HtmlKind::Other => lines.get(i).is_none_or(|next| is_blank(next)),
        };
        if done {
            break;
        }
    }
    nodes.push(Node::Html(html));
    i
}

/// Split a table row on unescaped pipes, dropping the outer ones.
fn split_row(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let trimmed = match trimmed.strip_suffix('|') {
        Some(inner) if !inner.ends_with('\\') => inner,
        _ => trimmed,
    };

    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut chars = trimmed.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                cell.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut cell).trim().to_string()),
            _ => cell.push(c),
        }
    }
    cells.push(cell.trim().to_string());
    cells
}

fn has_unescaped_pipe(line: &str) -> bool {
    let bytes = line.as_bytes();
    bytes
        .iter()
        .enumerate()
        .any(|(i, &b)| b == b'|' && (i == 0 || bytes[i - 1] != b'\\'))
}

fn delimiter_row(line: &str) -> Option<Vec<Alignment>> {
    if !line.contains('-') {
        return None;
    }
    split_row(line)
        .iter()
        .map(|cell| {
            let left = cell.starts_with(':');
            let right = cell.ends_with(':');
            let dashes = cell.trim_start_matches(':').trim_end_matches(':');
            if dashes.is_empty() || !dashes.bytes().all(|b| b == b'-') {
                return None;
            }
            Some(match (left, right) {
                (true, true) => Alignment::Center,
                (true, false) => Alignment::Left,
                (false, true) => Alignment::Right,
                (false, false) => Alignment::None,
            })
        })
        .collect()
}

fn is_table_start(lines: &[String], i: usize) -> bool {
    let header = &lines[i];
    if indent(header) > 3 || !has_unescaped_pipe(header) {
        return false;
    }
    let Some(alignments) = lines.get(i + 1).and_then(|line| delimiter_row(line)) else {
        return false;
    };
    alignments.len() == split_row(header).len()
}

fn parse_table(lines: &[String], start: usize, nodes: &mut Vec<Node>) -> usize {
    let headers = split_row(&lines[start]);
    let alignments = delimiter_row(&lines[start + 1]).unwrap_or_default();
    let mut rows = Vec::new();
    let mut i = start + 2;
    while i < lines.len() {
        let line = &lines[i];
        if is_blank(line) || interrupts_paragraph(line) {
            break;
        }
        let mut cells = split_row(line);
        cells.resize(headers.len(), String::new());
        rows.push(cells);
        i += 1;
    }
    nodes.push(Node::Table {
        alignments,
        headers,
        rows,
    });
    i
}

/// Returns the next line and whether the paragraph is still open there.
fn parse_paragraph(
    lines: &[String],
    start: usize,
    nodes: &mut Vec<Node>,
    refs: &mut RefMap,
) -> (usize, bool) {
    let mut text_lines = vec![lines[start].trim_start()];
    let mut i = start + 1;

    while i < lines.len() {
        let line = &lines[i];
        if is_blank(line) {
            break;
        }
        if let Some(level) = setext_underline(line) {
            let text = take_ref_defs(&text_lines.join("\n"), refs);
            if text.is_empty() {
                return (i, false);
            }
            nodes.push(Node::Heading { level, text });
            return (i + 1, false);
        }
        if interrupts_paragraph(line) || is_table_start(lines, i) {
            break;
        }
        text_lines.push(line.trim_start());
        i += 1;
    }

    let text = take_ref_defs(&text_lines.join("\n"), refs);
    if text.is_empty() {
        return (i, false);
    }
    nodes.push(Node::Paragraph(text));
    (i, true)
}

/// Record reference definitions at the start of a paragraph and return the
/// remaining text, trimmed.
fn take_ref_defs(text: &str, refs: &mut RefMap) -> String {
    let mut rest = text;
    while let Some((label, target, consumed)) = inline::parse_ref_def(rest) {
        // First definition of a label wins
        refs.entry(label).or_insert(target);
        rest = &rest[consumed..];
    }
    rest.trim().to_string()
}

fn build(nodes: Vec<Node>, ctx: &InlineContext<'_>) -> Vec<Block> {
    nodes.into_iter().map(|node| build_block(node, ctx)).collect()
}

fn build_block(node: Node, ctx: &InlineContext<'_>) -> Block {
    match node {
        Node::Paragraph(text) => Block::Paragraph {
            content: inline::parse_inline(&text, ctx),
        },
        Node::Heading { level, text } => Block::Heading {
            level,
            content: inline::parse_inline(&text, ctx),
        },
        Node::Code { language, content } => Block::CodeBlock { language, content },
        Node::Html(html) => Block::Html(html),
        Node::Rule => Block::Rule,
        Node::Quote(children) => Block::BlockQuote(Document::new(build(children, ctx))),
        Node::List {
            ordered,
            start,
            tight,
            items,
        } => Block::List(List {
            ordered,
            start,
            tight,
            items: items
                .into_iter()
                .map(|item| ListItem {
                    blocks: build(item.children, ctx),
                    checked: item.checked,
                })
                .collect(),
        }),
        Node::Table {
            alignments,
            headers,
            rows,
        } => Block::Table(Table {
            alignments,
            headers: headers
                .iter()
                .map(|cell| inline::parse_inline(cell, ctx))
                .collect(),
            rows: rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|cell| inline::parse_inline(cell, ctx))
                        .collect()
                })
                .collect(),
        }),
    }
}
