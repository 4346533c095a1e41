//! Span-level parsing of a block's text.
//!
//! One left-to-right scan produces a flat list of pieces: finished inline
//! nodes, `*`/`_`/`~` delimiter runs and `[`/`![` bracket markers. Brackets
//! are resolved into links as soon as their `]` shows up; delimiter runs are
//! paired into emphasis at the end (and inside each link's text when the link
//! closes). Anything that never pairs up falls back to literal text.

use std::collections::HashMap;

use crate::block::Inline;
use crate::math::{self, Delimiter};

/// Emphasis deeper than this stays literal, keeping the tree shallow enough
/// to render recursively.
const MAX_INLINE_NESTING: usize = 64;

/// Schemes accepted in `<scheme:...>` autolinks.
const AUTOLINK_SCHEMES: &[&str] = &[
    "http", "https", "ftp", "ftps", "mailto", "tel", "irc", "ircs", "news", "git", "ssh", "sftp",
];

/// A link reference definition, `[label]: url "title"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRef {
    pub url: String,
    pub title: Option<String>,
}

/// Reference definitions keyed by normalized label.
pub type RefMap = HashMap<String, LinkRef>;

/// Everything inline parsing needs from outside the block being parsed.
#[derive(Debug, Clone, Copy)]
pub struct InlineContext<'a> {
    pub refs: &'a RefMap,
    pub delimiters: &'a [Delimiter],
}

/// Case-fold a link label and collapse its internal whitespace.
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Parse one block's text into inline nodes.
pub fn parse_inline(text: &str, ctx: &InlineContext<'_>) -> Vec<Inline> {
    let mut scanner = Scanner::new(text, ctx);
    scanner.run();
    scanner.flush_text();
    finish(scanner.pieces).0
}

#[derive(Debug)]
struct Delim {
    ch: u8,
    count: usize,
    /// Run length before any characters were consumed by matches
    orig: usize,
    can_open: bool,
    can_close: bool,
}

#[derive(Debug)]
enum Piece {
    /// A finished node and how deeply its children nest
    Node(Inline, usize),
    Delim(Delim),
    Bracket {
        image: bool,
        active: bool,
        /// Byte offset of the bracket's text in the source
        start: usize,
    },
}

struct Scanner<'t, 'c> {
    text: &'t str,
    bytes: &'t [u8],
    pos: usize,
    pieces: Vec<Piece>,
    /// Indices into `pieces` of brackets still waiting for a `]`
    brackets: Vec<usize>,
    pending: String,
    ctx: &'c InlineContext<'c>,
}

impl<'t, 'c> Scanner<'t, 'c> {
    fn new(text: &'t str, ctx: &'c InlineContext<'c>) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
            pieces: Vec::new(),
            brackets: Vec::new(),
            pending: String::new(),
            ctx,
        }
    }

    fn run(&mut self) {
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];

            if self.starts_math(b) {
                if let Some(len) = math::match_span(self.text, self.pos, self.ctx.delimiters) {
                    // Opaque: the typesetter needs the exact source bytes
                    self.pending.push_str(&self.text[self.pos..self.pos + len]);
                    self.pos += len;
                    continue;
                }
            }

            match b {
                b'\n' => self.handle_newline(),
                b'\\' => self.handle_backslash(),
                b'`' => self.handle_backticks(),
                b'*' | b'_' => self.handle_delim(b),
                b'~' => self.handle_tilde(),
                b'[' => self.push_bracket(false, 1),
                b'!' if self.bytes.get(self.pos + 1) == Some(&b'[') => self.push_bracket(true, 2),
                b']' => self.handle_close_bracket(),
                b'<' => self.handle_angle(),
                b'@' => self.handle_at(),
                b'h' | b'f' | b'w' => {
                    if !self.handle_bare_url() {
                        self.pending.push(b as char);
                        self.pos += 1;
                    }
                }
                _ => self.push_plain(),
            }
        }
    }

    fn starts_math(&self, b: u8) -> bool {
        self.ctx
            .delimiters
            .iter()
            .any(|d| d.left.as_bytes().first() == Some(&b))
    }

    fn is_special(&self, b: u8) -> bool {
        matches!(
            b,
            b'\n' | b'\\' | b'`' | b'*' | b'_' | b'~' | b'[' | b']' | b'!' | b'<' | b'@' | b'h'
                | b'f' | b'w'
        ) || self.starts_math(b)
    }

    /// Copy a run of ordinary text into the pending buffer.
    fn push_plain(&mut self) {
        let start = self.pos;
        self.pos += 1;
        while self.pos < self.bytes.len() && !self.is_special(self.bytes[self.pos]) {
            self.pos += 1;
        }
        // Never end the run inside a UTF-8 sequence
        while !self.text.is_char_boundary(self.pos) {
            self.pos += 1;
        }
        self.pending.push_str(&self.text[start..self.pos]);
    }

    fn flush_text(&mut self) {
        if !self.pending.is_empty() {
            let text = std::mem::take(&mut self.pending);
            self.pieces.push(Piece::Node(Inline::Text(text), 0));
        }
    }

    fn push_node(&mut self, inline: Inline) {
        self.flush_text();
        self.pieces.push(Piece::Node(inline, 0));
    }

    fn skip_spaces(&mut self) {
        while self.bytes.get(self.pos) == Some(&b' ') {
            self.pos += 1;
        }
    }

    fn handle_newline(&mut self) {
        let trimmed = self.pending.trim_end_matches(' ').len();
        let hard = self.pending.len() - trimmed >= 2;
        self.pending.truncate(trimmed);
        self.push_node(if hard {
            Inline::LineBreak
        } else {
            Inline::SoftBreak
        });
        self.pos += 1;
        self.skip_spaces();
    }

    fn handle_backslash(&mut self) {
        match self.bytes.get(self.pos + 1) {
            Some(b'\n') => {
                self.push_node(Inline::LineBreak);
                self.pos += 2;
                self.skip_spaces();
            }
            Some(&next) if next.is_ascii_punctuation() => {
                self.pending.push(next as char);
                self.pos += 2;
            }
            _ => {
                self.pending.push('\\');
                self.pos += 1;
            }
        }
    }

    fn handle_backticks(&mut self) {
        let start = self.pos;
        let run = count_run(self.bytes, start, b'`');
        let body_start = start + run;

        let mut search = body_start;
        while search < self.bytes.len() {
            if self.bytes[search] != b'`' {
                search += 1;
                continue;
            }
            let closing = count_run(self.bytes, search, b'`');
            if closing == run {
                let code = normalize_code_span(&self.text[body_start..search]);
                self.push_node(Inline::Code(code));
                self.pos = search + closing;
                return;
            }
            search += closing;
        }

        // No matching run: the backticks are literal
        self.pending.push_str(&self.text[start..body_start]);
        self.pos = body_start;
    }

    fn flanking(&self, start: usize, len: usize) -> (bool, bool, char, char) {
        let before = self.text[..start].chars().next_back().unwrap_or('\n');
        let after = self.text[start + len..].chars().next().unwrap_or('\n');
        let left = !after.is_whitespace()
            && (!is_punctuation(after) || before.is_whitespace() || is_punctuation(before));
        let right = !before.is_whitespace()
            && (!is_punctuation(before) || after.is_whitespace() || is_punctuation(after));
        (left, right, before, after)
    }

    fn handle_delim(&mut self, ch: u8) {
        let run = count_run(self.bytes, self.pos, ch);
        let (left, right, before, after) = self.flanking(self.pos, run);
        let (can_open, can_close) = if ch == b'_' {
            (
                left && (!right || is_punctuation(before)),
                right && (!left || is_punctuation(after)),
            )
        } else {
            (left, right)
        };

        self.flush_text();
        self.pieces.push(Piece::Delim(Delim {
            ch,
            count: run,
            orig: run,
            can_open,
            can_close,
        }));
        self.pos += run;
    }

    fn handle_tilde(&mut self) {
        let run = count_run(self.bytes, self.pos, b'~');
        if run != 2 {
            self.pending.push_str(&self.text[self.pos..self.pos + run]);
            self.pos += run;
            return;
        }
        let (left, right, _, _) = self.flanking(self.pos, run);
        self.flush_text();
        self.pieces.push(Piece::Delim(Delim {
            ch: b'~',
            count: run,
            orig: run,
            can_open: left,
            can_close: right,
        }));
        self.pos += run;
    }

    fn push_bracket(&mut self, image: bool, len: usize) {
        self.flush_text();
        self.brackets.push(self.pieces.len());
        self.pieces.push(Piece::Bracket {
            image,
            active: true,
            start: self.pos + len,
        });
        self.pos += len;
    }

    fn handle_close_bracket(&mut self) {
        let Some(opener) = self.brackets.pop() else {
            self.pending.push(']');
            self.pos += 1;
            return;
        };
        let Piece::Bracket {
            image,
            active,
            start,
        } = self.pieces[opener]
        else {
            self.pending.push(']');
            self.pos += 1;
            return;
        };
        if !active {
            self.pending.push(']');
            self.pos += 1;
            return;
        }

        let label = &self.text[start..self.pos];
        let Some((url, title, end)) = self.link_target(self.pos + 1, label) else {
            self.pending.push(']');
            self.pos += 1;
            return;
        };

        self.flush_text();
        let inner: Vec<Piece> = self.pieces.drain(opener + 1..).collect();
        self.pieces.pop();
        let (content, depth) = finish(inner);

        if image {
            let alt = content.iter().map(Inline::plain_text).collect();
            self.pieces
                .push(Piece::Node(Inline::Image { url, alt, title }, 0));
        } else {
            self.pieces.push(Piece::Node(
                Inline::Link {
                    url,
                    title,
                    content,
                },
                depth + 1,
            ));
            // Links may not contain other links
            for &index in &self.brackets {
                if let Piece::Bracket {
                    image: false,
                    active,
                    ..
                } = &mut self.pieces[index]
                {
                    *active = false;
                }
            }
        }
        self.pos = end;
    }

    /// Resolve what follows a `]`: an inline `(dest "title")`, a `[ref]`,
    /// a collapsed `[]` or a shortcut reference.
    fn link_target(&self, at: usize, label: &str) -> Option<(String, Option<String>, usize)> {
        match self.bytes.get(at) {
            Some(b'(') => {
                if let Some(found) = parse_inline_link(self.text, at) {
                    return Some(found);
                }
            }
            Some(b'[') => {
                let close = find_label_end(self.bytes, at + 1)?;
                let inner = &self.text[at + 1..close];
                let key = if inner.trim().is_empty() { label } else { inner };
                return self
                    .lookup(key)
                    .map(|found| (found.url.clone(), found.title.clone(), close + 1));
            }
            _ => {}
        }
        self.lookup(label)
            .map(|found| (found.url.clone(), found.title.clone(), at))
    }

    fn lookup(&self, label: &str) -> Option<&LinkRef> {
        if label.trim().is_empty() {
            return None;
        }
        self.ctx.refs.get(&normalize_label(label))
    }

    fn handle_angle(&mut self) {
        let rest = &self.text[self.pos..];
        if let Some((url, email, len)) = scan_autolink(rest) {
            self.push_node(Inline::Autolink { url, email });
            self.pos += len;
        } else if let Some(len) = scan_html_span(rest) {
            self.push_node(Inline::Html(rest[..len].to_string()));
            self.pos += len;
        } else {
            self.pending.push('<');
            self.pos += 1;
        }
    }

    /// Bare `user@example.com` in running text.
    fn handle_at(&mut self) {
        let local_len = self
            .pending
            .bytes()
            .rev()
            .take_while(|b| b.is_ascii_alphanumeric() || b"._+-".contains(b))
            .count();
        let domain_len = scan_domain(&self.bytes[self.pos + 1..]);

        if local_len == 0 || domain_len == 0 || !self.brackets.is_empty() {
            self.pending.push('@');
            self.pos += 1;
            return;
        }

        let split = self.pending.len() - local_len;
        let local = self.pending.split_off(split);
        let domain = &self.text[self.pos + 1..self.pos + 1 + domain_len];
        self.push_node(Inline::Autolink {
            url: format!("{local}@{domain}"),
            email: true,
        });
        self.pos += 1 + domain_len;
    }

    /// Bare `http://`, `https://`, `ftp://` and `www.` links.
    fn handle_bare_url(&mut self) -> bool {
        if !self.brackets.is_empty() {
            return false;
        }
        let before = self.text[..self.pos].chars().next_back();
        if !matches!(before, None | Some('(' | '*' | '_' | '~')) && !before.is_some_and(char::is_whitespace) {
            return false;
        }

        let rest = &self.text[self.pos..];
        let prefix = ["https://", "http://", "ftp://", "www."]
            .into_iter()
            .find(|prefix| {
                rest.len() > prefix.len()
                    && rest.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
            });
        let Some(prefix) = prefix else {
            return false;
        };

        let end = rest
            .find(|c: char| c.is_whitespace() || c == '<')
            .unwrap_or(rest.len());
        let len = trim_url_end(&rest[..end]);
        if len <= prefix.len() || scan_domain(&rest.as_bytes()[prefix.len()..len]) == 0 {
            return false;
        }

        self.push_node(Inline::Autolink {
            url: rest[..len].to_string(),
            email: false,
        });
        self.pos += len;
        true
    }
}

/// Pair delimiter runs into emphasis, then turn leftovers into text.
///
/// Also returns the nesting depth of the resulting nodes.
fn finish(mut pieces: Vec<Piece>) -> (Vec<Inline>, usize) {
    process_emphasis(&mut pieces);
    let depth = nesting_depth(&pieces);
    let mut out: Vec<Inline> = Vec::with_capacity(pieces.len());
    for piece in pieces {
        let inline = match piece {
            Piece::Node(inline, _) => inline,
            Piece::Delim(delim) => Inline::Text((delim.ch as char).to_string().repeat(delim.count)),
            Piece::Bracket { image: true, .. } => Inline::Text("![".to_string()),
            Piece::Bracket { image: false, .. } => Inline::Text("[".to_string()),
        };
        if let Inline::Text(text) = &inline {
            if text.is_empty() {
                continue;
            }
            if let Some(Inline::Text(last)) = out.last_mut() {
                last.push_str(text);
                continue;
            }
        }
        out.push(inline);
    }
    (out, depth)
}

fn nesting_depth(pieces: &[Piece]) -> usize {
    pieces
        .iter()
        .map(|piece| match piece {
            Piece::Node(_, depth) => *depth,
            _ => 0,
        })
        .max()
        .unwrap_or(0)
}

fn process_emphasis(pieces: &mut Vec<Piece>) {
    let mut closer = 0;
    // Openers below this index would wrap a node already at the nesting limit
    let mut floor = 0;
    // Lowest index still worth searching for each kind of closer
    let mut bottoms: HashMap<(u8, usize, bool), usize> = HashMap::new();
    while closer < pieces.len() {
        let (ch, closer_orig, closer_count, closer_opens) = match &pieces[closer] {
            Piece::Delim(d) if d.can_close && d.count > 0 => (d.ch, d.orig, d.count, d.can_open),
            _ => {
                closer += 1;
                continue;
            }
        };

        let kind = if ch == b'~' {
            (ch, closer_count, closer_opens)
        } else {
            (ch, closer_orig % 3, closer_opens)
        };
        let bottom = bottoms.get(&kind).copied().unwrap_or(0).max(floor);
        let opener = (bottom..closer).rev().find(|&i| match &pieces[i] {
            Piece::Delim(o) if o.ch == ch && o.can_open && o.count > 0 => {
                if ch == b'~' {
                    o.count == closer_count
                } else {
                    let multiple_of_three = (o.orig + closer_orig) % 3 == 0
                        && !(o.orig % 3 == 0 && closer_orig % 3 == 0);
                    !((o.can_close || closer_opens) && multiple_of_three)
                }
            }
            _ => false,
        });
        let Some(opener) = opener else {
            bottoms.insert(kind, closer);
            closer += 1;
            continue;
        };
        if nesting_depth(&pieces[opener + 1..closer]) >= MAX_INLINE_NESTING {
            floor = opener + 1;
            closer += 1;
            continue;
        }

        let opener_count = match &pieces[opener] {
            Piece::Delim(o) => o.count,
            _ => 0,
        };
        let used = if ch == b'~' || (opener_count >= 2 && closer_count >= 2) {
            2
        } else {
            1
        };

        let inner: Vec<Piece> = pieces.drain(opener + 1..closer).collect();
        let (content, depth) = finish(inner);
        let node = match (ch, used) {
            (b'~', _) => Inline::Strikethrough(content),
            (_, 2) => Inline::Strong(content),
            _ => Inline::Emphasis(content),
        };
        pieces.insert(opener + 1, Piece::Node(node, depth + 1));
        closer = opener + 2;
        // Pieces above the opener moved
        for bottom in bottoms.values_mut() {
            *bottom = (*bottom).min(opener);
        }

        if let Piece::Delim(c) = &mut pieces[closer] {
            c.count -= used;
        }
        if let Piece::Delim(o) = &mut pieces[opener] {
            o.count -= used;
        }
        if matches!(&pieces[closer], Piece::Delim(c) if c.count == 0) {
            pieces.remove(closer);
        }
        if matches!(&pieces[opener], Piece::Delim(o) if o.count == 0) {
            pieces.remove(opener);
            closer -= 1;
        }
    }
}

fn count_run(bytes: &[u8], start: usize, ch: u8) -> usize {
    bytes[start..].iter().take_while(|&&b| b == ch).count()
}

fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation() || (!c.is_ascii() && !c.is_alphanumeric() && !c.is_whitespace())
}

/// Line endings become spaces; one surrounding space is stripped from each
/// side when both are present and the span is not all spaces.
fn normalize_code_span(raw: &str) -> String {
    let code = raw.replace('\n', " ");
    if code.len() >= 2
        && code.starts_with(' ')
        && code.ends_with(' ')
        && code.bytes().any(|b| b != b' ')
    {
        code[1..code.len() - 1].to_string()
    } else {
        code
    }
}

/// Remove backslashes in front of ASCII punctuation.
pub(crate) fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if next.is_ascii_punctuation() {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// Parse a link reference definition at the start of `text`.
///
/// Returns the normalized label, the target and the number of bytes consumed
/// (including the line ending).
pub(crate) fn parse_ref_def(text: &str) -> Option<(String, LinkRef, usize)> {
    let bytes = text.as_bytes();
    if bytes.first() != Some(&b'[') {
        return None;
    }
    let close = find_label_end(bytes, 1)?;
    let label = &text[1..close];
    if label.trim().is_empty() || bytes.get(close + 1) != Some(&b':') {
        return None;
    }

    let (start, _) = skip_whitespace(bytes, close + 2);
    let (dest_start, dest_end, next) = scan_destination(bytes, start)?;
    if dest_start == dest_end {
        return None;
    }
    let url = unescape(strip_angle(&text[dest_start..dest_end]));

    let line_end = |from: usize| text[from..].find('\n').map_or(text.len(), |n| from + n);
    let consumed = |end: usize| if end < text.len() { end + 1 } else { end };

    let (title_start, had_space) = skip_whitespace(bytes, next);
    if had_space {
        if let Some((title_end, raw)) = scan_title(text, title_start) {
            let end = line_end(title_end);
            if text[title_end..end].trim().is_empty() {
                let target = LinkRef {
                    url,
                    title: Some(unescape(raw)),
                };
                return Some((normalize_label(label), target, consumed(end)));
            }
        }
    }

    let end = line_end(next);
    if !text[next..end].trim().is_empty() {
        return None;
    }
    let target = LinkRef { url, title: None };
    Some((normalize_label(label), target, consumed(end)))
}

/// Position of the `]` closing a link label that starts at `from`.
fn find_label_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut i = from;
    while i < bytes.len() && i - from < 1000 {
        match bytes[i] {
            b'\\' => i += 2,
            b'[' => return None,
            b']' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> (usize, bool) {
    let start = i;
    let mut newlines = 0;
    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' => i += 1,
            b'\n' if newlines == 0 => {
                newlines += 1;
                i += 1;
            }
            _ => break,
        }
    }
    (i, i > start)
}

/// Parse `(dest "title")` starting at the `(`.
///
/// The destination is scanned up to the nearest balanced closing paren.
/// Returns the unescaped destination, the title and the offset past `)`.
fn parse_inline_link(text: &str, open: usize) -> Option<(String, Option<String>, usize)> {
    let bytes = text.as_bytes();
    let (mut i, _) = skip_whitespace(bytes, open + 1);

    let (dest_start, dest_end, after_dest) = scan_destination(bytes, i)?;
    let dest = unescape(strip_angle(&text[dest_start..dest_end]));
    i = after_dest;

    let (after_space, had_space) = skip_whitespace(bytes, i);
    i = after_space;
    let mut title = None;
    if had_space {
        if let Some((title_end, raw)) = scan_title(text, i) {
            title = Some(unescape(raw));
            i = skip_whitespace(bytes, title_end).0;
        }
    }

    if bytes.get(i) == Some(&b')') {
        Some((dest, title, i + 1))
    } else {
        None
    }
}

fn strip_angle(dest: &str) -> &str {
    dest.strip_prefix('<')
        .and_then(|d| d.strip_suffix('>'))
        .unwrap_or(dest)
}

/// Returns `(start, end, next)` of a link destination.
fn scan_destination(bytes: &[u8], start: usize) -> Option<(usize, usize, usize)> {
    if bytes.get(start) == Some(&b'<') {
        let mut i = start + 1;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => i += 2,
                b'\n' | b'<' => return None,
                b'>' => return Some((start, i + 1, i + 1)),
                _ => i += 1,
            }
        }
        return None;
    }

    let mut depth = 0usize;
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if bytes.get(i + 1).is_some_and(u8::is_ascii_punctuation) => i += 2,
            b'(' => {
                depth += 1;
                i += 1;
            }
            b')' if depth == 0 => break,
            b')' => {
                depth -= 1;
                i += 1;
            }
            b if b <= b' ' => break,
            _ => i += 1,
        }
    }
    if depth != 0 {
        return None;
    }
    Some((start, i.min(bytes.len()), i.min(bytes.len())))
}

/// Returns the offset past the closing quote and the raw title text.
fn scan_title(text: &str, start: usize) -> Option<(usize, &str)> {
    let bytes = text.as_bytes();
    let close = match bytes.get(start)? {
        b'"' => b'"',
        b'\'' => b'\'',
        b'(' => b')',
        _ => return None,
    };
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == close => return Some((i + 1, &text[start + 1..i])),
            b'(' if close == b')' => return None,
            _ => i += 1,
        }
    }
    None
}

/// `<scheme:...>` or `<user@host>`; returns the target, whether it is an
/// email, and the consumed length.
fn scan_autolink(rest: &str) -> Option<(String, bool, usize)> {
    let close = rest.find('>')?;
    let inner = &rest[1..close];
    if inner.is_empty() || inner.bytes().any(|b| b <= b' ' || b == b'<') {
        return None;
    }

    if let Some((scheme, _)) = inner.split_once(':') {
        let scheme = scheme.to_ascii_lowercase();
        if AUTOLINK_SCHEMES.contains(&scheme.as_str()) {
            return Some((inner.to_string(), false, close + 1));
        }
        return None;
    }

    let (local, domain) = inner.split_once('@')?;
    let local_ok = !local.is_empty()
        && local
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b".!#$%&'*+/=?^_`{|}~-".contains(&b));
    if local_ok && scan_domain(domain.as_bytes()) == domain.len() {
        Some((inner.to_string(), true, close + 1))
    } else {
        None
    }
}

/// Length of a dotted hostname at the start of `bytes`, 0 if there is none.
fn scan_domain(bytes: &[u8]) -> usize {
    let mut len = 0;
    let mut labels = 0;
    loop {
        let label = bytes[len..]
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric() || **b == b'-' || **b == b'_')
            .count();
        if label == 0 {
            break;
        }
        len += label;
        labels += 1;
        let continues = bytes.get(len) == Some(&b'.')
            && bytes
                .get(len + 1)
                .is_some_and(|b| b.is_ascii_alphanumeric());
        if !continues {
            break;
        }
        len += 1;
    }
    if labels >= 2 { len } else { 0 }
}

/// Drop trailing punctuation and unbalanced closing parens from a bare URL.
fn trim_url_end(url: &str) -> usize {
    let mut end = url.len();
    loop {
        let Some(last) = url[..end].chars().next_back() else {
            return 0;
        };
        match last {
            '?' | '!' | '.' | ',' | ':' | '*' | '_' | '~' | '\'' | '"' | ';' => end -= 1,
            ')' => {
                let opens = url[..end].matches('(').count();
                let closes = url[..end].matches(')').count();
                if closes > opens {
                    end -= 1;
                } else {
                    return end;
                }
            }
            _ => return end,
        }
    }
}

/// Length of a raw HTML tag, closing tag or comment at the start of `rest`.
fn scan_html_span(rest: &str) -> Option<usize> {
    if rest.starts_with("<!--") {
        return rest[4..].find("-->").map(|end| 4 + end + 3);
    }
    scan_tag(rest.as_bytes())
}

/// Length of an open or closing tag at the start of `bytes`.
pub(crate) fn scan_tag(bytes: &[u8]) -> Option<usize> {
    if bytes.first() != Some(&b'<') {
        return None;
    }
    if bytes.get(1) == Some(&b'/') {
        let name = tag_name_len(&bytes[2..]);
        if name == 0 {
            return None;
        }
        let mut i = 2 + name;
        while bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
            i += 1;
        }
        return (bytes.get(i) == Some(&b'>')).then_some(i + 1);
    }
    scan_open_tag(bytes)
}

fn tag_name_len(bytes: &[u8]) -> usize {
    match bytes.first() {
        Some(b) if b.is_ascii_alphabetic() => bytes
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric() || **b == b'-')
            .count(),
        _ => 0,
    }
}

/// `<name attr="value" ...>` or `<name ... />`.
fn scan_open_tag(bytes: &[u8]) -> Option<usize> {
    let name = tag_name_len(&bytes[1..]);
    if name == 0 {
        return None;
    }
    let mut i = 1 + name;
    loop {
        let ws_start = i;
        while bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
            i += 1;
        }
        match bytes.get(i)? {
            b'>' => return Some(i + 1),
            b'/' => return (bytes.get(i + 1) == Some(&b'>')).then_some(i + 2),
            _ if i == ws_start => return None,
            _ => {}
        }

        let attr = bytes[i..]
            .iter()
            .enumerate()
            .take_while(|(n, b)| {
                b.is_ascii_alphabetic()
                    || **b == b'_'
                    || **b == b':'
                    || (*n > 0 && (b.is_ascii_digit() || **b == b'.' || **b == b'-'))
            })
            .count();
        if attr == 0 {
            return None;
        }
        i += attr;

        let mut j = i;
        while bytes.get(j).is_some_and(u8::is_ascii_whitespace) {
            j += 1;
        }
        if bytes.get(j) != Some(&b'=') {
            continue;
        }
        j += 1;
        while bytes.get(j).is_some_and(u8::is_ascii_whitespace) {
            j += 1;
        }
        match bytes.get(j)? {
            quote @ (b'"' | b'\'') => {
                let close = bytes[j + 1..].iter().position(|b| b == quote)?;
                i = j + 1 + close + 1;
            }
            _ => {
                let len = bytes[j..]
                    .iter()
                    .take_while(|b| !b.is_ascii_whitespace() && !b"\"'=<>`".contains(*b))
                    .count();
                if len == 0 {
                    return None;
                }
                i = j + len;
            }
        }
    }
}
