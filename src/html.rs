use crate::block::{Block, Document, Inline, List, Table};
use crate::escape::{escape_href, escape_html, escape_text};
use crate::sanitize::{Policy, sanitize_block, sanitize_inline};

/// Render a document to an HTML fragment
pub fn render(document: &Document, policy: Policy) -> String {
    let mut out = String::new();
    blocks_to_html(&document.blocks, policy, &mut out);
    tracing::debug!(
        blocks = document.blocks.len(),
        bytes = out.len(),
        safe = policy.safe,
        "rendered html"
    );
    out
}

fn blocks_to_html(blocks: &[Block], policy: Policy, out: &mut String) {
    for block in blocks {
        if let Some(block) = sanitize_block(block, policy) {
            emit_block(block, policy, out);
        }
    }
}

/// Start block tags on a fresh line.
fn ensure_newline(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn emit_block(block: &Block, policy: Policy, out: &mut String) {
    ensure_newline(out);
    match block {
        Block::Heading { level, content } => {
            out.push_str(&format!("<h{level}>"));
            inlines_to_html(content, policy, out);
            out.push_str(&format!("</h{level}>\n"));
        }
        Block::Paragraph { content } => {
            out.push_str("<p>");
            inlines_to_html(content, policy, out);
            out.push_str("</p>\n");
        }
        Block::CodeBlock { language, content } => {
            out.push_str("<pre><code");
            if let Some(lang) = language {
                out.push_str(" class=\"language-");
                escape_html(lang, out);
                out.push('"');
            }
            out.push('>');
            escape_html(content, out);
            out.push_str("</code></pre>\n");
        }
        Block::List(list) => list_to_html(list, policy, out),
        Block::BlockQuote(inner) => {
            out.push_str("<blockquote>\n");
            blocks_to_html(&inner.blocks, policy, out);
            out.push_str("</blockquote>\n");
        }
        Block::Table(table) => table_to_html(table, policy, out),
        Block::Html(html) => {
            out.push_str(html);
            ensure_newline(out);
        }
        Block::Rule => out.push_str("<hr />\n"),
    }
}

fn list_to_html(list: &List, policy: Policy, out: &mut String) {
    let tag = if list.ordered { "ol" } else { "ul" };
    if list.ordered && list.start != 1 {
        out.push_str(&format!("<ol start=\"{}\">\n", list.start));
    } else {
        out.push_str(&format!("<{tag}>\n"));
    }

    for item in &list.items {
        out.push_str("<li>");
        match item.checked {
            Some(true) => out.push_str("<input type=\"checkbox\" disabled=\"\" checked=\"\" /> "),
            Some(false) => out.push_str("<input type=\"checkbox\" disabled=\"\" /> "),
            None => {}
        }

        // Whether the item's output so far ends in bare paragraph text
        let mut inline_last = false;
        for block in &item.blocks {
            let Some(block) = sanitize_block(block, policy) else {
                continue;
            };
            match block {
                // Tight items hold their paragraph text directly
                Block::Paragraph { content } if list.tight => {
                    ensure_newline_after_tag(out);
                    inlines_to_html(content, policy, out);
                    inline_last = true;
                }
                _ => {
                    emit_block(block, policy, out);
                    inline_last = false;
                }
            }
        }

        if !inline_last {
            ensure_newline_after_tag(out);
        }
        out.push_str("</li>\n");
    }

    out.push_str(&format!("</{tag}>\n"));
}

/// Like `ensure_newline`, but an element's own opening tag needs no break
/// before its first child text.
fn ensure_newline_after_tag(out: &mut String) {
    if out.ends_with("<li>") || out.ends_with("/> ") {
        return;
    }
    ensure_newline(out);
}

fn table_to_html(table: &Table, policy: Policy, out: &mut String) {
    out.push_str("<table>\n<thead>\n<tr>\n");
    for (i, cell) in table.headers.iter().enumerate() {
        cell_to_html("th", table, i, cell, policy, out);
    }
    out.push_str("</tr>\n</thead>\n");

    if !table.rows.is_empty() {
        out.push_str("<tbody>\n");
        for row in &table.rows {
            out.push_str("<tr>\n");
            for (i, cell) in row.iter().enumerate() {
                cell_to_html("td", table, i, cell, policy, out);
            }
            out.push_str("</tr>\n");
        }
        out.push_str("</tbody>\n");
    }
    out.push_str("</table>\n");
}

fn cell_to_html(
    tag: &str,
    table: &Table,
    column: usize,
    cell: &[Inline],
    policy: Policy,
    out: &mut String,
) {
    let align = table
        .alignments
        .get(column)
        .and_then(|alignment| alignment.as_css());
    match align {
        Some(align) => out.push_str(&format!("<{tag} style=\"text-align: {align}\">")),
        None => out.push_str(&format!("<{tag}>")),
    }
    inlines_to_html(cell, policy, out);
    out.push_str(&format!("</{tag}>\n"));
}

fn inlines_to_html(inlines: &[Inline], policy: Policy, out: &mut String) {
    for inline in inlines {
        if let Some(inline) = sanitize_inline(inline, policy) {
            inline_to_html(&inline, policy, out);
        }
    }
}

fn inline_to_html(inline: &Inline, policy: Policy, out: &mut String) {
    match inline {
        Inline::Text(text) => escape_text(text, out),
        Inline::Emphasis(inner) => wrap("em", inner, policy, out),
        Inline::Strong(inner) => wrap("strong", inner, policy, out),
        Inline::Strikethrough(inner) => wrap("del", inner, policy, out),
        Inline::Code(code) => {
            out.push_str("<code>");
            escape_html(code, out);
            out.push_str("</code>");
        }
        Inline::Link {
            url,
            title,
            content,
        } => {
            out.push_str("<a href=\"");
            escape_href(url, out);
            out.push('"');
            push_title(title.as_deref(), out);
            out.push('>');
            inlines_to_html(content, policy, out);
            out.push_str("</a>");
        }
        Inline::Image { url, alt, title } => {
            out.push_str("<img src=\"");
            escape_href(url, out);
            out.push_str("\" alt=\"");
            escape_html(alt, out);
            out.push('"');
            push_title(title.as_deref(), out);
            out.push_str(" />");
        }
        Inline::Autolink { url, email } => {
            out.push_str("<a href=\"");
            if *email {
                out.push_str("mailto:");
            } else if url.starts_with("www.") {
                out.push_str("http://");
            }
            escape_href(url, out);
            out.push_str("\">");
            escape_html(url, out);
            out.push_str("</a>");
        }
        Inline::Html(html) => out.push_str(html),
        Inline::LineBreak => out.push_str("<br />\n"),
        Inline::SoftBreak => out.push('\n'),
    }
}

fn wrap(tag: &str, inner: &[Inline], policy: Policy, out: &mut String) {
    out.push_str(&format!("<{tag}>"));
    inlines_to_html(inner, policy, out);
    out.push_str(&format!("</{tag}>"));
}

fn push_title(title: Option<&str>, out: &mut String) {
    if let Some(title) = title {
        out.push_str(" title=\"");
        escape_text(title, out);
        out.push('"');
    }
}

#[cfg(test)]
mod tests {
    use crate::markdown_to_html;

    fn safe(markdown: &str) -> String {
        markdown_to_html(markdown, true)
    }

    fn trusted(markdown: &str) -> String {
        markdown_to_html(markdown, false)
    }

    #[test]
    fn heading() {
        assert_eq!(safe("# Hello"), "<h1>Hello</h1>\n");
        assert_eq!(safe("### Three"), "<h3>Three</h3>\n");
    }

    #[test]
    fn paragraph() {
        assert_eq!(safe("Hello world"), "<p>Hello world</p>\n");
    }

    #[test]
    fn plain_text_is_escaped() {
        assert_eq!(
            safe("1 < 2 & \"3\" > 0"),
            "<p>1 &lt; 2 &amp; &quot;3&quot; &gt; 0</p>\n"
        );
    }

    #[test]
    fn entities_are_not_double_escaped() {
        assert_eq!(safe("Tom &amp; Jerry"), "<p>Tom &amp; Jerry</p>\n");
        assert_eq!(safe("&copy; 2024"), "<p>&copy; 2024</p>\n");
    }

    #[test]
    fn bold_and_italic() {
        assert_eq!(safe("**bold**"), "<p><strong>bold</strong></p>\n");
        assert_eq!(safe("*italic*"), "<p><em>italic</em></p>\n");
        assert_eq!(
            safe("***both***"),
            "<p><em><strong>both</strong></em></p>\n"
        );
        assert_eq!(safe("~~gone~~"), "<p><del>gone</del></p>\n");
    }

    #[test]
    fn inline_code_escapes_html() {
        assert_eq!(safe("`<b>`"), "<p><code>&lt;b&gt;</code></p>\n");
        assert_eq!(safe("`&amp;`"), "<p><code>&amp;amp;</code></p>\n");
    }

    #[test]
    fn code_block() {
        assert_eq!(
            safe("```rust\nlet x = 1 < 2;\n```"),
            "<pre><code class=\"language-rust\">let x = 1 &lt; 2;\n</code></pre>\n"
        );
        assert_eq!(
            safe("    plain"),
            "<pre><code>plain\n</code></pre>\n"
        );
    }

    #[test]
    fn unordered_list() {
        assert_eq!(
            safe("- one\n- two"),
            "<ul>\n<li>one</li>\n<li>two</li>\n</ul>\n"
        );
    }

    #[test]
    fn ordered_list() {
        assert_eq!(
            safe("1. one\n2. two"),
            "<ol>\n<li>one</li>\n<li>two</li>\n</ol>\n"
        );
        assert_eq!(
            safe("5. five\n6. six"),
            "<ol start=\"5\">\n<li>five</li>\n<li>six</li>\n</ol>\n"
        );
    }

    #[test]
    fn loose_list_wraps_paragraphs() {
        assert_eq!(
            safe("- one\n\n- two"),
            "<ul>\n<li>\n<p>one</p>\n</li>\n<li>\n<p>two</p>\n</li>\n</ul>\n"
        );
    }

    #[test]
    fn nested_list() {
        assert_eq!(
            safe("- a\n  - b\n- c"),
            "<ul>\n<li>a\n<ul>\n<li>b</li>\n</ul>\n</li>\n<li>c</li>\n</ul>\n"
        );
    }

    #[test]
    fn tight_items_close_after_text() {
        assert_eq!(safe("- a\n- b"), "<ul>\n<li>a</li>\n<li>b</li>\n</ul>\n");
        assert_eq!(
            safe("- a\n  ```\n  x\n  ```\n- b"),
            "<ul>\n<li>a\n<pre><code>x\n</code></pre>\n</li>\n<li>b</li>\n</ul>\n"
        );
    }

    #[test]
    fn task_list() {
        assert_eq!(
            safe("- [x] done\n- [ ] open"),
            "<ul>\n<li><input type=\"checkbox\" disabled=\"\" checked=\"\" /> done</li>\n\
             <li><input type=\"checkbox\" disabled=\"\" /> open</li>\n</ul>\n"
        );
    }

    #[test]
    fn empty_list_item() {
        assert_eq!(safe("-\n- b"), "<ul>\n<li></li>\n<li>b</li>\n</ul>\n");
    }

    #[test]
    fn block_quote() {
        assert_eq!(
            safe("> quoted\n> text"),
            "<blockquote>\n<p>quoted\ntext</p>\n</blockquote>\n"
        );
    }

    #[test]
    fn hard_break() {
        assert_eq!(
            safe("line one  \nline two"),
            "<p>line one<br />\nline two</p>\n"
        );
    }

    #[test]
    fn links_and_images() {
        assert_eq!(
            safe("[site](https://example.com \"Home\")"),
            "<p><a href=\"https://example.com\" title=\"Home\">site</a></p>\n"
        );
        assert_eq!(
            safe("![a *cat*](/cat.png)"),
            "<p><img src=\"/cat.png\" alt=\"a cat\" /></p>\n"
        );
    }

    #[test]
    fn title_entities_are_not_double_escaped() {
        assert_eq!(
            safe("[a](/u \"Tom &amp; Jerry\")"),
            "<p><a href=\"/u\" title=\"Tom &amp; Jerry\">a</a></p>\n"
        );
        assert_eq!(
            safe("![a](/i.png \"R&D\")"),
            "<p><img src=\"/i.png\" alt=\"a\" title=\"R&amp;D\" /></p>\n"
        );
    }

    #[test]
    fn deep_nesting_renders() {
        let quotes = safe(&format!("{}x", "> ".repeat(20_000)));
        assert_eq!(quotes.matches("<blockquote>").count(), 64);

        let lists = safe(&format!("{}x", "1. ".repeat(20_000)));
        assert_eq!(lists.matches("<ol>").count(), 64);

        let emphasis = safe(&format!("{}b{}", "*a ".repeat(20_000), " a*".repeat(20_000)));
        assert_eq!(emphasis.matches("<em>").count(), 64);
    }

    #[test]
    fn autolinks() {
        assert_eq!(
            safe("<https://example.com>"),
            "<p><a href=\"https://example.com\">https://example.com</a></p>\n"
        );
        assert_eq!(
            safe("mail me@example.com"),
            "<p>mail <a href=\"mailto:me@example.com\">me@example.com</a></p>\n"
        );
        assert_eq!(
            safe("see www.example.com"),
            "<p>see <a href=\"http://www.example.com\">www.example.com</a></p>\n"
        );
    }

    #[test]
    fn table() {
        let md = "| A | B |\n|:--|--:|\n| 1 | 2 |";
        assert_eq!(
            safe(md),
            "<table>\n<thead>\n<tr>\n<th style=\"text-align: left\">A</th>\n\
             <th style=\"text-align: right\">B</th>\n</tr>\n</thead>\n<tbody>\n<tr>\n\
             <td style=\"text-align: left\">1</td>\n<td style=\"text-align: right\">2</td>\n\
             </tr>\n</tbody>\n</table>\n"
        );
    }

    #[test]
    fn table_without_rows() {
        assert_eq!(
            safe("| A |\n| - |"),
            "<table>\n<thead>\n<tr>\n<th>A</th>\n</tr>\n</thead>\n</table>\n"
        );
    }

    #[test]
    fn horizontal_rule() {
        assert_eq!(safe("---"), "<hr />\n");
    }

    #[test]
    fn safe_mode_removes_scripts() {
        let md = "<script>alert(1)</script>\n\n[x](javascript:alert(1)) and <b>ok</b>";
        assert_eq!(safe(md), "<p><a href=\"\">x</a> and <b>ok</b></p>\n");
    }

    #[test]
    fn unsafe_mode_passes_html_through() {
        let md = "<script>alert(1)</script>\n\n[x](javascript:alert(1))";
        assert_eq!(
            trusted(md),
            "<script>alert(1)</script>\n<p><a href=\"javascript:alert(1)\">x</a></p>\n"
        );
    }

    #[test]
    fn safe_mode_drops_inline_tags_with_attributes() {
        assert_eq!(
            safe("click <span onclick=\"x()\">here</span>"),
            "<p>click here</p>\n"
        );
    }

    #[test]
    fn math_delimiters_survive() {
        assert_eq!(
            safe("Inline $a_1 * b_2$ and $$\\sum_{i}^{n} x_i$$"),
            "<p>Inline $a_1 * b_2$ and $$\\sum_{i}^{n} x_i$$</p>\n"
        );
        assert_eq!(
            safe("\\(x_1\\) then \\[y_2\\]"),
            "<p>\\(x_1\\) then \\[y_2\\]</p>\n"
        );
    }

    #[test]
    fn empty_input() {
        assert_eq!(safe(""), "");
        assert_eq!(safe("   \n\n  "), "");
    }

    #[test]
    fn heading_and_list_scenario() {
        assert_eq!(
            safe("## Hello World!\n\n- Item one\n- **Bold** text"),
            "<h2>Hello World!</h2>\n<ul>\n<li>Item one</li>\n<li><strong>Bold</strong> text</li>\n</ul>\n"
        );
    }
}
