//! Output compared against pulldown-cmark for constructs whose CommonMark
//! rendering is fixed. Inputs avoid quotes, raw HTML and extensions, where
//! the two renderers legitimately differ.

use pulldown_cmark::{html, Parser};

fn reference(markdown: &str) -> String {
    let mut out = String::new();
    html::push_html(&mut out, Parser::new(markdown));
    out
}

fn assert_matches_reference(markdown: &str) {
    assert_eq!(
        mdwidget::markdown_to_html(markdown, false),
        reference(markdown),
        "input: {markdown:?}"
    );
}

#[test]
fn heading_and_list_scenario() {
    assert_matches_reference("## Hello World!\n\n- Item one\n- **Bold** text");
}

#[test]
fn headings() {
    assert_matches_reference("# One\n\n## Two ##\n\nThree\n=====\n\nFour\n----");
}

#[test]
fn paragraphs_with_emphasis() {
    assert_matches_reference("Some *emphasis*, some **strong** and ***both***.\n\nNext _one_ here.");
    assert_matches_reference("snake_case_name stays plain");
    assert_matches_reference("**unclosed and *nested* text");
}

#[test]
fn code() {
    assert_matches_reference("Use `a < b` inline.");
    assert_matches_reference("```rust\nfn main() {}\n```");
    assert_matches_reference("    indented\n    code\n\nafter");
    assert_matches_reference("`` a ` b ``");
}

#[test]
fn rules() {
    assert_matches_reference("above\n\n***\n\nbelow");
    assert_matches_reference("- - -");
}

#[test]
fn block_quotes() {
    assert_matches_reference("> quoted\n> text\n\nafter");
    assert_matches_reference("> outer\n>\n> > inner");
}

#[test]
fn lazy_lines_only_continue_paragraphs() {
    assert_matches_reference("> # H\ntext");
    assert_matches_reference("> ```\n> code\nlazy");
    assert_matches_reference("> quoted\nlazy");
    assert_matches_reference("> a\n2. b");
    assert_matches_reference("- a\n  - b\nc");
}

#[test]
fn ordered_and_nested_tight_items() {
    assert_matches_reference("1. one\n2. two\n3. three");
    assert_matches_reference("- a\n  - b\n- c");
}

#[test]
fn lists() {
    assert_matches_reference("- a\n- b\n- c");
    assert_matches_reference("- a\n\n- b");
    assert_matches_reference("- a\n  - b\n  - c\n- d");
    assert_matches_reference("1. one\n2. two");
    assert_matches_reference("3. three\n4. four");
    assert_matches_reference("* star\n+ plus");
}

#[test]
fn links_and_images() {
    assert_matches_reference("[site](https://example.com/path?x=1&y=2)");
    assert_matches_reference("[ref][home] and [home]\n\n[home]: https://example.com");
    assert_matches_reference("![alt text](/img.png)");
    assert_matches_reference("<https://example.com/a>");
}

#[test]
fn line_breaks_and_escapes() {
    assert_matches_reference("hard  \nbreak");
    assert_matches_reference("soft\nbreak");
    assert_matches_reference("backslash\\\nbreak");
    assert_matches_reference("\\*not emphasis\\* and 1 &lt; 2");
}
