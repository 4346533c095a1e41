mod block;
mod config;
mod error;
mod escape;
mod html;
mod inline;
mod math;
mod parser;
mod sanitize;
mod widget;

pub use block::{Alignment, Block, Document, Inline, List, ListItem, Table};
pub use config::{Config, RenderConfig, WidgetConfig};
pub use error::{Error, Result};
pub use math::{Delimiter, MathOptions, default_delimiters};
pub use sanitize::{Policy, UrlContext, is_safe_url};
pub use widget::{Widget, WidgetSettings};

/// Parse markdown text into a document, using the default math delimiters.
pub fn parse(markdown: &str) -> Document {
    parser::parse(markdown, &default_delimiters())
}

/// Render a parsed document to an HTML fragment.
pub fn render(document: &Document, policy: Policy) -> String {
    html::render(document, policy)
}

/// Convert markdown to HTML. Blank input gives an empty string.
pub fn markdown_to_html(markdown: &str, safe_mode: bool) -> String {
    markdown_to_html_with_delimiters(markdown, Policy::new(safe_mode), &default_delimiters())
}

/// Convert markdown to HTML with custom config.
pub fn markdown_to_html_with_config(markdown: &str, config: &Config) -> String {
    markdown_to_html_with_delimiters(markdown, config.render.policy(), &config.math.delimiters)
}

pub(crate) fn markdown_to_html_with_delimiters(
    markdown: &str,
    policy: Policy,
    delimiters: &[Delimiter],
) -> String {
    if markdown.trim().is_empty() {
        return String::new();
    }
    let document = parser::parse(markdown, delimiters);
    html::render(&document, policy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Document>();
    }

    #[test]
    fn config_drives_policy_and_delimiters() {
        let mut config = Config::compiled_default();
        config.render.safe_mode = false;
        config.math.delimiters = vec![Delimiter::new("%%", "%%", false)];

        assert_eq!(
            markdown_to_html_with_config("<i>x</i> %%a *b* c%% $d *e* f$", &config),
            "<p><i>x</i> %%a *b* c%% $d <em>e</em> f$</p>\n"
        );
    }

    #[test]
    fn parse_and_render_separately() {
        let document = parse("> *quoted*");
        assert_eq!(
            document.blocks,
            vec![Block::BlockQuote(Document::new(vec![Block::Paragraph {
                content: vec![Inline::Emphasis(vec![Inline::Text("quoted".to_string())])],
            }]))]
        );
        assert_eq!(
            render(&document, Policy::SAFE),
            "<blockquote>\n<p><em>quoted</em></p>\n</blockquote>\n"
        );
    }
}
