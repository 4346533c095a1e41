//! Page-builder widget: settings in, wrapped HTML out.
//!
//! A host hands over the widget's saved settings as JSON. Rendering is a pure
//! function of those settings and the `Config` the widget was built with.

use serde::Deserialize;

use crate::config::{Config, DEFAULT_PLACEHOLDER};
use crate::error::Result;
use crate::escape::escape_html;
use crate::math::MathOptions;
use crate::sanitize::Policy;

/// Per-instance settings, as stored by the page builder.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WidgetSettings {
    #[serde(alias = "markdown_content")]
    pub content: String,
    pub safe_mode: bool,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            content: DEFAULT_PLACEHOLDER.to_string(),
            safe_mode: true,
        }
    }
}

impl WidgetSettings {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Settings from the host's JSON settings bag. Missing keys take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone)]
pub struct Widget {
    config: Config,
}

impl Widget {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Settings a freshly added widget starts with.
    pub fn default_settings(&self) -> WidgetSettings {
        WidgetSettings {
            content: self.config.widget.placeholder.clone(),
            safe_mode: self.config.render.safe_mode,
        }
    }

    /// Render settings to the widget's HTML.
    ///
    /// Blank content renders nothing at all, not even the container.
    pub fn render(&self, settings: &WidgetSettings) -> String {
        let html = crate::markdown_to_html_with_delimiters(
            &settings.content,
            Policy::new(settings.safe_mode),
            &self.config.math.delimiters,
        );
        if html.is_empty() {
            return html;
        }

        let mut out = String::with_capacity(html.len() + 40);
        out.push_str("<div class=\"");
        escape_html(&self.config.widget.container_class, &mut out);
        out.push_str("\">");
        out.push_str(&html);
        out.push_str("</div>");
        out
    }

    /// Options object for the client-side math typesetter.
    pub fn math_options(&self) -> &MathOptions {
        &self.config.math
    }
}

impl Default for Widget {
    fn default() -> Self {
        Self::new(Config::compiled_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_output_in_container() {
        let widget = Widget::default();
        assert_eq!(
            widget.render(&WidgetSettings::new("Hi")),
            "<div class=\"markdown-output\"><p>Hi</p>\n</div>"
        );
    }

    #[test]
    fn blank_content_renders_nothing() {
        let widget = Widget::default();
        assert_eq!(widget.render(&WidgetSettings::new("")), "");
        assert_eq!(widget.render(&WidgetSettings::new(" \n\t\n")), "");
    }

    #[test]
    fn placeholder_renders() {
        let widget = Widget::default();
        let html = widget.render(&widget.default_settings());
        assert_eq!(
            html,
            "<div class=\"markdown-output\"><h2>Hello World!</h2>\n<ul>\n\
             <li>This is a list item.</li>\n\
             <li><strong>Bold text</strong> and <em>italic text</em>.</li>\n</ul>\n\
             <p><a href=\"https://elementor.com\">Elementor Website</a></p>\n</div>"
        );
    }

    #[test]
    fn custom_container_class() {
        let mut config = Config::compiled_default();
        config.widget.container_class = "md \"x\"".to_string();
        let widget = Widget::new(config);
        assert_eq!(
            widget.render(&WidgetSettings::new("---")),
            "<div class=\"md &quot;x&quot;\"><hr />\n</div>"
        );
    }

    #[test]
    fn settings_from_json() {
        let settings =
            WidgetSettings::from_json(r#"{"markdown_content": "<b>x</b>", "safe_mode": false}"#)
                .unwrap();
        assert_eq!(settings.content, "<b>x</b>");
        assert!(!settings.safe_mode);

        let defaults = WidgetSettings::from_json("{}").unwrap();
        assert_eq!(defaults, WidgetSettings::default());
        assert!(WidgetSettings::from_json("[").is_err());
    }

    #[test]
    fn safe_mode_follows_settings() {
        let widget = Widget::default();
        let md = "<div>raw</div>";
        assert_eq!(widget.render(&WidgetSettings::new(md)), "");
        let trusted = WidgetSettings {
            content: md.to_string(),
            safe_mode: false,
        };
        assert_eq!(
            widget.render(&trusted),
            "<div class=\"markdown-output\"><div>raw</div>\n</div>"
        );
    }
}
