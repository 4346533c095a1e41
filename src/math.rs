//! Math delimiter configuration shared with the client-side typesetter.
//!
//! The HTML produced by this crate keeps delimited math spans byte-for-byte so
//! an auto-render pass in the browser can find them. The same delimiter list
//! tells the inline tokenizer which spans to leave alone and is handed to the
//! typesetter as its options object.

use serde::{Deserialize, Serialize};

/// One `{left, right, display}` delimiter pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delimiter {
    pub left: String,
    pub right: String,
    pub display: bool,
}

impl Delimiter {
    pub fn new(left: &str, right: &str, display: bool) -> Self {
        Self {
            left: left.to_string(),
            right: right.to_string(),
            display,
        }
    }
}

/// Delimiters in match order: display `$$` before inline `$`.
pub fn default_delimiters() -> Vec<Delimiter> {
    vec![
        Delimiter::new("$$", "$$", true),
        Delimiter::new("$", "$", false),
        Delimiter::new("\\(", "\\)", false),
        Delimiter::new("\\[", "\\]", true),
    ]
}

/// Options object for the client typesetter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MathOptions {
    pub delimiters: Vec<Delimiter>,
    /// Malformed expressions stay as source text instead of raising
    #[serde(alias = "throw_on_error")]
    pub throw_on_error: bool,
}

impl Default for MathOptions {
    fn default() -> Self {
        Self {
            delimiters: default_delimiters(),
            throw_on_error: false,
        }
    }
}

impl MathOptions {
    /// Serialize as the JSON object the typesetter's auto-render call expects.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Find a math span starting at `pos`.
///
/// Delimiters are tried in order. Returns the byte length of the whole span,
/// delimiters included, when a closing delimiter exists further on with a
/// non-blank body in between. A closer preceded by a backslash does not count.
pub fn match_span(text: &str, pos: usize, delimiters: &[Delimiter]) -> Option<usize> {
    let rest = &text[pos..];
    for delimiter in delimiters {
        if delimiter.left.is_empty() || delimiter.right.is_empty() {
            continue;
        }
        if !rest.starts_with(&delimiter.left) {
            continue;
        }
        let body_start = delimiter.left.len();
        if let Some(end) = find_closer(&rest[body_start..], &delimiter.right) {
            if rest[body_start..body_start + end].trim().is_empty() {
                continue;
            }
            return Some(body_start + end + delimiter.right.len());
        }
    }
    None
}

fn find_closer(body: &str, right: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut from = 0;
    while let Some(found) = body[from..].find(right) {
        let at = from + found;
        let escaped = right != "\\)" && right != "\\]" && at > 0 && bytes[at - 1] == b'\\';
        if !escaped {
            return Some(at);
        }
        from = at + right.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_json() {
        let json = MathOptions::default().to_json().unwrap();
        assert_eq!(
            json,
            r#"{"delimiters":[{"left":"$$","right":"$$","display":true},{"left":"$","right":"$","display":false},{"left":"\\(","right":"\\)","display":false},{"left":"\\[","right":"\\]","display":true}],"throwOnError":false}"#
        );
    }

    #[test]
    fn display_delimiter_wins_over_inline() {
        let delimiters = default_delimiters();
        assert_eq!(match_span("$$x$$ y", 0, &delimiters), Some(5));
        assert_eq!(match_span("$x$ y", 0, &delimiters), Some(3));
    }

    #[test]
    fn escaped_closer_is_skipped() {
        let delimiters = default_delimiters();
        assert_eq!(match_span(r"$a\$b$", 0, &delimiters), Some(6));
    }

    #[test]
    fn bracket_delimiters() {
        let delimiters = default_delimiters();
        assert_eq!(match_span(r"\(x^2\) rest", 0, &delimiters), Some(7));
        assert_eq!(match_span(r"\[x\]", 0, &delimiters), Some(5));
    }

    #[test]
    fn unclosed_or_empty_spans_do_not_match() {
        let delimiters = default_delimiters();
        assert_eq!(match_span("$5 only", 0, &delimiters), None);
        assert_eq!(match_span("$ $", 0, &delimiters), None);
        assert_eq!(match_span(r"\(open", 0, &delimiters), None);
    }
}
