//! Safe-mode filtering of raw HTML and link targets.
//!
//! The renderer asks this module about each node as it goes. Nothing here
//! reports errors: disallowed content is dropped or neutralized in place.

use std::borrow::Cow;

use crate::block::{Block, Inline};

/// Inline tags a raw HTML span may use in safe mode, attribute-free only.
const ALLOWED_INLINE_TAGS: &[&str] = &[
    "abbr", "b", "br", "cite", "code", "del", "dfn", "em", "i", "ins", "kbd", "mark", "q", "s",
    "samp", "small", "strong", "sub", "sup", "u", "var", "wbr",
];

/// Sanitization policy for a single render call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub safe: bool,
}

impl Policy {
    pub const SAFE: Policy = Policy { safe: true };
    pub const TRUSTED: Policy = Policy { safe: false };

    pub fn new(safe: bool) -> Self {
        Self { safe }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::SAFE
    }
}

/// Where a URL is going to be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlContext {
    Link,
    Image,
}

/// Filter a block. `None` means the block is dropped from the output.
pub fn sanitize_block(block: &Block, policy: Policy) -> Option<&Block> {
    match block {
        Block::Html(_) if policy.safe => None,
        _ => Some(block),
    }
}

/// Filter an inline node.
///
/// Returns `None` when the node is dropped, a borrowed node when it passes
/// unchanged, and an owned copy when a URL had to be neutralized.
pub fn sanitize_inline(inline: &Inline, policy: Policy) -> Option<Cow<'_, Inline>> {
    if !policy.safe {
        return Some(Cow::Borrowed(inline));
    }
    match inline {
        Inline::Html(html) => {
            if is_allowed_tag(html) {
                Some(Cow::Borrowed(inline))
            } else {
                None
            }
        }
        Inline::Link {
            url,
            title,
            content,
        } if !is_safe_url(url, UrlContext::Link) => {
            tracing::warn!(url = %url, "neutralized link target");
            Some(Cow::Owned(Inline::Link {
                url: String::new(),
                title: title.clone(),
                content: content.clone(),
            }))
        }
        Inline::Image { url, alt, title } if !is_safe_url(url, UrlContext::Image) => {
            tracing::warn!(url = %url, "neutralized image source");
            Some(Cow::Owned(Inline::Image {
                url: String::new(),
                alt: alt.clone(),
                title: title.clone(),
            }))
        }
        Inline::Autolink { url, .. } if !is_safe_url(url, UrlContext::Link) => {
            Some(Cow::Owned(Inline::Text(url.clone())))
        }
        _ => Some(Cow::Borrowed(inline)),
    }
}

/// Check a URL against the scheme denylist.
///
/// Control characters and whitespace are removed before the case-insensitive
/// comparison, since browsers ignore them inside a scheme.
pub fn is_safe_url(url: &str, context: UrlContext) -> bool {
    let normalized: String = url
        .chars()
        .filter(|c| !c.is_control() && !c.is_whitespace())
        .take(32)
        .flat_map(char::to_lowercase)
        .collect();

    if normalized.starts_with("data:") {
        return context == UrlContext::Image
            && ["data:image/png", "data:image/gif", "data:image/jpeg", "data:image/webp"]
                .iter()
                .any(|prefix| normalized.starts_with(prefix));
    }

    !["javascript:", "vbscript:", "file:"]
        .iter()
        .any(|scheme| normalized.starts_with(scheme))
}

/// Whether a raw HTML span is a bare open/close tag from the allow-list.
///
/// `<em>`, `</em>`, `<br>` and `<br />` pass; anything with attributes,
/// comments and unknown tags do not.
fn is_allowed_tag(html: &str) -> bool {
    let Some(inner) = html.strip_prefix('<').and_then(|s| s.strip_suffix('>')) else {
        return false;
    };
    let inner = inner.strip_prefix('/').unwrap_or(inner);
    let inner = inner.strip_suffix('/').unwrap_or(inner).trim_end();
    if inner.is_empty() || !inner.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return false;
    }
    let name = inner.to_ascii_lowercase();
    ALLOWED_INLINE_TAGS.contains(&name.as_str())
}
