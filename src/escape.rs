//! HTML escaping for rendered text, code and attribute values.

/// Escape `&`, `<`, `>` and `"` unconditionally.
///
/// Used for code content, where an entity in the source is literal text.
pub fn escape_html(text: &str, out: &mut String) {
    let mut last = 0;
    for (i, byte) in text.bytes().enumerate() {
        let replacement = match byte {
            b'&' => "&amp;",
            b'<' => "&lt;",
            b'>' => "&gt;",
            b'"' => "&quot;",
            _ => continue,
        };
        out.push_str(&text[last..i]);
        out.push_str(replacement);
        last = i + 1;
    }
    out.push_str(&text[last..]);
}

/// Escape running text, leaving entity references from the source intact.
///
/// `&amp;` in the input stays `&amp;` instead of becoming `&amp;amp;`.
pub fn escape_text(text: &str, out: &mut String) {
    let bytes = text.as_bytes();
    let mut last = 0;
    for (i, &byte) in bytes.iter().enumerate() {
        let replacement = match byte {
            b'&' if entity_len(&bytes[i..]).is_some() => continue,
            b'&' => "&amp;",
            b'<' => "&lt;",
            b'>' => "&gt;",
            b'"' => "&quot;",
            _ => continue,
        };
        out.push_str(&text[last..i]);
        out.push_str(replacement);
        last = i + 1;
    }
    out.push_str(&text[last..]);
}

/// Escape a URL for use inside a double-quoted `href`/`src` attribute.
///
/// Characters outside the URL-safe set are percent-encoded byte by byte,
/// existing `%XX` sequences are kept.
pub fn escape_href(url: &str, out: &mut String) {
    for &byte in url.as_bytes() {
        match byte {
            b'&' => out.push_str("&amp;"),
            b'\'' => out.push_str("&#x27;"),
            b if is_href_safe(b) => out.push(b as char),
            b => {
                out.push('%');
                out.push_str(&format!("{b:02X}"));
            }
        }
    }
}

fn is_href_safe(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || b"!#$%()*+,-./:;=?@_~".contains(&byte)
}

/// Length of an HTML entity reference at the start of `bytes`, if any.
///
/// Recognizes `&name;`, `&#123;` and `&#x1F;` shapes. Named references are
/// not checked against the HTML5 entity table.
pub fn entity_len(bytes: &[u8]) -> Option<usize> {
    if bytes.first() != Some(&b'&') {
        return None;
    }
    let body = &bytes[1..];
    let (digits, max, start) = match body {
        [b'#', b'x' | b'X', ..] => (DigitKind::Hex, 6, 2),
        [b'#', ..] => (DigitKind::Decimal, 7, 1),
        [first, ..] if first.is_ascii_alphabetic() => (DigitKind::Name, 32, 0),
        _ => return None,
    };

    let mut len = 0;
    while let Some(&b) = body.get(start + len) {
        let ok = match digits {
            DigitKind::Hex => b.is_ascii_hexdigit(),
            DigitKind::Decimal => b.is_ascii_digit(),
            DigitKind::Name => b.is_ascii_alphanumeric(),
        };
        if !ok {
            break;
        }
        len += 1;
        if len > max {
            return None;
        }
    }

    let min = if digits == DigitKind::Name { 2 } else { 1 };
    if len >= min && body.get(start + len) == Some(&b';') {
        Some(1 + start + len + 1)
    } else {
        None
    }
}

#[derive(PartialEq)]
enum DigitKind {
    Hex,
    Decimal,
    Name,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(input: &str) -> String {
        let mut out = String::new();
        escape_text(input, &mut out);
        out
    }

    fn html(input: &str) -> String {
        let mut out = String::new();
        escape_html(input, &mut out);
        out
    }

    fn href(input: &str) -> String {
        let mut out = String::new();
        escape_href(input, &mut out);
        out
    }

    #[test]
    fn escapes_special_chars() {
        assert_eq!(text("a < b > c \"d\""), "a &lt; b &gt; c &quot;d&quot;");
        assert_eq!(text("fish & chips"), "fish &amp; chips");
    }

    #[test]
    fn keeps_existing_entities() {
        assert_eq!(text("&amp;"), "&amp;");
        assert_eq!(text("&copy; &#169; &#xA9;"), "&copy; &#169; &#xA9;");
        assert_eq!(text("&#;"), "&amp;#;");
        assert_eq!(text("&a;"), "&amp;a;");
    }

    #[test]
    fn code_escaping_is_unconditional() {
        assert_eq!(html("&amp; <b>"), "&amp;amp; &lt;b&gt;");
    }

    #[test]
    fn href_percent_encodes() {
        assert_eq!(href("https://example.com/a b"), "https://example.com/a%20b");
        assert_eq!(href("/q?a=1&b=2"), "/q?a=1&amp;b=2");
        assert_eq!(href("\"><x"), "%22%3E%3Cx");
        assert_eq!(href("/caf\u{e9}"), "/caf%C3%A9");
        assert_eq!(href("/already%20encoded"), "/already%20encoded");
    }

    #[test]
    fn entity_lengths() {
        assert_eq!(entity_len(b"&amp; rest"), Some(5));
        assert_eq!(entity_len(b"&#x41;"), Some(6));
        assert_eq!(entity_len(b"&#12345678;"), None);
        assert_eq!(entity_len(b"& amp;"), None);
    }
}
