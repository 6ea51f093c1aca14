//! Escaping helpers shared by the serializers.
//!
//! - HTML text and attribute escaping
//! - Script-safe embedding of JSON inside a `<script>` element

// ---------------------------------------------------------------------------
// HTML Escaping
// ---------------------------------------------------------------------------

/// Append `s` to `out`, escaped for an HTML text or double-quoted
/// attribute context (`& < > " '`).
pub fn push_escaped_html(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}

// ---------------------------------------------------------------------------
// Script Embedding
// ---------------------------------------------------------------------------

/// Make serialized JSON safe to place inside an inline `<script>` element.
///
/// The result is still valid JSON and a valid JavaScript expression. `<`,
/// `>` and `&` only occur inside string literals, where `\uXXXX` escapes
/// decode back to the same characters; U+2028/U+2029 are line terminators
/// in older JavaScript engines.
pub fn escape_script_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len() + 16);
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    out
}
