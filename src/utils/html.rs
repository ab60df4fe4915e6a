// src/utils/html.rs

use std::sync::LazyLock;

use regex::Regex;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Turns HTML-formatted code back into plain text.
///
/// Entities are decoded first so that escaped markup (`&lt;b&gt;`) is stripped
/// along with real tags. Text that merely contains `<` without a closing `>`
/// is kept.
pub fn html_to_text(input: &str) -> String {
    strip_tags(&unescape_entities(input))
}

/// Removes every `<...>` tag, keeping the text between them.
pub fn strip_tags(input: &str) -> String {
    TAG_RE.replace_all(input, "").into_owned()
}

/// Expands every HTML5 character reference the way a browser does in text:
/// the full named table, legacy names without `;`, and invalid code points as U+FFFD.
pub fn unescape_entities(input: &str) -> String {
    htmlize::unescape(input).into_owned()
}
