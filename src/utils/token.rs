// src/utils/token.rs

use std::path::{Component, Path, PathBuf};

/// Token used when an identifier has no safe characters left.
pub const FALLBACK_TOKEN: &str = "quiz";

/// Longest token in bytes. Leaves room in a 255-byte file name for the
/// `_results.json` suffix plus temporary and quarantine suffixes.
pub const MAX_TOKEN_BYTES: usize = 128;

const RESULTS_SUFFIX: &str = "_results.json";

/// Derives a filesystem-safe token from a submitted quiz identifier.
///
/// `./algebra.json` becomes `algebra`, `***` becomes `quiz`.
/// The output only contains alphanumerics, `_`, `-` and `.`, is at most
/// `MAX_TOKEN_BYTES` long, and `sanitize_token(&sanitize_token(x)) == sanitize_token(x)`.
pub fn sanitize_token(raw: &str) -> String {
    let raw = raw.strip_prefix("./").unwrap_or(raw);

    let mut token: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        .collect();
    truncate_to_boundary(&mut token, MAX_TOKEN_BYTES);

    // Filtering can expose a new suffix (`a.js on`), so strip until none is left.
    while let Some(stem_len) = json_stem_len(&token) {
        token.truncate(stem_len);
    }

    if token.is_empty() {
        FALLBACK_TOKEN.to_string()
    } else {
        token
    }
}

fn truncate_to_boundary(token: &mut String, max: usize) {
    if token.len() <= max {
        return;
    }
    let cut = token
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|&end| end <= max)
        .last()
        .unwrap_or(0);
    token.truncate(cut);
}

fn json_stem_len(token: &str) -> Option<usize> {
    let stem_len = token.len().checked_sub(".json".len())?;
    let suffix = token.get(stem_len..)?;
    suffix.eq_ignore_ascii_case(".json").then_some(stem_len)
}

pub fn result_file_name(token: &str) -> String {
    format!("{}{}", token, RESULTS_SUFFIX)
}

/// Joins the result file for `token` onto `results_dir`.
///
/// Returns `None` unless the file name is a single normal path component,
/// so the result always lands directly inside `results_dir`.
pub fn result_path(results_dir: &Path, token: &str) -> Option<PathBuf> {
    let file_name = result_file_name(token);

    let mut components = Path::new(&file_name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Some(results_dir.join(file_name)),
        _ => None,
    }
}
