// src/cleanup.rs

use std::{io, path::Path};

use serde_json::Value;

use crate::utils::{fs::write_atomic, html::html_to_text};

/// Outcome of a cleanup pass over a quiz directory.
#[derive(Debug, Default, PartialEq)]
pub struct CleanReport {
    /// Files that were rewritten.
    pub updated: Vec<String>,
    /// Files that could not be parsed, with the parse error.
    pub failed: Vec<(String, String)>,
}

/// Strips HTML from the `code` field of every question in `*.json` files under `dir`.
///
/// Files that fail to parse are reported and skipped, files whose root is
/// not an array are ignored, and only modified files are rewritten.
pub async fn clean_quiz_dir(dir: &Path) -> io::Result<CleanReport> {
    let mut names = Vec::new();
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.to_ascii_lowercase().ends_with(".json") && entry.file_type().await?.is_file() {
            names.push(name);
        }
    }
    names.sort();

    let mut report = CleanReport::default();

    for name in names {
        let path = dir.join(&name);
        let bytes = tokio::fs::read(&path).await?;

        let mut data: Value = match serde_json::from_slice(&bytes) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("Failed to parse {}: {}", name, e);
                report.failed.push((name, e.to_string()));
                continue;
            }
        };

        if clean_questions(&mut data) {
            let pretty = serde_json::to_vec_pretty(&data).map_err(io::Error::other)?;
            write_atomic(&path, &pretty).await?;
            tracing::info!("Cleaned {}", name);
            report.updated.push(name);
        }
    }

    Ok(report)
}

/// Cleans the `code` field of each question object in place.
/// Returns whether anything changed.
pub fn clean_questions(data: &mut Value) -> bool {
    let Some(questions) = data.as_array_mut() else {
        return false;
    };

    let mut modified = false;
    for question in questions.iter_mut().filter_map(Value::as_object_mut) {
        let Some(Value::String(code)) = question.get_mut("code") else {
            continue;
        };
        if code.is_empty() {
            continue;
        }

        let cleaned = html_to_text(code);
        if cleaned != *code {
            *code = cleaned;
            modified = true;
        }
    }

    modified
}
