// src/bin/clean_quizzes.rs

use std::{env, path::PathBuf, process::ExitCode};

use quiz_recorder::{cleanup::clean_quiz_dir, config::Config};
use tracing_subscriber::EnvFilter;

/// Strips HTML from the `code` field of every quiz question file.
///
/// Usage: `clean_quizzes [quiz-dir]` (defaults to `QUIZ_DIR` or `<root>/quizzes`).
#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.rust_log))
        .with_target(false)
        .init();

    let dir = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or(config.quiz_dir);

    let report = match clean_quiz_dir(&dir).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Failed to clean {}: {}", dir.display(), e);
            return ExitCode::FAILURE;
        }
    };

    if report.updated.is_empty() {
        println!("No changes needed.");
    } else {
        println!("Updated files: {}", report.updated.join(", "));
    }

    ExitCode::SUCCESS
}
