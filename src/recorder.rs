// src/recorder.rs

use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use chrono::Utc;
use serde_json::Value;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::{
    config::CorruptPolicy,
    error::AppError,
    models::result_entry::{ResultEntry, Submission},
    utils::{
        fs::write_atomic,
        token::{result_path, sanitize_token},
    },
};

/// Appends quiz results to `<token>_results.json` files.
///
/// Every read-modify-write of a file happens while holding that file's token
/// lock, so concurrent submissions for the same quiz are never lost.
#[derive(Debug)]
pub struct ResultRecorder {
    results_dir: PathBuf,
    corrupt_policy: CorruptPolicy,
    locks: TokenLocks,
}

impl ResultRecorder {
    /// Creates the recorder, creating `results_dir` if it does not exist yet.
    pub fn new(results_dir: impl Into<PathBuf>, corrupt_policy: CorruptPolicy) -> io::Result<Self> {
        let results_dir = results_dir.into();
        std::fs::create_dir_all(&results_dir)?;

        Ok(Self {
            results_dir,
            corrupt_policy,
            locks: TokenLocks::default(),
        })
    }

    /// Durably appends one entry for `submission` and returns it.
    pub async fn append(&self, submission: &Submission) -> Result<ResultEntry, AppError> {
        let token = sanitize_token(&submission.quiz);
        let path = result_path(&self.results_dir, &token)
            .ok_or_else(|| AppError::BadRequest("Invalid quiz identifier".to_string()))?;

        let _guard = self.locks.acquire(&token).await;

        let mut entries = self.load_entries(&path).await?;
        let entry = ResultEntry::new(submission.quiz.clone(), submission.score);
        entries.push(serde_json::to_value(&entry).map_err(persistence_error(&path))?);

        let bytes = serde_json::to_vec_pretty(&entries).map_err(persistence_error(&path))?;
        write_atomic(&path, &bytes)
            .await
            .map_err(persistence_error(&path))?;

        tracing::info!(token = %token, entries = entries.len(), "Recorded quiz result");

        Ok(entry)
    }

    /// Reads the current array for `path`.
    ///
    /// A missing file is empty, a non-array value becomes a one-element array
    /// and unparseable content is handled per the corrupt-file policy.
    async fn load_entries(&self, path: &Path) -> Result<Vec<Value>, AppError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(persistence_error(path)(e)),
        };

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Array(entries)) => Ok(entries),
            Ok(other) => Ok(vec![other]),
            Err(e) => {
                self.handle_corrupt(path, &e).await?;
                Ok(Vec::new())
            }
        }
    }

    async fn handle_corrupt(&self, path: &Path, err: &serde_json::Error) -> Result<(), AppError> {
        match self.corrupt_policy {
            CorruptPolicy::Absorb => {
                tracing::warn!(
                    "Result file {} is not valid JSON ({}), starting a new array",
                    path.display(),
                    err
                );
            }
            CorruptPolicy::Quarantine => {
                let target = quarantine_path(path);
                tokio::fs::rename(path, &target)
                    .await
                    .map_err(persistence_error(path))?;
                tracing::warn!(
                    "Result file {} is not valid JSON ({}), moved to {}",
                    path.display(),
                    err,
                    target.display()
                );
            }
        }
        Ok(())
    }
}

fn persistence_error<E: std::fmt::Display>(path: &Path) -> impl Fn(E) -> AppError + '_ {
    move |e| AppError::PersistenceError(format!("{}: {}", path.display(), e))
}

fn quarantine_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".corrupt-{}", Utc::now().format("%Y%m%dT%H%M%S%.6fZ")));
    path.with_file_name(name)
}

/// Lock table keyed by token. Entries are created on demand and dropped
/// once nobody holds or waits on them.
#[derive(Debug, Default)]
struct TokenLocks {
    inner: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl TokenLocks {
    async fn acquire(&self, token: &str) -> TokenGuard {
        let lock = {
            let mut table = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            // A waiter cancelled right after being woken leaves an entry only the table holds.
            table.retain(|_, lock| Arc::strong_count(lock) > 1);
            table.entry(token.to_string()).or_default().clone()
        };

        TokenGuard {
            guard: Some(lock.lock_owned().await),
            token: token.to_string(),
            table: Arc::clone(&self.inner),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

struct TokenGuard {
    guard: Option<OwnedMutexGuard<()>>,
    token: String,
    table: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl Drop for TokenGuard {
    fn drop(&mut self) {
        let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        // Release under the table lock so no one can clone the entry in between.
        drop(self.guard.take());

        if table
            .get(&self.token)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            table.remove(&self.token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::token::MAX_TOKEN_BYTES;

    fn submission(quiz: &str, score: f64) -> Submission {
        Submission {
            quiz: quiz.to_string(),
            score,
        }
    }

    fn read_entries(path: &Path) -> Vec<ResultEntry> {
        let bytes = std::fs::read(path).unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_new_creates_results_dir() {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path().join("results");

        ResultRecorder::new(&results, CorruptPolicy::Absorb).unwrap();
        assert!(results.is_dir());

        // Idempotent.
        ResultRecorder::new(&results, CorruptPolicy::Absorb).unwrap();
    }

    #[tokio::test]
    async fn test_sequential_appends_keep_order() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = ResultRecorder::new(dir.path(), CorruptPolicy::Absorb).unwrap();

        let mut written = Vec::new();
        for i in 0..5 {
            written.push(recorder.append(&submission("algebra", i as f64)).await.unwrap());
        }

        let stored = read_entries(&dir.path().join("algebra_results.json"));
        assert_eq!(stored, written);
        assert_eq!(
            stored.iter().map(|e| e.first_score).collect::<Vec<_>>(),
            vec![0.0, 1.0, 2.0, 3.0, 4.0]
        );
    }

    #[tokio::test]
    async fn test_original_identifier_is_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = ResultRecorder::new(dir.path(), CorruptPolicy::Absorb).unwrap();

        recorder.append(&submission("./algebra.json", 87.0)).await.unwrap();

        let stored = read_entries(&dir.path().join("algebra_results.json"));
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].quiz, "./algebra.json");
        assert_eq!(stored[0].first_score, 87.0);
    }

    #[tokio::test]
    async fn test_fallback_token() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = ResultRecorder::new(dir.path(), CorruptPolicy::Absorb).unwrap();

        recorder.append(&submission("***", 10.0)).await.unwrap();
        assert!(dir.path().join("quiz_results.json").is_file());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_absorbed() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = ResultRecorder::new(dir.path(), CorruptPolicy::Absorb).unwrap();
        let path = dir.path().join("broken_results.json");
        std::fs::write(&path, b"[{\"quiz\": oops").unwrap();

        recorder.append(&submission("broken", 50.0)).await.unwrap();

        let stored = read_entries(&path);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].quiz, "broken");
    }

    #[tokio::test]
    async fn test_corrupt_file_is_quarantined() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = ResultRecorder::new(dir.path(), CorruptPolicy::Quarantine).unwrap();
        let path = dir.path().join("broken_results.json");
        std::fs::write(&path, b"not json at all").unwrap();

        recorder.append(&submission("broken", 50.0)).await.unwrap();

        assert_eq!(read_entries(&path).len(), 1);

        let quarantined: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.to_string_lossy().contains(".corrupt-"))
            .collect();
        assert_eq!(quarantined.len(), 1);
        assert_eq!(std::fs::read(&quarantined[0]).unwrap(), b"not json at all");
    }

    #[tokio::test]
    async fn test_non_array_file_is_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = ResultRecorder::new(dir.path(), CorruptPolicy::Absorb).unwrap();
        let path = dir.path().join("single_results.json");
        std::fs::write(&path, br#"{"legacy": true}"#).unwrap();

        recorder.append(&submission("single", 1.0)).await.unwrap();

        let stored: Vec<Value> = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0], serde_json::json!({ "legacy": true }));
        assert_eq!(stored[1]["quiz"], "single");
    }

    #[tokio::test]
    async fn test_long_identifier_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = ResultRecorder::new(dir.path(), CorruptPolicy::Absorb).unwrap();
        let quiz = "a".repeat(300);

        let entry = recorder.append(&submission(&quiz, 5.0)).await.unwrap();
        assert_eq!(entry.quiz, quiz);

        let file_name = format!("{}_results.json", "a".repeat(MAX_TOKEN_BYTES));
        assert_eq!(read_entries(&dir.path().join(file_name)).len(), 1);
    }

    #[tokio::test]
    async fn test_stale_lock_entries_are_pruned() {
        let locks = TokenLocks::default();
        locks
            .inner
            .lock()
            .unwrap()
            .insert("abandoned".to_string(), Arc::default());

        let guard = locks.acquire("active").await;
        assert_eq!(locks.len(), 1);

        drop(guard);
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn test_write_failure_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path().join("results");
        let recorder = ResultRecorder::new(&results, CorruptPolicy::Absorb).unwrap();
        std::fs::remove_dir(&results).unwrap();

        let res = recorder.append(&submission("algebra", 1.0)).await;
        assert!(matches!(res, Err(AppError::PersistenceError(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_lose_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Arc::new(ResultRecorder::new(dir.path(), CorruptPolicy::Absorb).unwrap());

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let recorder = Arc::clone(&recorder);
                tokio::spawn(async move {
                    let quiz = if i % 2 == 0 { "shared" } else { "./shared.json" };
                    recorder.append(&submission(quiz, i as f64)).await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = read_entries(&dir.path().join("shared_results.json"));
        assert_eq!(stored.len(), 32);

        let mut scores: Vec<f64> = stored.iter().map(|e| e.first_score).collect();
        scores.sort_by(f64::total_cmp);
        assert_eq!(scores, (0..32).map(|i| i as f64).collect::<Vec<_>>());

        assert_eq!(recorder.locks.len(), 0);
    }
}
