// src/config.rs

use std::{
    env,
    fmt::Display,
    path::{Path, PathBuf},
    str::FromStr,
};

use dotenvy::dotenv;

/// Port used when neither the first CLI argument nor `PORT` is set.
pub const DEFAULT_PORT: u16 = 5173;

/// What to do with a result file whose contents are not valid JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorruptPolicy {
    /// Treat the file as an empty array and overwrite it.
    #[default]
    Absorb,
    /// Move the file aside to `<name>.corrupt-<timestamp>` and start a fresh array.
    Quarantine,
}

impl FromStr for CorruptPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "absorb" => Ok(CorruptPolicy::Absorb),
            "quarantine" => Ok(CorruptPolicy::Quarantine),
            other => Err(format!("unknown corrupt-file policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Directory served as static files.
    pub root_dir: PathBuf,
    /// Directory holding `<token>_results.json` files.
    pub results_dir: PathBuf,
    /// Directory scanned by the `clean_quizzes` tool.
    pub quiz_dir: PathBuf,
    pub corrupt_policy: CorruptPolicy,
    pub max_body_bytes: usize,
    pub log_dir: String,
    pub rust_log: String,
}

impl Config {
    /// Builds a configuration rooted at `root` with every other setting at its default.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root_dir = root.as_ref().to_path_buf();

        Self {
            port: DEFAULT_PORT,
            results_dir: root_dir.join("results"),
            quiz_dir: root_dir.join("quizzes"),
            root_dir,
            corrupt_policy: CorruptPolicy::default(),
            max_body_bytes: 64 * 1024,
            log_dir: "logs".to_string(),
            rust_log: "info".to_string(),
        }
    }

    pub fn from_env() -> Self {
        dotenv().ok();

        let root_dir = env::var("QUIZ_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| install_dir());

        let mut config = Self::new(root_dir);

        if let Ok(raw) = env::var("PORT") {
            config.port = parse_or(&raw, "PORT", DEFAULT_PORT);
        }

        if let Ok(dir) = env::var("QUIZ_DIR") {
            config.quiz_dir = PathBuf::from(dir);
        }

        if let Ok(raw) = env::var("CORRUPT_RESULTS") {
            config.corrupt_policy = parse_or(&raw, "CORRUPT_RESULTS", CorruptPolicy::default());
        }

        if let Ok(raw) = env::var("MAX_BODY_BYTES") {
            config.max_body_bytes = parse_or(&raw, "MAX_BODY_BYTES", config.max_body_bytes);
        }

        config.log_dir = env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());
        config.rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        config
    }

    /// Applies a port given on the command line, as in `quiz-recorder 8080`.
    pub fn with_port_arg(mut self, arg: Option<String>) -> Self {
        if let Some(raw) = arg {
            self.port = parse_or(&raw, "port", self.port);
        }
        self
    }
}

/// Directory containing the running executable, falling back to the working directory.
fn install_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

// Logging is not initialized yet when config loads, so warnings go to stderr.
fn parse_or<T>(raw: &str, key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim().parse().unwrap_or_else(|e| {
        eprintln!("Invalid {} value '{}': {}, using default", key, raw, e);
        default
    })
}
