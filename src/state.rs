use std::sync::Arc;

use crate::{config::Config, recorder::ResultRecorder};
use axum::extract::FromRef;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub recorder: Arc<ResultRecorder>,
}

impl AppState {
    /// Builds the state for `config`, creating the results directory if needed.
    pub fn new(config: Config) -> std::io::Result<Self> {
        let recorder = ResultRecorder::new(&config.results_dir, config.corrupt_policy)?;

        Ok(Self {
            config,
            recorder: Arc::new(recorder),
        })
    }
}

impl FromRef<AppState> for Arc<ResultRecorder> {
    fn from_ref(state: &AppState) -> Self {
        state.recorder.clone()
    }
}
