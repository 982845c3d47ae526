use serde::{Deserialize, Serialize};
use std::fmt;

use crate::progress::ProgressEstimator;

/// Lifecycle of the single generation slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Loading,
    Success,
    Error,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable session state. Cloned out by [`super::Orchestrator::snapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub status: SessionStatus,
    /// Only set while `status` is `Error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub progress: f64,
    /// Artifact committed by the current run, while `status` is `Success`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_artifact_id: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            status: SessionStatus::Idle,
            error: None,
            progress: 0.0,
            last_artifact_id: None,
        }
    }
}

impl SessionState {
    pub fn is_loading(&self) -> bool {
        self.status == SessionStatus::Loading
    }

    pub(crate) fn begin(&mut self) {
        self.status = SessionStatus::Loading;
        self.error = None;
        self.progress = 0.0;
        self.last_artifact_id = None;
    }

    pub(crate) fn succeed(&mut self, artifact_id: String) {
        self.status = SessionStatus::Success;
        self.error = None;
        self.last_artifact_id = Some(artifact_id);
    }

    pub(crate) fn fail(&mut self, message: String) {
        self.status = SessionStatus::Error;
        self.error = Some(message);
        self.progress = 0.0;
        self.last_artifact_id = None;
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Everything guarded by the orchestrator's session lock.
#[derive(Default)]
pub(crate) struct Session {
    pub state: SessionState,
    /// Bumped on every run start and on shutdown. Late work from an older
    /// run compares against it and backs off.
    pub run: u64,
    pub estimator: Option<ProgressEstimator>,
}

impl Session {
    pub fn stop_estimator(&mut self) {
        if let Some(mut estimator) = self.estimator.take() {
            estimator.stop();
        }
    }
}
