use serde::Serialize;

use vaultsync_git::{CommitOutcome, StageReport};
use vaultsync_logging::SyncStep;

use crate::SyncError;

/// What a successful sync did
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub repository: String,
    pub staged: StageReport,
    pub commit: CommitOutcome,
    pub duration_secs: f64,
}

/// The final outcome of one sync invocation
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Changes staged, committed and pushed
    Success {
        repository: String,
        commit: String,
        added: usize,
        removed: usize,
        skipped: usize,
        duration_secs: f64,
    },
    /// A step failed; earlier steps are left in place
    Failed { step: SyncStep, error: String },
    /// Another sync was still running
    AlreadyRunning,
}

impl SyncOutcome {
    pub fn from_result(result: &Result<SyncSummary, SyncError>) -> Self {
        match result {
            Ok(summary) => Self::Success {
                repository: summary.repository.clone(),
                commit: summary.commit.id().to_string(),
                added: summary.staged.added.len(),
                removed: summary.staged.removed.len(),
                skipped: summary.staged.skipped.len(),
                duration_secs: summary.duration_secs,
            },
            Err(e) => match e.step() {
                Some(step) => Self::Failed {
                    step,
                    error: e.to_string(),
                },
                None => Self::AlreadyRunning,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Success { .. } => 0,
            Self::Failed { .. } => 1,
            Self::AlreadyRunning => 2,
        }
    }
}
