use serde::Serialize;

use vaultsync_logging::SyncStep;

/// Where a sync invocation currently is.
///
/// `Idle -> Staging -> Committing -> Pushing -> Done`, with any step able to
/// move to `Failed` instead of advancing. `Done` and `Failed` are terminal
/// for the invocation; the next run starts again from `Staging`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SyncPhase {
    #[default]
    Idle,
    Staging,
    Committing,
    Pushing,
    Done,
    Failed {
        step: SyncStep,
    },
}

impl SyncPhase {
    /// The step this phase runs, if any
    pub fn step(&self) -> Option<SyncStep> {
        match self {
            SyncPhase::Staging => Some(SyncStep::Stage),
            SyncPhase::Committing => Some(SyncStep::Commit),
            SyncPhase::Pushing => Some(SyncStep::Push),
            _ => None,
        }
    }
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncPhase::Idle => write!(f, "idle"),
            SyncPhase::Staging => write!(f, "staging"),
            SyncPhase::Committing => write!(f, "committing"),
            SyncPhase::Pushing => write!(f, "pushing"),
            SyncPhase::Done => write!(f, "done"),
            SyncPhase::Failed { step } => write!(f, "failed ({})", step),
        }
    }
}
