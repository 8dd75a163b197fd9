use thiserror::Error;

use vaultsync_git::GitError;
use vaultsync_logging::SyncStep;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Error staging changes: {0}")]
    Staging(#[source] GitError),

    #[error("Error committing changes: {0}")]
    Commit(#[source] GitError),

    #[error("Error pushing to remote: {0}")]
    Push(#[source] GitError),

    #[error("A sync is already in progress")]
    AlreadyRunning,
}

impl SyncError {
    /// Step that failed, `None` when no step ran
    pub fn step(&self) -> Option<SyncStep> {
        match self {
            SyncError::Staging(_) => Some(SyncStep::Stage),
            SyncError::Commit(_) => Some(SyncStep::Commit),
            SyncError::Push(_) => Some(SyncStep::Push),
            SyncError::AlreadyRunning => None,
        }
    }
}
