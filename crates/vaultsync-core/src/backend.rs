use async_trait::async_trait;
use std::io;

use vaultsync_git::{
    commit_branch, open_worktree, push_branch, stage_changes, CommitOutcome, GitError,
    StageReport,
};

use crate::SyncContext;

/// The repository side of a sync: one method per step
#[async_trait]
pub trait SyncBackend: Send + Sync {
    /// Stage every change under the watched subdirectories
    async fn stage(&self, ctx: &SyncContext) -> Result<StageReport, GitError>;

    /// Commit the index to the sync branch
    async fn commit(&self, ctx: &SyncContext, message: &str) -> Result<CommitOutcome, GitError>;

    /// Push the sync branch to the configured remote
    async fn push(&self, ctx: &SyncContext) -> Result<(), GitError>;
}

/// [`SyncBackend`] over libgit2.
///
/// libgit2 blocks, so every step runs on tokio's blocking pool against a
/// freshly opened repository.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitBackend;

impl GitBackend {
    pub fn new() -> Self {
        Self
    }
}

async fn blocking<T, F>(f: F) -> Result<T, GitError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, GitError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| GitError::IoError(io::Error::new(io::ErrorKind::Other, e.to_string())))?
}

#[async_trait]
impl SyncBackend for GitBackend {
    async fn stage(&self, ctx: &SyncContext) -> Result<StageReport, GitError> {
        let working_dir = ctx.working_dir.clone();
        let watched = ctx.watched_dirs.clone();
        let noise = ctx.noise_token.clone();

        blocking(move || {
            let repo = open_worktree(&working_dir)?;
            let subdirs: Vec<&str> = watched.iter().map(String::as_str).collect();
            stage_changes(&repo, &subdirs, &noise)
        })
        .await
    }

    async fn commit(&self, ctx: &SyncContext, message: &str) -> Result<CommitOutcome, GitError> {
        let working_dir = ctx.working_dir.clone();
        let branch = ctx.branch.clone();
        let author = ctx.author.clone();
        let message = message.to_string();

        blocking(move || {
            let repo = open_worktree(&working_dir)?;
            commit_branch(&repo, &branch, &message, &author)
        })
        .await
    }

    async fn push(&self, ctx: &SyncContext) -> Result<(), GitError> {
        let working_dir = ctx.working_dir.clone();
        let branch = ctx.branch.clone();
        let token = ctx.token.clone();
        let url = ctx.remote_url();

        blocking(move || {
            let repo = open_worktree(&working_dir)?;
            push_branch(&repo, &url, &branch, &token)
        })
        .await
    }
}
