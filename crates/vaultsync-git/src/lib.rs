//! # vaultsync-git
//!
//! Git operations for vaultsync, built on libgit2.
//!
//! This crate performs the three repository-side steps of a sync:
//! - staging every change under a set of watched subdirectories
//! - committing the index to a fixed branch
//! - pushing that branch to an HTTPS remote with a personal access token
//!
//! ## Key Types
//!
//! - [`StatusEntry`] - Three-way status of one changed path
//! - [`StageReport`] - What the stage step added, removed and skipped
//! - [`CommitOutcome`] - A new commit, or an earlier one still waiting to be pushed
//! - [`AccessToken`] - Redacting wrapper around the push credential
//! - [`GitError`] - Errors from every operation
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vaultsync_git::{open_worktree, stage_changes, commit_branch, push_branch, Author};
//!
//! let repo = open_worktree(&working_dir)?;
//! let report = stage_changes(&repo, &["public", "content"], ".DS_Store")?;
//! let outcome = commit_branch(&repo, "main", "laptop 2026-10-16 09:30:00", &author)?;
//! push_branch(&repo, "https://github.com/me/site", "main", &token)?;
//! ```
//!
//! All functions are blocking. Callers on an async runtime should run them
//! on a blocking thread.

mod commit;
mod error;
mod push;
mod stage;
mod status;

use git2::Repository;
use std::path::Path;

pub use commit::{commit_branch, has_unpushed_commit, Author, CommitOutcome};
pub use error::GitError;
pub use push::{push_branch, tracking_ref, AccessToken};
pub use stage::{stage_changes, StageAction, StageReport};
pub use status::{status_under, EntryState, StatusEntry};

/// Open the repository checked out at exactly `working_dir`.
///
/// Unlike discovery this never walks up to a parent repository, so a
/// misconfigured working directory fails instead of syncing the wrong tree.
pub fn open_worktree(working_dir: &Path) -> Result<Repository, GitError> {
    let repo = Repository::open(working_dir)
        .map_err(|_| GitError::NotARepo(working_dir.display().to_string()))?;

    if repo.is_bare() {
        return Err(GitError::BareRepository(working_dir.display().to_string()));
    }

    Ok(repo)
}
