use git2::{Index, Repository};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::status::{status_under, StatusEntry};
use crate::GitError;

/// What happened to a single path during staging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageAction {
    /// Present in the working tree, added to the index
    Added,
    /// Missing from the working tree, removed from the index
    Removed,
    /// Name contains the noise token, left untouched
    Skipped,
}

/// Result of staging all watched subdirectories
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageReport {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub skipped: Vec<String>,
}

impl StageReport {
    fn record(&mut self, path: String, action: StageAction) {
        match action {
            StageAction::Added => self.added.push(path),
            StageAction::Removed => self.removed.push(path),
            StageAction::Skipped => self.skipped.push(path),
        }
    }

    /// Number of add and remove operations applied to the index
    pub fn operations(&self) -> usize {
        self.added.len() + self.removed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations() == 0
    }
}

/// Stage every change under each of `subdirs`.
///
/// Paths whose name contains `noise_token` are skipped. A path that still
/// exists in the working tree is added to the index, otherwise it is
/// removed. The index is written once per subdirectory, after every path in
/// it was applied; a failing path leaves that subdirectory's changes
/// unwritten and aborts the remaining subdirectories.
pub fn stage_changes(
    repo: &Repository,
    subdirs: &[&str],
    noise_token: &str,
) -> Result<StageReport, GitError> {
    let workdir = repo
        .workdir()
        .ok_or_else(|| GitError::BareRepository(repo.path().display().to_string()))?
        .to_path_buf();

    let mut report = StageReport::default();

    for subdir in subdirs {
        let entries = status_under(repo, subdir)?;
        if entries.is_empty() {
            debug!(subdir, "No changes");
            continue;
        }

        for (path, action) in stage_batch(repo, &workdir, entries, noise_token)? {
            report.record(path, action);
        }
    }

    info!(
        added = report.added.len(),
        removed = report.removed.len(),
        skipped = report.skipped.len(),
        "Staged changes"
    );

    Ok(report)
}

/// Apply one subdirectory's entries to the index and write it.
///
/// On any failure the in-memory index is reloaded from disk, so neither the
/// file nor later users of this repository handle see a partial batch.
fn stage_batch(
    repo: &Repository,
    workdir: &Path,
    entries: Vec<StatusEntry>,
    noise_token: &str,
) -> Result<Vec<(String, StageAction)>, GitError> {
    let mut index = repo.index()?;

    match apply_entries(&mut index, workdir, entries, noise_token) {
        Ok(applied) => {
            index.write()?;
            Ok(applied)
        }
        Err(e) => {
            if let Err(reload) = index.read(true) {
                warn!(error = %reload, "Failed to discard partial index changes");
            }
            Err(e)
        }
    }
}

fn apply_entries(
    index: &mut Index,
    workdir: &Path,
    entries: Vec<StatusEntry>,
    noise_token: &str,
) -> Result<Vec<(String, StageAction)>, GitError> {
    let mut applied = Vec::with_capacity(entries.len());

    for entry in entries {
        let action = if !noise_token.is_empty() && entry.path.contains(noise_token) {
            StageAction::Skipped
        } else if exists_in_worktree(workdir, &entry.path) {
            index.add_path(Path::new(&entry.path))?;
            StageAction::Added
        } else {
            index.remove_path(Path::new(&entry.path))?;
            StageAction::Removed
        };

        debug!(path = %entry.path, ?action, "Staged path");
        applied.push((entry.path, action));
    }

    Ok(applied)
}

/// Whether `path` is a file or symlink in the working tree.
///
/// A directory where a tracked file used to be counts as absent: the old
/// entry is removed and the files below it are reported on their own.
fn exists_in_worktree(workdir: &Path, path: &str) -> bool {
    workdir
        .join(path)
        .symlink_metadata()
        .map(|meta| !meta.is_dir())
        .unwrap_or(false)
}
