use git2::{Repository, Status, StatusOptions};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::GitError;

/// How one side of a path differs from the side below it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    New,
    Modified,
    Deleted,
    Renamed,
    Typechange,
}

/// Status of one changed path, relative to the repository root.
///
/// `index` compares HEAD to the index, `worktree` compares the index to the
/// working tree. A path only appears when at least one side differs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub path: String,
    pub index: Option<EntryState>,
    pub worktree: Option<EntryState>,
    pub conflicted: bool,
}

impl StatusEntry {
    fn from_status(path: String, st: Status) -> Self {
        let index = if st.is_index_new() {
            Some(EntryState::New)
        } else if st.is_index_modified() {
            Some(EntryState::Modified)
        } else if st.is_index_deleted() {
            Some(EntryState::Deleted)
        } else if st.is_index_renamed() {
            Some(EntryState::Renamed)
        } else if st.is_index_typechange() {
            Some(EntryState::Typechange)
        } else {
            None
        };

        let worktree = if st.is_wt_new() {
            Some(EntryState::New)
        } else if st.is_wt_modified() {
            Some(EntryState::Modified)
        } else if st.is_wt_deleted() {
            Some(EntryState::Deleted)
        } else if st.is_wt_renamed() {
            Some(EntryState::Renamed)
        } else if st.is_wt_typechange() {
            Some(EntryState::Typechange)
        } else {
            None
        };

        Self {
            path,
            index,
            worktree,
            conflicted: st.is_conflicted(),
        }
    }

    pub fn is_unchanged(&self) -> bool {
        self.index.is_none() && self.worktree.is_none() && !self.conflicted
    }
}

/// Status of every changed tracked or untracked path under `subdir`.
///
/// Ignored files are left out. Untracked directories are expanded so each
/// new file is reported on its own.
pub fn status_under(repo: &Repository, subdir: &str) -> Result<Vec<StatusEntry>, GitError> {
    let mut opts = StatusOptions::new();
    opts.pathspec(subdir)
        .include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false)
        .include_unmodified(false);

    let statuses = repo.statuses(Some(&mut opts))?;
    let mut entries = Vec::with_capacity(statuses.len());

    for entry in statuses.iter() {
        let Some(path) = entry.path() else {
            warn!(
                path = %String::from_utf8_lossy(entry.path_bytes()),
                "Skipping non-UTF-8 path"
            );
            continue;
        };

        let status_entry = StatusEntry::from_status(path.to_string(), entry.status());
        if !status_entry.is_unchanged() {
            entries.push(status_entry);
        }
    }

    debug!(subdir, changed = entries.len(), "Computed status");

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_untracked() {
        let entry = StatusEntry::from_status("public/a.html".into(), Status::WT_NEW);
        assert_eq!(entry.index, None);
        assert_eq!(entry.worktree, Some(EntryState::New));
        assert!(!entry.is_unchanged());
    }

    #[test]
    fn test_from_status_staged_then_deleted() {
        let entry = StatusEntry::from_status(
            "content/post.md".into(),
            Status::INDEX_NEW | Status::WT_DELETED,
        );
        assert_eq!(entry.index, Some(EntryState::New));
        assert_eq!(entry.worktree, Some(EntryState::Deleted));
    }

    #[test]
    fn test_from_status_current() {
        let entry = StatusEntry::from_status("public/index.html".into(), Status::CURRENT);
        assert!(entry.is_unchanged());
    }
}
