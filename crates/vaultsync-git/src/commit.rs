use git2::{Commit, ErrorCode, Oid, Repository, Signature};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::push::tracking_ref;
use crate::GitError;

/// Author and committer identity for sync commits
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub email: String,
}

impl Author {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Result of the commit step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommitOutcome {
    /// A new commit was written to the branch
    Created { id: String },
    /// Nothing new was staged, but the branch tip was never pushed
    Unpushed { id: String },
}

impl CommitOutcome {
    pub fn id(&self) -> &str {
        match self {
            Self::Created { id } | Self::Unpushed { id } => id,
        }
    }
}

/// Commit the index to `refs/heads/<branch>`.
///
/// The parent is the branch's current tip, so the commit lands on `branch`
/// no matter what HEAD points at. When the index matches the tip the step
/// fails with [`GitError::NothingToCommit`], unless the tip itself still
/// has to be pushed, in which case it is returned as
/// [`CommitOutcome::Unpushed`].
pub fn commit_branch(
    repo: &Repository,
    branch: &str,
    message: &str,
    author: &Author,
) -> Result<CommitOutcome, GitError> {
    let refname = format!("refs/heads/{branch}");
    let parent = branch_tip(repo, &refname)?;

    let mut index = repo.index()?;
    let tree_id = index.write_tree()?;

    let unchanged = match &parent {
        Some(commit) => commit.tree_id() == tree_id,
        None => index.is_empty(),
    };

    if unchanged {
        if let Some(commit) = &parent {
            if has_unpushed_commit(repo, branch)? {
                debug!(branch, id = %commit.id(), "Nothing new to commit, tip not yet pushed");
                return Ok(CommitOutcome::Unpushed {
                    id: commit.id().to_string(),
                });
            }
        }
        return Err(GitError::NothingToCommit);
    }

    let signature = Signature::now(&author.name, &author.email)?;
    let tree = repo.find_tree(tree_id)?;
    let parents: Vec<&Commit> = parent.iter().collect();

    let oid = repo.commit(
        Some(&refname),
        &signature,
        &signature,
        message,
        &tree,
        &parents,
    )?;

    info!(branch, id = %oid, "Created commit");

    Ok(CommitOutcome::Created {
        id: oid.to_string(),
    })
}

/// Whether `refs/heads/<branch>` holds a commit that was never pushed.
///
/// A branch with no record of a previous push counts as unpushed. An unborn
/// branch never does.
pub fn has_unpushed_commit(repo: &Repository, branch: &str) -> Result<bool, GitError> {
    let Some(tip) = ref_target(repo, &format!("refs/heads/{branch}"))? else {
        return Ok(false);
    };

    match ref_target(repo, &tracking_ref(branch))? {
        Some(pushed) => Ok(pushed != tip),
        None => Ok(true),
    }
}

fn branch_tip<'r>(repo: &'r Repository, refname: &str) -> Result<Option<Commit<'r>>, GitError> {
    match repo.find_reference(refname) {
        Ok(reference) => Ok(Some(reference.peel_to_commit()?)),
        Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
        Err(e) => Err(GitError::GitOperationFailed(e)),
    }
}

pub(crate) fn ref_target(repo: &Repository, refname: &str) -> Result<Option<Oid>, GitError> {
    match repo.refname_to_id(refname) {
        Ok(oid) => Ok(Some(oid)),
        Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
        Err(e) => Err(GitError::GitOperationFailed(e)),
    }
}
