use chrono::{Local, NaiveDateTime};
use std::path::PathBuf;

use vaultsync_git::{AccessToken, Author};

/// Branch every sync commits to and pushes
pub const SYNC_BRANCH: &str = "main";

/// Subdirectories of the working tree that are synced
pub const WATCHED_DIRS: &[&str] = &["public", "content"];

/// Filesystem metadata artifact that is never staged
pub const NOISE_TOKEN: &str = ".DS_Store";

/// Format of the timestamp in commit messages
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Everything one sync invocation needs
#[derive(Debug, Clone)]
pub struct SyncContext {
    /// Root of the repository checkout
    pub working_dir: PathBuf,
    /// Repository as configured, without scheme (shown to the user)
    pub repository: String,
    /// Credential for the push
    pub token: AccessToken,
    /// Commit author and committer
    pub author: Author,
    /// Hostname used in commit messages
    pub hostname: String,
    pub branch: String,
    pub watched_dirs: Vec<String>,
    pub noise_token: String,
}

impl SyncContext {
    pub fn new(
        working_dir: PathBuf,
        repository: impl Into<String>,
        token: AccessToken,
        author: Author,
        hostname: impl Into<String>,
    ) -> Self {
        Self {
            working_dir,
            repository: repository.into(),
            token,
            author,
            hostname: hostname.into(),
            branch: SYNC_BRANCH.to_string(),
            watched_dirs: WATCHED_DIRS.iter().map(|d| d.to_string()).collect(),
            noise_token: NOISE_TOKEN.to_string(),
        }
    }

    /// URL the branch is pushed to
    pub fn remote_url(&self) -> String {
        remote_url(&self.repository)
    }

    /// Commit message for a commit made at `at`
    pub fn commit_message(&self, at: NaiveDateTime) -> String {
        commit_message(&self.hostname, at)
    }
}

/// Turn a configured repository path into a push URL.
///
/// `github.com/me/site` becomes `https://github.com/me/site`. A value that
/// already names a scheme is used as-is.
pub fn remote_url(repository: &str) -> String {
    let repository = repository.trim();
    if repository.contains("://") {
        repository.to_string()
    } else {
        format!("https://{}", repository.trim_start_matches('/'))
    }
}

/// `"<hostname> <timestamp>"`
pub fn commit_message(hostname: &str, at: NaiveDateTime) -> String {
    format!("{} {}", hostname, at.format(TIMESTAMP_FORMAT))
}

/// Source of the commit timestamp
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Name of this machine, or `"unknown"` when it is not valid UTF-8
pub fn local_hostname() -> String {
    gethostname::gethostname()
        .into_string()
        .unwrap_or_else(|_| "unknown".to_string())
}
