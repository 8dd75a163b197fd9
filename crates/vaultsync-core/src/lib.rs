//! # vaultsync-core
//!
//! Sync orchestration for vaultsync: stage the watched subdirectories,
//! commit to the sync branch, push, and report each step to the user.

mod backend;
mod context;
mod error;
mod notify;
mod outcome;
mod phase;
mod sync_runner;

pub use backend::{GitBackend, SyncBackend};
pub use context::{
    commit_message, local_hostname, remote_url, Clock, SyncContext, SystemClock, NOISE_TOKEN,
    SYNC_BRANCH, TIMESTAMP_FORMAT, WATCHED_DIRS,
};
pub use error::SyncError;
pub use notify::Notifier;
pub use outcome::{SyncOutcome, SyncSummary};
pub use phase::SyncPhase;
pub use sync_runner::SyncRunner;
