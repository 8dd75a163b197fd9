use thiserror::Error;

#[derive(Error, Debug)]
pub enum GitError {
    #[error("Not a git repository: {0}")]
    NotARepo(String),

    #[error("Repository has no working tree: {0}")]
    BareRepository(String),

    #[error("Git operation failed: {0}")]
    GitOperationFailed(#[from] git2::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Nothing to commit")]
    NothingToCommit,

    #[error("Remote rejected {reference}: {reason}")]
    PushRejected { reference: String, reason: String },

    #[error("Remote rejected the access token")]
    AuthenticationRejected,
}
