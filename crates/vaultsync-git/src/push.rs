use git2::{Cred, ErrorCode, PushOptions, RemoteCallbacks, Repository};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;
use tracing::{debug, info};

use crate::commit::ref_target;
use crate::GitError;

/// Namespace of the refs recording what was last pushed
const TRACKING_NAMESPACE: &str = "refs/remotes/vaultsync";

/// Personal access token presented as the basic-auth username.
///
/// Formatting never reveals the value; call [`AccessToken::expose`] at the
/// point where the credential is handed to the transport.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([redacted])")
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<unset>")
        } else {
            f.write_str("********")
        }
    }
}

/// Ref recording the commit of `branch` that was last pushed successfully
pub fn tracking_ref(branch: &str) -> String {
    format!("{TRACKING_NAMESPACE}/{branch}")
}

/// Push `refs/heads/<branch>` to the same ref at `url`.
///
/// The token is offered once as the username with an empty password; a
/// second credential request means the remote refused it. A per-reference
/// rejection reported by the remote (for example a non-fast-forward update)
/// fails the push. On success the tracking ref is moved to the pushed tip.
pub fn push_branch(
    repo: &Repository,
    url: &str,
    branch: &str,
    token: &AccessToken,
) -> Result<(), GitError> {
    let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
    let mut remote = repo.remote_anonymous(url)?;

    let attempts = Cell::new(0u32);
    let mut rejected: Vec<(String, String)> = Vec::new();

    let result = {
        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(|_url, _username, _allowed| {
            attempts.set(attempts.get() + 1);
            if attempts.get() > 1 {
                return Err(git2::Error::from_str("access token rejected by remote"));
            }
            Cred::userpass_plaintext(token.expose(), "")
        });
        callbacks.push_update_reference(|reference, status| {
            if let Some(reason) = status {
                rejected.push((reference.to_string(), reason.to_string()));
            }
            Ok(())
        });

        let mut push_opts = PushOptions::new();
        push_opts.remote_callbacks(callbacks);

        debug!(url, %refspec, "Pushing");
        remote.push(&[refspec.as_str()], Some(&mut push_opts))
    };

    if let Err(e) = result {
        if attempts.get() > 1 {
            debug!(url, "Remote rejected credentials");
            return Err(GitError::AuthenticationRejected);
        }
        // libgit2 refuses a non-fast-forward update before sending it
        if e.code() == ErrorCode::NotFastForward {
            debug!(url, error = %e, "Push is not a fast-forward");
            return Err(GitError::PushRejected {
                reference: format!("refs/heads/{branch}"),
                reason: e.message().to_string(),
            });
        }
        return Err(GitError::GitOperationFailed(e));
    }

    if let Some((reference, reason)) = rejected.into_iter().next() {
        debug!(url, %reference, %reason, "Remote rejected update");
        return Err(GitError::PushRejected { reference, reason });
    }

    if let Some(tip) = ref_target(repo, &format!("refs/heads/{branch}"))? {
        repo.reference(&tracking_ref(branch), tip, true, "vaultsync: push")?;
    }

    info!(url, branch, "Pushed branch");

    Ok(())
}
