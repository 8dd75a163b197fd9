use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info};

use vaultsync_git::CommitOutcome;
use vaultsync_logging::LogEvent;

use crate::backend::SyncBackend;
use crate::context::Clock;
use crate::error::SyncError;
use crate::notify::Notifier;
use crate::outcome::SyncSummary;
use crate::phase::SyncPhase;
use crate::SyncContext;

/// Runs the stage, commit and push steps of a sync in order.
///
/// Only one run is in flight per runner; a second call while one is running
/// is rejected with [`SyncError::AlreadyRunning`] without touching the
/// repository.
pub struct SyncRunner {
    backend: Arc<dyn SyncBackend>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    running: AtomicBool,
    phase: watch::Sender<SyncPhase>,
}

/// Clears the running flag when a run ends, however it ends
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SyncRunner {
    pub fn new(
        backend: Arc<dyn SyncBackend>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (phase, _) = watch::channel(SyncPhase::Idle);
        Self {
            backend,
            notifier,
            clock,
            running: AtomicBool::new(false),
            phase,
        }
    }

    /// Phase of the current or most recent run
    pub fn phase(&self) -> SyncPhase {
        *self.phase.borrow()
    }

    /// Watch phase changes as they happen
    pub fn subscribe(&self) -> watch::Receiver<SyncPhase> {
        self.phase.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn enter(&self, phase: SyncPhase) {
        debug!(%phase, "Sync phase");
        self.phase.send_replace(phase);
    }

    /// Run one sync, reporting progress and the first failure to the notifier.
    ///
    /// Nothing is retried or rolled back: a failed commit leaves the index
    /// staged and a failed push leaves the commit on the branch, both picked
    /// up by the next run.
    pub async fn run(&self, ctx: &SyncContext) -> Result<SyncSummary, SyncError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Sync requested while another is in progress");
            self.notifier.notify(&LogEvent::SyncAlreadyRunning);
            return Err(SyncError::AlreadyRunning);
        }
        let _guard = RunGuard(&self.running);

        let started = Instant::now();
        self.notifier.notify(&LogEvent::SyncStarted {
            working_dir: ctx.working_dir.clone(),
        });

        match self.run_steps(ctx, started).await {
            Ok(summary) => {
                self.enter(SyncPhase::Done);
                self.notifier.notify(&LogEvent::PushCompleted {
                    repository: ctx.repository.clone(),
                });
                info!(
                    repository = %ctx.repository,
                    commit = %summary.commit.id(),
                    "Sync completed"
                );
                Ok(summary)
            }
            Err(e) => {
                // The phase still names the step that was running
                if let Some(step) = self.phase().step() {
                    self.enter(SyncPhase::Failed { step });
                    self.notifier.notify(&LogEvent::failed(step, e.to_string()));
                }
                debug!(error = %e, "Sync failed");
                Err(e)
            }
        }
    }

    async fn run_steps(
        &self,
        ctx: &SyncContext,
        started: Instant,
    ) -> Result<SyncSummary, SyncError> {
        self.enter(SyncPhase::Staging);
        let staged = self.backend.stage(ctx).await.map_err(SyncError::Staging)?;
        self.notifier.notify(&LogEvent::StagingCompleted {
            added: staged.added.len(),
            removed: staged.removed.len(),
            skipped: staged.skipped.len(),
        });

        self.enter(SyncPhase::Committing);
        let message = ctx.commit_message(self.clock.now());
        let commit = self
            .backend
            .commit(ctx, &message)
            .await
            .map_err(SyncError::Commit)?;
        match &commit {
            CommitOutcome::Created { id } => self.notifier.notify(&LogEvent::CommitCreated {
                id: id.clone(),
                message: message.clone(),
            }),
            CommitOutcome::Unpushed { id } => {
                self.notifier.notify(&LogEvent::CommitPending { id: id.clone() })
            }
        }

        self.enter(SyncPhase::Pushing);
        self.backend.push(ctx).await.map_err(SyncError::Push)?;

        Ok(SyncSummary {
            repository: ctx.repository.clone(),
            staged,
            commit,
            duration_secs: started.elapsed().as_secs_f64(),
        })
    }
}
