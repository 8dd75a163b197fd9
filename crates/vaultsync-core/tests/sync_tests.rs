use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use git2::{Repository, RepositoryInitOptions};
use tempfile::TempDir;
use tokio::sync::Notify;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use vaultsync_core::{
    Clock, GitBackend, Notifier, SyncBackend, SyncContext, SyncError, SyncPhase, SyncRunner,
};
use vaultsync_git::{AccessToken, Author, CommitOutcome, GitError, StageReport};
use vaultsync_logging::{LogEvent, SyncStep};

// ============================================================
// Test doubles
// ============================================================

struct FixedClock(NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(
        NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap(),
    ))
}

#[derive(Default)]
struct RecordingNotifier {
    events: Mutex<Vec<LogEvent>>,
}

impl RecordingNotifier {
    fn events(&self) -> Vec<LogEvent> {
        self.events.lock().unwrap().clone()
    }

    fn failures(&self) -> Vec<(SyncStep, String, u64)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                LogEvent::SyncFailed {
                    step,
                    message,
                    display_secs,
                } => Some((step, message, display_secs)),
                _ => None,
            })
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: &LogEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Fail {
    None,
    Stage,
    Commit,
    Push,
}

/// Backend that records calls and fails on request.
struct FakeBackend {
    fail: Fail,
    calls: Mutex<Vec<String>>,
    entered_stage: Notify,
    release_stage: Option<Notify>,
}

impl FakeBackend {
    fn new(fail: Fail) -> Self {
        Self {
            fail,
            calls: Mutex::new(Vec::new()),
            entered_stage: Notify::new(),
            release_stage: None,
        }
    }

    /// Stage blocks until `release_stage` is notified.
    fn gated() -> Self {
        Self {
            release_stage: Some(Notify::new()),
            ..Self::new(Fail::None)
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SyncBackend for FakeBackend {
    async fn stage(&self, _ctx: &SyncContext) -> Result<StageReport, GitError> {
        self.calls.lock().unwrap().push("stage".into());
        self.entered_stage.notify_one();
        if let Some(gate) = &self.release_stage {
            gate.notified().await;
        }
        if self.fail == Fail::Stage {
            return Err(GitError::NotARepo("/vault/site".into()));
        }
        Ok(StageReport {
            added: vec!["public/a.html".into()],
            removed: vec!["content/old.md".into()],
            skipped: vec![],
        })
    }

    async fn commit(&self, _ctx: &SyncContext, message: &str) -> Result<CommitOutcome, GitError> {
        self.calls.lock().unwrap().push(format!("commit:{message}"));
        if self.fail == Fail::Commit {
            return Err(GitError::NothingToCommit);
        }
        Ok(CommitOutcome::Created {
            id: "0123456789abcdef".into(),
        })
    }

    async fn push(&self, _ctx: &SyncContext) -> Result<(), GitError> {
        self.calls.lock().unwrap().push("push".into());
        if self.fail == Fail::Push {
            return Err(GitError::AuthenticationRejected);
        }
        Ok(())
    }
}

fn context(working_dir: &Path, repository: &str) -> SyncContext {
    SyncContext::new(
        working_dir.to_path_buf(),
        repository,
        AccessToken::new("ghp_token"),
        Author::new("Site Bot", "bot@example.com"),
        "H",
    )
}

/// Counts tracing events at WARN or above
struct WarnCounter(Arc<AtomicUsize>);

impl<S: Subscriber> Layer<S> for WarnCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() <= Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn runner_with(backend: Arc<FakeBackend>) -> (SyncRunner, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let runner = SyncRunner::new(backend, notifier.clone(), fixed_clock());
    (runner, notifier)
}

// ============================================================
// Orchestration
// ============================================================

#[tokio::test]
async fn test_successful_sync_runs_every_step() {
    let backend = Arc::new(FakeBackend::new(Fail::None));
    let (runner, notifier) = runner_with(backend.clone());
    let ctx = context(Path::new("/vault/site"), "github.com/me/site");

    let summary = runner.run(&ctx).await.unwrap();

    assert_eq!(
        backend.calls(),
        vec!["stage", "commit:H 2026-10-16 09:30:00", "push"]
    );
    assert_eq!(summary.repository, "github.com/me/site");
    assert_eq!(summary.staged.added, vec!["public/a.html"]);
    assert_eq!(runner.phase(), SyncPhase::Done);
    assert!(!runner.is_running());

    let events = notifier.events();
    assert!(matches!(events.first(), Some(LogEvent::SyncStarted { .. })));
    assert!(matches!(
        events.last(),
        Some(LogEvent::PushCompleted { repository }) if repository == "github.com/me/site"
    ));
    assert!(events
        .iter()
        .any(|e| matches!(e, LogEvent::CommitCreated { message, .. } if message == "H 2026-10-16 09:30:00")));
    assert!(notifier.failures().is_empty());
}

#[tokio::test]
async fn test_staging_failure_stops_before_commit() {
    let backend = Arc::new(FakeBackend::new(Fail::Stage));
    let (runner, notifier) = runner_with(backend.clone());
    let ctx = context(Path::new("/vault/site"), "github.com/me/site");

    let err = runner.run(&ctx).await.unwrap_err();

    assert!(matches!(err, SyncError::Staging(GitError::NotARepo(_))));
    assert_eq!(backend.calls(), vec!["stage"]);
    assert_eq!(
        runner.phase(),
        SyncPhase::Failed {
            step: SyncStep::Stage
        }
    );

    let failures = notifier.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, SyncStep::Stage);
    assert!(failures[0].1.starts_with("Error staging changes: "));
    assert_eq!(failures[0].2, 10);
}

#[tokio::test]
async fn test_commit_failure_stops_before_push() {
    let backend = Arc::new(FakeBackend::new(Fail::Commit));
    let (runner, notifier) = runner_with(backend.clone());
    let ctx = context(Path::new("/vault/site"), "github.com/me/site");

    let err = runner.run(&ctx).await.unwrap_err();

    assert!(matches!(err, SyncError::Commit(GitError::NothingToCommit)));
    assert_eq!(backend.calls().len(), 2);
    assert_eq!(
        notifier.failures()[0].1,
        "Error committing changes: Nothing to commit"
    );
    assert!(!notifier
        .events()
        .iter()
        .any(|e| matches!(e, LogEvent::PushCompleted { .. })));
}

#[tokio::test]
async fn test_push_failure_is_reported() {
    let backend = Arc::new(FakeBackend::new(Fail::Push));
    let (runner, notifier) = runner_with(backend.clone());
    let ctx = context(Path::new("/vault/site"), "github.com/me/site");

    let err = runner.run(&ctx).await.unwrap_err();

    assert!(matches!(err, SyncError::Push(GitError::AuthenticationRejected)));
    assert_eq!(
        runner.phase(),
        SyncPhase::Failed {
            step: SyncStep::Push
        }
    );
    assert_eq!(notifier.failures()[0].0, SyncStep::Push);
}

#[tokio::test]
async fn test_failure_is_not_repeated_as_a_warning() {
    let warnings = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(WarnCounter(warnings.clone()));
    let _default = tracing::subscriber::set_default(subscriber);

    let backend = Arc::new(FakeBackend::new(Fail::Push));
    let (runner, notifier) = runner_with(backend);
    let ctx = context(Path::new("/vault/site"), "github.com/me/site");

    runner.run(&ctx).await.unwrap_err();

    assert_eq!(notifier.failures().len(), 1);
    assert_eq!(warnings.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_overlapping_sync_is_rejected() {
    let backend = Arc::new(FakeBackend::gated());
    let (runner, notifier) = runner_with(backend.clone());
    let runner = Arc::new(runner);
    let ctx = context(Path::new("/vault/site"), "github.com/me/site");

    let first = {
        let runner = runner.clone();
        let ctx = ctx.clone();
        tokio::spawn(async move { runner.run(&ctx).await })
    };
    backend.entered_stage.notified().await;
    assert!(runner.is_running());
    assert_eq!(runner.phase(), SyncPhase::Staging);

    let second = runner.run(&ctx).await;
    assert!(matches!(second, Err(SyncError::AlreadyRunning)));
    assert!(notifier
        .events()
        .iter()
        .any(|e| matches!(e, LogEvent::SyncAlreadyRunning)));

    backend.release_stage.as_ref().unwrap().notify_one();
    first.await.unwrap().unwrap();

    // Only the first run touched the backend.
    assert_eq!(backend.calls().iter().filter(|c| *c == "stage").count(), 1);
    assert!(!runner.is_running());
}

#[tokio::test]
async fn test_runner_can_sync_again_after_failure() {
    let backend = Arc::new(FakeBackend::new(Fail::Push));
    let (runner, _notifier) = runner_with(backend.clone());
    let ctx = context(Path::new("/vault/site"), "github.com/me/site");

    assert!(runner.run(&ctx).await.is_err());
    assert!(matches!(runner.run(&ctx).await, Err(SyncError::Push(_))));
    assert_eq!(backend.calls().iter().filter(|c| *c == "push").count(), 2);
}

#[tokio::test]
async fn test_phase_subscription_sees_final_phase() {
    let backend = Arc::new(FakeBackend::new(Fail::None));
    let (runner, _notifier) = runner_with(backend);
    let rx = runner.subscribe();
    let ctx = context(Path::new("/vault/site"), "github.com/me/site");

    runner.run(&ctx).await.unwrap();

    assert_eq!(*rx.borrow(), SyncPhase::Done);
}

// ============================================================
// End to end against real repositories
// ============================================================

fn write_file(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn init_checkout(root: &Path) -> Repository {
    let mut opts = RepositoryInitOptions::new();
    opts.initial_head("main");
    Repository::init_opts(root, &opts).unwrap()
}

fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}

fn git_runner() -> (SyncRunner, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let runner = SyncRunner::new(Arc::new(GitBackend::new()), notifier.clone(), fixed_clock());
    (runner, notifier)
}

#[tokio::test]
async fn test_end_to_end_sync_pushes_watched_changes() {
    let work = TempDir::new().unwrap();
    let remote_dir = TempDir::new().unwrap();
    let checkout = init_checkout(work.path());
    let remote = Repository::init_bare(remote_dir.path()).unwrap();

    write_file(work.path(), "public/index.html", "<h1>home</h1>");
    write_file(work.path(), "content/post.md", "# post");
    write_file(work.path(), "public/.DS_Store", "junk");
    write_file(work.path(), "notes/private.md", "not synced");

    let (runner, _notifier) = git_runner();
    let ctx = context(work.path(), &file_url(remote_dir.path()));

    let summary = runner.run(&ctx).await.unwrap();

    assert_eq!(summary.staged.added.len(), 2);
    assert_eq!(summary.staged.skipped, vec!["public/.DS_Store"]);

    let pushed = remote
        .find_reference("refs/heads/main")
        .unwrap()
        .peel_to_commit()
        .unwrap();
    assert_eq!(pushed.id().to_string(), summary.commit.id());
    assert_eq!(pushed.message(), Some("H 2026-10-16 09:30:00"));
    let tree = pushed.tree().unwrap();
    assert!(tree.get_path(Path::new("public/index.html")).is_ok());
    assert!(tree.get_path(Path::new("content/post.md")).is_ok());
    assert!(tree.get_path(Path::new("public/.DS_Store")).is_err());
    assert!(tree.get_path(Path::new("notes/private.md")).is_err());

    // A second sync with nothing new fails at the commit step.
    let err = runner.run(&ctx).await.unwrap_err();
    assert!(matches!(err, SyncError::Commit(GitError::NothingToCommit)));
    assert_eq!(
        checkout.refname_to_id("refs/heads/main").unwrap(),
        pushed.id()
    );
}

#[tokio::test]
async fn test_end_to_end_failed_push_is_retried_next_run() {
    let work = TempDir::new().unwrap();
    let remote_dir = TempDir::new().unwrap();
    let checkout = init_checkout(work.path());
    let remote = Repository::init_bare(remote_dir.path()).unwrap();
    write_file(work.path(), "content/post.md", "# post");

    let (runner, notifier) = git_runner();
    let unreachable = context(
        work.path(),
        &file_url(&work.path().join("missing-remote.git")),
    );

    let err = runner.run(&unreachable).await.unwrap_err();
    assert!(matches!(err, SyncError::Push(_)));
    assert!(notifier.failures()[0]
        .1
        .starts_with("Error pushing to remote: "));
    let committed = checkout.refname_to_id("refs/heads/main").unwrap();

    let reachable = context(work.path(), &file_url(remote_dir.path()));
    let summary = runner.run(&reachable).await.unwrap();

    assert_eq!(
        summary.commit,
        CommitOutcome::Unpushed {
            id: committed.to_string()
        }
    );
    assert_eq!(remote.refname_to_id("refs/heads/main").unwrap(), committed);
}

#[tokio::test]
async fn test_end_to_end_missing_checkout_is_a_staging_failure() {
    let vault = TempDir::new().unwrap();
    let (runner, notifier) = git_runner();
    let ctx = context(&vault.path().join("site"), "github.com/me/site");

    let err = runner.run(&ctx).await.unwrap_err();

    assert!(matches!(err, SyncError::Staging(GitError::NotARepo(_))));
    assert_eq!(notifier.failures()[0].0, SyncStep::Stage);
}
