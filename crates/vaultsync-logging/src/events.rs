use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// How long a normal notice stays on screen
pub const NOTICE_DISPLAY: Duration = Duration::from_secs(4);

/// How long a failure notice stays on screen
pub const ERROR_DISPLAY: Duration = Duration::from_secs(10);

/// Step of the sync flow an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStep {
    Stage,
    Commit,
    Push,
}

impl std::fmt::Display for SyncStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncStep::Stage => write!(f, "stage"),
            SyncStep::Commit => write!(f, "commit"),
            SyncStep::Push => write!(f, "push"),
        }
    }
}

/// User-facing notices emitted while a sync runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    SyncStarted {
        working_dir: PathBuf,
    },
    StagingCompleted {
        added: usize,
        removed: usize,
        skipped: usize,
    },
    CommitCreated {
        id: String,
        message: String,
    },
    /// Nothing new to commit, an earlier commit is pushed instead
    CommitPending {
        id: String,
    },
    PushCompleted {
        repository: String,
    },
    SyncFailed {
        step: SyncStep,
        message: String,
        display_secs: u64,
    },
    SyncAlreadyRunning,
}

impl LogEvent {
    /// Failure notice for `step`, shown for [`ERROR_DISPLAY`]
    pub fn failed(step: SyncStep, message: impl Into<String>) -> Self {
        LogEvent::SyncFailed {
            step,
            message: message.into(),
            display_secs: ERROR_DISPLAY.as_secs(),
        }
    }

    /// How long a host with transient notifications should show this event
    pub fn display_duration(&self) -> Duration {
        match self {
            LogEvent::SyncFailed { display_secs, .. } => Duration::from_secs(*display_secs),
            LogEvent::SyncAlreadyRunning => ERROR_DISPLAY,
            _ => NOTICE_DISPLAY,
        }
    }

    /// The event as a JSON record, with a timestamp and its display time
    fn to_record(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
            obj.insert(
                "display_secs".to_string(),
                serde_json::Value::from(self.display_duration().as_secs()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for sync notices - handles both console output and file logging
pub struct Logger {
    format: LogFormat,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            file_writer: None,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            file_writer: Some(Mutex::new(file)),
        })
    }

    pub fn log(&self, event: &LogEvent) {
        // File output is always JSON
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let _ = writeln!(file, "{}", event.to_record());
            }
        }

        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &LogEvent) {
        let _ = writeln!(std::io::stderr(), "{}", event.to_record());
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::SyncStarted { working_dir } => {
                let _ = writeln!(
                    stderr,
                    "{} {} {}",
                    "▶".bright_cyan(),
                    "Syncing".bright_cyan().bold(),
                    working_dir.display().to_string().dimmed()
                );
            }
            LogEvent::StagingCompleted {
                added,
                removed,
                skipped,
            } => {
                if added + removed == 0 {
                    let _ = writeln!(stderr, "  {} {}", "·".dimmed(), "No changes staged".dimmed());
                } else {
                    let _ = writeln!(
                        stderr,
                        "  {} Staged {}, {}",
                        "✓".bright_green(),
                        format!("+{}", added).green(),
                        format!("-{}", removed).red()
                    );
                }
                if *skipped > 0 {
                    let _ = writeln!(
                        stderr,
                        "  {} {}",
                        "·".dimmed(),
                        format!(
                            "Skipped {} {}",
                            skipped,
                            if *skipped == 1 { "file" } else { "files" }
                        )
                        .dimmed()
                    );
                }
            }
            LogEvent::CommitCreated { id, message } => {
                let _ = writeln!(
                    stderr,
                    "  {} Committed {} {}",
                    "✓".bright_green(),
                    short_id(id).bright_yellow(),
                    message.dimmed()
                );
            }
            LogEvent::CommitPending { id } => {
                let _ = writeln!(
                    stderr,
                    "  {} Nothing new to commit, pushing {}",
                    "·".dimmed(),
                    short_id(id).bright_yellow()
                );
            }
            LogEvent::PushCompleted { repository } => {
                let _ = writeln!(
                    stderr,
                    "{} Successfully pushed to {}",
                    "✓".bright_green(),
                    repository.bold()
                );
            }
            LogEvent::SyncFailed { message, .. } => {
                let _ = writeln!(stderr, "{} {}", "✗".bright_red(), message.bright_red());
            }
            LogEvent::SyncAlreadyRunning => {
                let _ = writeln!(
                    stderr,
                    "{} {}",
                    "⚠".bright_yellow(),
                    "A sync is already in progress".bright_yellow()
                );
            }
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        let timestamp = chrono::Local::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::SyncStarted { working_dir } => {
                format!("[{}] sync:start {}", timestamp, working_dir.display())
            }
            LogEvent::StagingCompleted {
                added,
                removed,
                skipped,
            } => format!(
                "[{}] stage:done +{} -{} ~{}",
                timestamp, added, removed, skipped
            ),
            LogEvent::CommitCreated { id, .. } => {
                format!("[{}] commit:done {}", timestamp, short_id(id))
            }
            LogEvent::CommitPending { id } => {
                format!("[{}] commit:pending {}", timestamp, short_id(id))
            }
            LogEvent::PushCompleted { repository } => {
                format!("[{}] push:done {}", timestamp, repository)
            }
            LogEvent::SyncFailed { step, message, .. } => {
                format!("[{}] {}:error {}", timestamp, step, message)
            }
            LogEvent::SyncAlreadyRunning => format!("[{}] sync:busy", timestamp),
        };
        let _ = writeln!(stderr, "{}", msg);
    }
}

fn short_id(id: &str) -> &str {
    id.get(..7).unwrap_or(id)
}
