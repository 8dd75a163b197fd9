mod config;
mod init;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing::warn;

use vaultsync_core::{local_hostname, GitBackend, SyncOutcome, SyncRunner, SystemClock};
use vaultsync_logging::{init_tracing, LogFormat, Logger};

use crate::config::{SettingKey, SettingsStore, TomlSettingsStore};

#[derive(Parser, Debug)]
#[command(
    name = "vaultsync",
    about = "Stage, commit and push a vault's published folders",
    version,
    author
)]
struct Cli {
    /// Vault root the working directory is relative to (default: current directory)
    #[arg(long, global = true)]
    vault: Option<PathBuf>,

    /// Settings file (default: <config dir>/vaultsync/settings.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty", global = true)]
    log_format: LogFormatChoice,

    /// Also append notices to this file as JSON lines
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Output the sync result as JSON
    #[arg(long, global = true)]
    json_output: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stage, commit and push (the default)
    Sync,
    /// Fill in the settings interactively
    Init,
    /// Show or edit the settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print every setting, with the token redacted
    Show,
    /// Change one setting
    Set {
        #[arg(value_enum)]
        key: SettingKey,
        value: String,
    },
    /// Print the settings file location
    Path,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_format: LogFormat = cli.log_format.into();
    init_tracing("warn", log_format);

    let store = match &cli.config {
        Some(path) => TomlSettingsStore::new(path.clone()),
        None => TomlSettingsStore::default_location()?,
    };

    match &cli.command {
        None | Some(Commands::Sync) => handle_sync(&cli, &store, log_format).await,
        Some(Commands::Init) => init::handle_init(&store),
        Some(Commands::Config { action }) => handle_config(action, &store),
    }
}

async fn handle_sync(cli: &Cli, store: &TomlSettingsStore, log_format: LogFormat) -> Result<()> {
    let vault = match &cli.vault {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let settings = store.load()?;
    for key in settings.missing_fields() {
        warn!(setting = key.name(), "Setting is empty");
    }

    let ctx = settings.to_context(&vault, &local_hostname());

    let logger = match &cli.log_file {
        Some(path) => Logger::with_file(log_format, path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?,
        None => Logger::new(log_format),
    };

    let runner = SyncRunner::new(
        Arc::new(GitBackend::new()),
        Arc::new(logger),
        Arc::new(SystemClock),
    );

    let result = runner.run(&ctx).await;
    let outcome = SyncOutcome::from_result(&result);

    if cli.json_output {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }

    std::process::exit(outcome.exit_code());
}

fn handle_config(action: &ConfigAction, store: &TomlSettingsStore) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let settings = store.load()?;
            for key in SettingKey::ALL {
                let value = settings.display_value(key);
                let shown = if value.is_empty() {
                    "<unset>".dimmed().to_string()
                } else {
                    value
                };
                println!("{:<18} {}", key.name(), shown);
            }
        }
        ConfigAction::Set { key, value } => {
            let mut settings = store.load()?;
            settings.set(*key, value.clone());
            store.save(&settings)?;
            eprintln!(
                "{} {} = {}",
                "✓".bright_green(),
                key.name(),
                settings.display_value(*key)
            );
        }
        ConfigAction::Path => {
            println!("{}", store.path().display());
        }
    }
    Ok(())
}
