//! Settings persistence for vaultsync.
//!
//! The six sync settings live in one TOML file, by default
//! `<config dir>/vaultsync/settings.toml`. They are loaded once at start and
//! saved once per edited field.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use vaultsync_core::SyncContext;
use vaultsync_git::{AccessToken, Author};

/// Directory under the platform config dir holding our files
pub const CONFIG_DIR_NAME: &str = "vaultsync";

/// The settings file name
pub const SETTINGS_FILE_NAME: &str = "settings.toml";

/// Sync settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Account owner; informational only
    pub username: String,
    /// Repository path without scheme, e.g. `github.com/me/site`
    pub repository_url: String,
    /// Personal access token used for the push
    pub access_token: AccessToken,
    /// Checkout location relative to the vault root
    pub working_directory: String,
    pub author_name: String,
    pub author_email: String,
}

/// One editable settings field
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum SettingKey {
    Username,
    RepositoryUrl,
    AccessToken,
    WorkingDirectory,
    AuthorName,
    AuthorEmail,
}

impl SettingKey {
    pub const ALL: [SettingKey; 6] = [
        SettingKey::Username,
        SettingKey::RepositoryUrl,
        SettingKey::AccessToken,
        SettingKey::WorkingDirectory,
        SettingKey::AuthorName,
        SettingKey::AuthorEmail,
    ];

    /// Key as written in the settings file
    pub fn name(&self) -> &'static str {
        match self {
            SettingKey::Username => "username",
            SettingKey::RepositoryUrl => "repository_url",
            SettingKey::AccessToken => "access_token",
            SettingKey::WorkingDirectory => "working_directory",
            SettingKey::AuthorName => "author_name",
            SettingKey::AuthorEmail => "author_email",
        }
    }

    /// Label shown in the interactive form
    pub fn label(&self) -> &'static str {
        match self {
            SettingKey::Username => "Username",
            SettingKey::RepositoryUrl => "Repository URL (without https://)",
            SettingKey::AccessToken => "Access token",
            SettingKey::WorkingDirectory => "Working directory (relative to the vault)",
            SettingKey::AuthorName => "Commit author name",
            SettingKey::AuthorEmail => "Commit author email",
        }
    }

    pub fn is_secret(&self) -> bool {
        matches!(self, SettingKey::AccessToken)
    }
}

impl Settings {
    pub fn set(&mut self, key: SettingKey, value: String) {
        match key {
            SettingKey::Username => self.username = value,
            SettingKey::RepositoryUrl => self.repository_url = value,
            SettingKey::AccessToken => self.access_token = AccessToken::new(value),
            SettingKey::WorkingDirectory => self.working_directory = value,
            SettingKey::AuthorName => self.author_name = value,
            SettingKey::AuthorEmail => self.author_email = value,
        }
    }

    /// Value of `key` for display; the token is redacted
    pub fn display_value(&self, key: SettingKey) -> String {
        match key {
            SettingKey::Username => self.username.clone(),
            SettingKey::RepositoryUrl => self.repository_url.clone(),
            SettingKey::AccessToken => self.access_token.to_string(),
            SettingKey::WorkingDirectory => self.working_directory.clone(),
            SettingKey::AuthorName => self.author_name.clone(),
            SettingKey::AuthorEmail => self.author_email.clone(),
        }
    }

    /// Fields a sync cannot do without that are still empty
    pub fn missing_fields(&self) -> Vec<SettingKey> {
        let mut missing = Vec::new();
        if self.repository_url.trim().is_empty() {
            missing.push(SettingKey::RepositoryUrl);
        }
        if self.access_token.is_empty() {
            missing.push(SettingKey::AccessToken);
        }
        if self.author_name.trim().is_empty() {
            missing.push(SettingKey::AuthorName);
        }
        if self.author_email.trim().is_empty() {
            missing.push(SettingKey::AuthorEmail);
        }
        missing
    }

    /// Checkout location for a vault rooted at `vault_root`
    pub fn working_dir(&self, vault_root: &Path) -> PathBuf {
        let relative = self.working_directory.trim();
        if relative.is_empty() {
            vault_root.to_path_buf()
        } else {
            vault_root.join(relative)
        }
    }

    pub fn to_context(&self, vault_root: &Path, hostname: &str) -> SyncContext {
        SyncContext::new(
            self.working_dir(vault_root),
            self.repository_url.trim(),
            self.access_token.clone(),
            Author::new(self.author_name.clone(), self.author_email.clone()),
            hostname,
        )
    }
}

/// Load/save contract for the settings record
pub trait SettingsStore {
    fn load(&self) -> Result<Settings>;
    fn save(&self, settings: &Settings) -> Result<()>;
}

/// Settings kept in a TOML file
#[derive(Debug, Clone)]
pub struct TomlSettingsStore {
    path: PathBuf,
}

impl TomlSettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store at the platform default location
    pub fn default_location() -> Result<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(Self::new(dir.join(CONFIG_DIR_NAME).join(SETTINGS_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for TomlSettingsStore {
    /// Returns defaults if the file does not exist; a file that exists but
    /// fails to parse is a hard error.
    fn load(&self) -> Result<Settings> {
        if !self.path.exists() {
            return Ok(Settings::default());
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;

        toml::from_str(&content).with_context(|| format!("Failed to parse {}", self.path.display()))
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(settings).context("Failed to serialize settings")?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;

        restrict_permissions(&self.path)
    }
}

/// The file holds a token, keep it owner-only
#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .with_context(|| format!("Failed to set permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
