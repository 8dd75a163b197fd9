//! Interactive settings form.
//!
//! Asks for each field in turn and saves after every answer, so an
//! interrupted form keeps what was already entered.

use anyhow::Result;
use colored::Colorize;
use dialoguer::{Input, Password};

use crate::config::{SettingKey, SettingsStore};

/// Token answer that clears a saved token
const CLEAR_TOKEN: &str = "-";

/// New token for a form answer, or `None` to keep the saved one
fn token_answer(entered: String) -> Option<String> {
    match entered.as_str() {
        "" => None,
        CLEAR_TOKEN => Some(String::new()),
        _ => Some(entered),
    }
}

pub fn handle_init(store: &dyn SettingsStore) -> Result<()> {
    eprintln!("{}", "Setting up vaultsync...".bold());
    eprintln!();

    let mut settings = store.load()?;

    for key in SettingKey::ALL {
        let value = if key.is_secret() {
            let hint = if settings.access_token.is_empty() {
                String::new()
            } else {
                format!(" (empty keeps the current one, {} clears it)", CLEAR_TOKEN)
                    .dimmed()
                    .to_string()
            };
            let entered = Password::new()
                .with_prompt(format!("{}{}", key.label(), hint))
                .allow_empty_password(true)
                .interact()?;
            match token_answer(entered) {
                Some(token) => token,
                None => continue,
            }
        } else {
            Input::<String>::new()
                .with_prompt(key.label())
                .with_initial_text(settings.display_value(key))
                .allow_empty(true)
                .interact_text()?
        };

        if value == settings.display_value(key) && !key.is_secret() {
            continue;
        }

        settings.set(key, value);
        store.save(&settings)?;
    }

    let missing = settings.missing_fields();
    eprintln!();
    if missing.is_empty() {
        eprintln!("{} Settings saved", "✓".bright_green());
        eprintln!();
        eprintln!("Run {} to sync your vault.", "vaultsync sync".bright_cyan());
    } else {
        let names: Vec<&str> = missing.iter().map(|k| k.name()).collect();
        eprintln!(
            "{} Still missing: {}",
            "⚠".bright_yellow(),
            names.join(", ")
        );
        eprintln!(
            "Set them with {}",
            "vaultsync config set <key> <value>".bright_cyan()
        );
    }

    Ok(())
}
