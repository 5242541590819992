//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;
use std::path::PathBuf;

/// Run the config command. `path` is the file the settings were loaded from.
pub fn run_config(action: &ConfigAction, settings: Settings, path: PathBuf) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&settings)
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Path => {
            println!("{}", path.display());
        }

        ConfigAction::Init { force } => {
            if path.exists() && !force {
                Output::warning(&format!("{} already exists (use --force to overwrite)", path.display()));
                return Ok(());
            }
            settings.save_to(&path)?;
            Output::success(&format!("Wrote configuration to {}", path.display()));
        }
    }

    Ok(())
}
