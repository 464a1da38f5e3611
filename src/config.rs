use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::ChargerError;

/// User toggles shown as checkboxes in the tray menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Preferences {
    #[serde(default)]
    pub notify_on_change: bool,
    #[serde(default = "default_show_power")]
    pub show_power: bool,
    #[serde(default)]
    pub launch_at_startup: bool,
}

fn default_show_power() -> bool {
    true
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            notify_on_change: false,
            show_power: default_show_power(),
            launch_at_startup: false,
        }
    }
}

/// Preference file location.
/// Search order:
///   1. CHARGER_INFO_CONFIG env var
///   2. ~/.charger-info/preferences.toml
pub fn path() -> Option<PathBuf> {
    std::env::var("CHARGER_INFO_CONFIG")
        .ok()
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|h| h.join(".charger-info/preferences.toml")))
}

/// Load preferences, falling back to defaults when the file is missing or bad.
pub fn load() -> Preferences {
    match path() {
        Some(p) => load_from(&p),
        None => {
            warn!("no home directory, using default preferences");
            Preferences::default()
        }
    }
}

pub fn load_from(path: &Path) -> Preferences {
    if !path.exists() {
        info!(path = %path.display(), "no preferences file found, using defaults");
        return Preferences::default();
    }

    match read_from(path) {
        Ok(prefs) => {
            info!(
                path = %path.display(),
                notify = prefs.notify_on_change,
                show_power = prefs.show_power,
                startup = prefs.launch_at_startup,
                "loaded preferences"
            );
            prefs
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load preferences");
            Preferences::default()
        }
    }
}

fn read_from(path: &Path) -> Result<Preferences, ChargerError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

impl Preferences {
    pub fn save(&self) -> Result<(), ChargerError> {
        match path() {
            Some(p) => self.save_to(&p),
            None => Err(ChargerError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no home directory",
            ))),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ChargerError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string(self)?)?;
        info!(path = %path.display(), "saved preferences");
        Ok(())
    }
}
