use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::ChargerError;

pub const AGENT_LABEL: &str = "com.charger-info.menubar";

/// A per-user LaunchAgent that starts the app at login.
pub struct LaunchAgent {
    plist_path: PathBuf,
    program: PathBuf,
}

impl LaunchAgent {
    pub fn new(plist_path: PathBuf, program: PathBuf) -> Self {
        Self {
            plist_path,
            program,
        }
    }

    /// The agent for the running executable under ~/Library/LaunchAgents.
    pub fn for_current_exe() -> Result<Self, ChargerError> {
        let home = dirs::home_dir()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no home directory"))?;
        let plist_path = home
            .join("Library/LaunchAgents")
            .join(format!("{AGENT_LABEL}.plist"));
        Ok(Self::new(plist_path, std::env::current_exe()?))
    }

    pub fn plist_path(&self) -> &Path {
        &self.plist_path
    }

    pub fn is_registered(&self) -> bool {
        self.plist_path.exists()
    }

    pub fn register(&self) -> Result<(), ChargerError> {
        if let Some(parent) = self.plist_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.plist_path, self.plist())?;
        info!(path = %self.plist_path.display(), "registered launch agent");
        Ok(())
    }

    /// Remove the plist. A plist that is already gone counts as unregistered.
    pub fn unregister(&self) -> Result<(), ChargerError> {
        match fs::remove_file(&self.plist_path) {
            Ok(()) => {
                info!(path = %self.plist_path.display(), "removed launch agent");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<(), ChargerError> {
        if enabled {
            self.register()
        } else {
            self.unregister()
        }
    }

    fn plist(&self) -> String {
        let program = xml_escape(&self.program.to_string_lossy());
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{AGENT_LABEL}</string>
    <key>ProgramArguments</key>
    <array>
        <string>{program}</string>
    </array>
    <key>RunAtLoad</key>
    <true/>
</dict>
</plist>
"#
        )
    }
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
