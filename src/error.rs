use std::fmt;

#[derive(Debug)]
pub enum ChargerError {
    /// A system command could not be spawned or exited non-zero.
    Command { program: String, message: String },
    /// Both telemetry sources failed. Fatal for the process.
    TelemetryUnavailable(String),
    Tray(String),
    Io(std::io::Error),
    ConfigParse(toml::de::Error),
    ConfigWrite(toml::ser::Error),
}

impl fmt::Display for ChargerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command { program, message } => write!(f, "Command failed: {program}: {message}"),
            Self::TelemetryUnavailable(msg) => write!(f, "Charger telemetry unavailable: {msg}"),
            Self::Tray(msg) => write!(f, "Tray error: {msg}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::ConfigParse(e) => write!(f, "Config parse error: {e}"),
            Self::ConfigWrite(e) => write!(f, "Config write error: {e}"),
        }
    }
}

impl std::error::Error for ChargerError {}

impl From<std::io::Error> for ChargerError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<toml::de::Error> for ChargerError {
    fn from(e: toml::de::Error) -> Self {
        Self::ConfigParse(e)
    }
}

impl From<toml::ser::Error> for ChargerError {
    fn from(e: toml::ser::Error) -> Self {
        Self::ConfigWrite(e)
    }
}
