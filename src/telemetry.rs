// Power adapter telemetry. The primary source is the AdapterDetails entry
// of the AppleSmartBattery IORegistry node; `pmset -g ac` is the fallback for
// machines where ioreg does not expose it.

use std::process::Command;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, error, warn};

use crate::error::ChargerError;

const PRIMARY_PROGRAM: &str = "ioreg";
const PRIMARY_ARGS: &[&str] = &["-rn", "AppleSmartBattery"];
const PRIMARY_KEY: &str = "\"AdapterDetails\"";

const FALLBACK_PROGRAM: &str = "pmset";
const FALLBACK_ARGS: &[&str] = &["-g", "ac"];

static ADAPTER_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{.+\}").unwrap());
static IOREG_WATTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""Watts"=([0-9]+)"#).unwrap());
static IOREG_VOLTAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""Voltage"=([0-9]+)"#).unwrap());
static IOREG_CURRENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""Current"=([0-9]+)"#).unwrap());
static PMSET_WATTS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Wattage = ([0-9]+)").unwrap());
static PMSET_VOLTAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Voltage = ([0-9]+)").unwrap());
static PMSET_CURRENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Current = ([0-9]+)").unwrap());

/// Which query produced a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetrySource {
    Ioreg,
    Pmset,
}

/// One reading of the adapter. Values are kept as the raw digit strings the
/// OS reported; voltage and current are in milli-units.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub watts: Option<String>,
    pub voltage_milli: Option<String>,
    pub current_milli: Option<String>,
    pub source: Option<TelemetrySource>,
}

impl TelemetrySnapshot {
    fn empty(source: TelemetrySource) -> Self {
        Self {
            source: Some(source),
            ..Self::default()
        }
    }

    /// Charging is all-or-nothing: every field must be present and non-empty.
    pub fn is_charging(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        present(&self.watts) && present(&self.voltage_milli) && present(&self.current_milli)
    }

    /// Field-wise string equality, ignoring which source produced the reading.
    pub fn same_reading(&self, other: &Self) -> bool {
        self.watts == other.watts
            && self.voltage_milli == other.voltage_milli
            && self.current_milli == other.current_milli
    }
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Keep only the AdapterDetails lines of ioreg output. `None` when there are
/// none, which counts as a failed primary query.
pub fn adapter_details(stdout: &str) -> Option<String> {
    let lines: Vec<&str> = stdout.lines().filter(|l| l.contains(PRIMARY_KEY)).collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Parse the `{...}` block of an AdapterDetails line.
pub fn parse_ioreg(details: &str) -> TelemetrySnapshot {
    let Some(block) = ADAPTER_BLOCK.find(details) else {
        return TelemetrySnapshot::empty(TelemetrySource::Ioreg);
    };
    let block = block.as_str();
    TelemetrySnapshot {
        watts: capture(&IOREG_WATTS, block),
        voltage_milli: capture(&IOREG_VOLTAGE, block),
        current_milli: capture(&IOREG_CURRENT, block),
        source: Some(TelemetrySource::Ioreg),
    }
}

/// Parse the line-oriented `pmset -g ac` output.
pub fn parse_pmset(stdout: &str) -> TelemetrySnapshot {
    TelemetrySnapshot {
        watts: capture(&PMSET_WATTS, stdout),
        voltage_milli: capture(&PMSET_VOLTAGE, stdout),
        current_milli: capture(&PMSET_CURRENT, stdout),
        source: Some(TelemetrySource::Pmset),
    }
}

/// Runs a system command and returns its stdout.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, ChargerError>;
}

pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, ChargerError> {
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| ChargerError::Command {
                program: program.into(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ChargerError::Command {
                program: program.into(),
                message: format!("{}: {}", output.status, stderr.trim()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Reads adapter telemetry, latching onto the fallback source for good once
/// the primary source fails.
pub struct TelemetryReader<R: CommandRunner> {
    runner: R,
    fallback: bool,
    exhausted: Option<String>,
}

impl<R: CommandRunner> TelemetryReader<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            fallback: false,
            exhausted: None,
        }
    }

    #[cfg(test)]
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    #[cfg(test)]
    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn read(&mut self) -> Result<TelemetrySnapshot, ChargerError> {
        if let Some(msg) = &self.exhausted {
            return Err(ChargerError::TelemetryUnavailable(msg.clone()));
        }

        if !self.fallback {
            let primary = self
                .runner
                .run(PRIMARY_PROGRAM, PRIMARY_ARGS)
                .and_then(|out| {
                    adapter_details(&out).ok_or_else(|| ChargerError::Command {
                        program: PRIMARY_PROGRAM.into(),
                        message: "no AdapterDetails entry".into(),
                    })
                });
            match primary {
                Ok(details) => {
                    let snapshot = parse_ioreg(&details);
                    debug!(?snapshot, "read adapter details");
                    return Ok(snapshot);
                }
                Err(e) => {
                    warn!(error = %e, "primary telemetry query failed, switching to pmset");
                    self.fallback = true;
                }
            }
        }

        match self.runner.run(FALLBACK_PROGRAM, FALLBACK_ARGS) {
            Ok(out) if out.is_empty() => Ok(TelemetrySnapshot::empty(TelemetrySource::Pmset)),
            Ok(out) => {
                let snapshot = parse_pmset(&out);
                debug!(?snapshot, "read pmset ac");
                Ok(snapshot)
            }
            Err(e) => {
                error!(error = %e, "fallback telemetry query failed");
                let msg = e.to_string();
                self.exhausted = Some(msg.clone());
                Err(ChargerError::TelemetryUnavailable(msg))
            }
        }
    }
}
