// macOS helpers that shell out to system tools: osascript for notifications
// and alerts, `defaults` for the appearance, `open` for URLs.

use std::process::Command;
use tracing::warn;

use crate::monitor::Notifier;
use crate::state::ChargerNotification;

/// Strip characters that would break out of an AppleScript string literal.
fn clean(s: &str) -> String {
    s.replace('\\', "").replace('"', "'")
}

fn notification_script(title: &str, body: Option<&str>) -> String {
    format!(
        "display notification \"{}\" with title \"{}\"",
        clean(body.unwrap_or("")),
        clean(title),
    )
}

fn alert_script(title: &str, message: &str) -> String {
    format!(
        "display alert \"{}\" message \"{}\" as critical",
        clean(title),
        clean(message),
    )
}

fn run_osascript(script: &str) -> Result<(), String> {
    match Command::new("osascript").args(["-e", script]).output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(output) => Err(format!(
            "osascript failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )),
        Err(e) => Err(format!("failed to run osascript: {e}")),
    }
}

/// Silent desktop notifications via osascript, which needs no
/// UNUserNotificationCenter entitlements.
pub struct OsascriptNotifier;

impl Notifier for OsascriptNotifier {
    fn notify(&self, notification: &ChargerNotification) {
        let script = notification_script(&notification.title, notification.body.as_deref());
        if let Err(e) = run_osascript(&script) {
            warn!(error = %e, "failed to send notification");
        }
    }
}

/// Show a blocking error alert. Returns once the user dismisses it.
pub fn show_error_alert(title: &str, message: &str) {
    if let Err(e) = run_osascript(&alert_script(title, message)) {
        warn!(error = %e, "failed to show error alert");
    }
}

/// Whether the menu bar uses the dark appearance. `defaults` exits non-zero
/// when the key is absent, which means light mode.
pub fn is_dark_mode() -> bool {
    Command::new("defaults")
        .args(["read", "-g", "AppleInterfaceStyle"])
        .output()
        .map(|o| o.status.success() && String::from_utf8_lossy(&o.stdout).trim() == "Dark")
        .unwrap_or(false)
}

pub fn open_url(url: &str) {
    if let Err(e) = Command::new("open").arg(url).spawn() {
        warn!(url, error = %e, "failed to open url");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_strips_quotes_and_backslashes() {
        assert_eq!(clean(r#"say "hi" \now"#), "say 'hi' now");
    }

    #[test]
    fn test_notification_script() {
        assert_eq!(
            notification_script("\u{26A1}Charging", Some("Power: 30W")),
            "display notification \"Power: 30W\" with title \"\u{26A1}Charging\""
        );
        assert_eq!(
            notification_script("Missed charger.", None),
            "display notification \"\" with title \"Missed charger.\""
        );
    }

    #[test]
    fn test_alert_script() {
        assert_eq!(
            alert_script("Error : Charger Information", "pmset \"failed\""),
            "display alert \"Error : Charger Information\" message \"pmset 'failed'\" as critical"
        );
    }
}
