use crate::telemetry::TelemetrySnapshot;

pub const STATUS_CHARGING: &str = "\u{26A1}Charging";
pub const STATUS_MISSED: &str = "Missed charger.";

/// Everything the tray shows for one snapshot, already formatted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargerDisplay {
    pub charging: bool,
    pub status: String,
    pub power: String,
    pub voltage: String,
    pub current: String,
    pub title: String,
    /// Hover text; mirrors the status line.
    pub tooltip: String,
}

impl ChargerDisplay {
    pub fn from_snapshot(snapshot: &TelemetrySnapshot, show_power: bool) -> Self {
        if !snapshot.is_charging() {
            return Self {
                charging: false,
                status: STATUS_MISSED.into(),
                power: String::new(),
                voltage: String::new(),
                current: String::new(),
                title: String::new(),
                tooltip: STATUS_MISSED.into(),
            };
        }

        let watts = snapshot.watts.as_deref().unwrap_or_default();
        let title = if show_power {
            format!("{watts}W")
        } else {
            String::new()
        };

        Self {
            charging: true,
            status: STATUS_CHARGING.into(),
            power: format!("\tPower: {watts}W"),
            voltage: format!("\tVoltage: {}V", milli_to_unit(&snapshot.voltage_milli)),
            current: format!("\tCurrent: {}A", milli_to_unit(&snapshot.current_milli)),
            title,
            tooltip: STATUS_CHARGING.into(),
        }
    }
}

/// Title and body of the change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargerNotification {
    pub title: String,
    pub body: Option<String>,
}

impl ChargerNotification {
    pub fn from_snapshot(snapshot: &TelemetrySnapshot) -> Self {
        if !snapshot.is_charging() {
            return Self {
                title: STATUS_MISSED.into(),
                body: None,
            };
        }

        let watts = snapshot.watts.as_deref().unwrap_or_default();
        Self {
            title: STATUS_CHARGING.into(),
            body: Some(format!(
                "Power: {watts}W\nVoltage: {}V / Current: {}A",
                milli_to_unit(&snapshot.voltage_milli),
                milli_to_unit(&snapshot.current_milli),
            )),
        }
    }
}

/// Convert a milli-unit digit string to its unit value in shortest decimal
/// form: "20000" -> "20", "1500" -> "1.5".
pub fn milli_to_unit(milli: &Option<String>) -> String {
    match milli.as_deref().and_then(|s| s.parse::<f64>().ok()) {
        Some(v) => format!("{}", v / 1000.0),
        None => "?".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(w: Option<&str>, v: Option<&str>, c: Option<&str>) -> TelemetrySnapshot {
        TelemetrySnapshot {
            watts: w.map(Into::into),
            voltage_milli: v.map(Into::into),
            current_milli: c.map(Into::into),
            source: None,
        }
    }

    #[test]
    fn test_milli_to_unit() {
        assert_eq!(milli_to_unit(&Some("20000".into())), "20");
        assert_eq!(milli_to_unit(&Some("1500".into())), "1.5");
        assert_eq!(milli_to_unit(&Some("3250".into())), "3.25");
        assert_eq!(milli_to_unit(&Some("0".into())), "0");
        assert_eq!(milli_to_unit(&None), "?");
    }

    #[test]
    fn test_display_charging() {
        let d = ChargerDisplay::from_snapshot(&snapshot(Some("30"), Some("20000"), Some("1500")), true);
        assert!(d.charging);
        assert_eq!(d.status, STATUS_CHARGING);
        assert_eq!(d.power, "\tPower: 30W");
        assert_eq!(d.voltage, "\tVoltage: 20V");
        assert_eq!(d.current, "\tCurrent: 1.5A");
        assert_eq!(d.title, "30W");
        assert_eq!(d.tooltip, d.status);
    }

    #[test]
    fn test_display_hides_title_when_show_power_off() {
        let d = ChargerDisplay::from_snapshot(&snapshot(Some("30"), Some("20000"), Some("1500")), false);
        assert!(d.charging);
        assert_eq!(d.title, "");
    }

    #[test]
    fn test_display_partial_snapshot_is_missed() {
        let d = ChargerDisplay::from_snapshot(&snapshot(Some("0"), None, None), true);
        assert!(!d.charging);
        assert_eq!(d.status, STATUS_MISSED);
        assert_eq!(d.title, "");
        assert_eq!(d.tooltip, d.status);
    }

    #[test]
    fn test_notification_text() {
        let n = ChargerNotification::from_snapshot(&snapshot(Some("30"), Some("20000"), Some("1500")));
        assert_eq!(n.title, STATUS_CHARGING);
        assert_eq!(
            n.body.as_deref(),
            Some("Power: 30W\nVoltage: 20V / Current: 1.5A")
        );

        let missed = ChargerNotification::from_snapshot(&TelemetrySnapshot::default());
        assert_eq!(missed.title, STATUS_MISSED);
        assert_eq!(missed.body, None);
    }
}
