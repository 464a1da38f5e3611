use tracing::{debug, info};

use crate::config::Preferences;
use crate::error::ChargerError;
use crate::state::{ChargerDisplay, ChargerNotification};
use crate::telemetry::{CommandRunner, TelemetryReader, TelemetrySnapshot};

/// UI surfaces updated on every visible change.
pub trait ChargerView {
    fn set_icon(&mut self, charging: bool);
    fn set_title(&mut self, title: &str);
    fn set_menu_info(&mut self, display: &ChargerDisplay);
    fn rebuild_menu(&mut self);
}

pub trait Notifier {
    fn notify(&self, notification: &ChargerNotification);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Reading matched the previous one; nothing was touched.
    Unchanged,
    Redrawn,
    Notified,
}

/// Owns the reader and the last snapshot, and decides what a new reading
/// should change on screen.
pub struct Monitor<R: CommandRunner> {
    reader: TelemetryReader<R>,
    current: Option<TelemetrySnapshot>,
}

impl<R: CommandRunner> Monitor<R> {
    pub fn new(reader: TelemetryReader<R>) -> Self {
        Self {
            reader,
            current: None,
        }
    }

    #[cfg(test)]
    pub fn current(&self) -> Option<&TelemetrySnapshot> {
        self.current.as_ref()
    }

    #[cfg(test)]
    pub fn reader(&self) -> &TelemetryReader<R> {
        &self.reader
    }

    /// Read telemetry and push it to the UI. Forced refreshes always redraw
    /// and never notify; timer refreshes redraw only on change.
    pub fn refresh(
        &mut self,
        force: bool,
        prefs: &Preferences,
        view: &mut impl ChargerView,
        notifier: &impl Notifier,
    ) -> Result<RefreshOutcome, ChargerError> {
        let old = self.current.take();
        let snapshot = match self.reader.read() {
            Ok(new) => &*self.current.insert(new),
            Err(e) => {
                self.current = old;
                return Err(e);
            }
        };

        if !force && old.as_ref().is_some_and(|o| o.same_reading(snapshot)) {
            return Ok(RefreshOutcome::Unchanged);
        }

        let shown = ChargerDisplay::from_snapshot(snapshot, prefs.show_power);
        view.set_icon(shown.charging);
        view.set_title(&shown.title);
        view.set_menu_info(&shown);
        view.rebuild_menu();

        let charging = shown.charging;
        if force {
            debug!(charging, "forced refresh");
            return Ok(RefreshOutcome::Redrawn);
        }

        info!(
            charging,
            watts = snapshot.watts.as_deref().unwrap_or("-"),
            "charger state changed"
        );

        if !prefs.notify_on_change {
            return Ok(RefreshOutcome::Redrawn);
        }

        notifier.notify(&ChargerNotification::from_snapshot(snapshot));
        Ok(RefreshOutcome::Notified)
    }
}
