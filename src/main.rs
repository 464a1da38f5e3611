mod config;
mod error;
mod monitor;
mod platform;
mod startup;
mod state;
mod telemetry;
mod tray;

use std::time::Duration;

use tao::{
    event::Event,
    event_loop::{ControlFlow, EventLoopBuilder},
};
use tray_icon::{menu::MenuEvent, TrayIconEvent};
use tracing::{error, info, warn};

use crate::config::Preferences;
use crate::error::ChargerError;
use crate::monitor::{ChargerView, Monitor, Notifier, RefreshOutcome};
use crate::platform::OsascriptNotifier;
use crate::startup::LaunchAgent;
use crate::telemetry::{CommandRunner, SystemRunner, TelemetryReader};
use crate::tray::{MenuItems, TrayView};

const POLL_INTERVAL: Duration = Duration::from_secs(5);

enum UserEvent {
    Poll,
    TrayIconEvent(TrayIconEvent),
    MenuEvent(MenuEvent),
}

fn error_title() -> String {
    format!("Error : {}", tray::APP_NAME)
}

/// Run a refresh. On a fatal telemetry error show the alert and return false;
/// the caller must stop the loop and do no further work.
fn run_refresh<R: CommandRunner>(
    monitor: &mut Monitor<R>,
    force: bool,
    prefs: &Preferences,
    view: &mut impl ChargerView,
    notifier: &impl Notifier,
    alert: impl Fn(&str, &str),
) -> bool {
    match monitor.refresh(force, prefs, view, notifier) {
        Ok(RefreshOutcome::Unchanged) => true,
        Ok(outcome) => {
            info!(?outcome, force, "tray refreshed");
            true
        }
        Err(e) => {
            error!(error = %e, "telemetry unavailable, quitting");
            alert(&error_title(), &e.to_string());
            false
        }
    }
}

enum StartupToggle {
    /// Telemetry failed fatally; nothing was written.
    Stopped,
    Applied,
    Failed(ChargerError),
}

/// Forced refresh, then write or remove the launch agent.
fn toggle_startup<R: CommandRunner>(
    monitor: &mut Monitor<R>,
    prefs: &Preferences,
    enabled: bool,
    view: &mut impl ChargerView,
    notifier: &impl Notifier,
    alert: impl Fn(&str, &str),
    agent: impl FnOnce() -> Result<LaunchAgent, ChargerError>,
) -> StartupToggle {
    if !run_refresh(monitor, true, prefs, view, notifier, alert) {
        return StartupToggle::Stopped;
    }
    match agent().and_then(|agent| agent.set_enabled(enabled)) {
        Ok(()) => StartupToggle::Applied,
        Err(e) => StartupToggle::Failed(e),
    }
}

fn save_prefs(prefs: &Preferences) {
    if let Err(e) = prefs.save() {
        warn!(error = %e, "failed to save preferences");
    }
}

/// Trust the LaunchAgents directory over the stored toggle.
fn reconcile_startup(prefs: &mut Preferences) {
    match LaunchAgent::for_current_exe() {
        Ok(agent) => {
            let registered = agent.is_registered();
            if registered != prefs.launch_at_startup {
                warn!(
                    path = %agent.plist_path().display(),
                    registered,
                    "startup preference out of sync with launch agent"
                );
                prefs.launch_at_startup = registered;
                save_prefs(prefs);
            }
        }
        Err(e) => warn!(error = %e, "cannot locate launch agent"),
    }
}

fn main() {
    // Init tracing to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("charger-info starting");

    let mut prefs = config::load();
    reconcile_startup(&mut prefs);
    let mut monitor = Monitor::new(TelemetryReader::new(SystemRunner));

    let mut event_loop = EventLoopBuilder::<UserEvent>::with_user_event().build();

    // Menu bar agent: no dock icon. Must be set before run()
    #[cfg(target_os = "macos")]
    {
        use tao::platform::macos::{ActivationPolicy, EventLoopExtMacOS};
        event_loop.set_activation_policy(ActivationPolicy::Accessory);
    }

    let proxy = event_loop.create_proxy();
    TrayIconEvent::set_event_handler(Some(move |event| {
        let _ = proxy.send_event(UserEvent::TrayIconEvent(event));
    }));

    let proxy = event_loop.create_proxy();
    MenuEvent::set_event_handler(Some(move |event| {
        let _ = proxy.send_event(UserEvent::MenuEvent(event));
    }));

    // Poll ticker; stops once the event loop is gone
    let proxy = event_loop.create_proxy();
    std::thread::spawn(move || {
        let ticker = crossbeam_channel::tick(POLL_INTERVAL);
        for _ in ticker.iter() {
            if proxy.send_event(UserEvent::Poll).is_err() {
                break;
            }
        }
    });

    let mut menu_items = Some(MenuItems::new(&prefs));
    let mut view: Option<TrayView> = None;

    event_loop.run(move |event, _event_loop_target, control_flow| {
        *control_flow = ControlFlow::Wait;

        match event {
            Event::NewEvents(tao::event::StartCause::Init) => {
                let Some(items) = menu_items.take() else {
                    return;
                };
                match TrayView::new(items) {
                    Ok(mut v) => {
                        info!("tray icon created");
                        let alive = run_refresh(
                            &mut monitor,
                            true,
                            &prefs,
                            &mut v,
                            &OsascriptNotifier,
                            platform::show_error_alert,
                        );
                        view = Some(v);
                        if !alive {
                            *control_flow = ControlFlow::Exit;
                            return;
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "failed to create tray icon");
                        platform::show_error_alert(&error_title(), &e.to_string());
                        *control_flow = ControlFlow::Exit;
                        return;
                    }
                }

                // Wake up the run loop on macOS so the icon appears
                #[cfg(target_os = "macos")]
                {
                    use objc2_core_foundation::CFRunLoop;
                    if let Some(rl) = CFRunLoop::main() {
                        rl.wake_up();
                    }
                }
            }

            Event::UserEvent(UserEvent::Poll) => {
                if let Some(ref mut v) = view {
                    let alive = run_refresh(
                        &mut monitor,
                        false,
                        &prefs,
                        v,
                        &OsascriptNotifier,
                        platform::show_error_alert,
                    );
                    if !alive {
                        *control_flow = ControlFlow::Exit;
                    }
                }
            }

            Event::UserEvent(UserEvent::MenuEvent(event)) => {
                let Some(v) = view.as_mut() else {
                    return;
                };

                if event.id == *v.items().quit_item.id() {
                    info!("quit requested");
                    view.take();
                    *control_flow = ControlFlow::Exit;
                } else if event.id == *v.items().notify_item.id() {
                    prefs.notify_on_change = v.items().notify_item.is_checked();
                    info!(enabled = prefs.notify_on_change, "change notification toggled");
                    save_prefs(&prefs);
                } else if event.id == *v.items().show_power_item.id() {
                    prefs.show_power = v.items().show_power_item.is_checked();
                    info!(enabled = prefs.show_power, "show power toggled");
                    let alive = run_refresh(
                        &mut monitor,
                        true,
                        &prefs,
                        v,
                        &OsascriptNotifier,
                        platform::show_error_alert,
                    );
                    if !alive {
                        *control_flow = ControlFlow::Exit;
                        return;
                    }
                    save_prefs(&prefs);
                } else if event.id == *v.items().startup_item.id() {
                    let enabled = v.items().startup_item.is_checked();
                    let result = toggle_startup(
                        &mut monitor,
                        &prefs,
                        enabled,
                        v,
                        &OsascriptNotifier,
                        platform::show_error_alert,
                        LaunchAgent::for_current_exe,
                    );
                    match result {
                        StartupToggle::Stopped => {
                            *control_flow = ControlFlow::Exit;
                        }
                        StartupToggle::Applied => {
                            prefs.launch_at_startup = enabled;
                            info!(enabled, "launch at startup toggled");
                            save_prefs(&prefs);
                        }
                        StartupToggle::Failed(e) => {
                            warn!(error = %e, enabled, "failed to update launch agent");
                            platform::show_error_alert(&error_title(), &e.to_string());
                            v.items().startup_item.set_checked(prefs.launch_at_startup);
                        }
                    }
                } else if event.id == *v.items().github_item.id() {
                    platform::open_url(tray::GITHUB_URL);
                }
            }

            Event::UserEvent(UserEvent::TrayIconEvent(_event)) => {
                // Menu opens on click; nothing else to do
            }

            _ => {}
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::tests::{RecordingNotifier, RecordingView};
    use crate::telemetry::tests::{FakeRunner, PMSET_CHARGING};
    use std::cell::RefCell;

    fn agent_in(dir: &std::path::Path) -> LaunchAgent {
        LaunchAgent::new(
            dir.join("LaunchAgents/agent.plist"),
            std::path::PathBuf::from("/usr/local/bin/charger-info"),
        )
    }

    /// Primary gone, fallback answers `healthy_reads` times, then fails.
    fn monitor_failing_after(healthy_reads: usize) -> Monitor<FakeRunner> {
        let runner = FakeRunner::default();
        runner.push_ioreg(Err("ioreg failed"));
        for _ in 0..healthy_reads {
            runner.push_pmset(Ok(PMSET_CHARGING));
        }
        runner.push_pmset(Err("pmset failed"));
        Monitor::new(TelemetryReader::new(runner))
    }

    #[test]
    fn test_run_refresh_fatal_alerts_and_stops() {
        let mut monitor = monitor_failing_after(0);
        let alerts = RefCell::new(Vec::new());
        let mut view = RecordingView::default();

        let alive = run_refresh(
            &mut monitor,
            true,
            &Preferences::default(),
            &mut view,
            &RecordingNotifier::default(),
            |title: &str, msg: &str| alerts.borrow_mut().push(format!("{title}: {msg}")),
        );
        assert!(!alive);
        assert!(view.calls.is_empty());
        let alerts = alerts.into_inner();
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].starts_with("Error : Charger Information: "));
        assert!(alerts[0].contains("pmset failed"));
    }

    #[test]
    fn test_toggle_startup_writes_nothing_after_fatal_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let mut monitor = monitor_failing_after(0);
        let agent_requested = RefCell::new(false);

        let result = toggle_startup(
            &mut monitor,
            &Preferences::default(),
            true,
            &mut RecordingView::default(),
            &RecordingNotifier::default(),
            |_: &str, _: &str| {},
            || {
                *agent_requested.borrow_mut() = true;
                Ok(agent_in(dir.path()))
            },
        );
        assert!(matches!(result, StartupToggle::Stopped));
        assert!(!*agent_requested.borrow());
        assert!(!agent_in(dir.path()).is_registered());
    }

    #[test]
    fn test_toggle_startup_registers_after_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let mut monitor = monitor_failing_after(1);
        let mut view = RecordingView::default();

        let result = toggle_startup(
            &mut monitor,
            &Preferences::default(),
            true,
            &mut view,
            &RecordingNotifier::default(),
            |_: &str, _: &str| panic!("no alert expected"),
            || Ok(agent_in(dir.path())),
        );
        assert!(matches!(result, StartupToggle::Applied));
        assert_eq!(view.calls.len(), 4);
        assert!(agent_in(dir.path()).is_registered());
    }

    #[test]
    fn test_toggle_startup_reports_agent_failure() {
        let mut monitor = monitor_failing_after(1);

        let result = toggle_startup(
            &mut monitor,
            &Preferences::default(),
            false,
            &mut RecordingView::default(),
            &RecordingNotifier::default(),
            |_: &str, _: &str| {},
            || {
                Err(ChargerError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no home directory",
                )))
            },
        );
        assert!(matches!(result, StartupToggle::Failed(ChargerError::Io(_))));
    }
}
