use image::{ImageBuffer, Rgba};
use tray_icon::{
    menu::{CheckMenuItem, IsMenuItem, Menu, MenuItem, PredefinedMenuItem},
    Icon, TrayIcon, TrayIconBuilder,
};
use tracing::warn;

use crate::config::Preferences;
use crate::error::ChargerError;
use crate::monitor::ChargerView;
use crate::platform;
use crate::state::ChargerDisplay;

pub const APP_NAME: &str = "Charger Information";
pub const GITHUB_URL: &str = "https://github.com/narikei/Charger-Information-for-Mac";

const ICON_SIZE: u32 = 18;

/// Lightning bolt outline in icon pixel coordinates.
const BOLT: [(f32, f32); 7] = [
    (11.0, 1.0),
    (4.0, 10.0),
    (8.5, 10.0),
    (7.0, 17.0),
    (14.0, 8.0),
    (9.5, 8.0),
    (12.0, 1.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconKind {
    Black,
    White,
    Gray,
}

impl IconKind {
    /// Gray when not charging; otherwise the variant readable on the theme.
    pub fn select(charging: bool, dark: bool) -> Self {
        match (charging, dark) {
            (false, _) => Self::Gray,
            (true, true) => Self::White,
            (true, false) => Self::Black,
        }
    }

    fn color(self) -> [u8; 3] {
        match self {
            Self::Black => [0, 0, 0],
            Self::White => [255, 255, 255],
            Self::Gray => [128, 128, 128],
        }
    }
}

/// Even-odd test against the bolt outline.
fn inside_bolt(x: f32, y: f32) -> bool {
    let mut inside = false;
    let mut j = BOLT.len() - 1;
    for i in 0..BOLT.len() {
        let (xi, yi) = BOLT[i];
        let (xj, yj) = BOLT[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn bolt_image(kind: IconKind) -> ImageBuffer<Rgba<u8>, Vec<u8>> {
    let [r, g, b] = kind.color();
    ImageBuffer::from_fn(ICON_SIZE, ICON_SIZE, |x, y| {
        if inside_bolt(x as f32 + 0.5, y as f32 + 0.5) {
            Rgba([r, g, b, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

fn generate_icon(kind: IconKind) -> Result<Icon, ChargerError> {
    let img = bolt_image(kind);
    let (width, height) = img.dimensions();
    Icon::from_rgba(img.into_raw(), width, height).map_err(|e| ChargerError::Tray(e.to_string()))
}

struct Icons {
    black: Icon,
    white: Icon,
    gray: Icon,
}

impl Icons {
    fn generate() -> Result<Self, ChargerError> {
        Ok(Self {
            black: generate_icon(IconKind::Black)?,
            white: generate_icon(IconKind::White)?,
            gray: generate_icon(IconKind::Gray)?,
        })
    }

    fn get(&self, kind: IconKind) -> &Icon {
        match kind {
            IconKind::Black => &self.black,
            IconKind::White => &self.white,
            IconKind::Gray => &self.gray,
        }
    }
}

/// Menu items kept alive across menu rebuilds.
pub struct MenuItems {
    pub status_item: MenuItem,
    pub power_item: MenuItem,
    pub voltage_item: MenuItem,
    pub current_item: MenuItem,
    pub notify_item: CheckMenuItem,
    pub show_power_item: CheckMenuItem,
    pub startup_item: CheckMenuItem,
    pub github_item: MenuItem,
    pub quit_item: MenuItem,
}

impl MenuItems {
    pub fn new(prefs: &Preferences) -> Self {
        Self {
            status_item: MenuItem::new("", false, None),
            power_item: MenuItem::new("", false, None),
            voltage_item: MenuItem::new("", false, None),
            current_item: MenuItem::new("", false, None),
            notify_item: CheckMenuItem::new("Change Notification", true, prefs.notify_on_change, None),
            show_power_item: CheckMenuItem::new("Show Power", true, prefs.show_power, None),
            startup_item: CheckMenuItem::new("Set Startup", true, prefs.launch_at_startup, None),
            github_item: MenuItem::new("Open GitHub", true, None),
            quit_item: MenuItem::new(
                format!("Quit {APP_NAME} v{}", env!("CARGO_PKG_VERSION")),
                true,
                None,
            ),
        }
    }
}

/// Build the dropdown. The power/voltage/current lines are only included
/// while charging.
pub fn build_menu(items: &MenuItems, show_info: bool) -> Menu {
    let menu = Menu::new();
    let separator_a = PredefinedMenuItem::separator();
    let separator_b = PredefinedMenuItem::separator();
    let separator_c = PredefinedMenuItem::separator();

    let mut entries: Vec<&dyn IsMenuItem> = vec![&items.status_item];
    if show_info {
        entries.extend([
            &items.power_item as &dyn IsMenuItem,
            &items.voltage_item,
            &items.current_item,
        ]);
    }
    entries.extend([
        &separator_a as &dyn IsMenuItem,
        &items.notify_item,
        &items.show_power_item,
        &items.startup_item,
        &separator_b,
        &items.github_item,
        &separator_c,
        &items.quit_item,
    ]);

    if let Err(e) = menu.append_items(&entries) {
        warn!(error = %e, "failed to populate tray menu");
    }
    menu
}

/// The live tray icon and its menu.
pub struct TrayView {
    tray: TrayIcon,
    items: MenuItems,
    icons: Icons,
    show_info: bool,
}

impl TrayView {
    pub fn new(items: MenuItems) -> Result<Self, ChargerError> {
        let icons = Icons::generate()?;
        let tray = TrayIconBuilder::new()
            .with_menu(Box::new(build_menu(&items, false)))
            .with_icon(icons.black.clone())
            .with_tooltip(APP_NAME)
            .with_menu_on_left_click(true)
            .build()
            .map_err(|e| ChargerError::Tray(e.to_string()))?;

        Ok(Self {
            tray,
            items,
            icons,
            show_info: false,
        })
    }

    pub fn items(&self) -> &MenuItems {
        &self.items
    }
}

impl ChargerView for TrayView {
    fn set_icon(&mut self, charging: bool) {
        let kind = IconKind::select(charging, platform::is_dark_mode());
        if let Err(e) = self.tray.set_icon(Some(self.icons.get(kind).clone())) {
            warn!(error = %e, ?kind, "failed to set tray icon");
        }
    }

    fn set_title(&mut self, title: &str) {
        self.tray.set_title(Some(title));
    }

    fn set_menu_info(&mut self, display: &ChargerDisplay) {
        self.items.status_item.set_text(&display.status);
        self.show_info = display.charging;
        if display.charging {
            self.items.power_item.set_text(&display.power);
            self.items.voltage_item.set_text(&display.voltage);
            self.items.current_item.set_text(&display.current);
        }
        let _ = self.tray.set_tooltip(Some(&display.tooltip));
    }

    fn rebuild_menu(&mut self) {
        let menu = build_menu(&self.items, self.show_info);
        self.tray.set_menu(Some(Box::new(menu)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icon_selection() {
        assert_eq!(IconKind::select(false, false), IconKind::Gray);
        assert_eq!(IconKind::select(false, true), IconKind::Gray);
        assert_eq!(IconKind::select(true, false), IconKind::Black);
        assert_eq!(IconKind::select(true, true), IconKind::White);
    }

    #[test]
    fn test_bolt_shape() {
        // Middle of the bolt stroke and the transparent corners.
        assert!(inside_bolt(9.0, 9.0));
        assert!(!inside_bolt(0.5, 0.5));
        assert!(!inside_bolt(17.5, 17.5));
    }

    #[test]
    fn test_bolt_image_uses_variant_color() {
        let img = bolt_image(IconKind::Gray);
        assert_eq!(img.dimensions(), (ICON_SIZE, ICON_SIZE));
        assert_eq!(*img.get_pixel(9, 8), Rgba([128, 128, 128, 255]));
        assert_eq!(*img.get_pixel(0, 0), Rgba([0, 0, 0, 0]));
    }
}
