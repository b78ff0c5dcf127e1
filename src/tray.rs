//! System tray integration using tray-icon crate

use muda::{CheckMenuItem, Menu, MenuEvent, MenuId, MenuItem, PredefinedMenuItem, Submenu};
use thiserror::Error;
use tracing::warn;
use tray_icon::{Icon, TrayIcon, TrayIconBuilder};

use crate::notifier::{APP_TITLE, IndicatorState, StatusIndicator};
use crate::settings::{Corner, NotificationSettings};

#[derive(Debug, Error)]
pub enum TrayError {
    #[error("Tray icon creation failed: {0}")]
    Creation(String),

    #[error("Menu operation failed: {0}")]
    Menu(String),
}

const ICON_SIZE: u32 = 32;

const IDLE_COLOR: (u8, u8, u8) = (160, 160, 160);
const ACTIVE_COLOR: (u8, u8, u8) = (255, 200, 0);
const DISABLED_COLOR: (u8, u8, u8) = (80, 80, 80);

/// System tray state and menu IDs
pub struct TrayState {
    tray: TrayIcon,
    menu_edit: MenuId,
    menu_enable: MenuId,
    menu_flash: MenuId,
    menu_repeat: MenuId,
    menu_autolaunch: MenuId,
    menu_exit: MenuId,
    status_item: MenuItem,
    enable_item: MenuItem,
    flash_item: CheckMenuItem,
    repeat_item: CheckMenuItem,
    corner_items: Vec<(Corner, CheckMenuItem)>,
    autolaunch_item: CheckMenuItem,
}

impl TrayState {
    /// Create tray icon with menu reflecting `settings`
    pub fn new(settings: &NotificationSettings) -> Result<Self, TrayError> {
        let status_item = MenuItem::with_id(
            "status",
            status_text(IndicatorState::Idle),
            false,
            None,
        );
        let edit_item = MenuItem::with_id("edit", "Edit watch list…", true, None);
        let enable_item = MenuItem::with_id("enable", "Disable", true, None);
        let flash_item = CheckMenuItem::with_id(
            "flash",
            "Flash screen",
            true,
            settings.flash_on_notify,
            None,
        );
        let repeat_item = CheckMenuItem::with_id(
            "repeat",
            "Repeat notifications",
            true,
            settings.repeat_enabled,
            None,
        );
        let corner_menu = Submenu::with_id("corner", "Notification corner", true);
        let corner_items: Vec<(Corner, CheckMenuItem)> = Corner::ALL
            .iter()
            .map(|&corner| {
                let item = CheckMenuItem::with_id(
                    format!("corner-{}", corner.index()),
                    corner.label(),
                    true,
                    corner == settings.corner,
                    None,
                );
                (corner, item)
            })
            .collect();
        let autolaunch_item =
            CheckMenuItem::with_id("autolaunch", "Start with Windows", true, false, None);
        let exit_item = MenuItem::with_id("exit", "Exit", true, None);

        // Store IDs
        let menu_edit = edit_item.id().clone();
        let menu_enable = enable_item.id().clone();
        let menu_flash = flash_item.id().clone();
        let menu_repeat = repeat_item.id().clone();
        let menu_autolaunch = autolaunch_item.id().clone();
        let menu_exit = exit_item.id().clone();

        let menu_err = |e: muda::Error| TrayError::Menu(e.to_string());

        for (_, item) in &corner_items {
            corner_menu.append(item).map_err(menu_err)?;
        }

        // Build menu
        let menu = Menu::new();
        menu.append(&status_item).map_err(menu_err)?;
        menu.append(&PredefinedMenuItem::separator())
            .map_err(menu_err)?;
        menu.append(&edit_item).map_err(menu_err)?;
        menu.append(&enable_item).map_err(menu_err)?;
        menu.append(&PredefinedMenuItem::separator())
            .map_err(menu_err)?;
        menu.append(&flash_item).map_err(menu_err)?;
        menu.append(&repeat_item).map_err(menu_err)?;
        menu.append(&corner_menu).map_err(menu_err)?;
        menu.append(&PredefinedMenuItem::separator())
            .map_err(menu_err)?;
        menu.append(&autolaunch_item).map_err(menu_err)?;
        menu.append(&PredefinedMenuItem::separator())
            .map_err(menu_err)?;
        menu.append(&exit_item).map_err(menu_err)?;

        let tray = TrayIconBuilder::new()
            .with_menu(Box::new(menu))
            .with_tooltip(APP_TITLE)
            .with_icon(state_icon(IndicatorState::Idle)?)
            .build()
            .map_err(|e| TrayError::Creation(e.to_string()))?;

        Ok(Self {
            tray,
            menu_edit,
            menu_enable,
            menu_flash,
            menu_repeat,
            menu_autolaunch,
            menu_exit,
            status_item,
            enable_item,
            flash_item,
            repeat_item,
            corner_items,
            autolaunch_item,
        })
    }

    /// Mirror `settings` in the check items (after a reload)
    pub fn sync_settings(&self, settings: &NotificationSettings) {
        self.flash_item.set_checked(settings.flash_on_notify);
        self.repeat_item.set_checked(settings.repeat_enabled);
        self.set_corner_checked(settings.corner);
    }

    /// Radio behaviour: only `corner` stays checked
    pub fn set_corner_checked(&self, corner: Corner) {
        for (c, item) in &self.corner_items {
            item.set_checked(*c == corner);
        }
    }

    /// Set autolaunch checkbox state
    pub fn set_autolaunch_checked(&self, checked: bool) {
        self.autolaunch_item.set_checked(checked);
    }

    pub fn autolaunch_checked(&self) -> bool {
        self.autolaunch_item.is_checked()
    }

    pub fn flash_checked(&self) -> bool {
        self.flash_item.is_checked()
    }

    pub fn repeat_checked(&self) -> bool {
        self.repeat_item.is_checked()
    }

    pub fn is_edit(&self, id: &MenuId) -> bool {
        *id == self.menu_edit
    }

    pub fn is_enable(&self, id: &MenuId) -> bool {
        *id == self.menu_enable
    }

    pub fn is_flash(&self, id: &MenuId) -> bool {
        *id == self.menu_flash
    }

    pub fn is_repeat(&self, id: &MenuId) -> bool {
        *id == self.menu_repeat
    }

    /// Corner whose submenu entry has `id`
    pub fn corner_for(&self, id: &MenuId) -> Option<Corner> {
        self.corner_items
            .iter()
            .find(|(_, item)| item.id() == id)
            .map(|(corner, _)| *corner)
    }

    /// Check if event matches autolaunch menu
    pub fn is_autolaunch(&self, id: &MenuId) -> bool {
        *id == self.menu_autolaunch
    }

    /// Check if event matches exit menu
    pub fn is_exit(&self, id: &MenuId) -> bool {
        *id == self.menu_exit
    }
}

impl StatusIndicator for TrayState {
    fn set_state(&self, state: IndicatorState) {
        match state_icon(state) {
            Ok(icon) => {
                if let Err(e) = self.tray.set_icon(Some(icon)) {
                    warn!("Tray icon update failed: {e}");
                }
            }
            Err(e) => warn!("{e}"),
        }
        self.status_item.set_text(status_text(state));
        self.enable_item.set_text(if state == IndicatorState::Disabled {
            "Enable"
        } else {
            "Disable"
        });
    }
}

/// Get menu event receiver
pub fn menu_receiver() -> &'static muda::MenuEventReceiver {
    MenuEvent::receiver()
}

fn status_text(state: IndicatorState) -> &'static str {
    match state {
        IndicatorState::Idle => "No watched windows",
        IndicatorState::Active => "Watched windows on the taskbar",
        IndicatorState::Disabled => "Disabled",
    }
}

fn state_color(state: IndicatorState) -> (u8, u8, u8) {
    match state {
        IndicatorState::Idle => IDLE_COLOR,
        IndicatorState::Active => ACTIVE_COLOR,
        IndicatorState::Disabled => DISABLED_COLOR,
    }
}

fn state_icon(state: IndicatorState) -> Result<Icon, TrayError> {
    Icon::from_rgba(disc_rgba(state_color(state), ICON_SIZE), ICON_SIZE, ICON_SIZE)
        .map_err(|e| TrayError::Creation(e.to_string()))
}

/// RGBA pixels of a filled disc on a transparent square, darker rim
fn disc_rgba((r, g, b): (u8, u8, u8), size: u32) -> Vec<u8> {
    let center = (size as f64 - 1.0) / 2.0;
    let radius = size as f64 / 2.0 - 1.0;
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);

    for y in 0..size {
        for x in 0..size {
            let dist = ((x as f64 - center).powi(2) + (y as f64 - center).powi(2)).sqrt();
            if dist > radius {
                pixels.extend_from_slice(&[0, 0, 0, 0]);
            } else if dist > radius - 2.0 {
                pixels.extend_from_slice(&[r / 2, g / 2, b / 2, 255]);
            } else {
                pixels.extend_from_slice(&[r, g, b, 255]);
            }
        }
    }
    pixels
}
