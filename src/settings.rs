//! Notification settings: flash, repeat interval, screen corner

use std::fmt;

/// Lifetime of a notification card (unit: seconds)
pub const NOTIFICATION_DURATION_SECS: u32 = 5;

/// Shortest repeat interval; a repeat never starts before the previous card expired
pub const MIN_REPEAT_INTERVAL_SECS: u32 = NOTIFICATION_DURATION_SECS + 2;

pub const MAX_REPEAT_INTERVAL_SECS: u32 = 3600;

pub const DEFAULT_REPEAT_INTERVAL_SECS: u32 = 30;

/// Screen corner the notification card is placed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Corner {
    BottomLeft,
    #[default]
    BottomRight,
    TopLeft,
    TopRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::BottomLeft,
        Corner::BottomRight,
        Corner::TopLeft,
        Corner::TopRight,
    ];

    /// Index used by the data file
    pub fn index(self) -> u8 {
        match self {
            Corner::BottomLeft => 0,
            Corner::BottomRight => 1,
            Corner::TopLeft => 2,
            Corner::TopRight => 3,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Corner::BottomLeft => "Bottom left",
            Corner::BottomRight => "Bottom right",
            Corner::TopLeft => "Top left",
            Corner::TopRight => "Top right",
        }
    }
}

impl fmt::Display for Corner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// User-facing notification settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationSettings {
    pub flash_on_notify: bool,
    pub repeat_enabled: bool,
    pub repeat_interval_secs: u32,
    pub corner: Corner,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            flash_on_notify: false,
            repeat_enabled: false,
            repeat_interval_secs: DEFAULT_REPEAT_INTERVAL_SECS,
            corner: Corner::default(),
        }
    }
}

impl NotificationSettings {
    /// Clamp the repeat interval into [MIN_REPEAT_INTERVAL_SECS, MAX_REPEAT_INTERVAL_SECS]
    pub fn clamped(mut self) -> Self {
        self.repeat_interval_secs = self
            .repeat_interval_secs
            .clamp(MIN_REPEAT_INTERVAL_SECS, MAX_REPEAT_INTERVAL_SECS);
        self
    }
}
