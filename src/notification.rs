//! Desktop notification support

use notify_rust::Notification;

use crate::notifier::APP_TITLE;

/// Toast for an unreadable data file; startup stops afterwards
pub fn show_load_failure(error: &str) {
    if let Err(e) = Notification::new()
        .summary(&format!("{APP_TITLE} could not start"))
        .body(&format!("The data file is damaged and was left untouched.\n{error}"))
        .show()
    {
        tracing::warn!("Notification failed: {e}");
    }
}
