//! Auto-launch via Windows Registry (HKCU\Software\Microsoft\Windows\CurrentVersion\Run)

use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::info;
use winreg::RegKey;
use winreg::enums::{HKEY_CURRENT_USER, KEY_READ, KEY_WRITE};

use crate::notifier::APP_TITLE;

const RUN_KEY: &str = r"Software\Microsoft\Windows\CurrentVersion\Run";

#[derive(Debug, Error)]
pub enum AutoLaunchError {
    #[error("Registry access failed: {0}")]
    Registry(#[from] std::io::Error),

    #[error("Executable path not found")]
    ExePath,
}

/// Check if auto-launch enabled in registry
pub fn is_enabled() -> bool {
    value_exists(APP_TITLE)
}

/// Write or remove the Run entry so it matches `enabled`
pub fn set(enabled: bool) -> Result<(), AutoLaunchError> {
    if enabled {
        let exe = env::current_exe().map_err(|_| AutoLaunchError::ExePath)?;
        write_value(APP_TITLE, &launch_command(&exe))?;
    } else {
        remove_value(APP_TITLE)?;
    }
    info!(enabled, "Auto-launch updated");
    Ok(())
}

/// Quoted command line stored in the Run key
fn launch_command(exe: &Path) -> String {
    format!("\"{}\"", exe.display())
}

fn value_exists(name: &str) -> bool {
    RegKey::predef(HKEY_CURRENT_USER)
        .open_subkey_with_flags(RUN_KEY, KEY_READ)
        .ok()
        .and_then(|key| key.get_value::<String, _>(name).ok())
        .is_some()
}

fn write_value(name: &str, command: &str) -> Result<(), AutoLaunchError> {
    let (key, _) = RegKey::predef(HKEY_CURRENT_USER).create_subkey(RUN_KEY)?;
    key.set_value(name, &command)?;
    Ok(())
}

fn remove_value(name: &str) -> Result<(), AutoLaunchError> {
    let key = RegKey::predef(HKEY_CURRENT_USER).open_subkey_with_flags(RUN_KEY, KEY_WRITE)?;
    // Ignore error if value doesn't exist
    let _ = key.delete_value(name);
    Ok(())
}
