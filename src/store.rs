//! Data file persistence: settings + watch expressions, versioned flat text
//!
//! Layout (version 2):
//! ```text
//! 2
//! <flash 0|1>
//! <repeat 0|1> <interval secs>
//! <corner index>
//! <expression>...
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::settings::{Corner, NotificationSettings};

pub const FORMAT_VERSION: i64 = 2;

pub const FILE_NAME: &str = "TaskbarNotifier.dat";

const APP_DIR_NAME: &str = "TaskbarNotifier";

/// Everything that survives a restart
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedState {
    pub settings: NotificationSettings,
    pub expressions: Vec<String>,
}

/// Default data file: %APPDATA%\TaskbarNotifier\TaskbarNotifier.dat,
/// or the working directory when APPDATA is unset
pub fn default_path() -> PathBuf {
    match std::env::var_os("APPDATA") {
        Some(appdata) => PathBuf::from(appdata).join(APP_DIR_NAME).join(FILE_NAME),
        None => PathBuf::from(FILE_NAME),
    }
}

/// Write `state` to `path`, creating the parent directory if needed
pub fn save(path: &Path, state: &PersistedState) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    fs::write(path, encode(state)).map_err(io_err)?;
    debug!(path = %path.display(), expressions = state.expressions.len(), "Data file saved");
    Ok(())
}

/// Read `path`.
///
/// Missing file or a version line other than [`FORMAT_VERSION`] yields defaults.
/// Malformed lines after the version gate are errors.
pub fn load(path: &Path) -> Result<PersistedState, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "No data file, using defaults");
            return Ok(PersistedState::default());
        }
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    match decode(path, &content) {
        Err(StoreError::Version { found, .. }) => {
            info!(
                path = %path.display(),
                %found,
                "Unsupported data file version, using defaults"
            );
            Ok(PersistedState::default())
        }
        result => result,
    }
}

/// Re-read a file the user has edited by hand.
///
/// Unlike [`load`], a missing file or an unsupported version line is an error,
/// so a damaged edit never replaces the current state with defaults.
pub fn reload(path: &Path) -> Result<PersistedState, StoreError> {
    let content = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode(path, &content)
}

fn encode(state: &PersistedState) -> String {
    let s = &state.settings;
    let mut out = format!(
        "{FORMAT_VERSION}\n{}\n{} {}\n{}\n",
        u8::from(s.flash_on_notify),
        u8::from(s.repeat_enabled),
        s.repeat_interval_secs,
        s.corner.index(),
    );
    for expression in &state.expressions {
        out.push_str(expression);
        out.push('\n');
    }
    out
}

fn decode(path: &Path, content: &str) -> Result<PersistedState, StoreError> {
    // Notepad may save with a byte order mark
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut lines = content.lines();

    let first = lines.next().unwrap_or_default().trim();
    if first.parse::<i64>().ok() != Some(FORMAT_VERSION) {
        return Err(StoreError::Version {
            path: path.to_path_buf(),
            found: first.to_string(),
        });
    }

    let malformed = |line: usize, reason: String| StoreError::Malformed {
        path: path.to_path_buf(),
        line,
        reason,
    };

    let flash = parse_int(lines.next()).map_err(|r| malformed(2, r))?;

    let repeat_line = lines.next().ok_or_else(|| malformed(3, "missing".to_string()))?;
    let (repeat, interval) = repeat_line.split_once(' ').ok_or_else(|| {
        malformed(3, format!("expected \"<0|1> <seconds>\", got {repeat_line:?}"))
    })?;
    let repeat = parse_int(Some(repeat)).map_err(|r| malformed(3, r))?;
    let interval = parse_int(Some(interval)).map_err(|r| malformed(3, r))?;
    let interval = u32::try_from(interval)
        .map_err(|_| malformed(3, format!("interval {interval} out of range")))?;

    let corner = parse_int(lines.next()).map_err(|r| malformed(4, r))?;
    let corner = u8::try_from(corner)
        .ok()
        .and_then(Corner::from_index)
        .ok_or_else(|| malformed(4, format!("unknown corner index {corner}")))?;

    let settings = NotificationSettings {
        flash_on_notify: flash > 0,
        repeat_enabled: repeat > 0,
        repeat_interval_secs: interval,
        corner,
    }
    .clamped();

    let expressions = lines
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();

    Ok(PersistedState {
        settings,
        expressions,
    })
}

fn parse_int(line: Option<&str>) -> Result<i64, String> {
    let text = line.ok_or_else(|| "missing".to_string())?;
    text.trim()
        .parse::<i64>()
        .map_err(|_| format!("expected integer, got {text:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_state() -> PersistedState {
        PersistedState {
            settings: NotificationSettings {
                flash_on_notify: true,
                repeat_enabled: true,
                repeat_interval_secs: 45,
                corner: Corner::TopLeft,
            },
            expressions: vec![
                "Chrome".to_string(),
                "Note".to_string(),
                "Note".to_string(),
                " spaced title ".to_string(),
                "Ünïcødé · ✓".to_string(),
            ],
        }
    }

    // ========== Encoding Tests ==========

    #[test]
    fn test_encode_layout() {
        let encoded = encode(&sample_state());
        let lines: Vec<&str> = encoded.lines().collect();
        assert_eq!(lines[0], "2");
        assert_eq!(lines[1], "1");
        assert_eq!(lines[2], "1 45");
        assert_eq!(lines[3], "2");
        assert_eq!(lines[4], "Chrome");
        assert_eq!(lines.len(), 9);
    }

    #[test]
    fn test_encode_defaults() {
        assert_eq!(encode(&PersistedState::default()), "2\n0\n0 30\n1\n");
    }

    // ========== Save / Load Tests ==========

    #[test]
    fn test_save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(FILE_NAME);

        let state = sample_state();
        save(&path, &state).unwrap();
        assert_eq!(load(&path).unwrap(), state);
    }

    #[test]
    fn test_roundtrip_every_corner_and_flag() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(FILE_NAME);

        for corner in Corner::ALL {
            for (flash, repeat) in [(false, false), (true, false), (false, true), (true, true)] {
                let state = PersistedState {
                    settings: NotificationSettings {
                        flash_on_notify: flash,
                        repeat_enabled: repeat,
                        repeat_interval_secs: 3600,
                        corner,
                    },
                    expressions: vec!["x".to_string()],
                };
                save(&path, &state).unwrap();
                assert_eq!(load(&path).unwrap(), state);
            }
        }
    }

    #[test]
    fn test_save_creates_parent_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(FILE_NAME);

        save(&path, &PersistedState::default()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let state = load(&dir.path().join("absent.dat")).unwrap();
        assert_eq!(state, PersistedState::default());
    }

    // ========== Version Gate Tests ==========

    #[test]
    fn test_load_legacy_v1_is_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(FILE_NAME);
        fs::write(&path, "1\n1 45\nChrome\nNote\n").unwrap();

        assert_eq!(load(&path).unwrap(), PersistedState::default());
    }

    #[test]
    fn test_load_future_version_is_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(FILE_NAME);
        fs::write(&path, "3\n1\n1 45\n0\nChrome\n").unwrap();

        assert_eq!(load(&path).unwrap(), PersistedState::default());
    }

    #[test]
    fn test_load_garbage_version_is_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(FILE_NAME);
        fs::write(&path, "two\n1\n1 45\n0\nChrome\n").unwrap();

        assert_eq!(load(&path).unwrap(), PersistedState::default());
    }

    #[test]
    fn test_load_empty_file_is_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(FILE_NAME);
        fs::write(&path, "").unwrap();

        assert_eq!(load(&path).unwrap(), PersistedState::default());
    }

    // ========== Malformed Content Tests ==========

    #[test]
    fn test_load_malformed_flash_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(FILE_NAME);
        fs::write(&path, "2\nyes\n1 45\n0\n").unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, StoreError::Malformed { line: 2, .. }));
    }

    #[test]
    fn test_load_malformed_repeat_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(FILE_NAME);
        fs::write(&path, "2\n0\n1\n0\n").unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, StoreError::Malformed { line: 3, .. }));
    }

    #[test]
    fn test_load_malformed_interval() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(FILE_NAME);
        fs::write(&path, "2\n0\n1 soon\n0\n").unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, StoreError::Malformed { line: 3, .. }));
    }

    #[test]
    fn test_load_unknown_corner() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(FILE_NAME);
        fs::write(&path, "2\n0\n0 30\n7\n").unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, StoreError::Malformed { line: 4, .. }));
    }

    #[test]
    fn test_load_truncated_after_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(FILE_NAME);
        fs::write(&path, "2\n").unwrap();

        assert!(matches!(
            load(&path).unwrap_err(),
            StoreError::Malformed { line: 2, .. }
        ));
    }

    // ========== Lenient Content Tests ==========

    #[test]
    fn test_load_clamps_interval() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(FILE_NAME);
        fs::write(&path, "2\n0\n1 2\n0\n").unwrap();

        let state = load(&path).unwrap();
        assert_eq!(
            state.settings.repeat_interval_secs,
            crate::settings::MIN_REPEAT_INTERVAL_SECS
        );
    }

    #[test]
    fn test_load_skips_blank_expressions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(FILE_NAME);
        fs::write(&path, "2\n0\n0 30\n1\nChrome\n\nNote\n").unwrap();

        let state = load(&path).unwrap();
        assert_eq!(state.expressions, vec!["Chrome", "Note"]);
    }

    #[test]
    fn test_load_crlf_line_endings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(FILE_NAME);
        fs::write(&path, "2\r\n1\r\n1 60\r\n3\r\nChrome\r\n").unwrap();

        let state = load(&path).unwrap();
        assert!(state.settings.flash_on_notify);
        assert_eq!(state.settings.repeat_interval_secs, 60);
        assert_eq!(state.settings.corner, Corner::TopRight);
        assert_eq!(state.expressions, vec!["Chrome"]);
    }

    #[test]
    fn test_load_byte_order_mark() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(FILE_NAME);
        fs::write(&path, "\u{feff}2\n1\n1 45\n2\nChrome\nNote\n").unwrap();

        let state = load(&path).unwrap();
        assert!(state.settings.flash_on_notify);
        assert_eq!(state.settings.corner, Corner::TopLeft);
        assert_eq!(state.expressions, vec!["Chrome", "Note"]);
    }

    // ========== Reload Tests ==========

    #[test]
    fn test_reload_byte_order_mark() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(FILE_NAME);
        fs::write(&path, "\u{feff}2\r\n0\r\n0 30\r\n1\r\nChrome\r\n").unwrap();

        assert_eq!(reload(&path).unwrap().expressions, vec!["Chrome"]);
    }

    #[test]
    fn test_reload_rejects_unsupported_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(FILE_NAME);
        fs::write(&path, "v2\n1\n1 45\n2\nChrome\n").unwrap();

        let err = reload(&path).unwrap_err();
        assert!(matches!(err, StoreError::Version { ref found, .. } if found == "v2"));
    }

    #[test]
    fn test_reload_rejects_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = reload(&dir.path().join("absent.dat")).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn test_reload_malformed_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(FILE_NAME);
        fs::write(&path, "2\n0\n1 soon\n0\n").unwrap();

        assert!(matches!(
            reload(&path).unwrap_err(),
            StoreError::Malformed { line: 3, .. }
        ));
    }

    #[test]
    fn test_default_path_file_name() {
        assert_eq!(default_path().file_name().unwrap(), FILE_NAME);
    }
}
