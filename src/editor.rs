//! Watch list editing in an external text editor
//!
//! The data file is opened in Notepad; the caller polls [`Editor::has_exited`]
//! from its event loop and reloads the file afterwards.

use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::error::EditorError;

pub const DEFAULT_EDITOR: &str = "notepad.exe";

/// Running editor process
pub struct Editor {
    child: Child,
    path: PathBuf,
}

impl Editor {
    /// Open `path` in Notepad
    pub fn open(path: &Path) -> Result<Self, EditorError> {
        Self::open_with(DEFAULT_EDITOR, path)
    }

    pub fn open_with(program: &str, path: &Path) -> Result<Self, EditorError> {
        let child = Command::new(program)
            .arg(path)
            .spawn()
            .map_err(|source| EditorError::Spawn {
                program: program.to_string(),
                source,
            })?;

        info!(program, path = %path.display(), pid = child.id(), "Editor opened");
        Ok(Self {
            child,
            path: path.to_path_buf(),
        })
    }

    /// Non-blocking check. A failed wait counts as exited.
    pub fn has_exited(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!(?status, path = %self.path.display(), "Editor closed");
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!("Editor wait failed: {e}");
                true
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    #[test]
    fn test_open_missing_program_fails() {
        let err = Editor::open_with("taskbar-notifier-no-such-editor", Path::new("x.dat"))
            .err()
            .unwrap();
        assert!(matches!(err, EditorError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_has_exited_after_process_ends() {
        let mut editor = Editor::open_with("true", Path::new("x.dat")).unwrap();
        assert_eq!(editor.path(), Path::new("x.dat"));

        let deadline = Instant::now() + Duration::from_secs(10);
        while !editor.has_exited() {
            assert!(Instant::now() < deadline, "editor did not exit");
            std::thread::sleep(Duration::from_millis(10));
        }
    }
}
