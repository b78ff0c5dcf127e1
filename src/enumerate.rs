//! Window enumeration: visible top-level window titles, filtered

use std::collections::HashSet;
use tracing::warn;

use crate::error::EnumError;

/// Title of the shell desktop window, never reported
pub const SHELL_TITLE: &str = "Program Manager";

/// Source of raw visible top-level window titles in OS enumeration order
pub trait WindowSource {
    fn visible_titles(&self) -> Result<Vec<String>, EnumError>;
}

impl<T: WindowSource + ?Sized> WindowSource for &T {
    fn visible_titles(&self) -> Result<Vec<String>, EnumError> {
        (**self).visible_titles()
    }
}

/// Snapshot of visible window titles, excluding empty titles, `excluded` and the shell.
/// A failing source yields an empty snapshot.
pub fn enumerate<S: WindowSource + ?Sized>(source: &S, excluded: &HashSet<String>) -> Vec<String> {
    match source.visible_titles() {
        Ok(titles) => filter_titles(titles, excluded),
        Err(e) => {
            warn!("Window enumeration failed: {e}");
            Vec::new()
        }
    }
}

fn filter_titles(titles: Vec<String>, excluded: &HashSet<String>) -> Vec<String> {
    titles
        .into_iter()
        .filter(|t| !t.is_empty() && t != SHELL_TITLE && !excluded.contains(t))
        .collect()
}

#[cfg(windows)]
pub use win32::Win32WindowSource;

#[cfg(windows)]
mod win32 {
    use windows::Win32::Foundation::{HWND, LPARAM};
    use windows::Win32::UI::WindowsAndMessaging::{
        EnumWindows, GetWindowTextLengthW, GetWindowTextW, IsWindowVisible,
    };
    use windows::core::BOOL;

    use super::WindowSource;
    use crate::error::EnumError;

    /// `EnumWindows` backed source (z-order)
    #[derive(Debug, Default)]
    pub struct Win32WindowSource;

    impl WindowSource for Win32WindowSource {
        fn visible_titles(&self) -> Result<Vec<String>, EnumError> {
            let mut titles: Vec<String> = Vec::new();

            // SAFETY: EnumWindows runs synchronously, `titles` outlives the call
            unsafe {
                EnumWindows(
                    Some(enum_callback),
                    LPARAM(&mut titles as *mut Vec<String> as isize),
                )
            }
            .map_err(|e| EnumError::EnumWindows(e.to_string()))?;

            Ok(titles)
        }
    }

    unsafe extern "system" fn enum_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
        // SAFETY: lparam is the Vec passed by visible_titles()
        let titles = unsafe { &mut *(lparam.0 as *mut Vec<String>) };

        if unsafe { IsWindowVisible(hwnd) }.as_bool() {
            let title = window_title(hwnd);
            if !title.is_empty() {
                titles.push(title);
            }
        }

        BOOL(1)
    }

    fn window_title(hwnd: HWND) -> String {
        unsafe {
            let len = GetWindowTextLengthW(hwnd);
            if len <= 0 {
                return String::new();
            }

            let mut buf = vec![0u16; (len + 1) as usize];
            let copied = GetWindowTextW(hwnd, &mut buf);
            if copied <= 0 {
                return String::new();
            }

            String::from_utf16_lossy(&buf[..copied as usize])
        }
    }
}

#[cfg(test)]
pub mod testing {
    use std::cell::RefCell;

    use super::WindowSource;
    use crate::error::EnumError;

    /// Scripted source: returns the current titles, or fails when `failing` is set
    #[derive(Debug, Default)]
    pub struct FakeWindows {
        pub titles: RefCell<Vec<String>>,
        pub failing: RefCell<bool>,
        pub calls: RefCell<usize>,
    }

    impl FakeWindows {
        pub fn with_titles(titles: &[&str]) -> Self {
            let fake = Self::default();
            fake.set(titles);
            fake
        }

        pub fn set(&self, titles: &[&str]) {
            *self.titles.borrow_mut() = titles.iter().map(|t| t.to_string()).collect();
        }
    }

    impl WindowSource for FakeWindows {
        fn visible_titles(&self) -> Result<Vec<String>, EnumError> {
            *self.calls.borrow_mut() += 1;
            if *self.failing.borrow() {
                return Err(EnumError::EnumWindows("scripted failure".to_string()));
            }
            Ok(self.titles.borrow().clone())
        }
    }
}
