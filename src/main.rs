// Hide console in release builds (background mode)
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
// Platform shell is Windows-only; the core still builds and tests everywhere
#![cfg_attr(not(windows), allow(dead_code))]

mod animation;
#[cfg(windows)]
mod autolaunch;
mod editor;
mod enumerate;
mod error;
mod matching;
#[cfg(windows)]
mod notification;
mod notifier;
mod overlay;
#[cfg(windows)]
mod overlay_win32;
mod scheduler;
mod settings;
mod store;
#[cfg(windows)]
mod tray;

#[cfg(windows)]
fn main() -> anyhow::Result<()> {
    app::run()
}

#[cfg(not(windows))]
fn main() -> anyhow::Result<()> {
    anyhow::bail!("{} only runs on Windows", notifier::APP_TITLE)
}

#[cfg(windows)]
mod app {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::{Duration, Instant};

    use anyhow::{Context, anyhow};
    use tracing::{debug, error, info, warn};
    use windows::Win32::System::Console::{
        CTRL_BREAK_EVENT, CTRL_C_EVENT, CTRL_CLOSE_EVENT, CTRL_LOGOFF_EVENT, CTRL_SHUTDOWN_EVENT,
        SetConsoleCtrlHandler,
    };
    use windows::Win32::UI::WindowsAndMessaging::{
        DispatchMessageW, MB_ICONERROR, MB_OK, MSG, MWMO_INPUTAVAILABLE, MessageBoxW,
        MsgWaitForMultipleObjectsEx, PM_REMOVE, PeekMessageW, QS_ALLINPUT, TranslateMessage,
        WM_QUIT,
    };
    use windows::core::{BOOL, PCWSTR};

    use crate::autolaunch;
    use crate::editor::Editor;
    use crate::enumerate::Win32WindowSource;
    use crate::notification;
    use crate::notifier::{APP_TITLE, Notifier};
    use crate::settings::NotificationSettings;
    use crate::overlay_win32::Win32OverlayBackend;
    use crate::scheduler::MonotonicClock;
    use crate::store;
    use crate::tray::{self, TrayState};

    type AppNotifier<'a> = Notifier<Win32WindowSource, Win32OverlayBackend, &'a TrayState>;

    /// Shutdown requested via signal (Ctrl-C, console close, etc.)
    static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

    /// Set once the final save is done
    static SHUTDOWN_COMPLETE: AtomicBool = AtomicBool::new(false);

    /// Console close / logoff: the process dies when the handler returns
    const CLOSE_GRACE: Duration = Duration::from_secs(4);

    /// Console control handler: signal shutdown via atomic flag
    unsafe extern "system" fn ctrl_handler(ctrl_type: u32) -> BOOL {
        match ctrl_type {
            x if x == CTRL_C_EVENT || x == CTRL_BREAK_EVENT => {
                SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
                BOOL(1)
            }
            x if x == CTRL_CLOSE_EVENT || x == CTRL_LOGOFF_EVENT || x == CTRL_SHUTDOWN_EVENT => {
                // Wait for the main loop to persist state
                SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
                let deadline = Instant::now() + CLOSE_GRACE;
                while !SHUTDOWN_COMPLETE.load(Ordering::SeqCst) && Instant::now() < deadline {
                    std::thread::sleep(Duration::from_millis(10));
                }
                BOOL(1)
            }
            _ => BOOL(0),
        }
    }

    pub fn run() -> anyhow::Result<()> {
        tracing_subscriber::fmt::init();
        info!(version = env!("CARGO_PKG_VERSION"), "{APP_TITLE} starting");

        let path = store::default_path();
        let state = match store::load(&path) {
            Ok(state) => state,
            Err(e) => {
                error!("Data file unreadable: {e}");
                notification::show_load_failure(&e.to_string());
                return Err(e).context("Loading data file");
            }
        };
        info!(path = %path.display(), "Data file loaded");

        // Initialize system tray
        let tray = TrayState::new(&state.settings).map_err(|e| anyhow!("TrayState: {e}"))?;
        tray.set_autolaunch_checked(autolaunch::is_enabled());
        info!("System tray initialized");

        let backend = Win32OverlayBackend::new().map_err(|e| anyhow!("Overlay: {e}"))?;
        let mut notifier = Notifier::new(Win32WindowSource, backend, &tray, path, state);

        // Install Ctrl-C handler for graceful shutdown
        unsafe { SetConsoleCtrlHandler(Some(ctrl_handler), true) }
            .map_err(|e| anyhow!("SetConsoleCtrlHandler: {e}"))?;

        let result = run_event_loop(&mut notifier, &tray);

        if let Err(e) = notifier.shutdown() {
            error!("Saving data file failed: {e}");
        }
        SHUTDOWN_COMPLETE.store(true, Ordering::SeqCst);

        result
    }

    fn run_event_loop(notifier: &mut AppNotifier<'_>, tray: &TrayState) -> anyhow::Result<()> {
        let menu_rx = tray::menu_receiver();
        let clock = MonotonicClock::start();
        let mut editor: Option<Editor> = None;
        let mut msg = MSG::default();

        loop {
            // Check shutdown flag (set by ctrl_handler or Exit)
            if SHUTDOWN_REQUESTED.load(Ordering::SeqCst) {
                info!("Shutdown requested");
                return Ok(());
            }

            // Wait for message OR 16ms timeout
            unsafe {
                MsgWaitForMultipleObjectsEx(None, 16, QS_ALLINPUT, MWMO_INPUTAVAILABLE);
            }

            // Check menu events (non-blocking)
            while let Ok(event) = menu_rx.try_recv() {
                handle_menu_event(&event, tray, notifier, &mut editor);
            }

            if editor.as_mut().is_some_and(|e| e.has_exited()) {
                editor = None;
                finish_editing(notifier, tray);
            }

            notifier.advance(clock.now());

            // Process Win32 messages
            while unsafe { PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE) }.as_bool() {
                if msg.message == WM_QUIT {
                    return Ok(());
                }
                unsafe {
                    let _ = TranslateMessage(&msg);
                    DispatchMessageW(&msg);
                }
            }
        }
    }

    /// Handle tray menu events
    fn handle_menu_event(
        event: &muda::MenuEvent,
        tray: &TrayState,
        notifier: &mut AppNotifier<'_>,
        editor: &mut Option<Editor>,
    ) {
        let id = event.id();

        if tray.is_exit(id) {
            info!("Exit requested via tray menu");
            SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
        } else if tray.is_edit(id) {
            start_editing(notifier, editor);
        } else if tray.is_enable(id) {
            let enabled = notifier.toggle_enabled();
            debug!(enabled, "Enabled toggled via tray menu");
        } else if tray.is_flash(id) {
            let mut settings = notifier.settings();
            settings.flash_on_notify = tray.flash_checked();
            update_settings(notifier, settings);
        } else if tray.is_repeat(id) {
            let mut settings = notifier.settings();
            settings.repeat_enabled = tray.repeat_checked();
            update_settings(notifier, settings);
        } else if let Some(corner) = tray.corner_for(id) {
            tray.set_corner_checked(corner);
            let mut settings = notifier.settings();
            settings.corner = corner;
            update_settings(notifier, settings);
        } else if tray.is_autolaunch(id) {
            let wanted = tray.autolaunch_checked();
            if let Err(e) = autolaunch::set(wanted) {
                error!("Auto-launch update failed: {e}");
                show_error(&format!("Could not change \"Start with Windows\".\n{e}"));
                tray.set_autolaunch_checked(autolaunch::is_enabled());
            }
        }
    }

    /// Apply a tray settings change and write it out
    fn update_settings(notifier: &mut AppNotifier<'_>, settings: NotificationSettings) {
        if let Err(e) = notifier.update_settings(settings) {
            error!("Saving data file failed: {e}");
        }
    }

    /// Save, pause polling and open the data file in the editor
    fn start_editing(notifier: &mut AppNotifier<'_>, editor: &mut Option<Editor>) {
        if editor.is_some() {
            debug!("Editor already open");
            return;
        }
        if let Err(e) = notifier.save() {
            error!("Saving data file failed: {e}");
            show_error(&e.to_string());
            return;
        }

        notifier.on_main_window_shown();
        match Editor::open(notifier.store_path()) {
            Ok(e) => *editor = Some(e),
            Err(e) => {
                error!("{e}");
                show_error(&e.to_string());
                if let Err(e) = notifier.on_main_window_hidden() {
                    error!("Saving data file failed: {e}");
                }
            }
        }
    }

    /// Reload the edited file and resume polling. A rejected file stays on
    /// disk as the user left it.
    fn finish_editing(notifier: &mut AppNotifier<'_>, tray: &TrayState) {
        match store::reload(notifier.store_path()) {
            Ok(state) => {
                notifier.apply(state);
                tray.sync_settings(&notifier.settings());
                if let Err(e) = notifier.on_main_window_hidden() {
                    error!("Saving data file failed: {e}");
                }
            }
            Err(e) => {
                warn!("Edited data file rejected: {e}");
                notifier.on_main_window_cancelled();
                show_error(&format!("The watch list was not changed.\n{e}"));
            }
        }
    }

    /// Modal error dialog titled with the app name
    fn show_error(text: &str) {
        let text: Vec<u16> = text.encode_utf16().chain(std::iter::once(0)).collect();
        let caption: Vec<u16> = APP_TITLE.encode_utf16().chain(std::iter::once(0)).collect();
        unsafe {
            MessageBoxW(
                None,
                PCWSTR(text.as_ptr()),
                PCWSTR(caption.as_ptr()),
                MB_OK | MB_ICONERROR,
            );
        }
    }
}
