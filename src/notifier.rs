//! Notification state machine: poll → match → notify
//!
//! One [`Notifier`] owns all mutable watch state: the previous match set, the
//! repeat timer, the live overlays and the status indicator. Everything runs on
//! the caller's thread; time enters only through [`Notifier::advance`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use crate::enumerate::{WindowSource, enumerate};
use crate::error::StoreError;
use crate::matching::match_titles;
use crate::overlay::{OverlayBackend, OverlayPresenter};
use crate::scheduler::{Scheduler, TimerId};
use crate::settings::NotificationSettings;
use crate::store::{self, PersistedState};

/// Window title of this application, never matched
pub const APP_TITLE: &str = "Taskbar Notifier";

/// Fixed polling cadence
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Tray indicator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorState {
    /// Polling, nothing matched
    Idle,
    /// Polling, watched windows present
    Active,
    /// Polling suspended by the user
    Disabled,
}

/// Receives indicator changes (tray icon)
pub trait StatusIndicator {
    fn set_state(&self, state: IndicatorState);
}

impl<T: StatusIndicator + ?Sized> StatusIndicator for &T {
    fn set_state(&self, state: IndicatorState) {
        (**self).set_state(state)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerEvent {
    Poll,
    RepeatExpired,
}

pub struct Notifier<W: WindowSource, B: OverlayBackend, I: StatusIndicator> {
    source: W,
    presenter: OverlayPresenter<B>,
    indicator: I,
    scheduler: Scheduler<TimerEvent>,
    store_path: PathBuf,
    settings: NotificationSettings,
    expressions: Vec<String>,
    excluded: HashSet<String>,
    previous: Vec<String>,
    status: IndicatorState,
    enabled: bool,
    main_window_shown: bool,
    poll_timer: Option<TimerId>,
    repeat_timer: Option<TimerId>,
}

impl<W: WindowSource, B: OverlayBackend, I: StatusIndicator> Notifier<W, B, I> {
    /// Start watching with `state`; polling begins immediately
    pub fn new(
        source: W,
        backend: B,
        indicator: I,
        store_path: PathBuf,
        state: PersistedState,
    ) -> Self {
        let PersistedState {
            settings,
            expressions,
        } = state;

        let mut notifier = Self {
            source,
            presenter: OverlayPresenter::new(backend),
            indicator,
            scheduler: Scheduler::new(),
            store_path,
            settings: settings.clamped(),
            expressions: sanitize(expressions),
            excluded: HashSet::from([APP_TITLE.to_string()]),
            previous: Vec::new(),
            status: IndicatorState::Idle,
            enabled: true,
            main_window_shown: false,
            poll_timer: None,
            repeat_timer: None,
        };
        notifier.indicator.set_state(IndicatorState::Idle);
        notifier.start_polling();
        info!(
            expressions = notifier.expressions.len(),
            "Watching for {} expression(s)",
            notifier.expressions.len()
        );
        notifier
    }

    /// Fire every timer due by `now`, then animate overlays to `now`
    pub fn advance(&mut self, now: Duration) {
        while let Some((_, event)) = self.scheduler.pop_due(now) {
            match event {
                TimerEvent::Poll => self.on_poll_tick(),
                TimerEvent::RepeatExpired => {
                    trace!("Repeat interval elapsed");
                    self.repeat_timer = None;
                }
            }
        }
        self.presenter.tick(now);
    }

    /// One polling cycle. Ignored while polling is suspended.
    pub fn on_poll_tick(&mut self) {
        if !self.is_polling() {
            trace!("Poll tick while suspended");
            return;
        }

        let current = if self.expressions.is_empty() {
            Vec::new()
        } else {
            let snapshot = enumerate(&self.source, &self.excluded);
            match_titles(&self.expressions, &snapshot)
        };

        if current.is_empty() {
            if !self.previous.is_empty() {
                info!("Watched windows gone");
            }
            self.set_status(IndicatorState::Idle);
        } else {
            let changed = current != self.previous;
            let repeat_due = self.settings.repeat_enabled && !self.repeat_armed();
            if changed || repeat_due {
                self.notify(&current);
            }
            self.set_status(IndicatorState::Active);
        }

        self.previous = current;
    }

    /// Configuration window opened: suspend polling
    pub fn on_main_window_shown(&mut self) {
        self.main_window_shown = true;
        self.stop_polling();
        info!("Main window shown, polling paused");
    }

    /// Configuration window closed: persist, then resume polling
    pub fn on_main_window_hidden(&mut self) -> Result<(), StoreError> {
        let saved = self.save();
        self.resume_after_main_window();
        saved
    }

    /// Configuration window closed without a usable result: resume polling,
    /// leave the data file as it is
    pub fn on_main_window_cancelled(&mut self) {
        self.resume_after_main_window();
    }

    /// Adopt new settings; they take effect on the next tick
    pub fn on_settings_changed(&mut self, settings: NotificationSettings) {
        self.settings = settings.clamped();
        debug!(settings = ?self.settings, "Settings changed");
    }

    /// Adopt new settings and write them out right away
    pub fn update_settings(&mut self, settings: NotificationSettings) -> Result<(), StoreError> {
        self.on_settings_changed(settings);
        self.save()
    }

    /// Replace the watch list and persist it
    pub fn set_expressions(&mut self, expressions: Vec<String>) -> Result<(), StoreError> {
        self.expressions = sanitize(expressions);
        info!(expressions = self.expressions.len(), "Watch list updated");
        self.save()
    }

    /// Adopt a reloaded data file without writing it back
    pub fn apply(&mut self, state: PersistedState) {
        self.on_settings_changed(state.settings);
        self.expressions = sanitize(state.expressions);
        info!(expressions = self.expressions.len(), "Data file applied");
    }

    /// Enable or disable polling. Disabling forgets the previous match set.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled == self.enabled {
            return;
        }
        self.enabled = enabled;

        if enabled {
            self.set_status(IndicatorState::Idle);
            if !self.main_window_shown {
                self.start_polling();
            }
            info!("Application enabled");
        } else {
            self.stop_polling();
            self.previous.clear();
            self.set_status(IndicatorState::Disabled);
            info!("Application disabled");
        }
    }

    /// Flip enabled state, returns the new state
    pub fn toggle_enabled(&mut self) -> bool {
        self.set_enabled(!self.enabled);
        self.enabled
    }

    /// Stop timers and overlays, then write the data file
    pub fn shutdown(&mut self) -> Result<(), StoreError> {
        self.stop_polling();
        if let Some(id) = self.repeat_timer.take() {
            self.scheduler.cancel(id);
        }
        self.presenter.stop_all();
        info!("Shutting down");
        self.save()
    }

    pub fn save(&self) -> Result<(), StoreError> {
        store::save(&self.store_path, &self.persisted())
    }

    pub fn persisted(&self) -> PersistedState {
        PersistedState {
            settings: self.settings,
            expressions: self.expressions.clone(),
        }
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    pub fn settings(&self) -> NotificationSettings {
        self.settings
    }

    pub fn expressions(&self) -> &[String] {
        &self.expressions
    }

    pub fn status(&self) -> IndicatorState {
        self.status
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_polling(&self) -> bool {
        self.poll_timer.is_some()
    }

    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    #[cfg(test)]
    fn presenter(&self) -> &OverlayPresenter<B> {
        &self.presenter
    }

    fn resume_after_main_window(&mut self) {
        self.main_window_shown = false;
        if self.enabled {
            self.start_polling();
        }
        info!("Main window hidden, polling resumed");
    }

    fn notify(&mut self, matches: &[String]) {
        let now = self.scheduler.now();
        info!(matches = %matches.join(", "), "Showing notification");

        self.presenter.stop_all();
        if self.settings.flash_on_notify {
            self.presenter.show_flash(now);
        }
        self.presenter
            .show_card(APP_TITLE, &matches.join("\n"), self.settings.corner, now);

        if self.settings.repeat_enabled {
            if let Some(id) = self.repeat_timer.take() {
                self.scheduler.cancel(id);
            }
            let interval = Duration::from_secs(self.settings.repeat_interval_secs as u64);
            self.repeat_timer = Some(
                self.scheduler
                    .schedule_once(interval, TimerEvent::RepeatExpired),
            );
        }
    }

    fn repeat_armed(&self) -> bool {
        self.repeat_timer
            .is_some_and(|id| self.scheduler.is_pending(id))
    }

    fn set_status(&mut self, status: IndicatorState) {
        if self.status != status {
            debug!(from = ?self.status, to = ?status, "Indicator");
            self.status = status;
            self.indicator.set_state(status);
        }
    }

    fn start_polling(&mut self) {
        if self.poll_timer.is_none() {
            self.poll_timer = Some(
                self.scheduler
                    .schedule_repeating(POLL_INTERVAL, TimerEvent::Poll),
            );
        }
    }

    fn stop_polling(&mut self) {
        if let Some(id) = self.poll_timer.take() {
            self.scheduler.cancel(id);
        }
    }
}

/// Drop empty and multi-line expressions
fn sanitize(expressions: Vec<String>) -> Vec<String> {
    expressions
        .into_iter()
        .filter(|e| {
            let ok = !e.is_empty() && !e.contains(['\n', '\r']);
            if !ok {
                warn!(expression = ?e, "Ignoring invalid watch expression");
            }
            ok
        })
        .collect()
}
