//! Overlay presenter: notification card + screen flash lifecycle
//!
//! Each overlay is a surface plus a [`Timeline`]. The presenter samples the
//! timeline on every animation frame, pushes the opacity to the surface and
//! closes it when the timeline is done or the surface was clicked. At most one
//! card and one flash are live; showing a new one disposes the old one first.

use std::time::Duration;
use tracing::{debug, warn};

use crate::animation::{
    FADE_DURATION, FLASH_DURATION, FLASH_OPACITY, Phase, Rect, Size, Timeline, card_origin,
    card_size,
};
use crate::error::OverlayError;
use crate::settings::{Corner, NOTIFICATION_DURATION_SECS};

/// Card and flash background colour (RGB)
pub const OVERLAY_COLOR: (u8, u8, u8) = (117, 16, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    Card,
    Flash,
}

/// What a backend has to draw
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceContent {
    Card { title: String, text: String },
    Flash,
}

/// One live overlay window
pub trait OverlaySurface {
    fn set_opacity(&mut self, opacity: f64);

    /// True once the user clicked the surface
    fn was_clicked(&self) -> bool;

    /// Hide and release the window. Must be idempotent.
    fn close(&mut self);
}

/// Platform side: screen geometry, text measurement, window creation
pub trait OverlayBackend {
    type Surface: OverlaySurface;

    /// Whole primary screen
    fn screen(&self) -> Rect;

    /// Primary screen minus taskbar
    fn work_area(&self) -> Rect;

    /// Size needed to render the card content
    fn measure_card(&self, title: &str, text: &str) -> Size;

    fn open(&mut self, bounds: Rect, content: SurfaceContent)
    -> Result<Self::Surface, OverlayError>;
}

/// Surface + timeline; closing the surface on drop covers every exit path
struct LiveOverlay<S: OverlaySurface> {
    kind: OverlayKind,
    surface: S,
    timeline: Timeline,
    started_at: Duration,
    phase: Phase,
}

impl<S: OverlaySurface> LiveOverlay<S> {
    /// Advance to `now`; false once the overlay should go away
    fn animate(&mut self, now: Duration) -> bool {
        if self.surface.was_clicked() {
            debug!(kind = ?self.kind, "Overlay dismissed by click");
            return false;
        }

        let frame = self
            .timeline
            .sample(now.saturating_sub(self.started_at));
        self.phase = frame.phase;
        if frame.phase == Phase::Done {
            return false;
        }

        self.surface.set_opacity(frame.opacity);
        true
    }
}

impl<S: OverlaySurface> Drop for LiveOverlay<S> {
    fn drop(&mut self) {
        self.surface.close();
    }
}

/// Owns the live card and flash
pub struct OverlayPresenter<B: OverlayBackend> {
    backend: B,
    card_duration: Duration,
    card: Option<LiveOverlay<B::Surface>>,
    flash: Option<LiveOverlay<B::Surface>>,
}

impl<B: OverlayBackend> OverlayPresenter<B> {
    pub fn new(backend: B) -> Self {
        Self::with_card_duration(
            backend,
            Duration::from_secs(NOTIFICATION_DURATION_SECS as u64),
        )
    }

    /// # Panics
    /// If `card_duration` does not exceed twice the fade duration.
    pub fn with_card_duration(backend: B, card_duration: Duration) -> Self {
        // panics here on an invalid duration, not on the first notification
        Timeline::card(card_duration, FADE_DURATION);
        Self {
            backend,
            card_duration,
            card: None,
            flash: None,
        }
    }

    /// Show a card in `corner`, replacing a live one
    pub fn show_card(&mut self, title: &str, text: &str, corner: Corner, now: Duration) {
        self.stop(OverlayKind::Card);

        let size = card_size(self.backend.measure_card(title, text));
        let (x, y) = card_origin(corner, &self.backend.work_area(), size);
        let bounds = Rect {
            left: x,
            top: y,
            right: x + size.width,
            bottom: y + size.height,
        };
        let content = SurfaceContent::Card {
            title: title.to_string(),
            text: text.to_string(),
        };
        let timeline = Timeline::card(self.card_duration, FADE_DURATION);

        self.card = self.open(OverlayKind::Card, bounds, content, timeline, now);
    }

    /// Flash the whole screen, replacing a live flash
    pub fn show_flash(&mut self, now: Duration) {
        self.stop(OverlayKind::Flash);

        let bounds = self.backend.screen();
        let timeline = Timeline::flash(FLASH_DURATION, FLASH_OPACITY);
        self.flash = self.open(OverlayKind::Flash, bounds, SurfaceContent::Flash, timeline, now);
    }

    /// Animation frame: update opacities, drop finished or clicked overlays
    pub fn tick(&mut self, now: Duration) {
        for slot in [&mut self.card, &mut self.flash] {
            if slot.as_mut().is_some_and(|o| !o.animate(now)) {
                *slot = None;
            }
        }
    }

    /// Stop one overlay kind. No-op when none is live.
    pub fn stop(&mut self, kind: OverlayKind) {
        let slot = match kind {
            OverlayKind::Card => &mut self.card,
            OverlayKind::Flash => &mut self.flash,
        };
        if slot.take().is_some() {
            debug!(?kind, "Overlay stopped");
        }
    }

    pub fn stop_all(&mut self) {
        self.stop(OverlayKind::Card);
        self.stop(OverlayKind::Flash);
    }

    pub fn is_live(&self, kind: OverlayKind) -> bool {
        match kind {
            OverlayKind::Card => self.card.is_some(),
            OverlayKind::Flash => self.flash.is_some(),
        }
    }

    /// Phase of the live overlay of `kind`, if any
    pub fn phase(&self, kind: OverlayKind) -> Option<Phase> {
        match kind {
            OverlayKind::Card => self.card.as_ref().map(|o| o.phase),
            OverlayKind::Flash => self.flash.as_ref().map(|o| o.phase),
        }
    }

    #[cfg(test)]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn open(
        &mut self,
        kind: OverlayKind,
        bounds: Rect,
        content: SurfaceContent,
        timeline: Timeline,
        now: Duration,
    ) -> Option<LiveOverlay<B::Surface>> {
        match self.backend.open(bounds, content) {
            Ok(surface) => {
                let mut overlay = LiveOverlay {
                    kind,
                    surface,
                    timeline,
                    started_at: now,
                    phase: Phase::FadeIn,
                };
                overlay.animate(now);
                Some(overlay)
            }
            Err(e) => {
                warn!(?kind, "Overlay failed: {e}");
                None
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingBackend;
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn presenter() -> OverlayPresenter<RecordingBackend> {
        OverlayPresenter::new(RecordingBackend::default())
    }

    // ========== Card Lifecycle Tests ==========

    #[test]
    fn test_card_opens_transparent() {
        let mut p = presenter();
        p.show_card("Taskbar Notifier", "NotePad", Corner::BottomRight, ms(0));

        let cards = p.backend().cards();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].borrow().opacities, vec![0.0]);
        assert_eq!(p.phase(OverlayKind::Card), Some(Phase::FadeIn));
    }

    #[test]
    fn test_card_content() {
        let mut p = presenter();
        p.show_card("Taskbar Notifier", "a\nb", Corner::TopLeft, ms(0));

        let card = &p.backend().cards()[0];
        assert_eq!(
            card.borrow().content,
            Some(SurfaceContent::Card {
                title: "Taskbar Notifier".to_string(),
                text: "a\nb".to_string(),
            })
        );
    }

    #[test]
    fn test_card_full_lifecycle() {
        let mut p = presenter();
        p.show_card("t", "x", Corner::BottomRight, ms(1000));

        p.tick(ms(1500));
        assert_eq!(p.phase(OverlayKind::Card), Some(Phase::Hold));
        p.tick(ms(5600));
        assert_eq!(p.phase(OverlayKind::Card), Some(Phase::FadeOut));
        p.tick(ms(5999));
        assert!(p.is_live(OverlayKind::Card));
        p.tick(ms(6000));
        assert!(!p.is_live(OverlayKind::Card));

        let card = &p.backend().cards()[0];
        assert_eq!(card.borrow().close_calls, 1);
    }

    #[test]
    fn test_card_closed_once_after_done() {
        let mut p = presenter();
        p.show_card("t", "x", Corner::BottomRight, ms(0));
        p.tick(ms(5000));
        p.tick(ms(6000));
        p.stop(OverlayKind::Card);
        p.stop_all();

        assert_eq!(p.backend().cards()[0].borrow().close_calls, 1);
    }

    #[test]
    fn test_card_click_dismisses() {
        let mut p = presenter();
        p.show_card("t", "x", Corner::BottomRight, ms(0));
        p.tick(ms(1000));

        p.backend().cards()[0].borrow_mut().clicked = true;
        p.tick(ms(1016));

        assert!(!p.is_live(OverlayKind::Card));
        assert_eq!(p.backend().cards()[0].borrow().close_calls, 1);
    }

    #[test]
    fn test_card_placement_uses_corner_and_min_size() {
        let mut p = presenter();
        p.show_card("t", "x", Corner::BottomRight, ms(0));

        let bounds = p.backend().cards()[0].borrow().bounds;
        assert_eq!(
            bounds,
            Rect {
                left: 1920 - 360 - 10,
                top: 1040 - 100 - 10,
                right: 1920 - 10,
                bottom: 1040 - 10,
            }
        );
    }

    #[test]
    fn test_card_grows_with_lines() {
        let mut p = presenter();
        let text = ["a"; 6].join("\n");
        p.show_card("t", &text, Corner::TopLeft, ms(0));

        let bounds = p.backend().cards()[0].borrow().bounds;
        assert_eq!(bounds.height(), 40 + 20 * 6);
        assert_eq!(bounds.width(), 360);
    }

    // ========== Replacement Tests ==========

    #[test]
    fn test_second_card_disposes_first() {
        let mut p = presenter();
        p.show_card("t", "first", Corner::BottomRight, ms(0));
        p.show_card("t", "second", Corner::BottomRight, ms(100));

        let cards = p.backend().cards();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].borrow().close_calls, 1);
        assert!(cards[1].borrow().is_open());
        assert_eq!(p.backend().open_count(), 1);
    }

    #[test]
    fn test_never_two_cards_live() {
        let mut p = presenter();
        for i in 0..5 {
            p.show_card("t", "x", Corner::BottomRight, ms(i * 100));
            assert_eq!(p.backend().open_count(), 1);
        }
    }

    #[test]
    fn test_replacement_restarts_timeline() {
        let mut p = presenter();
        p.show_card("t", "first", Corner::BottomRight, ms(0));
        p.show_card("t", "second", Corner::BottomRight, ms(4000));
        p.tick(ms(5500));
        assert_eq!(p.phase(OverlayKind::Card), Some(Phase::Hold));
    }

    // ========== Flash Tests ==========

    #[test]
    fn test_flash_covers_screen() {
        let mut p = presenter();
        p.show_flash(ms(0));

        let flash = &p.backend().flashes()[0];
        assert_eq!(flash.borrow().bounds, p.backend().screen());
        assert!((flash.borrow().opacities[0] - FLASH_OPACITY).abs() < 1e-10);
    }

    #[test]
    fn test_flash_self_closes() {
        let mut p = presenter();
        p.show_flash(ms(0));
        p.tick(ms(399));
        assert!(p.is_live(OverlayKind::Flash));
        p.tick(ms(400));
        assert!(!p.is_live(OverlayKind::Flash));
        assert_eq!(p.backend().flashes()[0].borrow().close_calls, 1);
    }

    #[test]
    fn test_flash_and_card_independent() {
        let mut p = presenter();
        p.show_flash(ms(0));
        p.show_card("t", "x", Corner::BottomRight, ms(0));
        assert_eq!(p.backend().open_count(), 2);

        p.tick(ms(400));
        assert!(!p.is_live(OverlayKind::Flash));
        assert!(p.is_live(OverlayKind::Card));
    }

    #[test]
    fn test_flash_click_dismisses() {
        let mut p = presenter();
        p.show_flash(ms(0));
        p.backend().flashes()[0].borrow_mut().clicked = true;
        p.tick(ms(10));
        assert!(!p.is_live(OverlayKind::Flash));
    }

    // ========== Cleanup Tests ==========

    #[test]
    fn test_stop_without_overlay_is_noop() {
        let mut p = presenter();
        p.stop(OverlayKind::Card);
        p.stop_all();
        assert!(p.backend().surfaces.is_empty());
    }

    #[test]
    fn test_stop_all_closes_everything() {
        let mut p = presenter();
        p.show_flash(ms(0));
        p.show_card("t", "x", Corner::BottomRight, ms(0));
        p.stop_all();
        assert_eq!(p.backend().open_count(), 0);
    }

    #[test]
    fn test_drop_presenter_closes_surfaces() {
        let mut p = presenter();
        p.show_card("t", "x", Corner::BottomRight, ms(0));
        let card = p.backend().cards()[0].clone();
        drop(p);
        assert_eq!(card.borrow().close_calls, 1);
    }

    #[test]
    fn test_backend_failure_leaves_nothing_live() {
        let mut p = OverlayPresenter::new(RecordingBackend {
            failing: true,
            ..Default::default()
        });
        p.show_card("t", "x", Corner::BottomRight, ms(0));
        p.show_flash(ms(0));
        assert!(!p.is_live(OverlayKind::Card));
        assert!(!p.is_live(OverlayKind::Flash));
    }

    #[test]
    #[should_panic(expected = "must exceed twice the fade duration")]
    fn test_short_card_duration_rejected() {
        OverlayPresenter::with_card_duration(RecordingBackend::default(), ms(800));
    }
}
