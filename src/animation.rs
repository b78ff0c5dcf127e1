//! Animation module: easing, opacity timelines, overlay placement

use std::time::Duration;

use crate::settings::Corner;

/// Card fade-in / fade-out duration
pub const FADE_DURATION: Duration = Duration::from_millis(500);

/// Flash fade-out duration
pub const FLASH_DURATION: Duration = Duration::from_millis(400);

/// Flash start opacity (0..1)
pub const FLASH_OPACITY: f64 = 0.4;

/// Card distance from the work area edges (px)
pub const CARD_MARGIN: i32 = 10;

pub const CARD_MIN_WIDTH: i32 = 360;
pub const CARD_MIN_HEIGHT: i32 = 100;

/// Easing function type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Easing {
    Linear,
    /// ease-in variant: slow start, fast end
    InQuad,
}

impl Easing {
    /// Apply easing function: t ∈ [0,1] → [0,1]
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::InQuad => t * t,
        }
    }
}

/// Linear interpolation: lerp(a, b, t) = a + (b - a) * t
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Lifecycle phase of an overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    FadeIn,
    Hold,
    FadeOut,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Segment {
    phase: Phase,
    duration: Duration,
    from: f64,
    to: f64,
    easing: Easing,
}

/// Opacity and phase at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub phase: Phase,
    pub opacity: f64,
}

/// Sequence of opacity segments played back to back
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    segments: Vec<Segment>,
}

impl Timeline {
    /// Fade in, hold, fade out; `total` covers all three.
    ///
    /// # Panics
    /// If `total` does not exceed twice `fade`.
    pub fn card(total: Duration, fade: Duration) -> Self {
        assert!(
            total > fade * 2,
            "card duration {total:?} must exceed twice the fade duration {fade:?}"
        );

        Self {
            segments: vec![
                Segment {
                    phase: Phase::FadeIn,
                    duration: fade,
                    from: 0.0,
                    to: 1.0,
                    easing: Easing::InQuad,
                },
                Segment {
                    phase: Phase::Hold,
                    duration: total - fade * 2,
                    from: 1.0,
                    to: 1.0,
                    easing: Easing::Linear,
                },
                Segment {
                    phase: Phase::FadeOut,
                    duration: fade,
                    from: 1.0,
                    to: 0.0,
                    easing: Easing::InQuad,
                },
            ],
        }
    }

    /// Single fade from `start_opacity` to transparent
    pub fn flash(duration: Duration, start_opacity: f64) -> Self {
        Self {
            segments: vec![Segment {
                phase: Phase::FadeOut,
                duration,
                from: start_opacity,
                to: 0.0,
                easing: Easing::InQuad,
            }],
        }
    }

    pub fn total(&self) -> Duration {
        self.segments.iter().map(|s| s.duration).sum()
    }

    /// Frame `elapsed` after the start
    pub fn sample(&self, elapsed: Duration) -> Frame {
        let mut offset = elapsed;
        for segment in &self.segments {
            if offset < segment.duration {
                let t = offset.as_secs_f64() / segment.duration.as_secs_f64();
                return Frame {
                    phase: segment.phase,
                    opacity: lerp(segment.from, segment.to, segment.easing.apply(t)),
                };
            }
            offset -= segment.duration;
        }

        Frame {
            phase: Phase::Done,
            opacity: 0.0,
        }
    }
}

/// Screen rectangle (left/top inclusive, right/bottom exclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

/// Card size: measured content, never below the minimum
pub fn card_size(content: Size) -> Size {
    Size {
        width: content.width.max(CARD_MIN_WIDTH),
        height: content.height.max(CARD_MIN_HEIGHT),
    }
}

/// Card top-left corner within `work_area`, `CARD_MARGIN` away from the edges
pub fn card_origin(corner: Corner, work_area: &Rect, size: Size) -> (i32, i32) {
    let left = work_area.left + CARD_MARGIN;
    let right = work_area.right - size.width - CARD_MARGIN;
    let top = work_area.top + CARD_MARGIN;
    let bottom = work_area.bottom - size.height - CARD_MARGIN;

    match corner {
        Corner::BottomLeft => (left, bottom),
        Corner::BottomRight => (right, bottom),
        Corner::TopLeft => (left, top),
        Corner::TopRight => (right, top),
    }
}
