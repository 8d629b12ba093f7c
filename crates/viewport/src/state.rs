use std::time::{Duration, Instant};

pub const DEFAULT_PIN_THRESHOLD_PX: f64 = 48.0;
pub const DEFAULT_AUTO_SCROLL_GUARD: Duration = Duration::from_millis(400);

/// Scroll position as reported by the host container.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
}

impl ScrollMetrics {
    pub fn distance_from_bottom(&self) -> f64 {
        (self.scroll_height - self.client_height - self.scroll_top).max(0.0)
    }
}

/// Whether the list follows newly arriving items.
///
/// Programmatic scrolls raise a guard so the scroll events they generate do
/// not feed back into the pin decision. The guard drops on
/// [`PinState::finish_auto_scroll`] or once its deadline passes.
#[derive(Debug, Clone)]
pub struct PinState {
    pub is_pinned_to_latest: bool,
    pub threshold_px: f64,
    guard: Duration,
    auto_scroll_until: Option<Instant>,
}

impl Default for PinState {
    fn default() -> Self {
        Self::new(DEFAULT_PIN_THRESHOLD_PX, DEFAULT_AUTO_SCROLL_GUARD)
    }
}

impl PinState {
    pub fn new(threshold_px: f64, guard: Duration) -> Self {
        Self {
            is_pinned_to_latest: true,
            threshold_px,
            guard,
            auto_scroll_until: None,
        }
    }

    pub fn is_auto_scrolling(&self, now: Instant) -> bool {
        self.auto_scroll_until.is_some_and(|until| now < until)
    }

    pub fn begin_auto_scroll(&mut self, now: Instant) {
        self.auto_scroll_until = Some(now + self.guard);
    }

    pub fn finish_auto_scroll(&mut self) {
        self.auto_scroll_until = None;
    }

    /// Re-derive the pin from a user scroll. Returns the resulting state.
    pub fn on_scroll(&mut self, metrics: ScrollMetrics, now: Instant) -> bool {
        if self.is_auto_scrolling(now) {
            return self.is_pinned_to_latest;
        }
        self.auto_scroll_until = None;
        self.is_pinned_to_latest = metrics.distance_from_bottom() <= self.threshold_px;
        self.is_pinned_to_latest
    }

    pub fn pin(&mut self) {
        self.is_pinned_to_latest = true;
    }

    pub fn unpin(&mut self) {
        self.is_pinned_to_latest = false;
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.threshold_px, self.guard);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_distance(distance: f64) -> ScrollMetrics {
        ScrollMetrics {
            scroll_top: 1000.0 - 300.0 - distance,
            scroll_height: 1000.0,
            client_height: 300.0,
        }
    }

    #[test]
    fn threshold_is_inclusive() {
        let now = Instant::now();
        let mut state = PinState::default();
        assert!(state.on_scroll(at_distance(48.0), now));
        assert!(!state.on_scroll(at_distance(48.5), now));
        assert!(state.on_scroll(at_distance(0.0), now));
    }

    #[test]
    fn guard_suppresses_scroll_feedback_until_finished() {
        let now = Instant::now();
        let mut state = PinState::default();
        state.begin_auto_scroll(now);
        assert!(state.on_scroll(at_distance(400.0), now));

        state.finish_auto_scroll();
        assert!(!state.on_scroll(at_distance(400.0), now));
    }

    #[test]
    fn guard_expires_on_its_own() {
        let now = Instant::now();
        let mut state = PinState::new(48.0, Duration::from_millis(100));
        state.begin_auto_scroll(now);
        assert!(state.is_auto_scrolling(now + Duration::from_millis(99)));
        assert!(!state.on_scroll(at_distance(200.0), now + Duration::from_millis(100)));
    }
}
