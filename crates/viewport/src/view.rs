use agentline_runtime_config::ViewportSettings;
use serde::Serialize;
use std::ops::Range;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::announce::LiveAnnouncer;
use crate::state::{PinState, ScrollMetrics};
use crate::window::VirtualWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollAlign {
    Start,
    Center,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollBehavior {
    Smooth,
    Instant,
}

/// Scroll request for the host to carry out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScrollCommand {
    pub index: usize,
    pub align: ScrollAlign,
    pub behavior: ScrollBehavior,
}

impl ScrollCommand {
    fn to_end(index: usize, behavior: ScrollBehavior) -> Self {
        Self {
            index,
            align: ScrollAlign::End,
            behavior,
        }
    }
}

/// Headless state of a virtualized, auto-following event list.
///
/// The host reports item counts, measurements and scroll positions, and
/// performs any returned [`ScrollCommand`].
#[derive(Debug, Clone)]
pub struct EventListView {
    window: VirtualWindow,
    pin: PinState,
    announcer: LiveAnnouncer,
    len: usize,
    mounted: bool,
    metrics: ScrollMetrics,
}

impl Default for EventListView {
    fn default() -> Self {
        Self::new(&ViewportSettings::default())
    }
}

impl EventListView {
    pub fn new(settings: &ViewportSettings) -> Self {
        Self {
            window: VirtualWindow::new(settings.estimated_item_height, settings.overscan),
            pin: PinState::new(
                settings.pin_threshold_px,
                Duration::from_millis(settings.auto_scroll_guard_ms),
            ),
            announcer: LiveAnnouncer::new(Duration::from_millis(settings.announce_clear_ms)),
            len: 0,
            mounted: false,
            metrics: ScrollMetrics::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_pinned_to_latest(&self) -> bool {
        self.pin.is_pinned_to_latest
    }

    pub fn window(&self) -> &VirtualWindow {
        &self.window
    }

    /// React to a new item count. Growth is announced; while pinned the list
    /// follows the last item, smoothly for growth and instantly on first
    /// mount or when the list shrank.
    pub fn on_items_changed(&mut self, len: usize, now: Instant) -> Option<ScrollCommand> {
        let previous = self.len;
        self.len = len;

        if !self.mounted {
            self.mounted = true;
            self.window.resize(len);
            return self.follow(ScrollBehavior::Instant, now);
        }

        if len > previous {
            self.window.resize(len);
            self.announcer.announce_growth(len - previous, now);
            return self.follow(ScrollBehavior::Smooth, now);
        }
        if len < previous {
            self.window.reset(len);
            return self.follow(ScrollBehavior::Instant, now);
        }
        None
    }

    /// The list was swapped for a different one of `len` items.
    pub fn on_items_replaced(&mut self, len: usize, now: Instant) -> Option<ScrollCommand> {
        self.len = len;
        self.mounted = true;
        self.window.reset(len);
        self.announcer.clear();
        self.follow(ScrollBehavior::Instant, now)
    }

    fn follow(&mut self, behavior: ScrollBehavior, now: Instant) -> Option<ScrollCommand> {
        if !self.pin.is_pinned_to_latest || self.len == 0 {
            return None;
        }
        self.pin.begin_auto_scroll(now);
        Some(ScrollCommand::to_end(self.len - 1, behavior))
    }

    pub fn measure(&mut self, index: usize, height: f64) {
        self.window.measure(index, height);
    }

    /// User or host scroll. Updates the pin unless a programmatic scroll is in
    /// flight.
    pub fn on_scroll(&mut self, metrics: ScrollMetrics, now: Instant) -> bool {
        self.metrics = metrics;
        let was_pinned = self.pin.is_pinned_to_latest;
        let pinned = self.pin.on_scroll(metrics, now);
        if was_pinned != pinned {
            debug!(
                "Viewport {} at {:.0}px from bottom",
                if pinned { "pinned" } else { "unpinned" },
                metrics.distance_from_bottom()
            );
        }
        pinned
    }

    pub fn finish_auto_scroll(&mut self) {
        self.pin.finish_auto_scroll();
    }

    /// Scroll to an externally selected item: centered mid-list, end-aligned
    /// for the last item. The list stays pinned only when that is the last
    /// item.
    pub fn focus(&mut self, index: usize, now: Instant) -> Option<ScrollCommand> {
        if index >= self.len {
            return None;
        }
        let is_last = index + 1 == self.len;
        if is_last {
            self.pin.pin();
        } else {
            self.pin.unpin();
        }
        self.pin.begin_auto_scroll(now);
        Some(ScrollCommand {
            index,
            align: if is_last {
                ScrollAlign::End
            } else {
                ScrollAlign::Center
            },
            behavior: ScrollBehavior::Smooth,
        })
    }

    pub fn jump_to_latest(&mut self, now: Instant) -> Option<ScrollCommand> {
        self.pin.pin();
        self.follow(ScrollBehavior::Smooth, now)
    }

    pub fn show_jump_to_latest(&self) -> bool {
        !self.pin.is_pinned_to_latest && self.len > 0
    }

    pub fn announcement(&self, now: Instant) -> Option<&str> {
        self.announcer.current(now)
    }

    /// Items to materialize for the last reported scroll position.
    pub fn render_range(&self) -> Range<usize> {
        self.window
            .visible_range(self.metrics.scroll_top, self.metrics.client_height)
    }
}
