use std::time::{Duration, Instant};

pub const DEFAULT_ANNOUNCE_CLEAR: Duration = Duration::from_secs(2);

/// Text for a screen-reader live region announcing list growth.
#[derive(Debug, Clone)]
pub struct LiveAnnouncer {
    message: Option<String>,
    posted_at: Option<Instant>,
    clear_after: Duration,
}

impl Default for LiveAnnouncer {
    fn default() -> Self {
        Self::new(DEFAULT_ANNOUNCE_CLEAR)
    }
}

impl LiveAnnouncer {
    pub fn new(clear_after: Duration) -> Self {
        Self {
            message: None,
            posted_at: None,
            clear_after,
        }
    }

    /// Replace the announcement with one for `added` new items.
    pub fn announce_growth(&mut self, added: usize, now: Instant) {
        if added == 0 {
            return;
        }
        self.message = Some(growth_message(added));
        self.posted_at = Some(now);
    }

    /// Current announcement, or `None` once it has been cleared.
    pub fn current(&self, now: Instant) -> Option<&str> {
        let posted = self.posted_at?;
        if now.saturating_duration_since(posted) >= self.clear_after {
            return None;
        }
        self.message.as_deref()
    }

    pub fn clear(&mut self) {
        self.message = None;
        self.posted_at = None;
    }
}

pub fn growth_message(added: usize) -> String {
    if added == 1 {
        "1 new event".to_string()
    } else {
        format!("{added} new events")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pluralizes() {
        assert_eq!(growth_message(1), "1 new event");
        assert_eq!(growth_message(3), "3 new events");
    }

    #[test]
    fn clears_after_timeout_and_restarts_on_new_growth() {
        let t0 = Instant::now();
        let mut announcer = LiveAnnouncer::default();
        assert_eq!(announcer.current(t0), None);

        announcer.announce_growth(2, t0);
        assert_eq!(announcer.current(t0 + Duration::from_millis(1999)), Some("2 new events"));
        assert_eq!(announcer.current(t0 + Duration::from_secs(2)), None);

        let t1 = t0 + Duration::from_secs(5);
        announcer.announce_growth(1, t1);
        assert_eq!(announcer.current(t1), Some("1 new event"));
        announcer.announce_growth(0, t1);
        assert_eq!(announcer.current(t1), Some("1 new event"));
    }
}
