use std::ops::Range;

/// Item geometry for a virtualized list.
///
/// Heights are estimated until the host reports a measurement, after which the
/// measured value is used for every offset computation.
#[derive(Debug, Clone)]
pub struct VirtualWindow {
    heights: Vec<Option<f64>>,
    estimate: f64,
    overscan: usize,
}

impl VirtualWindow {
    pub fn new(estimate: f64, overscan: usize) -> Self {
        Self {
            heights: Vec::new(),
            estimate: estimate.max(1.0),
            overscan,
        }
    }

    pub fn len(&self) -> usize {
        self.heights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }

    /// Grow or shrink to `len` items. Existing measurements are kept.
    pub fn resize(&mut self, len: usize) {
        self.heights.resize(len, None);
    }

    /// Forget every measurement, e.g. after the list was replaced.
    pub fn reset(&mut self, len: usize) {
        self.heights.clear();
        self.heights.resize(len, None);
    }

    pub fn measure(&mut self, index: usize, height: f64) {
        if let Some(slot) = self.heights.get_mut(index) {
            *slot = Some(height.max(0.0));
        }
    }

    pub fn is_measured(&self, index: usize) -> bool {
        self.heights.get(index).is_some_and(Option::is_some)
    }

    pub fn height_of(&self, index: usize) -> f64 {
        self.heights
            .get(index)
            .copied()
            .flatten()
            .unwrap_or(self.estimate)
    }

    /// Top edge of `index`; `len()` yields the total height.
    pub fn offset_of(&self, index: usize) -> f64 {
        (0..index.min(self.len())).map(|i| self.height_of(i)).sum()
    }

    pub fn total_height(&self) -> f64 {
        self.offset_of(self.len())
    }

    /// Items intersecting `[scroll_top, scroll_top + viewport_height)` plus
    /// `overscan` items on each side.
    pub fn visible_range(&self, scroll_top: f64, viewport_height: f64) -> Range<usize> {
        let len = self.len();
        if len == 0 {
            return 0..0;
        }
        let top = scroll_top.max(0.0);
        let bottom = top + viewport_height.max(0.0);

        let mut first = len;
        let mut last = 0;
        let mut offset = 0.0;
        for index in 0..len {
            let height = self.height_of(index);
            let end = offset + height;
            if end > top && offset < bottom.max(top + f64::EPSILON) {
                first = first.min(index);
                last = index + 1;
            }
            if offset >= bottom {
                break;
            }
            offset = end;
        }
        if first == len {
            // Scrolled past the content; keep the tail mounted.
            first = len - 1;
            last = len;
        }

        first.saturating_sub(self.overscan)..(last + self.overscan).min(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_use_measurements_once_known() {
        let mut window = VirtualWindow::new(100.0, 0);
        window.resize(4);
        assert_eq!(window.total_height(), 400.0);

        window.measure(1, 40.0);
        assert!(window.is_measured(1));
        assert_eq!(window.offset_of(2), 140.0);
        assert_eq!(window.total_height(), 340.0);
    }

    #[test]
    fn visible_range_includes_overscan() {
        let mut window = VirtualWindow::new(10.0, 2);
        window.resize(100);
        assert_eq!(window.visible_range(200.0, 30.0), 18..25);
        assert_eq!(window.visible_range(0.0, 30.0), 0..5);
        assert_eq!(window.visible_range(980.0, 50.0), 96..100);
    }

    #[test]
    fn scrolled_past_content_keeps_tail() {
        let mut window = VirtualWindow::new(10.0, 1);
        window.resize(3);
        assert_eq!(window.visible_range(500.0, 20.0), 1..3);
    }

    #[test]
    fn resize_keeps_measurements_and_reset_drops_them() {
        let mut window = VirtualWindow::new(10.0, 0);
        window.resize(2);
        window.measure(0, 50.0);
        window.resize(5);
        assert_eq!(window.height_of(0), 50.0);

        window.reset(5);
        assert_eq!(window.height_of(0), 10.0);
        assert_eq!(window.visible_range(0.0, 0.0), 0..1);
    }
}
