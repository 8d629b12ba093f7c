//! Headless shell for a virtualized event list.
//!
//! Holds only transient scroll state. The host renders items in
//! [`EventListView::render_range`], reports measurements and scroll positions,
//! and applies the returned [`ScrollCommand`]s.

pub mod announce;
pub mod state;
pub mod view;
pub mod window;

pub use announce::{LiveAnnouncer, growth_message};
pub use state::{PinState, ScrollMetrics};
pub use view::{EventListView, ScrollAlign, ScrollBehavior, ScrollCommand};
pub use window::VirtualWindow;
