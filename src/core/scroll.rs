//! Proximity trigger for the end of the rendered list.
//!
//! The sentinel is the line index just past the last rendered card. It is
//! re-anchored whenever the list is re-rendered with different content; the
//! trigger fires once when the sentinel comes within `lead` rows of the bottom
//! of the viewport. It re-arms on the next anchor, or when the sentinel leaves
//! the margin again, so scrolling back down retries a page that failed.

/// Default lead margin in rows.
pub const DEFAULT_LEAD_ROWS: usize = 10;

#[derive(Debug, Clone)]
pub struct ScrollTrigger {
    sentinel: Option<usize>,
    lead: usize,
    armed: bool,
}

impl Default for ScrollTrigger {
    fn default() -> Self {
        Self::new(DEFAULT_LEAD_ROWS)
    }
}

impl ScrollTrigger {
    pub fn new(lead: usize) -> Self {
        Self {
            sentinel: None,
            lead,
            armed: false,
        }
    }

    /// Place the sentinel after `content_len` rendered lines.
    ///
    /// A no-op when the sentinel is already there, so calling it on every frame
    /// does not re-arm a trigger that already fired.
    pub fn anchor(&mut self, content_len: usize) {
        if self.sentinel == Some(content_len) {
            return;
        }
        self.sentinel = Some(content_len);
        self.armed = true;
    }

    /// Remove the sentinel, e.g. while the list shows an empty or error state.
    pub fn detach(&mut self) {
        self.sentinel = None;
        self.armed = false;
    }

    pub fn sentinel(&self) -> Option<usize> {
        self.sentinel
    }

    fn visible(&self, top: usize, height: usize) -> bool {
        self.sentinel
            .is_some_and(|line| line < top + height + self.lead)
    }

    /// Returns true when the feed should fetch the next page.
    pub fn observe(&mut self, top: usize, height: usize, in_flight: bool, has_more: bool) -> bool {
        if !self.visible(top, height) {
            self.armed = self.sentinel.is_some();
            return false;
        }
        if !self.armed || in_flight || !has_more {
            return false;
        }
        self.armed = false;
        true
    }
}
