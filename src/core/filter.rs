//! Search and status filters with a debounced text input.

use std::time::{Duration, Instant};

use crate::core::models::{Filters, ReadingStatus};

/// Quiet period before a search-text edit is committed.
pub const SEARCH_DEBOUNCE_MS: u64 = 300;

#[derive(Debug)]
pub struct FilterController {
    search_text: String,
    status: Option<ReadingStatus>,
    /// Deadline of the one pending text commit. A newer edit replaces it.
    pending_until: Option<Instant>,
    debounce: Duration,
    committed: Filters,
}

impl Default for FilterController {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterController {
    pub fn new() -> Self {
        Self::with_debounce(Duration::from_millis(SEARCH_DEBOUNCE_MS))
    }

    pub fn with_debounce(debounce: Duration) -> Self {
        Self {
            search_text: String::new(),
            status: None,
            pending_until: None,
            debounce,
            committed: Filters::default(),
        }
    }

    /// Record a text edit; the commit fires once `debounce` passes without another edit.
    pub fn set_search_text(&mut self, text: impl Into<String>, now: Instant) {
        self.search_text = text.into();
        self.pending_until = Some(now + self.debounce);
    }

    /// Commit a status change immediately, together with the current text.
    ///
    /// Any pending text commit is folded into this one.
    pub fn set_status(&mut self, status: Option<ReadingStatus>) -> Filters {
        self.status = status;
        self.pending_until = None;
        self.commit()
    }

    /// Fire the pending text commit if its quiet period is over.
    pub fn poll(&mut self, now: Instant) -> Option<Filters> {
        let deadline = self.pending_until?;
        if now < deadline {
            return None;
        }
        self.pending_until = None;
        Some(self.commit())
    }

    fn commit(&mut self) -> Filters {
        self.committed = Filters {
            search: self.search_text.trim().to_string(),
            status: self.status,
        };
        log::debug!(
            "Filters committed: search={:?} status={:?}",
            self.committed.search,
            self.committed.status
        );
        self.committed.clone()
    }

    /// The last committed snapshot, what the feed is (or will be) showing.
    pub fn committed(&self) -> &Filters {
        &self.committed
    }

    /// The text as typed, possibly not yet committed.
    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn status(&self) -> Option<ReadingStatus> {
        self.status
    }

    pub fn is_pending(&self) -> bool {
        self.pending_until.is_some()
    }
}
