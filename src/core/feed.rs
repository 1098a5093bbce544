//! Paginated, filtered retrieval of the collection.
//!
//! The feed owns the loaded items and the pagination cursor. Each request is
//! tagged with a [`FeedTicket`] naming the generation (one per reset) it was
//! issued under; responses whose generation no longer matches are dropped, so
//! a late page for an old filter can never be merged into the current list.

use crate::core::api::ApiError;
use crate::core::models::{BookPage, BookRecord, Filters, PageQuery};

/// Number of records requested per page.
pub const PAGE_SIZE: usize = 20;

/// Identifies one page request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedTicket {
    generation: u64,
    offset: usize,
    filters: Filters,
}

impl FeedTicket {
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    /// First page of a reset (replaces the list) or an append.
    pub fn is_first_page(&self) -> bool {
        self.offset == 0
    }
}

/// A page fetch the caller must perform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub ticket: FeedTicket,
    pub query: PageQuery,
}

/// Outcome of applying a page response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeedUpdate {
    /// Response belonged to a superseded filter snapshot.
    Discarded,
    /// First page replaced the list.
    Replaced { count: usize },
    /// Next page appended to the list.
    Appended { count: usize },
    /// Request failed; only the in-flight flag was cleared.
    Failed { message: String },
}

/// What the list area should show.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedView<'a> {
    /// First page in flight, nothing to show yet.
    Loading,
    /// First page failed.
    Failed(&'a str),
    /// The active filter matched nothing.
    Empty { filtered: bool },
    Items(&'a [BookRecord]),
}

#[derive(Debug, Default)]
pub struct CollectionFeed {
    items: Vec<BookRecord>,
    offset: usize,
    exhausted: bool,
    in_flight: Option<FeedTicket>,
    filters: Filters,
    generation: u64,
    total: Option<usize>,
    /// Set when the first page of the current generation failed.
    load_error: Option<String>,
    /// Whether any response of the current generation arrived.
    settled: bool,
}

impl CollectionFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything loaded so far and fetch page one under `filters`.
    ///
    /// Proceeds even with a fetch in flight; that response will be discarded.
    pub fn reset(&mut self, filters: Filters) -> PageRequest {
        self.generation += 1;
        self.items.clear();
        self.offset = 0;
        self.exhausted = false;
        self.total = None;
        self.load_error = None;
        self.settled = false;
        self.filters = filters;

        log::debug!(
            "Feed reset (generation {}, search={:?}, status={:?})",
            self.generation,
            self.filters.search,
            self.filters.status
        );
        self.issue()
    }

    /// Request the next page, unless one is in flight or the feed is exhausted.
    pub fn fetch_next(&mut self) -> Option<PageRequest> {
        if self.in_flight.is_some() || self.exhausted {
            return None;
        }
        Some(self.issue())
    }

    fn issue(&mut self) -> PageRequest {
        let ticket = FeedTicket {
            generation: self.generation,
            offset: self.offset,
            filters: self.filters.clone(),
        };
        self.in_flight = Some(ticket.clone());
        PageRequest {
            query: PageQuery {
                limit: PAGE_SIZE,
                offset: ticket.offset,
                filters: ticket.filters.clone(),
            },
            ticket,
        }
    }

    /// Apply the response for `ticket`.
    pub fn apply(&mut self, ticket: &FeedTicket, result: Result<BookPage, ApiError>) -> FeedUpdate {
        if ticket.generation != self.generation || ticket.filters != self.filters {
            log::debug!(
                "Discarding stale page (generation {} != {})",
                ticket.generation,
                self.generation
            );
            return FeedUpdate::Discarded;
        }
        if self.in_flight.as_ref() == Some(ticket) {
            self.in_flight = None;
        }

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                log::warn!("Failed to load books at offset {}: {e}", ticket.offset);
                let message = "Error loading books. Please try again.".to_string();
                if ticket.is_first_page() && !self.settled {
                    self.load_error = Some(message.clone());
                }
                return FeedUpdate::Failed { message };
            }
        };

        if page.offset != ticket.offset {
            log::warn!(
                "Server echoed offset {} for request at {}",
                page.offset,
                ticket.offset
            );
        }

        let count = page.books.len();
        self.settled = true;
        self.load_error = None;
        self.offset = ticket.offset + count;
        self.exhausted = !page.has_more || count == 0;
        if page.total.is_some() {
            self.total = page.total;
        }
        self.items.extend(page.books);

        if ticket.is_first_page() {
            FeedUpdate::Replaced { count }
        } else {
            FeedUpdate::Appended { count }
        }
    }

    pub fn view(&self) -> FeedView<'_> {
        if !self.items.is_empty() {
            return FeedView::Items(&self.items);
        }
        if let Some(ref message) = self.load_error {
            return FeedView::Failed(message);
        }
        if !self.settled {
            return FeedView::Loading;
        }
        FeedView::Empty {
            filtered: self.filters.is_active(),
        }
    }

    pub fn items(&self) -> &[BookRecord] {
        &self.items
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Whether an append (not the first page) is outstanding.
    pub fn is_loading_more(&self) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|t| !t.is_first_page())
    }

    pub fn has_more(&self) -> bool {
        !self.exhausted
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    /// Total matching records, when the server reported it.
    pub fn total(&self) -> Option<usize> {
        self.total
    }
}

/// Message for the empty list, depending on whether filters are active.
pub fn empty_state_message(filtered: bool) -> (&'static str, &'static str) {
    if filtered {
        (
            "No books match your filters",
            "Try adjusting your search or filters",
        )
    } else {
        (
            "No books in your library yet",
            "Press a to add a book and get started",
        )
    }
}
