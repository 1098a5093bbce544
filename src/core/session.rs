//! The reading-list session: feed, filters, scroll trigger and entry workflow
//! wired together.
//!
//! The session never awaits anything. Every operation returns the [`Job`]s the
//! caller must run; network jobs are executed with [`run_job`] and their
//! [`Completion`]s fed back through [`ReadingSession::complete`].

use std::time::Instant;

use crate::core::api::{ApiResult, Backends};
use crate::core::feed::{CollectionFeed, FeedTicket, FeedUpdate, PageRequest};
use crate::core::filter::FilterController;
use crate::core::models::{BookPage, ReadingStatus};
use crate::core::scroll::ScrollTrigger;
use crate::core::workflow::{Action, Effect, EntryWorkflow, Event, Notice, Request};

/// Work produced by the session.
#[derive(Clone, Debug, PartialEq)]
pub enum Job {
    FetchPage(PageRequest),
    Workflow(Request),
    /// Show a message; no I/O.
    Notify(Notice),
}

impl Job {
    pub fn is_network(&self) -> bool {
        !matches!(self, Job::Notify(_))
    }
}

/// Result of a network job.
#[derive(Debug)]
pub enum Completion {
    Page {
        ticket: FeedTicket,
        result: ApiResult<BookPage>,
    },
    Workflow(Event),
}

#[derive(Debug)]
pub struct ReadingSession {
    feed: CollectionFeed,
    filters: FilterController,
    scroll: ScrollTrigger,
    workflow: EntryWorkflow,
}

impl Default for ReadingSession {
    fn default() -> Self {
        Self::new(FilterController::new(), ScrollTrigger::default())
    }
}

impl ReadingSession {
    pub fn new(filters: FilterController, scroll: ScrollTrigger) -> Self {
        Self {
            feed: CollectionFeed::new(),
            filters,
            scroll,
            workflow: EntryWorkflow::new(),
        }
    }

    pub fn feed(&self) -> &CollectionFeed {
        &self.feed
    }

    pub fn filters(&self) -> &FilterController {
        &self.filters
    }

    pub fn workflow(&self) -> &EntryWorkflow {
        &self.workflow
    }

    pub fn scroll(&self) -> &ScrollTrigger {
        &self.scroll
    }

    /// Load page one under the committed filters. Used at startup and for a
    /// manual reload.
    pub fn reload(&mut self) -> Vec<Job> {
        vec![self.reset_feed()]
    }

    fn reset_feed(&mut self) -> Job {
        self.scroll.detach();
        Job::FetchPage(self.feed.reset(self.filters.committed().clone()))
    }

    pub fn set_search_text(&mut self, text: impl Into<String>, now: Instant) {
        self.filters.set_search_text(text, now);
    }

    pub fn set_status_filter(&mut self, status: Option<ReadingStatus>) -> Vec<Job> {
        let filters = self.filters.set_status(status);
        self.scroll.detach();
        vec![Job::FetchPage(self.feed.reset(filters))]
    }

    /// Periodic housekeeping: fires a due debounced search commit.
    pub fn tick(&mut self, now: Instant) -> Vec<Job> {
        match self.filters.poll(now) {
            Some(filters) => {
                self.scroll.detach();
                vec![Job::FetchPage(self.feed.reset(filters))]
            }
            None => vec![],
        }
    }

    /// Re-anchor the sentinel after the list was rendered with `content_len` lines.
    pub fn anchor(&mut self, content_len: usize) {
        self.scroll.anchor(content_len);
    }

    /// Report the visible window of the list; may request the next page.
    pub fn observe_viewport(&mut self, top: usize, height: usize) -> Vec<Job> {
        let fire = self
            .scroll
            .observe(top, height, self.feed.is_loading(), self.feed.has_more());
        if !fire {
            return vec![];
        }
        self.feed.fetch_next().map(Job::FetchPage).into_iter().collect()
    }

    /// Forward a user action to the entry workflow.
    pub fn dispatch(&mut self, action: Action) -> Vec<Job> {
        let effects = self.workflow.dispatch(action);
        self.apply_effects(effects)
    }

    /// Route a network result to its owner.
    pub fn complete(&mut self, completion: Completion) -> Vec<Job> {
        match completion {
            Completion::Page { ticket, result } => match self.feed.apply(&ticket, result) {
                FeedUpdate::Failed { message } => vec![Job::Notify(Notice::error(message))],
                FeedUpdate::Replaced { count } | FeedUpdate::Appended { count } => {
                    log::debug!("Loaded {count} books, offset now {}", self.feed.offset());
                    vec![]
                }
                FeedUpdate::Discarded => vec![],
            },
            Completion::Workflow(event) => {
                let effects = self.workflow.handle(event);
                self.apply_effects(effects)
            }
        }
    }

    fn apply_effects(&mut self, effects: Vec<Effect>) -> Vec<Job> {
        effects
            .into_iter()
            .map(|effect| match effect {
                Effect::Request(request) => Job::Workflow(request),
                Effect::ResetFeed => self.reset_feed(),
                Effect::Notify(notice) => Job::Notify(notice),
            })
            .collect()
    }
}

/// Perform a network job against the backends. `Notify` jobs yield `None`.
pub async fn run_job(job: Job, backends: &Backends) -> Option<Completion> {
    let completion = match job {
        Job::FetchPage(PageRequest { ticket, query }) => Completion::Page {
            result: backends.collection.list_books(&query).await,
            ticket,
        },
        Job::Workflow(request) => Completion::Workflow(match request {
            Request::Search { seq, query } => Event::SearchCompleted {
                seq,
                result: backends.catalog.search(&query).await,
            },
            Request::Summary { seq, key } => Event::SummaryLoaded {
                seq,
                result: backends.catalog.summary(&key).await,
            },
            Request::Create(book) => {
                Event::CreateCompleted(backends.collection.create_book(&book).await)
            }
            Request::Update { id, update } => {
                Event::UpdateCompleted(backends.collection.update_book(id, &update).await)
            }
            Request::Delete { id } => {
                Event::DeleteCompleted(backends.collection.delete_book(id).await)
            }
        }),
        Job::Notify(_) => return None,
    };
    Some(completion)
}
