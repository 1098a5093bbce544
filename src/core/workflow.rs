//! Modal workflow for adding, editing and removing books.
//!
//! [`EntryWorkflow`] is a tagged-variant state machine. User actions go through
//! [`EntryWorkflow::dispatch`], network responses through
//! [`EntryWorkflow::handle`]; both return the side effects the caller must
//! carry out (requests to issue, a feed reset, notifications). The workflow
//! itself never performs I/O.

use crate::core::api::{ApiResult, RETRY_HINT};
use crate::core::models::{
    summary_key, BookRecord, BookSource, BookUpdate, CatalogHit, NewBook, Rating, ReadingStatus,
};

/// Shortest catalog query that is sent.
pub const MIN_QUERY_CHARS: usize = 2;

pub const MSG_QUERY_TOO_SHORT: &str = "Please enter at least 2 characters";
pub const MSG_NO_RESULTS: &str = "No books found";
pub const MSG_SEARCH_FAILED: &str = "Error searching books. Please try again.";
pub const MSG_TITLE_REQUIRED: &str = "Please enter a book title";
pub const MSG_STATUS_REQUIRED: &str = "Please select a reading status";
pub const MSG_YEAR_INVALID: &str = "Publication year must be a number";
pub const MSG_ADDED: &str = "Book added to your library!";
pub const MSG_UPDATED: &str = "Book updated successfully!";
pub const MSG_REMOVED: &str = "Book removed from your library";
pub const MSG_REMOVE_FAILED: &str = "Error removing book";
pub const MSG_DUPLICATE: &str = "This book is already in your library";
pub const MSG_NO_SUMMARY: &str = "No summary available for this book.";
pub const MSG_SUMMARY_FAILED: &str = "Could not load summary.";

// ── States ───────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryMode {
    NewFromCatalog,
    NewManual,
    EditExisting(i64),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WorkflowState {
    #[default]
    Idle,
    /// Choice between catalog search and manual entry.
    SearchOpen,
    SearchInputOpen,
    EntryOpen(EntryMode),
    /// Finished after a completed write; behaves like `Idle`.
    Closed,
}

impl WorkflowState {
    /// Whether any modal is showing.
    pub fn is_open(self) -> bool {
        !matches!(self, Self::Idle | Self::Closed)
    }
}

/// Progress of the catalog search panel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SearchStatus {
    #[default]
    Prompt,
    Searching,
    Results,
    NoResults,
    Failed,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SummaryState {
    /// No lookup for this record (manual entry or no catalog key).
    #[default]
    Hidden,
    Loading,
    Loaded(String),
    Missing,
    Failed,
}

impl SummaryState {
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Hidden => None,
            Self::Loading => Some("Loading summary..."),
            Self::Loaded(text) => Some(text),
            Self::Missing => Some(MSG_NO_SUMMARY),
            Self::Failed => Some(MSG_SUMMARY_FAILED),
        }
    }
}

/// Committed rating plus an uncommitted hover preview.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RatingInput {
    pub committed: Rating,
    pub preview: Option<Rating>,
}

impl RatingInput {
    fn committed(rating: Rating) -> Self {
        Self {
            committed: rating,
            preview: None,
        }
    }

    /// What the stars currently show.
    pub fn shown(&self) -> Rating {
        self.preview.unwrap_or(self.committed)
    }
}

/// Editable form fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Title,
    Author,
    Year,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntryForm {
    pub title: String,
    pub author: String,
    pub year: String,
    pub status: Option<ReadingStatus>,
    pub rating: RatingInput,
    pub cover_id: Option<i64>,
    pub added_at: Option<String>,
}

impl EntryForm {
    fn from_hit(hit: &CatalogHit) -> Self {
        Self {
            title: hit.title.clone(),
            author: hit.authors().unwrap_or_default(),
            year: hit.first_publish_year.map(|y| y.to_string()).unwrap_or_default(),
            cover_id: hit.cover_i,
            ..Self::default()
        }
    }

    fn from_record(record: &BookRecord) -> Self {
        Self {
            title: record.title.clone(),
            author: record.author_name.clone().unwrap_or_default(),
            year: record
                .first_publish_year
                .map(|y| y.to_string())
                .unwrap_or_default(),
            status: Some(record.status.unwrap_or(ReadingStatus::WantToRead)),
            rating: RatingInput::committed(record.rating),
            cover_id: record.cover_id,
            added_at: record.added_at.clone(),
        }
    }

    fn field_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Title => &mut self.title,
            Field::Author => &mut self.author,
            Field::Year => &mut self.year,
        }
    }

    fn year(&self) -> Result<Option<i32>, &'static str> {
        let year = self.year.trim();
        if year.is_empty() {
            return Ok(None);
        }
        year.parse().map(Some).map_err(|_| MSG_YEAR_INVALID)
    }
}

// ── Actions, events, effects ─────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    AddBook,
    SearchByTitle,
    ManualEntry,
    SetQuery(String),
    SubmitQuery,
    SelectResult(usize),
    OpenRecord(BookRecord),
    SetField(Field, String),
    SetStatus(Option<ReadingStatus>),
    HoverRating(Option<Rating>),
    SelectRating(Rating),
    Save,
    RequestDelete,
    ConfirmDelete,
    DeclineDelete,
    Cancel,
}

/// Network responses routed back into the workflow.
#[derive(Debug)]
pub enum Event {
    SearchCompleted {
        seq: u64,
        result: ApiResult<Vec<CatalogHit>>,
    },
    SummaryLoaded {
        seq: u64,
        result: ApiResult<Option<String>>,
    },
    CreateCompleted(ApiResult<Option<i64>>),
    UpdateCompleted(ApiResult<()>),
    DeleteCompleted(ApiResult<()>),
}

/// A network call the caller must perform and answer with an [`Event`].
#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    Search { seq: u64, query: String },
    Summary { seq: u64, key: String },
    Create(NewBook),
    Update { id: i64, update: BookUpdate },
    Delete { id: i64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A transient user-visible message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    Request(Request),
    /// Reload the feed under the currently committed filters.
    ResetFeed,
    Notify(Notice),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Write {
    Create,
    Update,
    Delete,
}

// ── Machine ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct EntryWorkflow {
    state: WorkflowState,
    query: String,
    search_status: SearchStatus,
    last_results: Vec<CatalogHit>,
    selected: Option<CatalogHit>,
    form: EntryForm,
    summary: SummaryState,
    message: Option<String>,
    confirm_delete: bool,
    pending_write: Option<Write>,
    search_seq: u64,
    summary_seq: u64,
}

impl EntryWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    /// Id of the record being edited; `Some` only in `EditExisting`.
    pub fn current_book_id(&self) -> Option<i64> {
        match self.state {
            WorkflowState::EntryOpen(EntryMode::EditExisting(id)) => Some(id),
            _ => None,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn search_status(&self) -> SearchStatus {
        self.search_status
    }

    pub fn results(&self) -> &[CatalogHit] {
        &self.last_results
    }

    pub fn selected_hit(&self) -> Option<&CatalogHit> {
        self.selected.as_ref()
    }

    pub fn form(&self) -> &EntryForm {
        &self.form
    }

    pub fn summary(&self) -> &SummaryState {
        &self.summary
    }

    /// Inline message for the open modal (validation or failure text).
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_confirming_delete(&self) -> bool {
        self.confirm_delete
    }

    /// Whether a create, update or delete is outstanding.
    pub fn is_saving(&self) -> bool {
        self.pending_write.is_some()
    }

    fn entry_mode(&self) -> Option<EntryMode> {
        match self.state {
            WorkflowState::EntryOpen(mode) => Some(mode),
            _ => None,
        }
    }

    /// Apply a user action.
    pub fn dispatch(&mut self, action: Action) -> Vec<Effect> {
        use WorkflowState as S;

        match (self.state, action) {
            (S::Idle | S::Closed, Action::AddBook) => {
                self.clear();
                self.state = S::SearchOpen;
                vec![]
            }
            (S::Idle | S::Closed, Action::OpenRecord(record)) => self.open_record(record),

            (S::SearchOpen, Action::SearchByTitle) => {
                self.state = S::SearchInputOpen;
                vec![]
            }
            (S::SearchOpen, Action::ManualEntry) => {
                self.form = EntryForm::default();
                self.summary = SummaryState::Hidden;
                self.message = None;
                self.state = S::EntryOpen(EntryMode::NewManual);
                vec![]
            }

            (S::SearchInputOpen, Action::SetQuery(query)) => {
                self.query = query;
                vec![]
            }
            (S::SearchInputOpen, Action::SubmitQuery) => self.submit_query(),
            (S::SearchInputOpen, Action::SelectResult(index)) => self.select_result(index),

            (S::SearchOpen | S::SearchInputOpen, Action::Cancel) => {
                self.close(S::Idle);
                vec![]
            }

            (S::EntryOpen(mode), action) => self.dispatch_entry(mode, action),

            (state, action) => {
                log::debug!("Ignoring {action:?} in state {state:?}");
                vec![]
            }
        }
    }

    fn dispatch_entry(&mut self, mode: EntryMode, action: Action) -> Vec<Effect> {
        match action {
            Action::SetField(field, value) => {
                if !matches!(mode, EntryMode::EditExisting(_)) {
                    *self.form.field_mut(field) = value;
                }
            }
            Action::SetStatus(status) => self.form.status = status,
            Action::HoverRating(preview) => self.form.rating.preview = preview,
            Action::SelectRating(rating) => {
                self.form.rating = RatingInput::committed(rating);
            }
            Action::Save => return self.save(mode),
            Action::RequestDelete => {
                if matches!(mode, EntryMode::EditExisting(_)) && self.pending_write.is_none() {
                    self.confirm_delete = true;
                }
            }
            Action::DeclineDelete => self.confirm_delete = false,
            Action::ConfirmDelete => return self.delete_confirmed(mode),
            Action::Cancel => self.cancel_entry(mode),
            other => log::debug!("Ignoring {other:?} in entry form"),
        }
        vec![]
    }

    fn open_record(&mut self, record: BookRecord) -> Vec<Effect> {
        let Some(id) = record.id else {
            log::warn!("Cannot edit unsaved record {:?}", record.title);
            return vec![];
        };
        self.clear();
        self.form = EntryForm::from_record(&record);
        self.state = WorkflowState::EntryOpen(EntryMode::EditExisting(id));
        self.request_summary(record.summary_key())
    }

    fn submit_query(&mut self) -> Vec<Effect> {
        let query = self.query.trim().to_string();
        if query.chars().count() < MIN_QUERY_CHARS {
            self.message = Some(MSG_QUERY_TOO_SHORT.to_string());
            return vec![];
        }
        self.message = None;
        self.search_seq += 1;
        self.search_status = SearchStatus::Searching;
        vec![Effect::Request(Request::Search {
            seq: self.search_seq,
            query,
        })]
    }

    fn select_result(&mut self, index: usize) -> Vec<Effect> {
        let Some(hit) = self.last_results.get(index).cloned() else {
            return vec![];
        };
        self.form = EntryForm::from_hit(&hit);
        self.message = None;
        let key = hit.key.clone();
        self.selected = Some(hit);
        self.state = WorkflowState::EntryOpen(EntryMode::NewFromCatalog);
        self.request_summary(key.as_deref())
    }

    fn request_summary(&mut self, key: Option<&str>) -> Vec<Effect> {
        self.summary_seq += 1;
        match summary_key(key) {
            Some(key) => {
                self.summary = SummaryState::Loading;
                vec![Effect::Request(Request::Summary {
                    seq: self.summary_seq,
                    key: key.to_string(),
                })]
            }
            None => {
                self.summary = SummaryState::Hidden;
                vec![]
            }
        }
    }

    fn cancel_entry(&mut self, mode: EntryMode) {
        if self.pending_write.is_some() {
            return;
        }
        if self.confirm_delete {
            self.confirm_delete = false;
            return;
        }
        match mode {
            EntryMode::NewFromCatalog => {
                // Back to the retained result list; no new search.
                self.selected = None;
                self.form = EntryForm::default();
                self.summary = SummaryState::Hidden;
                self.summary_seq += 1;
                self.message = None;
                self.state = WorkflowState::SearchInputOpen;
            }
            EntryMode::NewManual | EntryMode::EditExisting(_) => self.close(WorkflowState::Idle),
        }
    }

    fn validate(&self, mode: EntryMode) -> Result<(ReadingStatus, Option<i32>), &'static str> {
        if self.form.title.trim().is_empty() {
            return Err(MSG_TITLE_REQUIRED);
        }
        let status = self.form.status.ok_or(MSG_STATUS_REQUIRED)?;
        let year = match mode {
            EntryMode::EditExisting(_) => None,
            _ => self.form.year()?,
        };
        Ok((status, year))
    }

    fn save(&mut self, mode: EntryMode) -> Vec<Effect> {
        if self.pending_write.is_some() || self.confirm_delete {
            return vec![];
        }
        let (status, year) = match self.validate(mode) {
            Ok(valid) => valid,
            Err(message) => {
                self.message = Some(message.to_string());
                return vec![];
            }
        };
        self.message = None;
        let rating = self.form.rating.committed;

        let request = match mode {
            EntryMode::EditExisting(id) => {
                self.pending_write = Some(Write::Update);
                Request::Update {
                    id,
                    update: BookUpdate { status, rating },
                }
            }
            EntryMode::NewFromCatalog | EntryMode::NewManual => {
                self.pending_write = Some(Write::Create);
                Request::Create(NewBook {
                    title: self.form.title.trim().to_string(),
                    author_name: self.form.author.trim().to_string(),
                    first_publish_year: year,
                    status,
                    rating,
                    source: self.book_source(mode),
                })
            }
        };
        vec![Effect::Request(request)]
    }

    fn book_source(&self, mode: EntryMode) -> BookSource {
        let hit = match (mode, &self.selected) {
            (EntryMode::NewFromCatalog, Some(hit)) => hit,
            _ => return BookSource::manual(),
        };
        match summary_key(hit.key.as_deref()) {
            Some(key) => BookSource::Catalog {
                key: key.to_string(),
                cover_i: hit.cover_i,
                isbn: hit.isbn.clone(),
            },
            None => BookSource::manual(),
        }
    }

    fn delete_confirmed(&mut self, mode: EntryMode) -> Vec<Effect> {
        let EntryMode::EditExisting(id) = mode else {
            return vec![];
        };
        if !self.confirm_delete || self.pending_write.is_some() {
            return vec![];
        }
        self.confirm_delete = false;
        self.pending_write = Some(Write::Delete);
        vec![Effect::Request(Request::Delete { id })]
    }

    /// Apply a network response.
    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::SearchCompleted { seq, result } => {
                if seq != self.search_seq || self.state != WorkflowState::SearchInputOpen {
                    log::debug!("Dropping stale search response {seq}");
                    return vec![];
                }
                match result {
                    Ok(hits) if hits.is_empty() => {
                        self.last_results.clear();
                        self.search_status = SearchStatus::NoResults;
                    }
                    Ok(hits) => {
                        self.last_results = hits;
                        self.search_status = SearchStatus::Results;
                    }
                    Err(e) => {
                        log::warn!("Catalog search failed: {e}");
                        self.last_results.clear();
                        self.search_status = SearchStatus::Failed;
                    }
                }
                vec![]
            }
            Event::SummaryLoaded { seq, result } => {
                if seq != self.summary_seq || self.entry_mode().is_none() {
                    return vec![];
                }
                self.summary = match result {
                    Ok(Some(text)) => SummaryState::Loaded(text),
                    Ok(None) => SummaryState::Missing,
                    Err(e) => {
                        log::warn!("Summary lookup failed: {e}");
                        SummaryState::Failed
                    }
                };
                vec![]
            }
            Event::CreateCompleted(result) => {
                if !self.take_write(Write::Create) {
                    return vec![];
                }
                match result {
                    Ok(id) => {
                        log::info!("Created book {:?} (id {id:?})", self.form.title);
                        self.close(WorkflowState::Closed);
                        vec![Effect::Notify(Notice::success(MSG_ADDED)), Effect::ResetFeed]
                    }
                    Err(e) if e.is_conflict() => {
                        log::info!("Book {:?} already in library", self.form.title);
                        self.close(WorkflowState::Closed);
                        vec![Effect::Notify(Notice::error(MSG_DUPLICATE))]
                    }
                    Err(e) => {
                        log::warn!("Create failed: {e}");
                        self.fail_write(e.user_message("Error adding book"))
                    }
                }
            }
            Event::UpdateCompleted(result) => {
                if !self.take_write(Write::Update) {
                    return vec![];
                }
                match result {
                    Ok(()) => {
                        self.close(WorkflowState::Closed);
                        vec![Effect::Notify(Notice::success(MSG_UPDATED)), Effect::ResetFeed]
                    }
                    Err(e) => {
                        log::warn!("Update failed: {e}");
                        self.fail_write(e.user_message("Error updating book"))
                    }
                }
            }
            Event::DeleteCompleted(result) => {
                if !self.take_write(Write::Delete) {
                    return vec![];
                }
                match result {
                    Ok(()) => {
                        self.close(WorkflowState::Closed);
                        vec![Effect::Notify(Notice::success(MSG_REMOVED)), Effect::ResetFeed]
                    }
                    Err(e) => {
                        log::warn!("Delete failed: {e}");
                        // Server refusals keep the bare text; only transport errors suggest a retry.
                        let message = if e.is_transport() {
                            format!("{MSG_REMOVE_FAILED}. {RETRY_HINT}")
                        } else {
                            MSG_REMOVE_FAILED.to_string()
                        };
                        self.fail_write(message)
                    }
                }
            }
        }
    }

    fn take_write(&mut self, expected: Write) -> bool {
        if self.pending_write == Some(expected) {
            self.pending_write = None;
            true
        } else {
            log::warn!("Unexpected {expected:?} response (pending {:?})", self.pending_write);
            false
        }
    }

    fn fail_write(&mut self, message: String) -> Vec<Effect> {
        self.message = Some(message.clone());
        vec![Effect::Notify(Notice::error(message))]
    }

    fn close(&mut self, to: WorkflowState) {
        self.clear();
        self.state = to;
    }

    /// Drop all transient context. Sequence numbers advance so late responses
    /// for the old context are ignored.
    fn clear(&mut self) {
        self.query.clear();
        self.search_status = SearchStatus::Prompt;
        self.last_results.clear();
        self.selected = None;
        self.form = EntryForm::default();
        self.summary = SummaryState::Hidden;
        self.message = None;
        self.confirm_delete = false;
        self.pending_write = None;
        self.search_seq += 1;
        self.summary_seq += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::api::ApiError;
    use rstest::rstest;

    fn dune_hit() -> CatalogHit {
        CatalogHit {
            title: "Dune".to_string(),
            author_name: vec!["Frank Herbert".to_string()],
            first_publish_year: Some(1965),
            cover_i: Some(11481354),
            key: Some("/works/OL893415W".to_string()),
            isbn: vec![],
        }
    }

    fn record(status: Option<ReadingStatus>, rating: Rating) -> BookRecord {
        BookRecord {
            id: Some(7),
            title: "Emma".to_string(),
            author_name: Some("Jane Austen".to_string()),
            first_publish_year: Some(1815),
            catalog_key: Some("/works/OL66554W".to_string()),
            status,
            rating,
            cover_id: None,
            isbn: None,
            added_at: None,
        }
    }

    fn stars(value: f64) -> Rating {
        Rating::new(value).unwrap()
    }

    /// Workflow sitting on a result list for "dune" with one hit.
    fn with_results() -> (EntryWorkflow, u64) {
        let mut wf = EntryWorkflow::new();
        wf.dispatch(Action::AddBook);
        wf.dispatch(Action::SearchByTitle);
        wf.dispatch(Action::SetQuery("dune".to_string()));
        let effects = wf.dispatch(Action::SubmitQuery);
        let Effect::Request(Request::Search { seq, .. }) = effects[0] else {
            panic!("expected search request, got {effects:?}");
        };
        wf.handle(Event::SearchCompleted {
            seq,
            result: Ok(vec![dune_hit()]),
        });
        (wf, seq)
    }

    fn requests(effects: &[Effect]) -> Vec<&Request> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Request(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    // ── Navigation ──

    #[test]
    fn test_add_book_opens_choice() {
        let mut wf = EntryWorkflow::new();
        assert!(wf.dispatch(Action::AddBook).is_empty());
        assert_eq!(wf.state(), WorkflowState::SearchOpen);
        wf.dispatch(Action::SearchByTitle);
        assert_eq!(wf.state(), WorkflowState::SearchInputOpen);
    }

    #[test]
    fn test_manual_entry_opens_blank_form() {
        let mut wf = EntryWorkflow::new();
        wf.dispatch(Action::AddBook);
        wf.dispatch(Action::ManualEntry);
        assert_eq!(wf.state(), WorkflowState::EntryOpen(EntryMode::NewManual));
        assert_eq!(wf.form(), &EntryForm::default());
        assert_eq!(wf.summary(), &SummaryState::Hidden);
    }

    #[rstest]
    #[case("", true)]
    #[case("d", true)]
    #[case(" d ", true)]
    #[case("du", false)]
    #[case("dune", false)]
    fn test_query_length_validation(#[case] query: &str, #[case] rejected: bool) {
        let mut wf = EntryWorkflow::new();
        wf.dispatch(Action::AddBook);
        wf.dispatch(Action::SearchByTitle);
        wf.dispatch(Action::SetQuery(query.to_string()));
        let effects = wf.dispatch(Action::SubmitQuery);

        assert_eq!(effects.is_empty(), rejected);
        assert_eq!(wf.message() == Some(MSG_QUERY_TOO_SHORT), rejected);
        assert_eq!(wf.state(), WorkflowState::SearchInputOpen);
    }

    #[test]
    fn test_search_outcomes_never_close() {
        let (mut wf, _) = with_results();
        assert_eq!(wf.search_status(), SearchStatus::Results);
        assert_eq!(wf.results().len(), 1);

        let effects = wf.dispatch(Action::SubmitQuery);
        let Effect::Request(Request::Search { seq, .. }) = effects[0] else {
            panic!("expected search");
        };
        wf.handle(Event::SearchCompleted {
            seq,
            result: Ok(vec![]),
        });
        assert_eq!(wf.search_status(), SearchStatus::NoResults);
        assert_eq!(wf.state(), WorkflowState::SearchInputOpen);

        let effects = wf.dispatch(Action::SubmitQuery);
        let Effect::Request(Request::Search { seq, .. }) = effects[0] else {
            panic!("expected search");
        };
        wf.handle(Event::SearchCompleted {
            seq,
            result: Err(ApiError::Status(500)),
        });
        assert_eq!(wf.search_status(), SearchStatus::Failed);
        assert_eq!(wf.state(), WorkflowState::SearchInputOpen);
    }

    #[test]
    fn test_stale_search_response_is_dropped() {
        let (mut wf, old_seq) = with_results();
        wf.dispatch(Action::SetQuery("emma".to_string()));
        wf.dispatch(Action::SubmitQuery);
        wf.handle(Event::SearchCompleted {
            seq: old_seq,
            result: Ok(vec![]),
        });
        assert_eq!(wf.search_status(), SearchStatus::Searching);
        assert_eq!(wf.results().len(), 1);
    }

    #[test]
    fn test_select_result_prefills_and_fetches_summary() {
        let (mut wf, _) = with_results();
        let effects = wf.dispatch(Action::SelectResult(0));

        assert_eq!(wf.state(), WorkflowState::EntryOpen(EntryMode::NewFromCatalog));
        assert_eq!(wf.form().title, "Dune");
        assert_eq!(wf.form().author, "Frank Herbert");
        assert_eq!(wf.form().year, "1965");
        assert_eq!(wf.form().cover_id, Some(11481354));
        assert_eq!(wf.form().status, None);
        assert_eq!(wf.summary(), &SummaryState::Loading);
        assert!(matches!(
            requests(&effects)[..],
            [Request::Summary { key, .. }] if key == "/works/OL893415W"
        ));
    }

    #[test]
    fn test_manual_key_hit_skips_summary() {
        let mut wf = EntryWorkflow::new();
        wf.dispatch(Action::AddBook);
        wf.dispatch(Action::SearchByTitle);
        wf.dispatch(Action::SetQuery("notes".to_string()));
        let effects = wf.dispatch(Action::SubmitQuery);
        let Effect::Request(Request::Search { seq, .. }) = effects[0] else {
            panic!("expected search");
        };
        let hit = CatalogHit {
            key: Some("manual_abc".to_string()),
            ..dune_hit()
        };
        wf.handle(Event::SearchCompleted {
            seq,
            result: Ok(vec![hit]),
        });
        assert!(wf.dispatch(Action::SelectResult(0)).is_empty());
        assert_eq!(wf.summary(), &SummaryState::Hidden);
    }

    #[test]
    fn test_cancel_catalog_entry_restores_results_without_search() {
        let (mut wf, _) = with_results();
        wf.dispatch(Action::SelectResult(0));
        let effects = wf.dispatch(Action::Cancel);

        assert!(effects.is_empty());
        assert_eq!(wf.state(), WorkflowState::SearchInputOpen);
        assert_eq!(wf.results(), &[dune_hit()]);
        assert_eq!(wf.query(), "dune");
        assert!(wf.selected_hit().is_none());
    }

    #[test]
    fn test_cancel_manual_and_edit_return_to_idle() {
        let mut wf = EntryWorkflow::new();
        wf.dispatch(Action::AddBook);
        wf.dispatch(Action::ManualEntry);
        wf.dispatch(Action::Cancel);
        assert_eq!(wf.state(), WorkflowState::Idle);

        wf.dispatch(Action::OpenRecord(record(None, Rating::NONE)));
        assert_eq!(wf.current_book_id(), Some(7));
        wf.dispatch(Action::Cancel);
        assert_eq!(wf.state(), WorkflowState::Idle);
        assert_eq!(wf.current_book_id(), None);
    }

    #[test]
    fn test_late_summary_after_cancel_is_ignored() {
        let (mut wf, _) = with_results();
        let effects = wf.dispatch(Action::SelectResult(0));
        let Effect::Request(Request::Summary { seq, .. }) = effects[0] else {
            panic!("expected summary");
        };
        wf.dispatch(Action::Cancel);
        wf.dispatch(Action::SelectResult(0));
        wf.handle(Event::SummaryLoaded {
            seq,
            result: Ok(Some("old".to_string())),
        });
        assert_eq!(wf.summary(), &SummaryState::Loading);
    }

    #[test]
    fn test_summary_states() {
        let (mut wf, _) = with_results();
        let effects = wf.dispatch(Action::SelectResult(0));
        let Effect::Request(Request::Summary { seq, .. }) = effects[0] else {
            panic!("expected summary");
        };
        wf.handle(Event::SummaryLoaded {
            seq,
            result: Ok(None),
        });
        assert_eq!(wf.summary().text(), Some(MSG_NO_SUMMARY));
    }

    // ── Rating ──

    #[test]
    fn test_hover_preview_never_commits() {
        let mut wf = EntryWorkflow::new();
        wf.dispatch(Action::AddBook);
        wf.dispatch(Action::ManualEntry);

        wf.dispatch(Action::SelectRating(stars(3.5)));
        wf.dispatch(Action::SelectRating(stars(4.0)));
        wf.dispatch(Action::HoverRating(Some(stars(1.5))));
        assert_eq!(wf.form().rating.shown(), stars(1.5));
        wf.dispatch(Action::HoverRating(None));

        assert_eq!(wf.form().rating.committed, stars(4.0));
        assert_eq!(wf.form().rating.shown(), stars(4.0));
    }

    // ── Save ──

    #[rstest]
    #[case("", Some(ReadingStatus::Reading), "", MSG_TITLE_REQUIRED)]
    #[case("   ", Some(ReadingStatus::Reading), "", MSG_TITLE_REQUIRED)]
    #[case("Notes", None, "", MSG_STATUS_REQUIRED)]
    #[case("Notes", Some(ReadingStatus::Reading), "19x5", MSG_YEAR_INVALID)]
    fn test_save_validation(
        #[case] title: &str,
        #[case] status: Option<ReadingStatus>,
        #[case] year: &str,
        #[case] expected: &str,
    ) {
        let mut wf = EntryWorkflow::new();
        wf.dispatch(Action::AddBook);
        wf.dispatch(Action::ManualEntry);
        wf.dispatch(Action::SetField(Field::Title, title.to_string()));
        wf.dispatch(Action::SetField(Field::Year, year.to_string()));
        wf.dispatch(Action::SetStatus(status));

        assert!(wf.dispatch(Action::Save).is_empty());
        assert_eq!(wf.message(), Some(expected));
        assert_eq!(wf.state(), WorkflowState::EntryOpen(EntryMode::NewManual));
    }

    #[test]
    fn test_catalog_save_creates_with_metadata() {
        let (mut wf, _) = with_results();
        wf.dispatch(Action::SelectResult(0));
        wf.dispatch(Action::SetStatus(Some(ReadingStatus::Reading)));
        wf.dispatch(Action::SelectRating(stars(4.0)));

        let effects = wf.dispatch(Action::Save);
        let sent = requests(&effects);
        let [Request::Create(book)] = sent[..] else {
            panic!("expected create, got {effects:?}");
        };
        assert_eq!(book.title, "Dune");
        assert_eq!(book.author_name, "Frank Herbert");
        assert_eq!(book.first_publish_year, Some(1965));
        assert_eq!(book.status, ReadingStatus::Reading);
        assert_eq!(book.rating, stars(4.0));
        assert_eq!(
            book.source,
            BookSource::Catalog {
                key: "/works/OL893415W".to_string(),
                cover_i: Some(11481354),
                isbn: vec![],
            }
        );
        assert!(wf.is_saving());
    }

    #[test]
    fn test_manual_save_sends_manual_flag() {
        let mut wf = EntryWorkflow::new();
        wf.dispatch(Action::AddBook);
        wf.dispatch(Action::ManualEntry);
        wf.dispatch(Action::SetField(Field::Title, "Field Notes".to_string()));
        wf.dispatch(Action::SetStatus(Some(ReadingStatus::WantToRead)));

        let effects = wf.dispatch(Action::Save);
        let sent = requests(&effects);
        let [Request::Create(book)] = sent[..] else {
            panic!("expected create");
        };
        assert_eq!(book.source, BookSource::manual());
        assert_eq!(book.rating, Rating::NONE);
    }

    #[test]
    fn test_create_success_closes_and_resets() {
        let (mut wf, _) = with_results();
        wf.dispatch(Action::SelectResult(0));
        wf.dispatch(Action::SetStatus(Some(ReadingStatus::Reading)));
        wf.dispatch(Action::Save);

        let effects = wf.handle(Event::CreateCompleted(Ok(Some(12))));
        assert_eq!(
            effects,
            vec![Effect::Notify(Notice::success(MSG_ADDED)), Effect::ResetFeed]
        );
        assert_eq!(wf.state(), WorkflowState::Closed);
        assert!(wf.selected_hit().is_none());
        assert!(wf.results().is_empty());
    }

    #[test]
    fn test_conflict_closes_without_reset() {
        let (mut wf, _) = with_results();
        wf.dispatch(Action::SelectResult(0));
        wf.dispatch(Action::SetStatus(Some(ReadingStatus::Reading)));
        wf.dispatch(Action::Save);

        let effects = wf.handle(Event::CreateCompleted(Err(ApiError::Conflict(
            "Book already exists in your library".to_string(),
        ))));
        assert_eq!(effects, vec![Effect::Notify(Notice::error(MSG_DUPLICATE))]);
        assert_eq!(wf.state(), WorkflowState::Closed);
    }

    #[test]
    fn test_create_failure_preserves_form() {
        let mut wf = EntryWorkflow::new();
        wf.dispatch(Action::AddBook);
        wf.dispatch(Action::ManualEntry);
        wf.dispatch(Action::SetField(Field::Title, "Notes".to_string()));
        wf.dispatch(Action::SetStatus(Some(ReadingStatus::Reading)));
        wf.dispatch(Action::Save);

        wf.handle(Event::CreateCompleted(Err(ApiError::Status(502))));
        assert_eq!(wf.state(), WorkflowState::EntryOpen(EntryMode::NewManual));
        assert_eq!(wf.form().title, "Notes");
        assert_eq!(wf.message(), Some("Error adding book. Please try again."));
        assert!(!wf.is_saving());

        // The same action can be retried.
        assert_eq!(requests(&wf.dispatch(Action::Save)).len(), 1);
    }

    #[test]
    fn test_duplicate_save_ignored_while_outstanding() {
        let mut wf = EntryWorkflow::new();
        wf.dispatch(Action::AddBook);
        wf.dispatch(Action::ManualEntry);
        wf.dispatch(Action::SetField(Field::Title, "Notes".to_string()));
        wf.dispatch(Action::SetStatus(Some(ReadingStatus::Reading)));
        assert_eq!(requests(&wf.dispatch(Action::Save)).len(), 1);
        assert!(wf.dispatch(Action::Save).is_empty());
        wf.dispatch(Action::Cancel);
        assert_eq!(wf.state(), WorkflowState::EntryOpen(EntryMode::NewManual));
    }

    // ── Edit ──

    #[test]
    fn test_open_record_prefills_and_defaults_status() {
        let mut wf = EntryWorkflow::new();
        let effects = wf.dispatch(Action::OpenRecord(record(None, stars(2.5))));

        assert_eq!(wf.state(), WorkflowState::EntryOpen(EntryMode::EditExisting(7)));
        assert_eq!(wf.form().status, Some(ReadingStatus::WantToRead));
        assert_eq!(wf.form().rating.committed, stars(2.5));
        assert_eq!(requests(&effects).len(), 1);
    }

    #[test]
    fn test_edit_sends_only_status_and_rating() {
        let mut wf = EntryWorkflow::new();
        wf.dispatch(Action::OpenRecord(record(
            Some(ReadingStatus::WantToRead),
            Rating::NONE,
        )));
        wf.dispatch(Action::SetField(Field::Title, "Changed".to_string()));
        wf.dispatch(Action::SetStatus(Some(ReadingStatus::Finished)));
        wf.dispatch(Action::SelectRating(stars(4.5)));

        let effects = wf.dispatch(Action::Save);
        assert_eq!(
            requests(&effects),
            vec![&Request::Update {
                id: 7,
                update: BookUpdate {
                    status: ReadingStatus::Finished,
                    rating: stars(4.5),
                },
            }]
        );
        assert_eq!(wf.form().title, "Emma");

        let effects = wf.handle(Event::UpdateCompleted(Ok(())));
        assert!(effects.contains(&Effect::ResetFeed));
        assert_eq!(wf.state(), WorkflowState::Closed);
    }

    #[test]
    fn test_open_record_without_id_is_ignored() {
        let mut wf = EntryWorkflow::new();
        let mut unsaved = record(None, Rating::NONE);
        unsaved.id = None;
        assert!(wf.dispatch(Action::OpenRecord(unsaved)).is_empty());
        assert_eq!(wf.state(), WorkflowState::Idle);
    }

    // ── Delete ──

    #[test]
    fn test_delete_requires_confirmation() {
        let mut wf = EntryWorkflow::new();
        wf.dispatch(Action::OpenRecord(record(Some(ReadingStatus::Reading), Rating::NONE)));

        // Confirming without a prompt does nothing.
        assert!(wf.dispatch(Action::ConfirmDelete).is_empty());

        wf.dispatch(Action::RequestDelete);
        assert!(wf.is_confirming_delete());
        assert!(wf.dispatch(Action::DeclineDelete).is_empty());
        assert!(!wf.is_confirming_delete());
        assert_eq!(wf.current_book_id(), Some(7));

        wf.dispatch(Action::RequestDelete);
        // Esc on the prompt declines rather than closing the form.
        wf.dispatch(Action::Cancel);
        assert!(!wf.is_confirming_delete());
        assert_eq!(wf.current_book_id(), Some(7));

        wf.dispatch(Action::RequestDelete);
        let effects = wf.dispatch(Action::ConfirmDelete);
        assert_eq!(requests(&effects), vec![&Request::Delete { id: 7 }]);
        // Still open until the server answers.
        assert_eq!(wf.current_book_id(), Some(7));

        let effects = wf.handle(Event::DeleteCompleted(Ok(())));
        assert_eq!(
            effects,
            vec![Effect::Notify(Notice::success(MSG_REMOVED)), Effect::ResetFeed]
        );
        assert_eq!(wf.state(), WorkflowState::Closed);
    }

    #[test]
    fn test_delete_failure_stays_open() {
        let mut wf = EntryWorkflow::new();
        wf.dispatch(Action::OpenRecord(record(Some(ReadingStatus::Reading), Rating::NONE)));
        wf.dispatch(Action::RequestDelete);
        wf.dispatch(Action::ConfirmDelete);

        let effects = wf.handle(Event::DeleteCompleted(Err(ApiError::Status(500))));
        assert!(!effects.contains(&Effect::ResetFeed));
        assert_eq!(wf.current_book_id(), Some(7));
        assert_eq!(wf.message(), Some(MSG_REMOVE_FAILED));
    }

    #[test]
    fn test_delete_failure_message_ignores_server_text() {
        let mut wf = EntryWorkflow::new();
        wf.dispatch(Action::OpenRecord(record(Some(ReadingStatus::Reading), Rating::NONE)));
        wf.dispatch(Action::RequestDelete);
        wf.dispatch(Action::ConfirmDelete);
        let effects = wf.handle(Event::DeleteCompleted(Err(ApiError::rejected(
            500,
            "database is locked",
        ))));
        assert_eq!(effects, vec![Effect::Notify(Notice::error(MSG_REMOVE_FAILED))]);

        wf.dispatch(Action::RequestDelete);
        wf.dispatch(Action::ConfirmDelete);
        let garbled = serde_json::from_str::<u32>("{").unwrap_err();
        wf.handle(Event::DeleteCompleted(Err(ApiError::Json(garbled))));
        assert_eq!(
            wf.message(),
            Some("Error removing book. Please try again.")
        );
    }

    #[test]
    fn test_delete_not_offered_for_new_entries() {
        let mut wf = EntryWorkflow::new();
        wf.dispatch(Action::AddBook);
        wf.dispatch(Action::ManualEntry);
        wf.dispatch(Action::RequestDelete);
        assert!(!wf.is_confirming_delete());
    }

    // ── Invariants ──

    #[test]
    fn test_current_book_id_only_in_edit() {
        let (mut wf, _) = with_results();
        assert_eq!(wf.current_book_id(), None);
        wf.dispatch(Action::SelectResult(0));
        assert_eq!(wf.current_book_id(), None);
        wf.dispatch(Action::Cancel);
        wf.dispatch(Action::Cancel);
        assert_eq!(wf.state(), WorkflowState::Idle);
        assert!(wf.selected_hit().is_none());
        assert!(wf.results().is_empty());
    }

    #[test]
    fn test_closed_accepts_new_workflows() {
        let mut wf = EntryWorkflow::new();
        wf.dispatch(Action::OpenRecord(record(Some(ReadingStatus::Reading), Rating::NONE)));
        wf.dispatch(Action::Save);
        wf.handle(Event::UpdateCompleted(Ok(())));
        assert_eq!(wf.state(), WorkflowState::Closed);
        assert!(!wf.state().is_open());

        wf.dispatch(Action::AddBook);
        assert_eq!(wf.state(), WorkflowState::SearchOpen);
    }
}
