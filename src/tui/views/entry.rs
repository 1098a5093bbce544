//! Entry modal: catalog search, manual entry, editing and removal.
//!
//! The workflow itself lives in [`EntryWorkflow`]; this view only owns the
//! text buffers and cursors, maps keys to workflow actions and draws the
//! overlay for the current state.

use chrono::{DateTime, Utc};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Alignment, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::super::theme;
use crate::core::models::{
    cover_url, parse_timestamp, relative_age, CoverSize, Rating, ReadingStatus, UNKNOWN_AUTHOR,
};
use crate::core::session::ReadingSession;
use crate::core::workflow::{
    Action, EntryMode, EntryWorkflow, Field, SearchStatus, WorkflowState, MSG_NO_RESULTS,
    MSG_SEARCH_FAILED,
};
use crate::tui::events::InputOutcome;
use crate::tui::widgets::input_buffer::InputBuffer;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormField {
    Title,
    Author,
    Year,
    Status,
    Rating,
}

impl FormField {
    const NEW: [FormField; 5] = [
        Self::Title,
        Self::Author,
        Self::Year,
        Self::Status,
        Self::Rating,
    ];
    /// Title, author and year are fixed once a book is saved.
    const EDIT: [FormField; 2] = [Self::Status, Self::Rating];

    fn cycle(self, mode: EntryMode, forward: bool) -> Self {
        let order: &[FormField] = match mode {
            EntryMode::EditExisting(_) => &Self::EDIT,
            _ => &Self::NEW,
        };
        let idx = order.iter().position(|&f| f == self).unwrap_or(0);
        let len = order.len();
        if forward {
            order[(idx + 1) % len]
        } else {
            order[(idx + len - 1) % len]
        }
    }

    fn text_field(self) -> Option<Field> {
        match self {
            Self::Title => Some(Field::Title),
            Self::Author => Some(Field::Author),
            Self::Year => Some(Field::Year),
            Self::Status | Self::Rating => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SearchFocus {
    Query,
    Results,
}

/// Status choices in the form; unlike the list filter there is no "all".
fn cycle_status(current: Option<ReadingStatus>, forward: bool) -> ReadingStatus {
    let all = ReadingStatus::ALL;
    let len = all.len();
    match current.and_then(|s| all.iter().position(|&x| x == s)) {
        None if forward => all[0],
        None => all[len - 1],
        Some(idx) if forward => all[(idx + 1) % len],
        Some(idx) => all[(idx + len - 1) % len],
    }
}

pub struct EntryView {
    /// Workflow state the buffers were last loaded for.
    synced: WorkflowState,
    query: InputBuffer,
    search_focus: SearchFocus,
    cursor: usize,
    title: InputBuffer,
    author: InputBuffer,
    year: InputBuffer,
    field: FormField,
    /// Rating under the keyboard cursor on the rating field.
    rating_cursor: Rating,
}

impl Default for EntryView {
    fn default() -> Self {
        Self::new()
    }
}

impl EntryView {
    pub fn new() -> Self {
        Self {
            synced: WorkflowState::Idle,
            query: InputBuffer::new(),
            search_focus: SearchFocus::Query,
            cursor: 0,
            title: InputBuffer::new(),
            author: InputBuffer::new(),
            year: InputBuffer::new(),
            field: FormField::Title,
            rating_cursor: Rating::NONE,
        }
    }

    pub fn field(&self) -> FormField {
        self.field
    }

    /// Reload buffers when the workflow moved to another state.
    pub fn sync(&mut self, workflow: &EntryWorkflow) {
        let state = workflow.state();
        if state == self.synced {
            return;
        }
        match state {
            WorkflowState::SearchInputOpen => {
                self.query.set_text(workflow.query());
                if self.synced == WorkflowState::SearchOpen {
                    self.cursor = 0;
                    self.search_focus = SearchFocus::Query;
                } else {
                    // Back from a catalog entry: keep the cursor on the result list.
                    self.cursor = self.cursor.min(workflow.results().len().saturating_sub(1));
                    self.search_focus = if workflow.results().is_empty() {
                        SearchFocus::Query
                    } else {
                        SearchFocus::Results
                    };
                }
            }
            WorkflowState::EntryOpen(mode) => {
                let form = workflow.form();
                self.title.set_text(&form.title);
                self.author.set_text(&form.author);
                self.year.set_text(&form.year);
                self.rating_cursor = form.rating.committed;
                self.field = match mode {
                    EntryMode::EditExisting(_) => FormField::Status,
                    _ => FormField::Title,
                };
            }
            _ => {}
        }
        self.synced = state;
    }

    // ── Input ────────────────────────────────────────────────────────────

    pub fn handle_input(&mut self, event: &Event, session: &mut ReadingSession) -> InputOutcome {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = event
        else {
            return InputOutcome::Ignored;
        };

        let actions = match session.workflow().state() {
            WorkflowState::SearchOpen => Self::choice_input(*code),
            WorkflowState::SearchInputOpen => {
                let has_results = !session.workflow().results().is_empty();
                self.search_input(*code, *modifiers, has_results, session.workflow().results().len())
            }
            WorkflowState::EntryOpen(mode) => {
                if session.workflow().is_confirming_delete() {
                    Self::confirm_input(*code)
                } else {
                    self.form_input(*code, *modifiers, mode, session.workflow())
                }
            }
            WorkflowState::Idle | WorkflowState::Closed => return InputOutcome::Ignored,
        };

        let mut jobs = Vec::new();
        for action in actions {
            jobs.extend(session.dispatch(action));
        }
        self.sync(session.workflow());
        InputOutcome::from_jobs(jobs)
    }

    fn choice_input(code: KeyCode) -> Vec<Action> {
        match code {
            KeyCode::Char('s') | KeyCode::Char('1') => vec![Action::SearchByTitle],
            KeyCode::Char('m') | KeyCode::Char('2') => vec![Action::ManualEntry],
            KeyCode::Esc => vec![Action::Cancel],
            _ => vec![],
        }
    }

    fn search_input(
        &mut self,
        code: KeyCode,
        modifiers: KeyModifiers,
        has_results: bool,
        count: usize,
    ) -> Vec<Action> {
        if code == KeyCode::Esc {
            return vec![Action::Cancel];
        }
        match self.search_focus {
            SearchFocus::Query => match code {
                KeyCode::Enter => {
                    self.cursor = 0;
                    vec![Action::SubmitQuery]
                }
                KeyCode::Tab | KeyCode::Down if has_results => {
                    self.search_focus = SearchFocus::Results;
                    vec![]
                }
                _ if modifiers.contains(KeyModifiers::CONTROL) => vec![],
                other => {
                    if self.query.edit(other) {
                        vec![Action::SetQuery(self.query.text().to_string())]
                    } else {
                        vec![]
                    }
                }
            },
            SearchFocus::Results => match code {
                KeyCode::Char('j') | KeyCode::Down => {
                    self.cursor = (self.cursor + 1).min(count.saturating_sub(1));
                    vec![]
                }
                KeyCode::Char('k') | KeyCode::Up if self.cursor > 0 => {
                    self.cursor -= 1;
                    vec![]
                }
                KeyCode::Up | KeyCode::Tab | KeyCode::Char('/') => {
                    self.search_focus = SearchFocus::Query;
                    vec![]
                }
                KeyCode::Enter => vec![Action::SelectResult(self.cursor)],
                _ => vec![],
            },
        }
    }

    fn confirm_input(code: KeyCode) -> Vec<Action> {
        match code {
            KeyCode::Char('y') | KeyCode::Char('Y') => vec![Action::ConfirmDelete],
            KeyCode::Char('n') | KeyCode::Char('N') => vec![Action::DeclineDelete],
            KeyCode::Esc => vec![Action::Cancel],
            _ => vec![],
        }
    }

    fn form_input(
        &mut self,
        code: KeyCode,
        modifiers: KeyModifiers,
        mode: EntryMode,
        workflow: &EntryWorkflow,
    ) -> Vec<Action> {
        match (modifiers, code) {
            (KeyModifiers::CONTROL, KeyCode::Char('s')) => return vec![Action::Save],
            (KeyModifiers::CONTROL, KeyCode::Char('d')) => return vec![Action::RequestDelete],
            (_, KeyCode::Esc) => return vec![Action::Cancel],
            (_, KeyCode::Tab) => return self.move_field(mode, true, workflow),
            (_, KeyCode::BackTab) => return self.move_field(mode, false, workflow),
            _ => {}
        }

        match self.field {
            FormField::Status => match code {
                KeyCode::Left | KeyCode::Char('h') => {
                    vec![Action::SetStatus(Some(cycle_status(workflow.form().status, false)))]
                }
                KeyCode::Right | KeyCode::Char('l') => {
                    vec![Action::SetStatus(Some(cycle_status(workflow.form().status, true)))]
                }
                KeyCode::Enter => self.move_field(mode, true, workflow),
                _ => vec![],
            },
            FormField::Rating => match code {
                KeyCode::Left | KeyCode::Char('h') => {
                    self.rating_cursor = self.rating_cursor.step_down();
                    vec![Action::HoverRating(Some(self.rating_cursor))]
                }
                KeyCode::Right | KeyCode::Char('l') => {
                    self.rating_cursor = self.rating_cursor.step_up();
                    vec![Action::HoverRating(Some(self.rating_cursor))]
                }
                KeyCode::Char(' ') | KeyCode::Enter => vec![Action::SelectRating(self.rating_cursor)],
                KeyCode::Char(c @ '0'..='5') => {
                    let stars = c.to_digit(10).unwrap_or(0) as u8;
                    match Rating::from_half_steps(stars * 2) {
                        Some(rating) => {
                            self.rating_cursor = rating;
                            vec![Action::SelectRating(rating)]
                        }
                        None => vec![],
                    }
                }
                _ => vec![],
            },
            text => {
                let Some(field) = text.text_field() else {
                    return vec![];
                };
                if code == KeyCode::Enter {
                    return self.move_field(mode, true, workflow);
                }
                if modifiers.contains(KeyModifiers::CONTROL) {
                    return vec![];
                }
                let buffer = match field {
                    Field::Title => &mut self.title,
                    Field::Author => &mut self.author,
                    Field::Year => &mut self.year,
                };
                if buffer.edit(code) {
                    vec![Action::SetField(field, buffer.text().to_string())]
                } else {
                    vec![]
                }
            }
        }
    }

    fn move_field(&mut self, mode: EntryMode, forward: bool, workflow: &EntryWorkflow) -> Vec<Action> {
        let leaving_rating = self.field == FormField::Rating;
        self.field = self.field.cycle(mode, forward);
        if leaving_rating {
            // Drop an uncommitted preview
            self.rating_cursor = workflow.form().rating.committed;
            vec![Action::HoverRating(None)]
        } else {
            vec![]
        }
    }

    // ── Rendering ────────────────────────────────────────────────────────

    pub fn render(
        &self,
        frame: &mut Frame,
        area: Rect,
        workflow: &EntryWorkflow,
        covers_url: &str,
        now: DateTime<Utc>,
    ) {
        let (title, width, height, lines) = match workflow.state() {
            WorkflowState::SearchOpen => (" Add a Book ", 48, 10, self.choice_lines()),
            WorkflowState::SearchInputOpen => (" Search Books ", 70, 22, self.search_lines(workflow)),
            WorkflowState::EntryOpen(mode) => {
                let title = match mode {
                    EntryMode::EditExisting(_) => " Edit Book ",
                    _ => " Add to Library ",
                };
                (title, 76, 28, self.form_lines(mode, workflow, covers_url, now))
            }
            WorkflowState::Idle | WorkflowState::Closed => return,
        };

        let modal_area = centered_fixed(width, height, area);
        let block = Block::default()
            .title(title)
            .title_alignment(Alignment::Center)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme::ACCENT));

        frame.render_widget(Clear, modal_area);
        frame.render_widget(
            Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
            modal_area,
        );
    }

    fn choice_lines(&self) -> Vec<Line<'static>> {
        vec![
            Line::raw(""),
            Line::from(Span::styled("  How would you like to add a book?", theme::heading())),
            Line::raw(""),
            Line::from(vec![
                Span::styled("  [s] ", theme::selected()),
                Span::raw("Search by title"),
            ]),
            Line::from(vec![
                Span::styled("  [m] ", theme::selected()),
                Span::raw("Enter details manually"),
            ]),
            Line::raw(""),
            footer(&[("Esc", "cancel")]),
        ]
    }

    fn search_lines(&self, workflow: &EntryWorkflow) -> Vec<Line<'static>> {
        let query_focused = self.search_focus == SearchFocus::Query;
        let mut lines = vec![
            Line::raw(""),
            Line::from(vec![
                Span::styled("  Title: ", theme::label(query_focused)),
                Span::styled(
                    if query_focused {
                        self.query.display_with_cursor()
                    } else {
                        self.query.text().to_string()
                    },
                    theme::text(),
                ),
            ]),
            Line::raw(""),
        ];

        if let Some(message) = workflow.message() {
            lines.push(error_line(message));
        }

        match workflow.search_status() {
            SearchStatus::Prompt => lines.push(Line::from(Span::styled(
                "  Type at least 2 characters and press Enter",
                theme::dim(),
            ))),
            SearchStatus::Searching => {
                lines.push(Line::from(Span::styled("  Searching...", theme::muted())))
            }
            SearchStatus::NoResults => {
                lines.push(Line::from(Span::styled(format!("  {MSG_NO_RESULTS}"), theme::muted())))
            }
            SearchStatus::Failed => lines.push(error_line(MSG_SEARCH_FAILED)),
            SearchStatus::Results => {
                for (index, hit) in workflow.results().iter().enumerate() {
                    let is_cursor = !query_focused && index == self.cursor;
                    let marker = if is_cursor { "\u{25b8} " } else { "  " };
                    let mut spans = vec![
                        Span::raw("  "),
                        Span::styled(marker, Style::default().fg(theme::ACCENT)),
                        Span::styled(
                            hit.title.clone(),
                            if is_cursor { theme::selected() } else { theme::text() },
                        ),
                        Span::styled(
                            format!(
                                " - {}",
                                hit.authors().as_deref().unwrap_or(UNKNOWN_AUTHOR)
                            ),
                            theme::muted(),
                        ),
                    ];
                    if let Some(year) = hit.first_publish_year {
                        spans.push(Span::styled(format!(" ({year})"), theme::dim()));
                    }
                    lines.push(Line::from(spans));
                }
            }
        }

        lines.push(Line::raw(""));
        lines.push(footer(&[
            ("Enter", if query_focused { "search" } else { "select" }),
            ("Tab", "results"),
            ("Esc", "close"),
        ]));
        lines
    }

    fn form_lines(
        &self,
        mode: EntryMode,
        workflow: &EntryWorkflow,
        covers_url: &str,
        now: DateTime<Utc>,
    ) -> Vec<Line<'static>> {
        let form = workflow.form();
        let editable = !matches!(mode, EntryMode::EditExisting(_));
        let mut lines = vec![Line::raw("")];

        lines.push(self.text_line("Title", &self.title, FormField::Title, editable, "(required)"));
        lines.push(self.text_line("Author", &self.author, FormField::Author, editable, "Unknown Author"));
        lines.push(self.text_line("Year", &self.year, FormField::Year, editable, "(optional)"));

        let cover = match form.cover_id {
            Some(id) => cover_url(covers_url, id, CoverSize::Medium),
            None => "No cover".to_string(),
        };
        lines.push(Line::from(vec![
            Span::styled("  Cover:   ", theme::muted()),
            Span::styled(cover, theme::dim()),
        ]));

        if let Some(added) = form.added_at.as_deref().and_then(parse_timestamp) {
            lines.push(Line::from(Span::styled(
                format!("  Added {}", relative_age(added, now)),
                theme::dim(),
            )));
        }
        lines.push(Line::raw(""));

        // Status selector
        let status_focused = self.field == FormField::Status;
        let status_text = form.status.map_or("Select a status", ReadingStatus::label);
        let status_display = if status_focused {
            format!("\u{25c0} {status_text} \u{25b6}")
        } else {
            status_text.to_string()
        };
        lines.push(Line::from(vec![
            Span::styled("  Status:  ", theme::label(status_focused)),
            Span::styled(status_display, theme::status(form.status)),
        ]));

        // Rating: preview wins over the committed value while hovering
        let rating_focused = self.field == FormField::Rating;
        let shown = form.rating.shown();
        let mut rating_spans = vec![
            Span::styled("  Rating:  ", theme::label(rating_focused)),
            Span::styled(
                format!("{:<6}", shown.glyphs()),
                theme::stars(),
            ),
            Span::raw(" "),
            Span::styled(shown.caption(), theme::muted()),
        ];
        if form.rating.preview.is_some() {
            rating_spans.push(Span::styled("  (Space to set)", theme::dim()));
        }
        lines.push(Line::from(rating_spans));
        lines.push(Line::raw(""));

        if let Some(text) = workflow.summary().text() {
            lines.push(Line::from(Span::styled("  Summary", theme::heading())));
            lines.push(Line::from(Span::styled(format!("  {text}"), theme::muted())));
            lines.push(Line::raw(""));
        }

        if let Some(message) = workflow.message() {
            lines.push(error_line(message));
        }

        if workflow.is_confirming_delete() {
            lines.push(Line::from(vec![
                Span::styled(
                    "  Remove this book from your library? ",
                    theme::warning(),
                ),
                Span::styled("[y/n]", theme::hint()),
            ]));
        } else if workflow.is_saving() {
            lines.push(Line::from(Span::styled("  Saving...", theme::muted())));
        } else {
            let save_label = if editable { "add to library" } else { "update" };
            let mut keys = vec![("Tab", "next field"), ("Ctrl+S", save_label)];
            if !editable {
                keys.push(("Ctrl+D", "remove"));
            }
            keys.push(("Esc", "cancel"));
            lines.push(footer(&keys));
        }
        lines
    }

    fn text_line(
        &self,
        label: &str,
        buffer: &InputBuffer,
        field: FormField,
        editable: bool,
        placeholder: &str,
    ) -> Line<'static> {
        let focused = editable && self.field == field;
        let text = buffer.text();
        let (display, style) = if focused {
            (buffer.display_with_cursor(), theme::text())
        } else if text.is_empty() {
            (placeholder.to_string(), theme::dim())
        } else if editable {
            (text.to_string(), theme::text())
        } else {
            (text.to_string(), theme::muted())
        };
        Line::from(vec![
            Span::styled(if focused { "\u{25b8} " } else { "  " }, Style::default().fg(theme::ACCENT)),
            Span::styled(format!("{label:<8} "), theme::label(focused)),
            Span::styled(display, style),
        ])
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn error_line(message: &str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(message.to_string(), theme::error()),
    ])
}

fn footer(keys: &[(&str, &str)]) -> Line<'static> {
    let mut spans = vec![Span::raw("  ")];
    for (key, label) in keys {
        spans.push(Span::styled(key.to_string(), Style::default().fg(theme::TEXT_MUTED)));
        spans.push(Span::raw(format!(":{label}  ")));
    }
    Line::from(spans)
}

/// Compute a centered rectangle with fixed dimensions.
fn centered_fixed(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}
