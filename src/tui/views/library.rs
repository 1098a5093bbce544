//! Library view: the paginated, filterable list of saved books.
//!
//! Each book renders as a fixed-height card. The scroll position drives the
//! session's scroll trigger: after every event the view re-anchors the
//! sentinel below the last card and reports the visible window, which may
//! request the next page.
//!
//! Keys:
//! - `j`/`k`, arrows, `PgUp`/`PgDn`, `g`/`G` to move through the list
//! - `/` to edit the search filter (debounced), `s`/`S` to cycle the status filter
//! - `Enter` to open the selected book, `a` to add one, `r` to reload

use std::cell::Cell;
use std::time::Instant;

use chrono::{DateTime, Utc};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use super::super::theme;
use crate::core::feed::{empty_state_message, FeedView};
use crate::core::models::{relative_age, BookRecord, ReadingStatus};
use crate::core::session::{Job, ReadingSession};
use crate::core::workflow::Action;
use crate::tui::events::InputOutcome;
use crate::tui::widgets::input_buffer::InputBuffer;

/// Rendered rows per book card, separator included.
pub const CARD_HEIGHT: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FocusZone {
    List,
    Search,
}

pub struct LibraryState {
    search_input: InputBuffer,
    focus: FocusZone,
    /// Index of the highlighted book.
    selected: usize,
    /// First visible line of the list.
    scroll: usize,
    /// Height of the list area at the last render.
    viewport_rows: Cell<usize>,
}

impl Default for LibraryState {
    fn default() -> Self {
        Self::new()
    }
}

impl LibraryState {
    pub fn new() -> Self {
        Self {
            search_input: InputBuffer::new(),
            focus: FocusZone::List,
            selected: 0,
            scroll: 0,
            viewport_rows: Cell::new(0),
        }
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn is_editing_search(&self) -> bool {
        self.focus == FocusZone::Search
    }

    // ── Scroll trigger ───────────────────────────────────────────────────

    /// Re-anchor the sentinel under the current list and report the viewport.
    /// Call after every event; returns a page fetch when the end comes near.
    pub fn observe(&mut self, session: &mut ReadingSession) -> Vec<Job> {
        let len = session.feed().items().len();
        if len == 0 {
            self.selected = 0;
            self.scroll = 0;
            return vec![];
        }
        if self.selected >= len {
            self.select(len - 1, len);
        }
        session.anchor(len * CARD_HEIGHT);
        session.observe_viewport(self.scroll, self.viewport_rows.get())
    }

    fn select(&mut self, index: usize, len: usize) {
        if len == 0 {
            return;
        }
        self.selected = index.min(len - 1);
        let top = self.selected * CARD_HEIGHT;
        let height = self.viewport_rows.get().max(CARD_HEIGHT);
        if top < self.scroll {
            self.scroll = top;
        } else if top + CARD_HEIGHT > self.scroll + height {
            self.scroll = top + CARD_HEIGHT - height;
        }
    }

    fn page_cards(&self) -> usize {
        (self.viewport_rows.get() / CARD_HEIGHT).max(1)
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

        match self.focus {
            FocusZone::Search => self.handle_search_input(*code, session),
            FocusZone::List => self.handle_list_input(*code, *modifiers, session),
        }
    }

    fn handle_list_input(
        &mut self,
        code: KeyCode,
        modifiers: KeyModifiers,
        session: &mut ReadingSession,
    ) -> InputOutcome {
        let len = session.feed().items().len();
        match (modifiers, code) {
            (KeyModifiers::NONE, KeyCode::Char('/')) => {
                self.focus = FocusZone::Search;
                InputOutcome::Handled
            }
            (KeyModifiers::NONE, KeyCode::Char('j') | KeyCode::Down) => {
                self.select(self.selected + 1, len);
                InputOutcome::Handled
            }
            (KeyModifiers::NONE, KeyCode::Char('k') | KeyCode::Up) => {
                self.select(self.selected.saturating_sub(1), len);
                InputOutcome::Handled
            }
            (KeyModifiers::NONE, KeyCode::PageDown) => {
                self.select(self.selected + self.page_cards(), len);
                InputOutcome::Handled
            }
            (KeyModifiers::NONE, KeyCode::PageUp) => {
                self.select(self.selected.saturating_sub(self.page_cards()), len);
                InputOutcome::Handled
            }
            (KeyModifiers::NONE, KeyCode::Char('g') | KeyCode::Home) => {
                self.select(0, len);
                InputOutcome::Handled
            }
            (KeyModifiers::SHIFT, KeyCode::Char('G')) | (KeyModifiers::NONE, KeyCode::End) => {
                self.select(len.saturating_sub(1), len);
                InputOutcome::Handled
            }
            (KeyModifiers::NONE, KeyCode::Enter) => {
                match session.feed().items().get(self.selected).cloned() {
                    Some(book) => InputOutcome::from_jobs(session.dispatch(Action::OpenRecord(book))),
                    None => InputOutcome::Handled,
                }
            }
            (KeyModifiers::NONE, KeyCode::Char('a')) => {
                InputOutcome::from_jobs(session.dispatch(Action::AddBook))
            }
            (KeyModifiers::NONE, KeyCode::Char('s')) => {
                let next = ReadingStatus::cycle_next(session.filters().status());
                InputOutcome::from_jobs(session.set_status_filter(next))
            }
            (KeyModifiers::SHIFT, KeyCode::Char('S')) => {
                let prev = ReadingStatus::cycle_prev(session.filters().status());
                InputOutcome::from_jobs(session.set_status_filter(prev))
            }
            (KeyModifiers::NONE, KeyCode::Char('r')) => InputOutcome::from_jobs(session.reload()),
            _ => InputOutcome::Ignored,
        }
    }

    fn handle_search_input(&mut self, code: KeyCode, session: &mut ReadingSession) -> InputOutcome {
        match code {
            KeyCode::Esc => {
                // Clear the filter and return to the list
                if !self.search_input.text().is_empty() {
                    self.search_input.clear();
                    session.set_search_text("", Instant::now());
                }
                self.focus = FocusZone::List;
            }
            KeyCode::Enter | KeyCode::Tab | KeyCode::Down => {
                self.focus = FocusZone::List;
            }
            other => {
                if self.search_input.edit(other) {
                    session.set_search_text(self.search_input.text(), Instant::now());
                }
            }
        }
        // Consume to avoid pass-through
        InputOutcome::Handled
    }

    // ── Rendering ────────────────────────────────────────────────────────

    pub fn render(&self, frame: &mut Frame, area: Rect, session: &ReadingSession, now: DateTime<Utc>) {
        let block = theme::panel("My Library", self.focus == FocusZone::List);

        let inner = block.inner(area);
        frame.render_widget(block, area);

        let v_chunks = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(1),
        ])
        .split(inner);

        self.render_search_bar(frame, v_chunks[0]);
        frame.render_widget(Paragraph::new(status_filter_line(session.filters().status())), v_chunks[1]);
        frame.render_widget(Paragraph::new(count_line(session)), v_chunks[2]);
        self.render_list(frame, v_chunks[3], session, now);
    }

    fn render_search_bar(&self, frame: &mut Frame, area: Rect) {
        let focused = self.focus == FocusZone::Search;
        let query_text = self.search_input.text();

        let prefix_style = theme::label(focused);

        let (display_text, input_style) = if self.search_input.is_empty() && !focused {
            ("Press / to search by title or author...".to_string(), theme::dim())
        } else if focused {
            (self.search_input.display_with_cursor(), theme::text())
        } else {
            (query_text.to_string(), theme::text())
        };

        let line = Line::from(vec![
            Span::styled(" [/] Search: ", prefix_style),
            Span::styled(display_text, input_style),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    fn render_list(&self, frame: &mut Frame, area: Rect, session: &ReadingSession, now: DateTime<Utc>) {
        self.viewport_rows.set(area.height as usize);

        let lines = match session.feed().view() {
            FeedView::Loading => message_lines("Loading books...", None),
            FeedView::Failed(message) => message_lines(message, Some("Press r to retry")),
            FeedView::Empty { filtered } => {
                let (headline, hint) = empty_state_message(filtered);
                message_lines(headline, Some(hint))
            }
            FeedView::Items(items) => {
                let mut lines = build_card_lines(items, self.selected, now);
                if session.feed().is_loading_more() {
                    lines.push(Line::from(Span::styled("  Loading more books...", theme::muted())));
                }
                lines
            }
        };

        let content = Paragraph::new(lines).scroll((self.scroll as u16, 0));
        frame.render_widget(content, area);
    }
}

// ── Line builders ────────────────────────────────────────────────────────────

fn message_lines(headline: &str, hint: Option<&str>) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::raw(""),
        Line::from(vec![
            Span::raw("  "),
            Span::styled(headline.to_string(), Style::default().fg(theme::TEXT_MUTED)),
        ]),
    ];
    if let Some(hint) = hint {
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(hint.to_string(), theme::dim()),
        ]));
    }
    lines
}

fn status_filter_line(active: Option<ReadingStatus>) -> Line<'static> {
    let chip = |label: &'static str, on: bool| {
        if on {
            Span::styled(format!(" {label} "), theme::badge())
        } else {
            Span::styled(format!(" {label} "), theme::muted())
        }
    };

    let mut spans = vec![Span::styled(" [s] Status: ", theme::hint()), chip("All", active.is_none())];
    spans.extend(
        ReadingStatus::ALL
            .into_iter()
            .map(|status| chip(status.label(), active == Some(status))),
    );
    Line::from(spans)
}

fn count_line(session: &ReadingSession) -> Line<'static> {
    let feed = session.feed();
    let loaded = feed.items().len();
    let text = match feed.total() {
        Some(total) if total > loaded => format!(" Showing {loaded} of {total} books"),
        _ if loaded == 1 => " 1 book".to_string(),
        _ => format!(" {loaded} books"),
    };
    Line::from(Span::styled(text, theme::dim()))
}

/// Card lines for every loaded book, `CARD_HEIGHT` lines each.
fn build_card_lines(items: &[BookRecord], selected: usize, now: DateTime<Utc>) -> Vec<Line<'static>> {
    let mut lines = Vec::with_capacity(items.len() * CARD_HEIGHT + 1);
    for (index, book) in items.iter().enumerate() {
        let is_selected = index == selected;
        let marker = if is_selected { "\u{25b8} " } else { "  " };
        let title_style = if is_selected {
            theme::selected()
        } else {
            theme::text().add_modifier(Modifier::BOLD)
        };
        let status_label = book.status.map_or("No status", ReadingStatus::label);

        lines.push(Line::from(vec![
            Span::styled(marker, Style::default().fg(theme::ACCENT)),
            Span::styled(book.title.clone(), title_style),
            Span::raw("  "),
            Span::styled(
                format!("[{status_label}]"),
                theme::status(book.status),
            ),
        ]));

        let mut details = vec![
            Span::raw("    "),
            Span::styled(book.author_display().to_string(), theme::muted()),
        ];
        if let Some(year) = book.first_publish_year {
            details.push(Span::styled(format!(" \u{b7} {year}"), theme::muted()));
        }
        details.push(Span::raw(" \u{b7} "));
        if book.rating.is_set() {
            details.push(Span::styled(book.rating.glyphs(), theme::stars()));
            details.push(Span::styled(format!(" ({})", book.rating), theme::muted()));
        } else {
            details.push(Span::styled("No rating", theme::dim()));
        }
        if let Some(added) = book.added_at() {
            details.push(Span::styled(
                format!(" \u{b7} added {}", relative_age(added, now)),
                theme::dim(),
            ));
        }
        lines.push(Line::from(details));
        lines.push(Line::raw(""));
    }
    lines
}
