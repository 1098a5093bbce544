use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame, Terminal,
};
use tokio::sync::mpsc;

use super::events::{Action, AppEvent, InputOutcome, Notification};
use super::services::Services;
use super::theme;
use super::views::entry::EntryView;
use super::views::library::LibraryState;
use crate::config::TuiConfig;
use crate::core::filter::FilterController;
use crate::core::scroll::ScrollTrigger;
use crate::core::session::{Job, ReadingSession};
use crate::core::workflow::NoticeLevel;

/// How long a notification stays on screen.
const NOTIFICATION_MS: u64 = 5_000;
const MAX_NOTIFICATIONS: usize = 3;

pub struct AppState {
    pub running: bool,
    pub session: ReadingSession,
    pub library: LibraryState,
    pub entry: EntryView,
    pub notifications: Vec<Notification>,
    notification_ttl: u32,
    pub show_help: bool,
    event_rx: mpsc::UnboundedReceiver<AppEvent>,
    services: Services,
}

impl AppState {
    pub fn new(
        event_rx: mpsc::UnboundedReceiver<AppEvent>,
        services: Services,
        config: &TuiConfig,
    ) -> Self {
        let tick_ms = config.tick_rate_ms.max(1);
        Self {
            running: true,
            session: ReadingSession::new(
                FilterController::new(),
                ScrollTrigger::new(config.scroll_lead_rows),
            ),
            library: LibraryState::new(),
            entry: EntryView::new(),
            notifications: Vec::new(),
            notification_ttl: (NOTIFICATION_MS / tick_ms).max(1) as u32,
            show_help: false,
            event_rx,
            services,
        }
    }

    // ── Elm event loop ──────────────────────────────────────────────────

    /// Main event loop: render → select → update → loop.
    pub async fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        tick_rate: Duration,
    ) -> io::Result<()> {
        let mut tick_interval = tokio::time::interval(tick_rate);
        let mut event_stream = EventStream::new();

        // First page
        let jobs = self.session.reload();
        self.execute(jobs);

        while self.running {
            terminal.draw(|frame| self.render(frame))?;

            tokio::select! {
                _ = tick_interval.tick() => {
                    self.on_tick();
                }
                Some(event) = self.event_rx.recv() => {
                    self.handle_event(event);
                }
                Some(Ok(crossterm_event)) = event_stream.next() => {
                    self.handle_event(AppEvent::Input(crossterm_event));
                }
            }
        }

        Ok(())
    }

    /// Notices go to the overlay; everything else hits the network.
    fn execute(&mut self, jobs: Vec<Job>) {
        for job in jobs {
            match job {
                Job::Notify(notice) => self.push_notification(notice.text, notice.level),
                job => self.services.spawn(job),
            }
        }
    }

    // ── Event handling ──────────────────────────────────────────────────

    fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Input(crossterm_event) => self.handle_input(crossterm_event),
            AppEvent::Completed(completion) => {
                let jobs = self.session.complete(completion);
                self.execute(jobs);
            }
        }

        self.entry.sync(self.session.workflow());
        let jobs = self.library.observe(&mut self.session);
        self.execute(jobs);
    }

    fn handle_input(&mut self, event: Event) {
        // Priority 1: Help modal
        if self.show_help {
            if let Some(action) = self.map_help_input(&event) {
                self.handle_action(action);
            }
            return;
        }

        // Priority 2: Entry modal consumes all keys but Ctrl+C while open
        let outcome = if is_force_quit(&event) {
            InputOutcome::Ignored
        } else if self.session.workflow().state().is_open() {
            match self.entry.handle_input(&event, &mut self.session) {
                InputOutcome::Ignored => InputOutcome::Handled,
                other => other,
            }
        } else {
            // Priority 3: Library view
            self.library.handle_input(&event, &mut self.session)
        };

        match outcome {
            InputOutcome::Handled => {}
            InputOutcome::Jobs(jobs) => self.execute(jobs),
            // Priority 4: Global keybindings
            InputOutcome::Ignored => {
                if let Some(action) = self.map_input_to_action(event) {
                    self.handle_action(action);
                }
            }
        }
    }

    fn map_help_input(&self, event: &Event) -> Option<Action> {
        let Event::Key(KeyEvent {
            code,
            kind: KeyEventKind::Press,
            ..
        }) = event
        else {
            return None;
        };
        match code {
            KeyCode::Esc | KeyCode::Char('?') => Some(Action::CloseHelp),
            _ => None,
        }
    }

    fn map_input_to_action(&self, event: Event) -> Option<Action> {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = event
        else {
            return None;
        };

        match (modifiers, code) {
            (KeyModifiers::CONTROL, KeyCode::Char('c')) => Some(Action::Quit),
            (KeyModifiers::NONE | KeyModifiers::SHIFT, KeyCode::Char('q')) => Some(Action::Quit),
            (KeyModifiers::NONE | KeyModifiers::SHIFT, KeyCode::Char('?')) => {
                Some(Action::ShowHelp)
            }
            _ => None,
        }
    }

    fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.running = false,
            Action::ShowHelp => self.show_help = true,
            Action::CloseHelp => self.show_help = false,
        }
    }

    // ── Notifications ───────────────────────────────────────────────────

    /// Push a notification (dedup by message, max 3).
    pub fn push_notification(&mut self, message: String, level: NoticeLevel) {
        if self.notifications.iter().any(|n| n.message == message) {
            return;
        }

        self.notifications.push(Notification {
            message,
            level,
            ttl_ticks: self.notification_ttl,
        });

        while self.notifications.len() > MAX_NOTIFICATIONS {
            self.notifications.remove(0);
        }
    }

    /// Tick: decrement notification TTLs, fire a due search commit.
    fn on_tick(&mut self) {
        for n in &mut self.notifications {
            n.ttl_ticks = n.ttl_ticks.saturating_sub(1);
        }
        self.notifications.retain(|n| n.ttl_ticks > 0);

        let jobs = self.session.tick(Instant::now());
        self.execute(jobs);
    }

    // ── Rendering ───────────────────────────────────────────────────────

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        let now = chrono::Utc::now();

        let [main, status] =
            Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).areas(area);

        self.library.render(frame, main, &self.session, now);
        self.render_status_bar(frame, status);

        // Overlays
        if self.session.workflow().state().is_open() {
            self.entry.render(
                frame,
                area,
                self.session.workflow(),
                &self.services.covers_url,
                now,
            );
        }

        self.render_notifications(frame, area);

        if self.show_help {
            self.render_help_modal(frame, area);
        }
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let feed = self.session.feed();
        let feed_status = if feed.is_loading() || feed.is_loading_more() {
            Span::styled("loading", Style::default().fg(theme::PRIMARY_LIGHT))
        } else {
            Span::styled("ready", Style::default().fg(theme::TEXT_MUTED))
        };

        let mode_indicator = if self.library.is_editing_search() {
            Span::styled(" SEARCH ", theme::badge())
        } else {
            Span::raw("")
        };

        let status = Line::from(vec![
            Span::styled(" READLOG ", theme::brand()),
            Span::raw(" "),
            mode_indicator,
            Span::raw(" "),
            Span::styled(
                "My Library",
                Style::default()
                    .fg(theme::PRIMARY_LIGHT)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" │ "),
            feed_status,
            Span::raw(" │ "),
            Span::styled("a", theme::hint()),
            Span::raw(":add "),
            Span::styled("/", theme::hint()),
            Span::raw(":search "),
            Span::styled("s", theme::hint()),
            Span::raw(":status "),
            Span::styled("?", theme::hint()),
            Span::raw(":help "),
            Span::styled("q", theme::hint()),
            Span::raw(":quit"),
        ]);

        frame.render_widget(Paragraph::new(status), area);
    }

    fn render_notifications(&self, frame: &mut Frame, area: Rect) {
        if self.notifications.is_empty() {
            return;
        }

        let max_width = 50.min(area.width.saturating_sub(2));
        let height = self.notifications.len() as u16;
        let x = area.width.saturating_sub(max_width + 1);
        let y = 1;

        let notification_area = Rect::new(x, y, max_width, height);

        let lines: Vec<Line> = self
            .notifications
            .iter()
            .map(|n| {
                let (prefix, color) = match n.level {
                    NoticeLevel::Success => ("✓", theme::SUCCESS),
                    NoticeLevel::Error => ("✗", theme::ERROR),
                };
                Line::from(vec![
                    Span::styled(
                        format!(" {prefix} "),
                        Style::default().fg(color).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(n.message.as_str()),
                ])
            })
            .collect();

        frame.render_widget(Clear, notification_area);
        frame.render_widget(Paragraph::new(lines), notification_area);
    }

    fn render_help_modal(&self, frame: &mut Frame, area: Rect) {
        let modal = centered_rect(60, 80, area);

        let keybindings = [
            ("Global:", ""),
            ("q", "Quit application"),
            ("?", "Toggle this help"),
            ("Ctrl+C", "Force quit"),
            ("", ""),
            ("Library:", ""),
            ("j/k", "Move selection"),
            ("PgUp/PgDn", "Move a page"),
            ("g / G", "Jump to top / bottom"),
            ("Enter", "Edit selected book"),
            ("a", "Add a book"),
            ("/", "Search title or author"),
            ("s / S", "Next / previous status filter"),
            ("r", "Reload"),
            ("", ""),
            ("Add / Edit:", ""),
            ("Tab / Shift+Tab", "Next / previous field"),
            ("← / →", "Change status or rating"),
            ("Space / 0-5", "Set rating"),
            ("Ctrl+S", "Save"),
            ("Ctrl+D", "Remove book"),
            ("Esc", "Back / cancel"),
        ];

        let mut lines = vec![
            Line::raw(""),
            Line::from(Span::styled(
                " Keybindings",
                Style::default()
                    .fg(theme::ACCENT)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::raw(""),
        ];

        for (key, desc) in keybindings {
            if key.is_empty() {
                lines.push(Line::raw(""));
            } else if desc.is_empty() {
                lines.push(Line::from(Span::styled(
                    format!("  {key}"),
                    Style::default()
                        .fg(theme::ACCENT)
                        .add_modifier(Modifier::BOLD),
                )));
            } else {
                lines.push(Line::from(vec![
                    Span::raw("  "),
                    Span::styled(
                        format!("{key:<22}"),
                        Style::default()
                            .fg(theme::PRIMARY_LIGHT)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(desc),
                ]));
            }
        }

        lines.push(Line::raw(""));
        lines.push(Line::from(vec![
            Span::raw("  Press "),
            Span::styled("?", theme::hint()),
            Span::raw(" or "),
            Span::styled("Esc", theme::hint()),
            Span::raw(" to close"),
        ]));

        let block = Block::default()
            .title(" Help ")
            .title_alignment(Alignment::Center)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme::ACCENT));

        frame.render_widget(Clear, modal);
        frame.render_widget(Paragraph::new(lines).block(block), modal);
    }
}

fn is_force_quit(event: &Event) -> bool {
    matches!(
        event,
        Event::Key(KeyEvent {
            code: KeyCode::Char('c'),
            modifiers: KeyModifiers::CONTROL,
            kind: KeyEventKind::Press,
            ..
        })
    )
}

/// Calculate a centered rect using percentage of parent area.
pub(super) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .split(area);

    Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::api::{Backends, MockCatalogApi, MockCollectionApi};
    use crate::core::workflow::{Notice, WorkflowState};

    fn app() -> AppState {
        let (tx, rx) = mpsc::unbounded_channel();
        let backends = Backends::new(
            Arc::new(MockCollectionApi::new()),
            Arc::new(MockCatalogApi::new()),
        );
        let services = Services::new(backends, "https://covers.test".to_string(), tx);
        AppState::new(rx, services, &TuiConfig::default())
    }

    fn press(app: &mut AppState, code: KeyCode) {
        app.handle_event(AppEvent::Input(Event::Key(KeyEvent::new(
            code,
            KeyModifiers::NONE,
        ))));
    }

    #[test]
    fn test_notification_ttl_matches_tick_rate() {
        let app = app();
        // 5 s at the default 50 ms tick
        assert_eq!(app.notification_ttl, 100);
    }

    #[test]
    fn test_push_notification_dedup_and_cap() {
        let mut app = app();
        app.push_notification("Book added".into(), NoticeLevel::Success);
        app.push_notification("Book added".into(), NoticeLevel::Success);
        assert_eq!(app.notifications.len(), 1);

        for i in 0..4 {
            app.push_notification(format!("n{i}"), NoticeLevel::Success);
        }
        assert_eq!(app.notifications.len(), MAX_NOTIFICATIONS);
        assert_eq!(app.notifications[0].message, "n1");
    }

    #[test]
    fn test_notify_job_keeps_notice_level() {
        let mut app = app();
        app.execute(vec![Job::Notify(Notice::error("Error removing book"))]);
        assert_eq!(app.notifications.len(), 1);
        assert_eq!(app.notifications[0].level, NoticeLevel::Error);
        assert_eq!(app.notifications[0].message, "Error removing book");
    }

    #[test]
    fn test_notifications_expire() {
        let mut app = app();
        app.notification_ttl = 2;
        app.push_notification("gone soon".into(), NoticeLevel::Error);
        app.on_tick();
        assert_eq!(app.notifications.len(), 1);
        app.on_tick();
        assert!(app.notifications.is_empty());
    }

    #[test]
    fn test_help_toggle_blocks_other_keys() {
        let mut app = app();
        press(&mut app, KeyCode::Char('?'));
        assert!(app.show_help);
        press(&mut app, KeyCode::Char('q'));
        assert!(app.running);
        press(&mut app, KeyCode::Esc);
        assert!(!app.show_help);
    }

    #[test]
    fn test_entry_modal_captures_keys() {
        let mut app = app();
        press(&mut app, KeyCode::Char('a'));
        assert_eq!(app.session.workflow().state(), WorkflowState::SearchOpen);

        // 'q' is not a quit key while the modal is open.
        press(&mut app, KeyCode::Char('q'));
        assert!(app.running);

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.session.workflow().state(), WorkflowState::Idle);
        press(&mut app, KeyCode::Char('q'));
        assert!(!app.running);
    }

    #[test]
    fn test_centered_rect() {
        let area = Rect::new(0, 0, 100, 50);
        let r = centered_rect(60, 80, area);
        assert!(r.x > 0);
        assert!(r.y > 0);
        assert!(r.width <= 60);
        assert!(r.height <= 40);
    }
}
