use crate::core::session::{Completion, Job};
use crate::core::workflow::NoticeLevel;

/// Events flowing through the Elm-architecture event loop.
#[derive(Debug)]
pub enum AppEvent {
    /// Raw terminal input (keyboard/mouse).
    Input(crossterm::event::Event),
    /// A network job finished.
    Completed(Completion),
}

/// High-level actions resolved from global keybindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ShowHelp,
    CloseHelp,
    Quit,
}

/// What a view did with an input event.
#[derive(Debug, PartialEq)]
pub enum InputOutcome {
    /// Not handled; fall through to global keybindings.
    Ignored,
    Handled,
    /// Handled, and produced jobs for the app to run.
    Jobs(Vec<Job>),
}

impl InputOutcome {
    pub fn from_jobs(jobs: Vec<Job>) -> Self {
        if jobs.is_empty() {
            InputOutcome::Handled
        } else {
            InputOutcome::Jobs(jobs)
        }
    }
}

/// A timed notification shown in the overlay.
#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub level: NoticeLevel,
    /// Ticks remaining before auto-dismiss.
    pub ttl_ticks: u32,
}
