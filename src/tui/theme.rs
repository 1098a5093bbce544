//! Colors and styles for the readlog views.
//!
//! Truecolor RGB throughout. Views build their spans from the helpers below
//! rather than from `Color::*` literals, so a card, a badge or a rating looks
//! the same on every screen.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, BorderType, Borders};

use crate::core::models::ReadingStatus;

// ── Palette ─────────────────────────────────────────────────────────────────

/// Teal for headings and the focused panel.
pub const PRIMARY: Color = Color::Rgb(0x1E, 0x7A, 0x7A);
/// Lighter teal for focused labels and the busy indicator.
pub const PRIMARY_LIGHT: Color = Color::Rgb(0x3F, 0xA7, 0x9C);
/// Coral for the cursor, modal borders and the app badge.
pub const ACCENT: Color = Color::Rgb(0xF2, 0x80, 0x5A);
/// Dark ink behind badges.
pub const INK: Color = Color::Rgb(0x0B, 0x17, 0x18);

pub const TEXT: Color = Color::Rgb(0xE4, 0xE2, 0xDC);
pub const TEXT_MUTED: Color = Color::Rgb(0x8A, 0x88, 0x82);
pub const TEXT_DIM: Color = Color::Rgb(0x55, 0x55, 0x52);

pub const ERROR: Color = Color::Rgb(0xE5, 0x57, 0x4F);
pub const SUCCESS: Color = Color::Rgb(0x6C, 0xB8, 0x6E);
pub const WARNING: Color = Color::Rgb(0xF5, 0xA6, 0x2E);

/// Queued books ("Want to Read").
pub const QUEUED: Color = Color::Rgb(0x55, 0x9C, 0xE8);
pub const STAR: Color = Color::Rgb(0xF7, 0xC1, 0x1C);

// ── Book styles ─────────────────────────────────────────────────────────────

/// Color of the status label on a card or in the entry form.
pub fn status(status: Option<ReadingStatus>) -> Style {
    let color = match status {
        Some(ReadingStatus::WantToRead) => QUEUED,
        Some(ReadingStatus::Reading) => PRIMARY_LIGHT,
        Some(ReadingStatus::Finished) => SUCCESS,
        Some(ReadingStatus::DidNotFinish) => TEXT_MUTED,
        None => TEXT_DIM,
    };
    Style::default().fg(color)
}

pub fn stars() -> Style {
    Style::default().fg(STAR).add_modifier(Modifier::BOLD)
}

/// Title of the card or search hit under the cursor.
pub fn selected() -> Style {
    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
}

// ── Text ────────────────────────────────────────────────────────────────────

pub fn text() -> Style {
    Style::default().fg(TEXT)
}

pub fn heading() -> Style {
    Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD)
}

/// Field or search-bar label; lit while its input has focus.
pub fn label(focused: bool) -> Style {
    if focused {
        Style::default().fg(PRIMARY_LIGHT).add_modifier(Modifier::BOLD)
    } else {
        muted()
    }
}

pub fn muted() -> Style {
    Style::default().fg(TEXT_MUTED)
}

/// Placeholders and faint hints.
pub fn dim() -> Style {
    Style::default().fg(TEXT_DIM)
}

/// Key names in footers and the status bar.
pub fn hint() -> Style {
    Style::default().fg(TEXT_DIM)
}

pub fn error() -> Style {
    Style::default().fg(ERROR).add_modifier(Modifier::BOLD)
}

/// The delete confirmation question.
pub fn warning() -> Style {
    Style::default().fg(WARNING).add_modifier(Modifier::BOLD)
}

// ── Badges and panels ───────────────────────────────────────────────────────

pub fn brand() -> Style {
    Style::default().fg(INK).bg(ACCENT).add_modifier(Modifier::BOLD)
}

/// Active status chip, or the search-mode marker in the status bar.
pub fn badge() -> Style {
    Style::default()
        .fg(INK)
        .bg(PRIMARY_LIGHT)
        .add_modifier(Modifier::BOLD)
}

/// Rounded panel whose border lights up while it holds focus.
pub fn panel(title: &str, focused: bool) -> Block<'_> {
    let border = if focused { PRIMARY } else { TEXT_DIM };
    Block::default()
        .title(format!(" {title} "))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_status_has_its_own_color() {
        let all = [
            Some(ReadingStatus::WantToRead),
            Some(ReadingStatus::Reading),
            Some(ReadingStatus::Finished),
            Some(ReadingStatus::DidNotFinish),
            None,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(status(*a), status(*b), "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn test_label_lights_up_on_focus() {
        assert_ne!(label(true), label(false));
        assert_eq!(label(false), muted());
    }

    #[test]
    fn test_panel_border_follows_focus() {
        assert_ne!(panel("My Library", true), panel("My Library", false));
    }
}
