//! Colors and named styles. Components never build a `Color` themselves.

use ratatui::style::{Color, Modifier, Style};

pub const ACCENT: Color = Color::Rgb(97, 175, 239); // #61afef
pub const INFO: Color = Color::Rgb(86, 182, 194); // #56b6c2
pub const AMBER: Color = Color::Rgb(229, 192, 123); // #e5c07b
/// THR code snippets.
pub const CODE: Color = Color::Rgb(198, 120, 221); // #c678dd
pub const OK: Color = Color::Rgb(152, 195, 121); // #98c379
pub const ERR: Color = Color::Rgb(224, 108, 117); // #e06c75

pub const TEXT: Color = Color::Rgb(171, 178, 191); // #abb2bf
pub const MUTED: Color = Color::Rgb(92, 99, 112); // #5c6370
pub const SURFACE: Color = Color::Rgb(44, 49, 58); // #2c313a
pub const BACKDROP: Color = Color::Rgb(33, 37, 43); // #21252b

pub fn panel_title() -> Style {
    Style::default().fg(INFO).add_modifier(Modifier::BOLD)
}

pub fn focus_border() -> Style {
    Style::default().fg(ACCENT)
}

pub fn idle_border() -> Style {
    Style::default().fg(MUTED)
}

/// Sortable column headers; the active one also carries an arrow.
pub fn column_header() -> Style {
    Style::default()
        .fg(INFO)
        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
}

pub fn row() -> Style {
    Style::default().fg(TEXT)
}

pub fn row_selected() -> Style {
    Style::default()
        .fg(ACCENT)
        .bg(SURFACE)
        .add_modifier(Modifier::BOLD)
}

pub fn family_active() -> Style {
    Style::default()
        .fg(ACCENT)
        .add_modifier(Modifier::BOLD | Modifier::REVERSED)
}

pub fn family_idle() -> Style {
    Style::default().fg(TEXT)
}

pub fn hint() -> Style {
    Style::default().fg(MUTED)
}

pub fn hint_key() -> Style {
    Style::default().fg(INFO).add_modifier(Modifier::BOLD)
}

/// Fetch failures, field errors, the save banner.
pub fn error() -> Style {
    Style::default().fg(ERR)
}

/// THR code that is not valid YAML.
pub fn warning() -> Style {
    Style::default().fg(AMBER)
}
