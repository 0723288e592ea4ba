//! Full-record create/edit form for one control.
//!
//! Values and validation live in [`ControlForm`]; this panel owns focus,
//! the text cursor of the focused field, and the in-flight save flag.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Position, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};
use tui_input::{Input, InputRequest};

use thr_core::{Control, ControlForm, FormField};

use crate::theme;

/// What a key press asks of the owner.
#[derive(Debug, PartialEq)]
pub enum FormEvent {
    None,
    Cancel,
    /// Validation passed; persist this control.
    Save(Box<Control>),
}

pub struct ControlFormPanel {
    form: ControlForm,
    focus: FormField,
    input: Input,
    saving: bool,
}

impl ControlFormPanel {
    pub fn new(form: ControlForm) -> Self {
        let focus = if form.is_new() {
            FormField::Id
        } else {
            FormField::ControlFamily
        };
        let input = Input::new(form.value(focus).to_owned());
        Self {
            form,
            focus,
            input,
            saving: false,
        }
    }

    #[cfg(test)]
    pub fn form(&self) -> &ControlForm {
        &self.form
    }

    #[cfg(test)]
    pub fn focus(&self) -> FormField {
        self.focus
    }

    #[cfg(test)]
    pub fn is_saving(&self) -> bool {
        self.saving
    }

    /// The store rejected the save: show the banner, keep every value.
    pub fn save_failed(&mut self) {
        self.saving = false;
        self.form.record_failure();
    }

    fn move_focus(&mut self, field: FormField) {
        self.focus = field;
        self.input = Input::new(self.form.value(field).to_owned());
    }

    fn edit(&mut self, request: InputRequest) {
        if self.form.is_read_only(self.focus) {
            return;
        }
        if self.input.handle(request).is_some_and(|s| s.value) {
            self.form.set_value(self.focus, self.input.value());
        }
    }

    fn submit(&mut self) -> FormEvent {
        if let Some(control) = self.form.prepare() {
            self.saving = true;
            return FormEvent::Save(Box::new(control));
        }
        if let Some(first) = self.form.errors().keys().next().copied() {
            self.move_focus(first);
        }
        FormEvent::None
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormEvent {
        if self.saving {
            return FormEvent::None;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        match key.code {
            KeyCode::Esc => return FormEvent::Cancel,
            KeyCode::Char('s') if ctrl => return self.submit(),
            KeyCode::Tab | KeyCode::Down => self.move_focus(self.focus.next()),
            KeyCode::BackTab | KeyCode::Up => self.move_focus(self.focus.prev()),
            KeyCode::Enter if self.focus.multiline() => self.edit(InputRequest::InsertChar('\n')),
            KeyCode::Enter => self.move_focus(self.focus.next()),
            KeyCode::Char('u') if ctrl => self.edit(InputRequest::DeleteLine),
            KeyCode::Char('w') if ctrl => self.edit(InputRequest::DeletePrevWord),
            KeyCode::Char(c) if !ctrl && !alt => self.edit(InputRequest::InsertChar(c)),
            KeyCode::Backspace => self.edit(InputRequest::DeletePrevChar),
            KeyCode::Delete => self.edit(InputRequest::DeleteNextChar),
            KeyCode::Left => self.edit(InputRequest::GoToPrevChar),
            KeyCode::Right => self.edit(InputRequest::GoToNextChar),
            KeyCode::Home => self.edit(InputRequest::GoToStart),
            KeyCode::End => self.edit(InputRequest::GoToEnd),
            _ => {}
        }
        FormEvent::None
    }

    // ── Rendering ───────────────────────────────────────────────

    fn title(&self) -> String {
        if self.form.is_new() {
            format!(" New control · {} ", self.form.technology_id())
        } else {
            format!(" Edit control {} ", self.form.value(FormField::Id))
        }
    }

    fn render_field_list(&self, frame: &mut Frame, area: Rect) {
        let label_style = Style::default().fg(theme::TEXT);
        let focused_label = Style::default()
            .fg(theme::AMBER)
            .add_modifier(Modifier::BOLD);
        let preview_width = usize::from(area.width.saturating_sub(20)).max(4);

        let lines: Vec<Line> = FormField::ALL
            .iter()
            .map(|&field| {
                let focused = field == self.focus;
                let style = if focused { focused_label } else { label_style };
                let marker = if focused { "▸ " } else { "  " };
                let required = if field.required() { "*" } else { " " };
                let first_line = self.form.value(field).lines().next().unwrap_or("");
                let preview: String = first_line.chars().take(preview_width).collect();

                let mut spans = vec![
                    Span::styled(marker, style),
                    Span::styled(format!("{:<15}", field.label()), style),
                    Span::styled(required, theme::warning()),
                    Span::styled(" ", style),
                ];
                if self.form.error(field).is_some() {
                    spans.push(Span::styled("✗ ", theme::error()));
                }
                spans.push(Span::styled(preview, Style::default().fg(theme::INFO)));
                Line::from(spans)
            })
            .collect();

        frame.render_widget(Paragraph::new(lines), area);
    }

    fn render_editor(&self, frame: &mut Frame, area: Rect) {
        let layout = Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).split(area);

        let read_only = self.form.is_read_only(self.focus);
        let title = if read_only {
            format!(" {} (read-only) ", self.focus.label())
        } else {
            format!(" {} ", self.focus.label())
        };
        let block = Block::default()
            .title(title)
            .title_style(theme::panel_title())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if read_only {
                theme::idle_border()
            } else {
                theme::focus_border()
            });
        let inner = block.inner(layout[0]);
        frame.render_widget(block, layout[0]);

        // Cursor row/column inside the (possibly multi-line) value
        let value = self.input.value();
        let before: String = value.chars().take(self.input.cursor()).collect();
        let row = before.matches('\n').count();
        let col = before.rsplit('\n').next().map_or(0, |s| s.chars().count());
        let visible_rows = usize::from(inner.height.max(1));
        let scroll = row.saturating_sub(visible_rows - 1);

        let lines: Vec<Line> = value
            .split('\n')
            .map(|l| Line::from(Span::styled(l.to_owned(), Style::default().fg(theme::INFO))))
            .collect();
        frame.render_widget(
            Paragraph::new(lines).scroll((u16::try_from(scroll).unwrap_or(0), 0)),
            inner,
        );

        if !read_only && !self.saving && inner.width > 0 && inner.height > 0 {
            let x = inner
                .x
                .saturating_add(u16::try_from(col).unwrap_or(u16::MAX))
                .min(inner.right().saturating_sub(1));
            let y = inner
                .y
                .saturating_add(u16::try_from(row - scroll).unwrap_or(0))
                .min(inner.bottom().saturating_sub(1));
            frame.set_cursor_position(Position::new(x, y));
        }

        if let Some(error) = self.form.error(self.focus) {
            frame.render_widget(
                Paragraph::new(Span::styled(format!(" {error}"), theme::error())),
                layout[1],
            );
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        frame.render_widget(Clear, area);

        let block = Block::default()
            .title(self.title())
            .title_style(
                Style::default()
                    .fg(theme::AMBER)
                    .add_modifier(Modifier::BOLD),
            )
            .borders(Borders::ALL)
            .border_type(BorderType::Double)
            .border_style(Style::default().fg(theme::ACCENT));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let layout = Layout::vertical([
            Constraint::Min(3),    // fields + editor
            Constraint::Length(1), // banner / saving
            Constraint::Length(1), // THR code warning
            Constraint::Length(1), // hints
        ])
        .split(inner);

        let body = Layout::horizontal([Constraint::Length(42), Constraint::Min(20)]).split(layout[0]);
        self.render_field_list(frame, body[0]);
        self.render_editor(frame, body[1]);

        if self.saving {
            frame.render_widget(
                Paragraph::new(Span::styled(" Saving…", theme::warning())),
                layout[1],
            );
        } else if let Some(banner) = self.form.banner() {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    format!(" {banner}"),
                    theme::error().add_modifier(Modifier::BOLD),
                )),
                layout[1],
            );
        } else if !self.form.errors().is_empty() {
            let count = self.form.errors().len();
            frame.render_widget(
                Paragraph::new(Span::styled(
                    format!(" {count} field(s) need attention"),
                    theme::error(),
                )),
                layout[1],
            );
        }

        if let Some(warning) = self.form.thr_code_warning() {
            frame.render_widget(
                Paragraph::new(Span::styled(format!(" ! {warning}"), theme::warning())),
                layout[2],
            );
        }

        let hints = Line::from(vec![
            Span::styled(" Tab", theme::hint_key()),
            Span::styled(" next  ", theme::hint()),
            Span::styled("S-Tab", theme::hint_key()),
            Span::styled(" prev  ", theme::hint()),
            Span::styled("Enter", theme::hint_key()),
            Span::styled(" newline/next  ", theme::hint()),
            Span::styled("Ctrl+S", theme::hint_key()),
            Span::styled(" save  ", theme::hint()),
            Span::styled("Esc", theme::hint_key()),
            Span::styled(" cancel", theme::hint()),
        ]);
        frame.render_widget(Paragraph::new(hints), layout[3]);
    }
}
