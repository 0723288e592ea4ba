//! Controls table with an expandable detail panel and an inline form.
//!
//! The table is either browsing rows or showing the edit form, never
//! both. At most one row is expanded at a time.

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
};

use thr_core::{Control, ControlForm, ControlId, ControlsView, SortColumn};

use crate::action::{Action, ConfirmAction};
use crate::component::Component;
use crate::components::control_form::{ControlFormPanel, FormEvent};
use crate::theme;


pub enum TableMode {
    Browsing,
    Editing(Box<ControlFormPanel>),
}

pub struct ControlsTable {
    focused: bool,
    view: ControlsView,
    table_state: TableState,
    expanded: Option<ControlId>,
    mode: TableMode,
}

impl ControlsTable {
    pub fn new() -> Self {
        Self {
            focused: true,
            view: ControlsView::default(),
            table_state: TableState::default(),
            expanded: None,
            mode: TableMode::Browsing,
        }
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.mode, TableMode::Editing(_))
    }

    #[cfg(test)]
    pub fn expanded(&self) -> Option<&ControlId> {
        self.expanded.as_ref()
    }

    fn controls(&self) -> &[Control] {
        &self.view.controls
    }

    fn selected_index(&self) -> usize {
        self.table_state.selected().unwrap_or(0)
    }

    fn select(&mut self, idx: usize) {
        let clamped = if self.controls().is_empty() {
            0
        } else {
            idx.min(self.controls().len() - 1)
        };
        self.table_state.select(Some(clamped));
    }

    fn move_selection(&mut self, delta: isize) {
        if self.controls().is_empty() {
            return;
        }
        let next = self.selected_index().saturating_add_signed(delta);
        self.select(next);
    }

    fn selected_control(&self) -> Option<&Control> {
        self.controls().get(self.selected_index())
    }

    fn expanded_control(&self) -> Option<&Control> {
        let id = self.expanded.as_ref()?;
        self.controls().iter().find(|c| &c.id == id)
    }

    fn toggle_expanded(&mut self) {
        let Some(id) = self.selected_control().map(|c| c.id.clone()) else {
            return;
        };
        if self.expanded.as_ref() == Some(&id) {
            self.expanded = None;
        } else {
            self.expanded = Some(id);
        }
    }

    fn open_form(&mut self, form: ControlForm) {
        self.mode = TableMode::Editing(Box::new(ControlFormPanel::new(form)));
    }

    fn handle_browsing_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Char('g') | KeyCode::Home => self.select(0),
            KeyCode::Char('G') | KeyCode::End => self.select(usize::MAX),
            KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.move_selection(10);
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.move_selection(-10);
            }
            KeyCode::Char(' ') => self.toggle_expanded(),
            KeyCode::Esc if self.expanded.is_some() => self.expanded = None,
            KeyCode::Enter | KeyCode::Char('e') => {
                if let Some(control) = self.selected_control() {
                    let form = ControlForm::edit(control);
                    self.open_form(form);
                }
            }
            KeyCode::Char('n') => return Some(Action::NewControl),
            KeyCode::Char('d') => {
                return self.selected_control().map(|c| {
                    Action::ShowConfirm(ConfirmAction::DeleteControl { id: c.id.clone() })
                });
            }
            KeyCode::Char('r') => return Some(Action::Refresh),
            KeyCode::Char(c @ '1'..='5') => {
                let idx = usize::from(u8::try_from(c).unwrap_or(b'1') - b'1');
                return SortColumn::ALL.get(idx).map(|col| Action::SortBy(*col));
            }
            _ => {}
        }
        None
    }

    // ── Rendering ───────────────────────────────────────────────

    fn header_cell(&self, key: usize, column: SortColumn) -> Cell<'static> {
        let arrow = self
            .view
            .context
            .sort
            .filter(|s| s.column == column)
            .map_or("", |s| s.direction.arrow());
        Cell::from(format!("{key} {}{arrow}", column.label())).style(theme::column_header())
    }

    fn render_table(&self, frame: &mut Frame, area: Rect) {
        let layout = Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).split(area);

        let header = Row::new(vec![
            self.header_cell(1, SortColumn::Id),
            Cell::from("Technology").style(theme::column_header()),
            Cell::from("Rank").style(theme::column_header()),
            self.header_cell(2, SortColumn::ControlFamily),
            self.header_cell(3, SortColumn::ControlType),
            self.header_cell(4, SortColumn::Statement),
            self.header_cell(5, SortColumn::ThrCode),
        ]);

        let selected_idx = self.selected_index();
        let rows: Vec<Row> = self
            .controls()
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let is_selected = i == selected_idx;
                let is_expanded = self.expanded.as_ref() == Some(&c.id);
                let prefix = if is_expanded { "▾" } else { "▸" };
                let technology = c
                    .technology_title
                    .clone()
                    .unwrap_or_else(|| c.tech_id.to_string());
                let ranking = c.ranking.map_or_else(|| "—".into(), |r| r.to_string());
                let thr_code = c.thr_code.lines().next().unwrap_or("").to_owned();

                Row::new(vec![
                    Cell::from(format!("{prefix} {}", c.id)).style(
                        Style::default()
                            .fg(theme::INFO)
                            .add_modifier(if is_selected {
                                Modifier::BOLD
                            } else {
                                Modifier::empty()
                            }),
                    ),
                    Cell::from(technology),
                    Cell::from(ranking),
                    Cell::from(c.control_family.clone()),
                    Cell::from(c.control_type.clone()),
                    Cell::from(c.statement.replace('\n', " ")),
                    Cell::from(thr_code).style(Style::default().fg(theme::CODE)),
                ])
                .style(if is_selected {
                    theme::row_selected()
                } else {
                    theme::row()
                })
            })
            .collect();

        let widths = [
            Constraint::Length(18),
            Constraint::Length(16),
            Constraint::Length(5),
            Constraint::Length(18),
            Constraint::Length(16),
            Constraint::Min(20),
            Constraint::Length(22),
        ];

        if rows.is_empty() {
            let text = if self.view.loading {
                "  Loading controls…"
            } else {
                "  No controls match the current selection"
            };
            frame.render_widget(
                Paragraph::new(Span::styled(text, theme::hint())),
                layout[0],
            );
        } else {
            let table = Table::new(rows, widths)
                .header(header)
                .row_highlight_style(theme::row_selected());
            let mut state = self.table_state;
            frame.render_stateful_widget(table, layout[0], &mut state);
        }

        let hints = Line::from(vec![
            Span::styled("  j/k ", theme::hint_key()),
            Span::styled("move  ", theme::hint()),
            Span::styled("Space ", theme::hint_key()),
            Span::styled("expand  ", theme::hint()),
            Span::styled("Enter/e ", theme::hint_key()),
            Span::styled("edit  ", theme::hint()),
            Span::styled("n ", theme::hint_key()),
            Span::styled("new  ", theme::hint()),
            Span::styled("d ", theme::hint_key()),
            Span::styled("delete  ", theme::hint()),
            Span::styled("1-5 ", theme::hint_key()),
            Span::styled("sort  ", theme::hint()),
            Span::styled("r ", theme::hint_key()),
            Span::styled("refresh", theme::hint()),
        ]);
        frame.render_widget(Paragraph::new(hints), layout[1]);
    }

    #[allow(clippy::unused_self)]
    fn render_detail(&self, frame: &mut Frame, area: Rect, control: &Control) {
        let block = Block::default()
            .title(format!(" {} ", control.id))
            .title_style(theme::panel_title())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::focus_border());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let label = Style::default().fg(theme::MUTED);
        let value = Style::default().fg(theme::TEXT);
        let when = |t: Option<chrono::DateTime<chrono::Utc>>| {
            t.map_or_else(|| "—".into(), |t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        };
        let field = |name: &str, text: String| {
            Line::from(vec![
                Span::styled(format!("{name:<16}"), label),
                Span::styled(text, value),
            ])
        };

        let mut lines = vec![
            field(
                "Technology",
                format!(
                    "{} ({})",
                    control.technology_title.as_deref().unwrap_or("?"),
                    control.tech_id
                ),
            ),
            field(
                "Ranking",
                control.ranking.map_or_else(|| "—".into(), |r| r.to_string()),
            ),
            field(
                "Monitor ID",
                control.monitor_id.clone().unwrap_or_else(|| "—".into()),
            ),
            field("Description", control.description.clone()),
            field("Statement", control.statement.clone()),
            field("Recommendation", control.recommendation.clone()),
            field(
                "Comments",
                control.comments.clone().unwrap_or_else(|| "—".into()),
            ),
            field("Created", when(control.created_at)),
            field("Updated", when(control.updated_at)),
            Line::from(""),
            Line::from(Span::styled("THR code", label)),
        ];
        lines.extend(
            control
                .thr_code
                .lines()
                .map(|l| Line::from(Span::styled(format!("  {l}"), Style::default().fg(theme::CODE)))),
        );

        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
    }
}

impl Component for ControlsTable {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if let TableMode::Editing(panel) = &mut self.mode {
            return Ok(match panel.handle_key(key) {
                FormEvent::None => None,
                FormEvent::Cancel => {
                    self.mode = TableMode::Browsing;
                    None
                }
                FormEvent::Save(control) => Some(Action::SaveControl(control)),
            });
        }
        Ok(self.handle_browsing_key(key))
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::ControlsUpdated(view) => {
                self.view = (**view).clone();
                self.select(self.selected_index());
                if self.expanded_control().is_none() {
                    self.expanded = None;
                }
            }
            Action::OpenForm(form) => self.open_form((**form).clone()),
            Action::ControlSaved { .. } => self.mode = TableMode::Browsing,
            Action::ControlSaveFailed => {
                if let TableMode::Editing(panel) = &mut self.mode {
                    panel.save_failed();
                }
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        if let TableMode::Editing(panel) = &self.mode {
            panel.render(frame, area);
            return;
        }

        let count = self.controls().len();
        let block = Block::default()
            .title(format!(" Controls ({count}) "))
            .title_style(theme::panel_title())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if self.focused {
                theme::focus_border()
            } else {
                theme::idle_border()
            });
        let inner = block.inner(area);
        frame.render_widget(block, area);

        match self.expanded_control() {
            Some(control) => {
                let chunks =
                    Layout::vertical([Constraint::Percentage(50), Constraint::Percentage(50)])
                        .split(inner);
                self.render_table(frame, chunks[0]);
                self.render_detail(frame, chunks[1], control);
            }
            None => self.render_table(frame, inner),
        }
    }

    fn captures_input(&self) -> bool {
        self.is_editing()
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use thr_core::{FormField, SaveOutcome, TechnologyId};

    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn control(id: &str, ranking: i32) -> Control {
        Control {
            id: ControlId::from(id),
            tech_id: TechnologyId::from("windows-11"),
            family_id: None,
            technology_title: Some("Windows 11".into()),
            family_title: None,
            control_family: "Access Control".into(),
            control_type: "Technical".into(),
            ranking: Some(ranking),
            monitor_id: None,
            description: format!("{id} description"),
            statement: format!("{id} statement"),
            recommendation: "Apply the setting".into(),
            thr_code: "setting: true".into(),
            comments: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn table_with(ids: &[&str]) -> ControlsTable {
        let mut table = ControlsTable::new();
        let controls = ids
            .iter()
            .zip(1..)
            .map(|(id, rank)| control(id, rank))
            .collect();
        table
            .update(&Action::ControlsUpdated(Box::new(ControlsView {
                controls,
                ..ControlsView::default()
            })))
            .unwrap();
        table
    }

    #[test]
    fn space_expands_at_most_one_row() {
        let mut table = table_with(&["OS-WIN-001", "OS-WIN-002"]);
        table.handle_key_event(key(KeyCode::Char(' '))).unwrap();
        assert_eq!(table.expanded().map(ControlId::as_str), Some("OS-WIN-001"));

        table.handle_key_event(key(KeyCode::Char('j'))).unwrap();
        table.handle_key_event(key(KeyCode::Char(' '))).unwrap();
        assert_eq!(table.expanded().map(ControlId::as_str), Some("OS-WIN-002"));

        table.handle_key_event(key(KeyCode::Char(' '))).unwrap();
        assert_eq!(table.expanded(), None);
    }

    #[test]
    fn expanded_row_collapses_when_it_leaves_the_list() {
        let mut table = table_with(&["OS-WIN-001", "OS-WIN-002"]);
        table.handle_key_event(key(KeyCode::Char(' '))).unwrap();

        table
            .update(&Action::ControlsUpdated(Box::new(ControlsView {
                controls: vec![control("OS-WIN-002", 1)],
                ..ControlsView::default()
            })))
            .unwrap();
        assert_eq!(table.expanded(), None);
    }

    #[test]
    fn selection_is_clamped_to_rows() {
        let mut table = table_with(&["A", "B", "C"]);
        for _ in 0..5 {
            table.handle_key_event(key(KeyCode::Down)).unwrap();
        }
        assert_eq!(table.selected_index(), 2);
        table.handle_key_event(key(KeyCode::Char('g'))).unwrap();
        assert_eq!(table.selected_index(), 0);
        table.handle_key_event(key(KeyCode::Up)).unwrap();
        assert_eq!(table.selected_index(), 0);
    }

    #[test]
    fn enter_opens_edit_form_and_esc_returns_to_browsing() {
        let mut table = table_with(&["OS-WIN-001"]);
        table.handle_key_event(key(KeyCode::Enter)).unwrap();
        assert!(table.is_editing());
        assert!(table.captures_input());

        // Table keys go to the form while editing
        let action = table.handle_key_event(key(KeyCode::Char('n'))).unwrap();
        assert!(action.is_none());

        table.handle_key_event(key(KeyCode::Esc)).unwrap();
        assert!(!table.is_editing());
    }

    #[test]
    fn form_save_round_trip() {
        let mut table = table_with(&["OS-WIN-001"]);
        table.handle_key_event(key(KeyCode::Char('e'))).unwrap();

        let action = table
            .handle_key_event(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL))
            .unwrap();
        let Some(Action::SaveControl(saved)) = action else {
            panic!("expected SaveControl");
        };
        assert_eq!(saved.id.as_str(), "OS-WIN-001");

        table.update(&Action::ControlSaveFailed).unwrap();
        let TableMode::Editing(panel) = &table.mode else {
            panic!("form should stay open");
        };
        assert!(panel.form().banner().is_some());
        assert_eq!(panel.form().value(FormField::Id), "OS-WIN-001");

        table
            .update(&Action::ControlSaved {
                id: ControlId::from("OS-WIN-001"),
                outcome: SaveOutcome::Updated,
            })
            .unwrap();
        assert!(!table.is_editing());
    }

    #[test]
    fn browsing_keys_map_to_actions() {
        let mut table = table_with(&["OS-WIN-001"]);

        let action = table.handle_key_event(key(KeyCode::Char('n'))).unwrap();
        assert!(matches!(action, Some(Action::NewControl)));

        let action = table.handle_key_event(key(KeyCode::Char('d'))).unwrap();
        assert!(matches!(
            action,
            Some(Action::ShowConfirm(ConfirmAction::DeleteControl { id })) if id.as_str() == "OS-WIN-001"
        ));

        let action = table.handle_key_event(key(KeyCode::Char('3'))).unwrap();
        assert!(matches!(action, Some(Action::SortBy(SortColumn::ControlType))));

        let action = table.handle_key_event(key(KeyCode::Char('r'))).unwrap();
        assert!(matches!(action, Some(Action::Refresh)));
    }

    #[test]
    fn delete_on_empty_table_does_nothing() {
        let mut table = table_with(&[]);
        let action = table.handle_key_event(key(KeyCode::Char('d'))).unwrap();
        assert!(action.is_none());
        table.handle_key_event(key(KeyCode::Enter)).unwrap();
        assert!(!table.is_editing());
    }

    #[test]
    fn open_form_action_switches_to_editing() {
        let mut table = table_with(&[]);
        let form = ControlForm::create(Some(&TechnologyId::from("windows-11"))).unwrap();
        table.update(&Action::OpenForm(Box::new(form))).unwrap();
        assert!(table.is_editing());
    }
}
