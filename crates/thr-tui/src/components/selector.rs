//! Selector bar: family tab strip, technology dropdown and search box.
//!
//! The bar only mirrors the shell's [`Selection`]; every choice is sent
//! back as an action and comes back as [`Action::SelectionChanged`].

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Position, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph},
};
use tui_input::{Input, InputRequest};

use thr_core::{FamilyId, Selection, Technology, TechnologyFamily};

use crate::action::Action;
use crate::component::Component;
use crate::theme;
use crate::widgets::family_tabs::family_tabs;

const SEARCH_PREFIX: &str = " Search: ";
const ALL_TECHNOLOGIES: &str = "All technologies";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SelectorMode {
    Idle,
    Searching,
    /// Dropdown open; row 0 is "All technologies".
    PickingTechnology { cursor: usize },
}

pub struct SelectorBar {
    families: Vec<TechnologyFamily>,
    technologies: Vec<Technology>,
    technologies_for: Option<FamilyId>,
    loading_technologies: bool,
    selection: Selection,
    search: Input,
    mode: SelectorMode,
}

impl SelectorBar {
    pub fn new() -> Self {
        Self {
            families: Vec::new(),
            technologies: Vec::new(),
            technologies_for: None,
            loading_technologies: false,
            selection: Selection::default(),
            search: Input::default(),
            mode: SelectorMode::Idle,
        }
    }

    /// Keys the bar reacts to while idle.
    pub fn handles(key: &KeyEvent) -> bool {
        key.modifiers.difference(KeyModifiers::SHIFT).is_empty()
            && matches!(
                key.code,
                KeyCode::Char('[' | ']' | 't' | '/') | KeyCode::Left | KeyCode::Right
            )
    }

    /// Technologies of the selected family, once they have arrived.
    fn visible_technologies(&self) -> &[Technology] {
        let current = self.selection.family().map(|f| &f.id);
        if current.is_some() && self.technologies_for.as_ref() == current {
            &self.technologies
        } else {
            &[]
        }
    }

    fn family_index(&self) -> Option<usize> {
        let selected = self.selection.family()?;
        self.families.iter().position(|f| f.id == selected.id)
    }

    fn cycle_family(&self, forward: bool) -> Option<Action> {
        if self.families.is_empty() {
            return None;
        }
        let len = self.families.len();
        let next = match self.family_index() {
            Some(i) if forward => (i + 1) % len,
            Some(i) => (i + len - 1) % len,
            None => 0,
        };
        self.families
            .get(next)
            .map(|f| Action::SelectFamily(f.id.clone()))
    }

    fn open_picker(&mut self) {
        let cursor = self
            .selection
            .technology()
            .and_then(|sel| {
                self.visible_technologies()
                    .iter()
                    .position(|t| t.id == sel.id)
            })
            .map_or(0, |i| i + 1);
        self.mode = SelectorMode::PickingTechnology { cursor };
    }

    fn handle_picker_key(&mut self, key: KeyEvent, cursor: usize) -> Option<Action> {
        let options = self.visible_technologies().len() + 1;
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.mode = SelectorMode::PickingTechnology {
                    cursor: (cursor + 1).min(options - 1),
                };
                None
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.mode = SelectorMode::PickingTechnology {
                    cursor: cursor.saturating_sub(1),
                };
                None
            }
            KeyCode::Enter => {
                self.mode = SelectorMode::Idle;
                let chosen = cursor
                    .checked_sub(1)
                    .and_then(|i| self.visible_technologies().get(i))
                    .map(|t| t.id.clone());
                Some(Action::SelectTechnology(chosen))
            }
            KeyCode::Esc | KeyCode::Char('t') => {
                self.mode = SelectorMode::Idle;
                None
            }
            _ => None,
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Option<Action> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let request = match key.code {
            KeyCode::Esc | KeyCode::Enter => {
                self.mode = SelectorMode::Idle;
                return None;
            }
            KeyCode::Char('u') if ctrl => InputRequest::DeleteLine,
            KeyCode::Char('w') if ctrl => InputRequest::DeletePrevWord,
            KeyCode::Char(c) if !ctrl && !key.modifiers.contains(KeyModifiers::ALT) => {
                InputRequest::InsertChar(c)
            }
            KeyCode::Backspace => InputRequest::DeletePrevChar,
            KeyCode::Delete => InputRequest::DeleteNextChar,
            KeyCode::Left => InputRequest::GoToPrevChar,
            KeyCode::Right => InputRequest::GoToNextChar,
            KeyCode::Home => InputRequest::GoToStart,
            KeyCode::End => InputRequest::GoToEnd,
            _ => return None,
        };
        let changed = self.search.handle(request).is_some_and(|s| s.value);
        changed.then(|| Action::SearchChanged(self.search.value().to_owned()))
    }

    fn technology_label(&self) -> String {
        self.selection
            .technology()
            .map_or_else(|| ALL_TECHNOLOGIES.to_owned(), |t| t.title.clone())
    }

    /// Dropdown list, drawn over whatever sits below the bar.
    pub fn render_popup(&self, frame: &mut Frame, bar: Rect, screen: Rect) {
        let SelectorMode::PickingTechnology { cursor } = self.mode else {
            return;
        };

        let techs = self.visible_technologies();
        let mut items = vec![ListItem::new(ALL_TECHNOLOGIES)];
        items.extend(techs.iter().map(|t| ListItem::new(t.title.clone())));

        let wanted = u16::try_from(items.len()).unwrap_or(u16::MAX).saturating_add(2);
        let height = wanted
            .min(14)
            .min(screen.height.saturating_sub(bar.bottom()));
        let width = 40u16.min(bar.width.saturating_sub(2));
        let popup = Rect::new(bar.x + 1, bar.bottom(), width, height);
        if popup.height < 3 {
            return;
        }

        frame.render_widget(Clear, popup);

        let title = if self.loading_technologies {
            " Technology (loading…) "
        } else {
            " Technology "
        };
        let list = List::new(items)
            .block(
                Block::default()
                    .title(title)
                    .title_style(theme::panel_title())
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(theme::focus_border())
                    .style(Style::default().bg(theme::BACKDROP)),
            )
            .style(theme::row())
            .highlight_style(theme::row_selected())
            .highlight_symbol("▸ ");

        let mut state = ListState::default().with_selected(Some(cursor));
        frame.render_stateful_widget(list, popup, &mut state);
    }
}

impl Component for SelectorBar {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let action = match self.mode {
            SelectorMode::Searching => self.handle_search_key(key),
            SelectorMode::PickingTechnology { cursor } => self.handle_picker_key(key, cursor),
            SelectorMode::Idle => match key.code {
                KeyCode::Char('[') | KeyCode::Left => self.cycle_family(false),
                KeyCode::Char(']') | KeyCode::Right => self.cycle_family(true),
                KeyCode::Char('t') => {
                    if self.selection.family().is_some() {
                        self.open_picker();
                    }
                    None
                }
                KeyCode::Char('/') => {
                    self.mode = SelectorMode::Searching;
                    None
                }
                _ => None,
            },
        };
        Ok(action)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::DirectoryUpdated(view) => {
                self.families.clone_from(&view.families);
                self.technologies.clone_from(&view.technologies);
                self.technologies_for.clone_from(&view.technologies_for);
                self.loading_technologies = view.loading_technologies;
            }
            Action::SelectionChanged(selection) => {
                self.selection = (**selection).clone();
                if self.search.value() != self.selection.search() {
                    self.search = Input::new(self.selection.search().to_owned());
                }
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" THR Controls ")
            .title_style(theme::panel_title())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if self.mode == SelectorMode::Idle {
                theme::idle_border()
            } else {
                theme::focus_border()
            });
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if inner.height < 2 {
            return;
        }
        let rows = Layout::vertical([Constraint::Length(1), Constraint::Length(1)]).split(inner);

        // ── Family tabs ─────────────────────────────────────────
        let labels: Vec<&str> = self.families.iter().map(|f| f.title.as_str()).collect();
        let mut tabs = vec![Span::styled(" Family: ", theme::hint())];
        if labels.is_empty() {
            tabs.push(Span::styled("—", theme::hint()));
        } else {
            tabs.extend(family_tabs(&labels, self.family_index()).spans);
        }
        frame.render_widget(Paragraph::new(Line::from(tabs)), rows[0]);

        // ── Technology + search ─────────────────────────────────
        let cols = Layout::horizontal([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(rows[1]);

        let picking = matches!(self.mode, SelectorMode::PickingTechnology { .. });
        let tech_line = Line::from(vec![
            Span::styled(" Technology: ", theme::hint()),
            Span::styled(
                self.technology_label(),
                if picking {
                    theme::family_active()
                } else {
                    Style::default().fg(theme::INFO)
                },
            ),
            Span::styled(" ▾", theme::hint()),
        ]);
        frame.render_widget(Paragraph::new(tech_line), cols[0]);

        let searching = self.mode == SelectorMode::Searching;
        let value = self.search.value();
        let search_line = Line::from(vec![
            Span::styled(SEARCH_PREFIX, theme::hint()),
            if value.is_empty() && !searching {
                Span::styled("press / to search", theme::hint())
            } else {
                Span::styled(value, Style::default().fg(theme::INFO))
            },
        ]);
        frame.render_widget(Paragraph::new(search_line), cols[1]);

        if searching {
            let prefix = u16::try_from(SEARCH_PREFIX.len()).unwrap_or(0);
            let offset = u16::try_from(self.search.visual_cursor()).unwrap_or(u16::MAX);
            let x = cols[1]
                .x
                .saturating_add(prefix)
                .saturating_add(offset)
                .min(cols[1].right().saturating_sub(1));
            frame.set_cursor_position(Position::new(x, cols[1].y));
        }
    }

    fn captures_input(&self) -> bool {
        self.mode != SelectorMode::Idle
    }
}
