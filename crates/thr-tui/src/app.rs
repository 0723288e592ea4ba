//! Application core — event loop, selection state, action dispatch.
//!
//! The shell owns the [`Selection`] and [`SortState`]. Whenever either
//! changes, `selection.filter_context(sort)` is handed to the controls
//! service on a spawned task; results come back through the data bridge.

use std::time::{Duration, Instant};

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};
use throbber_widgets_tui::{Throbber, ThrobberState};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use thr_core::{
    ControlForm, ControlsView, CoreError, DirectoryView, FamilyId, Registry, SaveOutcome,
    Selection, SelectionChange, SortState,
};

use crate::action::{Action, ConfirmAction, Notification, NotificationLevel};
use crate::component::Component;
use crate::components::controls_table::ControlsTable;
use crate::components::selector::SelectorBar;
use crate::event::{Event, EventReader};
use crate::theme;
use crate::tui::Tui;

const NOTIFICATION_TTL: Duration = Duration::from_secs(3);

pub struct App {
    registry: Registry,
    selection: Selection,
    sort: SortState,
    /// Latest snapshots, kept for lookups and the status bar.
    directory: DirectoryView,
    controls: ControlsView,
    selector: SelectorBar,
    table: ControlsTable,
    running: bool,
    help_visible: bool,
    /// A save is in flight.
    saving: bool,
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,
    data_cancel: CancellationToken,
    /// Pending confirmation dialog (blocks other input while active).
    pending_confirm: Option<ConfirmAction>,
    notification: Option<(Notification, Instant)>,
    throbber: ThrobberState,
}

impl App {
    pub fn new(registry: Registry) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        Self {
            registry,
            selection: Selection::default(),
            sort: SortState::default(),
            directory: DirectoryView::default(),
            controls: ControlsView::default(),
            selector: SelectorBar::new(),
            table: ControlsTable::new(),
            running: true,
            help_visible: false,
            saving: false,
            action_tx,
            action_rx,
            data_cancel: CancellationToken::new(),
            pending_confirm: None,
            notification: None,
            throbber: ThrobberState::default(),
        }
    }

    /// Run the main event loop.
    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::start()?;

        let registry = self.registry.clone();
        let cancel = self.data_cancel.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            crate::data_bridge::spawn_data_bridge(registry, tx, cancel).await;
        });

        let mut events = EventReader::new(
            Duration::from_millis(250), // 4 Hz tick
            Duration::from_millis(33),  // ~30 FPS render
        );

        info!("TUI event loop started");

        while self.running {
            let Some(event) = events.next().await else {
                break;
            };

            match event {
                Event::Key(key) => {
                    if let Some(action) = self.handle_key_event(key)? {
                        self.action_tx.send(action)?;
                    }
                    self.table.set_focused(!self.selector.captures_input());
                }
                Event::Resize(w, h) => self.action_tx.send(Action::Resize(w, h))?,
                Event::Tick => self.action_tx.send(Action::Tick)?,
                Event::Render => self.action_tx.send(Action::Render)?,
            }

            while let Ok(action) = self.action_rx.try_recv() {
                self.process_action(&action)?;

                if let Action::Render = action {
                    tui.draw(|frame| self.render(frame))?;
                }
            }
        }

        self.data_cancel.cancel();
        events.stop();
        info!("TUI event loop ended");
        Ok(())
    }

    /// Map a key event to an action. Overlays and text entry see keys
    /// first; everything else goes to the selector or the table.
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            return Ok(Some(Action::Quit));
        }

        if self.pending_confirm.is_some() {
            return match key.code {
                KeyCode::Char('y' | 'Y') => Ok(Some(Action::ConfirmYes)),
                KeyCode::Char('n' | 'N') | KeyCode::Esc => Ok(Some(Action::ConfirmNo)),
                _ => Ok(None),
            };
        }

        if self.help_visible {
            return match key.code {
                KeyCode::Esc | KeyCode::Char('?') => Ok(Some(Action::ToggleHelp)),
                _ => Ok(None),
            };
        }

        if self.table.captures_input() {
            return self.table.handle_key_event(key);
        }
        if self.selector.captures_input() {
            return self.selector.handle_key_event(key);
        }

        match key.code {
            KeyCode::Char('q') if key.modifiers == KeyModifiers::NONE => {
                return Ok(Some(Action::Quit));
            }
            KeyCode::Char('?') => return Ok(Some(Action::ToggleHelp)),
            _ => {}
        }

        if SelectorBar::handles(&key) {
            return self.selector.handle_key_event(key);
        }
        self.table.handle_key_event(key)
    }

    /// Forward an action to both components, queueing any follow-ups.
    fn broadcast(&mut self, action: &Action) -> Result<()> {
        if let Some(follow_up) = self.selector.update(action)? {
            self.action_tx.send(follow_up)?;
        }
        if let Some(follow_up) = self.table.update(action)? {
            self.action_tx.send(follow_up)?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_lines)]
    fn process_action(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::Quit => self.running = false,

            Action::Resize(..) | Action::Render => {}

            Action::Tick => {
                if self.is_busy() {
                    self.throbber.calc_next();
                }
                if self
                    .notification
                    .as_ref()
                    .is_some_and(|(_, created)| created.elapsed() > NOTIFICATION_TTL)
                {
                    self.notification = None;
                }
            }

            Action::ToggleHelp => self.help_visible = !self.help_visible,

            Action::DirectoryUpdated(view) => {
                self.directory = (**view).clone();
                if let Some(family) = self.selection.families_loaded(&self.directory.families) {
                    self.load_technologies(family);
                    self.selection_changed()?;
                }
                self.broadcast(action)?;
            }

            Action::ControlsUpdated(view) => {
                self.controls = (**view).clone();
                self.broadcast(action)?;
            }

            Action::SelectFamily(id) => {
                let change = self
                    .directory
                    .families
                    .iter()
                    .find(|f| &f.id == id)
                    .map_or(SelectionChange::None, |f| self.selection.select_family(f));
                if let SelectionChange::FamilyChanged(family) = change {
                    debug!(%family, "family selected");
                    self.load_technologies(family);
                    self.selection_changed()?;
                }
            }

            Action::SelectTechnology(id) => {
                let change = match id {
                    Some(id) => self
                        .directory
                        .technologies
                        .iter()
                        .find(|t| &t.id == id)
                        .map_or(SelectionChange::None, |t| {
                            self.selection.select_technology(t)
                        }),
                    None => self.selection.clear_technology(),
                };
                if change != SelectionChange::None {
                    self.selection_changed()?;
                }
            }

            Action::SearchChanged(term) => {
                if self.selection.set_search(term.clone()) != SelectionChange::None {
                    self.selection_changed()?;
                }
            }

            Action::SelectionChanged(_) | Action::OpenForm(_) => self.broadcast(action)?,

            Action::ControlSaveFailed => {
                self.saving = false;
                self.broadcast(action)?;
            }

            Action::SortBy(column) => {
                let sort = self.sort.toggle(*column);
                debug!(column = %sort.column, direction = %sort.direction, "sort changed");
                self.push_context();
            }

            Action::Refresh => {
                self.notification =
                    Some((Notification::info("Refreshing controls"), Instant::now()));
                let controls = self.registry.controls().clone();
                tokio::spawn(async move {
                    if let Err(e) = controls.fetch().await {
                        warn!(error = %e, "refresh failed");
                    }
                });
            }

            Action::NewControl => {
                let technology = self.selection.technology().map(|t| t.id.clone());
                match ControlForm::create(technology.as_ref()) {
                    Ok(form) => self.action_tx.send(Action::OpenForm(Box::new(form)))?,
                    Err(CoreError::ValidationFailed { message }) => {
                        self.action_tx
                            .send(Action::Notify(Notification::error(message)))?;
                    }
                    Err(e) => {
                        self.action_tx
                            .send(Action::Notify(Notification::error(e.to_string())))?;
                    }
                }
            }

            Action::SaveControl(control) => {
                self.saving = true;
                let controls = self.registry.controls().clone();
                let control = (**control).clone();
                let tx = self.action_tx.clone();
                tokio::spawn(async move {
                    match controls.save(&control).await {
                        Ok(outcome) => {
                            let _ = tx.send(Action::ControlSaved {
                                id: control.id,
                                outcome,
                            });
                        }
                        Err(e) => {
                            warn!(error = %e, "control save failed");
                            let _ = tx.send(Action::ControlSaveFailed);
                        }
                    }
                });
            }

            Action::ControlSaved { id, outcome } => {
                self.saving = false;
                let verb = match outcome {
                    SaveOutcome::Created => "created",
                    SaveOutcome::Updated => "updated",
                };
                self.notification = Some((
                    Notification::success(format!("Control {id} {verb}")),
                    Instant::now(),
                ));
                self.broadcast(action)?;
            }

            Action::ShowConfirm(confirm) => self.pending_confirm = Some(confirm.clone()),

            Action::ConfirmYes => {
                if let Some(confirm) = self.pending_confirm.take() {
                    self.execute_confirm(confirm);
                }
            }

            Action::ConfirmNo => self.pending_confirm = None,

            Action::Notify(notification) => {
                self.notification = Some((notification.clone(), Instant::now()));
            }
        }
        Ok(())
    }

    fn is_busy(&self) -> bool {
        self.directory.loading() || self.controls.loading || self.saving
    }

    /// Push the new selection to the selector and re-query controls.
    fn selection_changed(&mut self) -> Result<()> {
        self.action_tx
            .send(Action::SelectionChanged(Box::new(self.selection.clone())))?;
        self.push_context();
        Ok(())
    }

    /// The context is stored before spawning, so keystrokes reach the
    /// service in the order they were typed.
    fn push_context(&self) {
        let ctx = self.selection.filter_context(self.sort.current());
        let controls = self.registry.controls().clone();
        let Some(pending) = controls.request(ctx) else {
            return;
        };
        tokio::spawn(async move {
            if let Err(e) = controls.fetch_pending(pending).await {
                warn!(error = %e, "controls fetch failed");
            }
        });
    }

    fn load_technologies(&self, family: FamilyId) {
        let directory = self.registry.directory().clone();
        let ticket = directory.reserve_technologies();
        tokio::spawn(async move {
            if let Err(e) = directory
                .load_reserved_technologies(ticket, Some(&family))
                .await
            {
                warn!(error = %e, %family, "technology load failed");
            }
        });
    }

    fn execute_confirm(&self, confirm: ConfirmAction) {
        match confirm {
            ConfirmAction::DeleteControl { id } => {
                let controls = self.registry.controls().clone();
                let tx = self.action_tx.clone();
                tokio::spawn(async move {
                    let notification = match controls.delete(&id).await {
                        Ok(()) => Notification::success(format!("Control {id} deleted")),
                        Err(_) => Notification::error(thr_core::controls::DELETE_ERROR),
                    };
                    let _ = tx.send(Action::Notify(notification));
                });
            }
        }
    }

    // ── Rendering ───────────────────────────────────────────────

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let layout = Layout::vertical([
            Constraint::Length(4), // selector bar
            Constraint::Min(1),    // table / form
            Constraint::Length(1), // status bar
        ])
        .split(area);

        self.selector.render(frame, layout[0]);
        self.table.render(frame, layout[1]);
        self.render_status_bar(frame, layout[2]);

        // Overlays, last = topmost
        self.selector.render_popup(frame, layout[0], area);

        if let Some((ref notif, _)) = self.notification {
            self.render_notification(frame, area, notif);
        }

        if let Some(ref confirm) = self.pending_confirm {
            self.render_confirm_dialog(frame, area, confirm);
        }

        if self.help_visible {
            self.render_help_overlay(frame, area);
        }
    }

    /// Throbber while anything is loading, then inline errors, then key hints.
    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let cols = Layout::horizontal([Constraint::Length(14), Constraint::Min(0)]).split(area);

        if self.is_busy() {
            let label = if self.saving { "Saving" } else { "Loading" };
            let throbber = Throbber::default()
                .label(label)
                .style(Style::default().fg(theme::INFO))
                .throbber_style(Style::default().fg(theme::ACCENT));
            frame.render_stateful_widget(throbber, cols[0], &mut self.throbber.clone());
        } else {
            frame.render_widget(
                Paragraph::new(Span::styled(" ● ready", Style::default().fg(theme::OK))),
                cols[0],
            );
        }

        let mut spans = Vec::new();
        for error in [&self.directory.error, &self.controls.error]
            .into_iter()
            .flatten()
        {
            spans.push(Span::styled(format!("✗ {error}  "), theme::error()));
        }
        spans.push(Span::styled(
            "│ ? help  / search  [ ] family  t technology  q quit",
            theme::hint(),
        ));
        frame.render_widget(Paragraph::new(Line::from(spans)), cols[1]);
    }

    #[allow(clippy::unused_self)]
    fn render_help_overlay(&self, frame: &mut Frame, area: Rect) {
        let help_width = 60u16.min(area.width.saturating_sub(4));
        let help_height = 28u16.min(area.height.saturating_sub(2));
        let x = (area.width.saturating_sub(help_width)) / 2;
        let y = (area.height.saturating_sub(help_height)) / 2;
        let help_area = Rect::new(area.x + x, area.y + y, help_width, help_height);

        frame.render_widget(Clear, help_area);
        frame.render_widget(
            Block::default().style(Style::default().bg(theme::BACKDROP)),
            help_area,
        );

        let block = Block::default()
            .title(" Keyboard Shortcuts ")
            .title_style(theme::panel_title())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::focus_border());
        let inner = block.inner(help_area);
        frame.render_widget(block, help_area);

        let section = |title: &'static str| {
            Line::from(Span::styled(
                format!("  {title}"),
                Style::default().fg(theme::INFO),
            ))
        };
        let entry = |keys: &'static str, text: &'static str| {
            Line::from(vec![
                Span::styled(format!("  {keys:<12}"), theme::hint_key()),
                Span::styled(text, theme::hint()),
            ])
        };

        let help_text = vec![
            section("Selection"),
            entry("[ ] ← →", "Previous / next family"),
            entry("t", "Pick technology"),
            entry("/", "Search id, statement, description"),
            Line::from(""),
            section("Controls"),
            entry("j/k ↑/↓", "Move"),
            entry("g/G", "Top / bottom"),
            entry("Space", "Expand / collapse detail"),
            entry("Enter e", "Edit control"),
            entry("n", "New control"),
            entry("d", "Delete control"),
            entry("1-5", "Sort by column (again to flip)"),
            entry("r", "Refresh"),
            Line::from(""),
            section("Form"),
            entry("Tab S-Tab", "Next / previous field"),
            entry("Ctrl+S", "Save"),
            entry("Esc", "Cancel"),
            Line::from(""),
            entry("?", "This help"),
            entry("q Ctrl+C", "Quit"),
            Line::from(""),
            Line::from(Span::styled(
                "                    Esc or ? to close",
                theme::hint(),
            )),
        ];

        frame.render_widget(Paragraph::new(help_text), inner);
    }

    #[allow(clippy::unused_self)]
    fn render_confirm_dialog(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmAction) {
        let width = 56u16.min(area.width.saturating_sub(4));
        let height = 5u16;
        let x = (area.width.saturating_sub(width)) / 2;
        let y = (area.height.saturating_sub(height)) / 2;
        let dialog_area = Rect::new(area.x + x, area.y + y, width, height);

        frame.render_widget(Clear, dialog_area);
        frame.render_widget(
            Block::default().style(Style::default().bg(theme::BACKDROP)),
            dialog_area,
        );

        let block = Block::default()
            .title(" Confirm ")
            .title_style(theme::panel_title())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(theme::AMBER));
        let inner = block.inner(dialog_area);
        frame.render_widget(block, dialog_area);

        let text = vec![
            Line::from(Span::styled(
                format!("  {confirm}"),
                Style::default().fg(theme::TEXT),
            )),
            Line::from(""),
            Line::from(vec![
                Span::styled("  y ", theme::hint_key()),
                Span::styled("confirm    ", theme::hint()),
                Span::styled("n ", theme::hint_key()),
                Span::styled("cancel", theme::hint()),
            ]),
        ];
        frame.render_widget(Paragraph::new(text), inner);
    }

    /// Toast in the bottom-right corner, above the status bar.
    #[allow(clippy::unused_self)]
    fn render_notification(&self, frame: &mut Frame, area: Rect, notif: &Notification) {
        let msg_len = u16::try_from(notif.message.chars().count()).unwrap_or(u16::MAX);
        let width = msg_len.saturating_add(6).clamp(20, 60).min(area.width);
        let height = 3u16;
        let x = area.width.saturating_sub(width + 1);
        let y = area.height.saturating_sub(height + 2);
        let toast_area = Rect::new(area.x + x, area.y + y, width, height);

        let (border_color, icon) = match notif.level {
            NotificationLevel::Success => (theme::OK, "✓"),
            NotificationLevel::Error => (theme::ERR, "✗"),
            NotificationLevel::Info => (theme::INFO, "·"),
        };

        frame.render_widget(Clear, toast_area);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(border_color))
            .style(Style::default().bg(theme::BACKDROP));
        let inner = block.inner(toast_area);
        frame.render_widget(block, toast_area);

        let line = Line::from(vec![
            Span::styled(format!(" {icon} "), Style::default().fg(border_color)),
            Span::styled(notif.message.as_str(), Style::default().fg(theme::TEXT)),
        ]);
        frame.render_widget(Paragraph::new(line), inner);
    }
}
