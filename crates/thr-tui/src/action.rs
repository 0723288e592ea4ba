//! UI actions. Every state change flows through one of these.

use std::fmt;

use thr_core::{
    Control, ControlForm, ControlId, ControlsView, DirectoryView, FamilyId, SaveOutcome,
    Selection, SortColumn, TechnologyId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
}

impl Notification {
    pub fn success(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Success,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Error,
        }
    }

    pub fn info(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Info,
        }
    }
}

/// Destructive operations that need a y/n prompt first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmAction {
    DeleteControl { id: ControlId },
}

impl fmt::Display for ConfirmAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeleteControl { id } => write!(f, "Delete control {id}? This cannot be undone."),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Action {
    // ── Lifecycle ──
    Quit,
    Tick,
    Render,
    Resize(u16, u16),
    ToggleHelp,

    // ── Data snapshots (from the data bridge) ──
    DirectoryUpdated(Box<DirectoryView>),
    ControlsUpdated(Box<ControlsView>),

    // ── Selector ──
    SelectFamily(FamilyId),
    /// `None` clears the technology.
    SelectTechnology(Option<TechnologyId>),
    SearchChanged(String),
    /// Current selection, pushed to the selector after every change.
    SelectionChanged(Box<Selection>),

    // ── Table ──
    SortBy(SortColumn),
    Refresh,
    NewControl,
    OpenForm(Box<ControlForm>),

    // ── Form ──
    SaveControl(Box<Control>),
    ControlSaved {
        id: ControlId,
        outcome: SaveOutcome,
    },
    ControlSaveFailed,

    // ── Confirmation / feedback ──
    ShowConfirm(ConfirmAction),
    ConfirmYes,
    ConfirmNo,
    Notify(Notification),
}
