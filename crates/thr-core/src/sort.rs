// ── Column sort state ──
//
// Sorting is server-side: the active `Sort` travels inside the
// `FilterContext` and becomes the `order=` clause of the controls query.

use serde::{Deserialize, Serialize};
use strum::Display;

/// Columns of the controls table that can be sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SortColumn {
    Id,
    ControlFamily,
    ControlType,
    Statement,
    ThrCode,
}

impl SortColumn {
    /// In table column order.
    pub const ALL: [Self; 5] = [
        Self::Id,
        Self::ControlFamily,
        Self::ControlType,
        Self::Statement,
        Self::ThrCode,
    ];

    /// Store column the sort is applied to.
    pub fn column_name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::ControlFamily => "control_family",
            Self::ControlType => "control_type",
            Self::Statement => "statement",
            Self::ThrCode => "thr_code",
        }
    }

    /// Table header label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::ControlFamily => "Control Family",
            Self::ControlType => "Control Type",
            Self::Statement => "Statement",
            Self::ThrCode => "THR Code",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flip(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    /// Header arrow glyph.
    pub fn arrow(self) -> &'static str {
        match self {
            Self::Asc => "▲",
            Self::Desc => "▼",
        }
    }
}

/// An explicit column sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sort {
    pub column: SortColumn,
    pub direction: SortDirection,
}

impl Sort {
    pub fn asc(column: SortColumn) -> Self {
        Self {
            column,
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(column: SortColumn) -> Self {
        Self {
            column,
            direction: SortDirection::Desc,
        }
    }
}

/// Header-click sort state. Starts unsorted (registry default order).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortState {
    current: Option<Sort>,
}

impl SortState {
    pub fn current(&self) -> Option<Sort> {
        self.current
    }

    /// Same column flips direction; a different column starts ascending.
    pub fn toggle(&mut self, column: SortColumn) -> Sort {
        let next = match self.current {
            Some(sort) if sort.column == column => Sort {
                column,
                direction: sort.direction.flip(),
            },
            _ => Sort::asc(column),
        };
        self.current = Some(next);
        next
    }

    /// Back to the registry default order.
    pub fn reset(&mut self) {
        self.current = None;
    }
}
