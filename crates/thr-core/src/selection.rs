// ── Family / technology / search selection ──
//
// Pure state machine behind the selector bar. It never talks to the
// store; transitions tell the caller what to load next.

use crate::controls::FilterContext;
use crate::model::{FamilyId, Technology, TechnologyFamily, TechnologyId};
use crate::sort::Sort;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyRef {
    pub id: FamilyId,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TechnologyRef {
    pub id: TechnologyId,
    pub title: String,
}

/// What a selection transition requires of the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionChange {
    /// Nothing changed.
    None,
    /// The family changed and the technology was cleared; load this
    /// family's technologies.
    FamilyChanged(FamilyId),
    /// Technology (or lack of one) changed.
    TechnologyChanged,
    SearchChanged,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    family: Option<FamilyRef>,
    technology: Option<TechnologyRef>,
    search: String,
}

impl Selection {
    pub fn family(&self) -> Option<&FamilyRef> {
        self.family.as_ref()
    }

    pub fn technology(&self) -> Option<&TechnologyRef> {
        self.technology.as_ref()
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    /// Called whenever the family list arrives. Picks the first family if
    /// nothing is selected or the selected family disappeared, and returns
    /// the family whose technologies must now be loaded.
    pub fn families_loaded(&mut self, families: &[TechnologyFamily]) -> Option<FamilyId> {
        let still_present = self
            .family
            .as_ref()
            .is_some_and(|sel| families.iter().any(|f| f.id == sel.id));
        if still_present {
            return None;
        }
        let first = families.first()?;
        match self.select_family(first) {
            SelectionChange::FamilyChanged(id) => Some(id),
            _ => None,
        }
    }

    /// Switch family. Clears the technology. Re-selecting the current
    /// family is a no-op.
    pub fn select_family(&mut self, family: &TechnologyFamily) -> SelectionChange {
        if self.family.as_ref().is_some_and(|f| f.id == family.id) {
            return SelectionChange::None;
        }
        self.family = Some(FamilyRef {
            id: family.id.clone(),
            title: family.title.clone(),
        });
        self.technology = None;
        SelectionChange::FamilyChanged(family.id.clone())
    }

    pub fn select_technology(&mut self, technology: &Technology) -> SelectionChange {
        if self.technology.as_ref().is_some_and(|t| t.id == technology.id) {
            return SelectionChange::None;
        }
        self.technology = Some(TechnologyRef {
            id: technology.id.clone(),
            title: technology.title.clone(),
        });
        SelectionChange::TechnologyChanged
    }

    pub fn clear_technology(&mut self) -> SelectionChange {
        if self.technology.take().is_some() {
            SelectionChange::TechnologyChanged
        } else {
            SelectionChange::None
        }
    }

    /// Every keystroke lands here; there is no debounce.
    pub fn set_search(&mut self, term: impl Into<String>) -> SelectionChange {
        let term = term.into();
        if term == self.search {
            return SelectionChange::None;
        }
        self.search = term;
        SelectionChange::SearchChanged
    }

    pub fn filter_context(&self, sort: Option<Sort>) -> FilterContext {
        FilterContext {
            technology_id: self.technology.as_ref().map(|t| t.id.clone()),
            family_id: self.family.as_ref().map(|f| f.id.clone()),
            search: self.search.clone(),
            sort,
        }
    }
}
