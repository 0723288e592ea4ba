// ── Registry store seam ──
//
// Services talk to the registry through `RegistryStore`. `RestStore`
// speaks PostgREST via `thr-api`; `MemoryStore` keeps everything in
// process (tests and the console's demo mode).

pub mod memory;
pub mod rest;
#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod testing;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::model::{Control, ControlId, FamilyId, Technology, TechnologyFamily, TechnologyId};
use crate::sort::Sort;

pub use memory::MemoryStore;
pub use rest::RestStore;

/// Which controls a query is restricted to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Scope {
    #[default]
    All,
    Family(FamilyId),
    Technology(TechnologyId),
}

/// Result ordering of a controls query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ControlOrder {
    /// Ranking ascending with unranked rows last, then id ascending.
    #[default]
    RankingThenId,
    /// Explicit column sort, ties broken by id ascending.
    By(Sort),
}

/// A fully resolved controls read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlQuery {
    pub scope: Scope,
    /// Trimmed, non-empty search term.
    pub search: Option<String>,
    pub order: ControlOrder,
    pub limit: usize,
}

/// Read/write access to the registry.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// All families ordered by title.
    async fn list_families(&self) -> Result<Vec<TechnologyFamily>, CoreError>;

    /// Technologies ordered by title, restricted to `family` when given.
    async fn list_technologies(
        &self,
        family: Option<&FamilyId>,
    ) -> Result<Vec<Technology>, CoreError>;

    async fn list_controls(&self, query: &ControlQuery) -> Result<Vec<Control>, CoreError>;

    async fn get_control(&self, id: &ControlId) -> Result<Option<Control>, CoreError>;

    /// Update the row with `control.id`, stamping `updated_at`. Returns
    /// `false` when no row had that id. Never changes `id` or `tech_id`.
    async fn update_control(&self, control: &Control) -> Result<bool, CoreError>;

    async fn insert_control(&self, control: &Control) -> Result<(), CoreError>;

    async fn delete_control(&self, id: &ControlId) -> Result<(), CoreError>;
}
