// ── Technology directory domain types ──

use serde::{Deserialize, Serialize};

use super::ids::{FamilyId, TechnologyId};

/// Top-level grouping of technologies (e.g. "Operating Systems").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnologyFamily {
    pub id: FamilyId,
    pub title: String,
}

/// A specific product or platform within a family (e.g. "Windows 11").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Technology {
    pub id: TechnologyId,
    pub title: String,
    pub family_id: FamilyId,
}
