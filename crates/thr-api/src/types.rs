// Wire types for the registry store.
//
// Field names follow the store's snake_case columns. Timestamps stay as
// strings here; thr-core parses them leniently.

use serde::{Deserialize, Serialize};

// ── Resource names ───────────────────────────────────────────────────

pub const FAMILIES: &str = "TechFamily";
pub const TECHNOLOGIES: &str = "Tech";
pub const CONTROLS: &str = "Controls";

/// Embedding used for every control read: the owning technology (inner
/// join, so orphans drop out) and its family.
pub const CONTROL_SELECT: &str = "*,Tech!inner(id,title,tech_family_id,TechFamily(id,title))";

/// Embedded path for filtering controls by family.
pub const CONTROL_FAMILY_FILTER: &str = "Tech.tech_family_id";

/// Columns searched by free-text queries.
pub const CONTROL_SEARCH_COLUMNS: [&str; 3] = ["id", "statement", "description"];

// ── Rows ─────────────────────────────────────────────────────────────

/// `TechFamily` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyRow {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// `Tech` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechRow {
    pub id: String,
    pub title: String,
    pub tech_family_id: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Family as embedded under a technology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyEmbed {
    pub id: String,
    pub title: String,
}

/// Technology as embedded under a control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechEmbed {
    pub id: String,
    pub title: String,
    pub tech_family_id: String,
    #[serde(rename = "TechFamily", default)]
    pub family: Option<FamilyEmbed>,
}

/// `Controls` row with its embedded technology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlRow {
    pub id: String,
    pub tech_id: String,
    pub control_family: String,
    pub control_type: String,
    #[serde(default)]
    pub ranking: Option<i32>,
    #[serde(default)]
    pub monitor_id: Option<String>,
    pub description: String,
    pub statement: String,
    pub recommendation: String,
    pub thr_code: String,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(rename = "Tech", default)]
    pub tech: Option<TechEmbed>,
}

// ── Write payloads ───────────────────────────────────────────────────

/// Body for inserting a new control. Timestamps are left to the store
/// defaults unless provided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlWrite {
    pub id: String,
    pub tech_id: String,
    pub control_family: String,
    pub control_type: String,
    pub ranking: Option<i32>,
    pub monitor_id: Option<String>,
    pub description: String,
    pub statement: String,
    pub recommendation: String,
    pub thr_code: String,
    pub comments: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Body for updating an existing control. Identity columns (`id`,
/// `tech_id`) are never part of an update. `None` clears nullable columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlPatch {
    pub control_family: String,
    pub control_type: String,
    pub ranking: Option<i32>,
    pub monitor_id: Option<String>,
    pub description: String,
    pub statement: String,
    pub recommendation: String,
    pub thr_code: String,
    pub comments: Option<String>,
    pub updated_at: String,
}
