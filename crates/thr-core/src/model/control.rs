// ── Control domain type ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ControlId, FamilyId, TechnologyId};

/// A single hardening requirement for one technology.
///
/// Rows read from the store carry the joined technology and family
/// titles; controls built locally (form drafts) leave them empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control {
    pub id: ControlId,
    pub tech_id: TechnologyId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_id: Option<FamilyId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technology_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_title: Option<String>,

    /// Categorization label such as "Access Control".
    pub control_family: String,
    /// Kind of control, e.g. "Technical" or "Administrative".
    pub control_type: String,
    /// Display order within a technology; `None` sorts last.
    pub ranking: Option<i32>,
    pub monitor_id: Option<String>,

    pub description: String,
    pub statement: String,
    pub recommendation: String,
    /// Automation payload, usually YAML.
    pub thr_code: String,
    pub comments: Option<String>,

    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Control {
    /// Case-insensitive substring match over id, statement and description.
    pub fn matches_search(&self, term: &str) -> bool {
        let needle = term.to_lowercase();
        [
            self.id.as_str(),
            self.statement.as_str(),
            self.description.as_str(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Minimal valid control for tests.
    pub(crate) fn control(id: &str, tech: &str, ranking: Option<i32>) -> Control {
        Control {
            id: ControlId::from(id),
            tech_id: TechnologyId::from(tech),
            family_id: None,
            technology_title: None,
            family_title: None,
            control_family: "Access Control".into(),
            control_type: "Technical".into(),
            ranking,
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
}
