// ── API-to-domain type conversions ──
//
// Bridges raw `thr_api::types` rows into `thr_core::model` types and
// back into write payloads.

use chrono::{DateTime, NaiveDateTime, Utc};

use thr_api::types::{ControlPatch, ControlRow, ControlWrite, FamilyRow, TechRow};

use crate::model::{Control, ControlId, FamilyId, Technology, TechnologyFamily, TechnologyId};

// ── Helpers ────────────────────────────────────────────────────────

/// Parse a store timestamp. Accepts RFC 3339 and the offset-less form
/// that `timestamp without time zone` columns produce (read as UTC).
fn parse_datetime(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Blank optional text becomes `None`.
pub(crate) fn non_blank(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
}

// ── Rows -> domain ─────────────────────────────────────────────────

impl From<FamilyRow> for TechnologyFamily {
    fn from(row: FamilyRow) -> Self {
        Self {
            id: FamilyId::from(row.id),
            title: row.title,
        }
    }
}

impl From<TechRow> for Technology {
    fn from(row: TechRow) -> Self {
        Self {
            id: TechnologyId::from(row.id),
            title: row.title,
            family_id: FamilyId::from(row.tech_family_id),
        }
    }
}

impl From<ControlRow> for Control {
    fn from(row: ControlRow) -> Self {
        let (family_id, technology_title, family_title) = match row.tech {
            Some(tech) => (
                Some(FamilyId::from(tech.tech_family_id)),
                Some(tech.title),
                tech.family.map(|f| f.title),
            ),
            None => (None, None, None),
        };

        Self {
            id: ControlId::from(row.id),
            tech_id: TechnologyId::from(row.tech_id),
            family_id,
            technology_title,
            family_title,
            control_family: row.control_family,
            control_type: row.control_type,
            ranking: row.ranking,
            monitor_id: row.monitor_id,
            description: row.description,
            statement: row.statement,
            recommendation: row.recommendation,
            thr_code: row.thr_code,
            comments: row.comments,
            created_at: parse_datetime(row.created_at.as_deref()),
            updated_at: parse_datetime(row.updated_at.as_deref()),
        }
    }
}

// ── Domain -> write payloads ───────────────────────────────────────

impl From<&Control> for ControlWrite {
    fn from(c: &Control) -> Self {
        Self {
            id: c.id.to_string(),
            tech_id: c.tech_id.to_string(),
            control_family: c.control_family.clone(),
            control_type: c.control_type.clone(),
            ranking: c.ranking,
            monitor_id: c.monitor_id.clone(),
            description: c.description.clone(),
            statement: c.statement.clone(),
            recommendation: c.recommendation.clone(),
            thr_code: c.thr_code.clone(),
            comments: c.comments.clone(),
            updated_at: c.updated_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Update body for `control`, stamped with `now`. Identity columns are
/// not part of the payload.
pub(crate) fn control_patch(c: &Control, now: DateTime<Utc>) -> ControlPatch {
    ControlPatch {
        control_family: c.control_family.clone(),
        control_type: c.control_type.clone(),
        ranking: c.ranking,
        monitor_id: c.monitor_id.clone(),
        description: c.description.clone(),
        statement: c.statement.clone(),
        recommendation: c.recommendation.clone(),
        thr_code: c.thr_code.clone(),
        comments: c.comments.clone(),
        updated_at: now.to_rfc3339(),
    }
}
