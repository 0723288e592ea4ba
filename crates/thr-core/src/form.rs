// ── Edit-control form model ──
//
// Field values, validation and submission for creating or editing one
// control. Rendering lives in the TUI; the CLI drives the same form from
// a JSON/YAML file.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::controls::{ControlsService, SaveOutcome};
use crate::convert::non_blank;
use crate::error::CoreError;
use crate::model::{Control, ControlId, TechnologyId};

pub const SAVE_FAILED_BANNER: &str = "Failed to save control. Please try again.";
pub const NO_TECHNOLOGY: &str = "Select a technology first";

/// Form fields in tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormField {
    Id,
    ControlFamily,
    ControlType,
    Ranking,
    MonitorId,
    Description,
    Statement,
    Recommendation,
    ThrCode,
    Comments,
}

impl FormField {
    pub const ALL: [FormField; 10] = [
        Self::Id,
        Self::ControlFamily,
        Self::ControlType,
        Self::Ranking,
        Self::MonitorId,
        Self::Description,
        Self::Statement,
        Self::Recommendation,
        Self::ThrCode,
        Self::Comments,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::ControlFamily => "Control family",
            Self::ControlType => "Control type",
            Self::Ranking => "Ranking",
            Self::MonitorId => "Monitor ID",
            Self::Description => "Description",
            Self::Statement => "Statement",
            Self::Recommendation => "Recommendation",
            Self::ThrCode => "THR code",
            Self::Comments => "Comments",
        }
    }

    pub fn required(self) -> bool {
        !matches!(self, Self::Ranking | Self::MonitorId | Self::Comments)
    }

    /// Free-text fields that accept newlines.
    pub fn multiline(self) -> bool {
        matches!(
            self,
            Self::Description | Self::Statement | Self::Recommendation | Self::ThrCode | Self::Comments
        )
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Per-field validation messages.
pub type FieldErrors = BTreeMap<FormField, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    /// New control under this technology.
    Create { technology: TechnologyId },
    /// Existing control; `id` and technology are fixed.
    Edit { original: Box<Control> },
}

/// Result of [`ControlForm::submit`].
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Persisted; the form can close.
    Saved(SaveOutcome),
    /// Field errors were recorded; the store was not contacted.
    Invalid,
    /// The store rejected the save; the banner is set and values are kept.
    Failed(CoreError),
}

/// A control record as read from a file (`thr controls save --from-file`).
/// Missing fields are treated as blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlDraft {
    pub id: String,
    pub tech_id: Option<String>,
    pub control_family: String,
    pub control_type: String,
    pub ranking: Option<i32>,
    pub monitor_id: Option<String>,
    pub description: String,
    pub statement: String,
    pub recommendation: String,
    pub thr_code: String,
    pub comments: Option<String>,
}

/// Editable state for one control.
#[derive(Debug, Clone)]
pub struct ControlForm {
    mode: FormMode,
    values: BTreeMap<FormField, String>,
    errors: FieldErrors,
    banner: Option<String>,
}

impl ControlForm {
    /// Blank form for a new control. Requires a technology.
    pub fn create(technology: Option<&TechnologyId>) -> Result<Self, CoreError> {
        let technology = technology.ok_or_else(|| CoreError::ValidationFailed {
            message: NO_TECHNOLOGY.into(),
        })?;
        Ok(Self {
            mode: FormMode::Create {
                technology: technology.clone(),
            },
            values: FormField::ALL.iter().map(|f| (*f, String::new())).collect(),
            errors: FieldErrors::new(),
            banner: None,
        })
    }

    /// Form pre-filled from an existing control.
    pub fn edit(control: &Control) -> Self {
        let mut values = BTreeMap::new();
        values.insert(FormField::Id, control.id.to_string());
        values.insert(FormField::ControlFamily, control.control_family.clone());
        values.insert(FormField::ControlType, control.control_type.clone());
        values.insert(
            FormField::Ranking,
            control.ranking.map(|r| r.to_string()).unwrap_or_default(),
        );
        values.insert(
            FormField::MonitorId,
            control.monitor_id.clone().unwrap_or_default(),
        );
        values.insert(FormField::Description, control.description.clone());
        values.insert(FormField::Statement, control.statement.clone());
        values.insert(FormField::Recommendation, control.recommendation.clone());
        values.insert(FormField::ThrCode, control.thr_code.clone());
        values.insert(
            FormField::Comments,
            control.comments.clone().unwrap_or_default(),
        );
        Self {
            mode: FormMode::Edit {
                original: Box::new(control.clone()),
            },
            values,
            errors: FieldErrors::new(),
            banner: None,
        }
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn is_new(&self) -> bool {
        matches!(self.mode, FormMode::Create { .. })
    }

    pub fn technology_id(&self) -> &TechnologyId {
        match &self.mode {
            FormMode::Create { technology } => technology,
            FormMode::Edit { original } => &original.tech_id,
        }
    }

    pub fn is_read_only(&self, field: FormField) -> bool {
        field == FormField::Id && !self.is_new()
    }

    pub fn value(&self, field: FormField) -> &str {
        self.values.get(&field).map_or("", String::as_str)
    }

    /// Replace a field's value. Read-only fields are left untouched and
    /// `false` is returned. Clears that field's error.
    pub fn set_value(&mut self, field: FormField, value: impl Into<String>) -> bool {
        if self.is_read_only(field) {
            return false;
        }
        self.values.insert(field, value.into());
        self.errors.remove(&field);
        true
    }

    /// Copy every editable field from a file record.
    pub fn apply_draft(&mut self, draft: &ControlDraft) {
        self.set_value(FormField::Id, draft.id.clone());
        self.set_value(FormField::ControlFamily, draft.control_family.clone());
        self.set_value(FormField::ControlType, draft.control_type.clone());
        self.set_value(
            FormField::Ranking,
            draft.ranking.map(|r| r.to_string()).unwrap_or_default(),
        );
        self.set_value(
            FormField::MonitorId,
            draft.monitor_id.clone().unwrap_or_default(),
        );
        self.set_value(FormField::Description, draft.description.clone());
        self.set_value(FormField::Statement, draft.statement.clone());
        self.set_value(FormField::Recommendation, draft.recommendation.clone());
        self.set_value(FormField::ThrCode, draft.thr_code.clone());
        self.set_value(
            FormField::Comments,
            draft.comments.clone().unwrap_or_default(),
        );
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn error(&self, field: FormField) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    /// Check every field and build the control to save.
    pub fn validate(&self) -> Result<Control, FieldErrors> {
        let mut errors = FieldErrors::new();
        for field in FormField::ALL {
            if field.required() && self.value(field).trim().is_empty() {
                errors.insert(field, format!("{} is required", field.label()));
            }
        }

        let ranking_raw = self.value(FormField::Ranking).trim();
        let ranking = if ranking_raw.is_empty() {
            None
        } else if let Ok(r) = ranking_raw.parse::<i32>() {
            Some(r)
        } else {
            errors.insert(FormField::Ranking, "Ranking must be a whole number".into());
            None
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        let mut control = match &self.mode {
            FormMode::Edit { original } => (**original).clone(),
            FormMode::Create { technology } => Control {
                id: ControlId::from(self.value(FormField::Id).trim()),
                tech_id: technology.clone(),
                family_id: None,
                technology_title: None,
                family_title: None,
                control_family: String::new(),
                control_type: String::new(),
                ranking: None,
                monitor_id: None,
                description: String::new(),
                statement: String::new(),
                recommendation: String::new(),
                thr_code: String::new(),
                comments: None,
                created_at: None,
                updated_at: None,
            },
        };
        control.control_family = self.value(FormField::ControlFamily).trim().to_owned();
        control.control_type = self.value(FormField::ControlType).trim().to_owned();
        control.ranking = ranking;
        control.monitor_id = non_blank(Some(self.value(FormField::MonitorId)));
        control.description = self.value(FormField::Description).to_owned();
        control.statement = self.value(FormField::Statement).to_owned();
        control.recommendation = self.value(FormField::Recommendation).to_owned();
        control.thr_code = self.value(FormField::ThrCode).to_owned();
        control.comments = non_blank(Some(self.value(FormField::Comments)));
        Ok(control)
    }

    /// Validate and record the outcome on the form. `None` means the
    /// field errors are now set.
    pub fn prepare(&mut self) -> Option<Control> {
        self.banner = None;
        match self.validate() {
            Ok(control) => {
                self.errors.clear();
                Some(control)
            }
            Err(errors) => {
                debug!(fields = errors.len(), "control form invalid");
                self.errors = errors;
                None
            }
        }
    }

    /// Mark a failed save; entered values stay as they are.
    pub fn record_failure(&mut self) {
        self.banner = Some(SAVE_FAILED_BANNER.into());
    }

    /// Validate, then save through `service`.
    pub async fn submit(&mut self, service: &ControlsService) -> SubmitOutcome {
        let Some(control) = self.prepare() else {
            return SubmitOutcome::Invalid;
        };
        match service.save(&control).await {
            Ok(outcome) => SubmitOutcome::Saved(outcome),
            Err(e) => {
                self.record_failure();
                SubmitOutcome::Failed(e)
            }
        }
    }

    /// Non-blocking check that the THR code parses as YAML.
    pub fn thr_code_warning(&self) -> Option<String> {
        let code = self.value(FormField::ThrCode);
        if code.trim().is_empty() {
            return None;
        }
        serde_yaml::from_str::<serde_yaml::Value>(code)
            .err()
            .map(|e| format!("THR code is not valid YAML: {e}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::controls::FilterContext;
    use crate::store::testing::{FailingStore, sample_store};
    use crate::store::{MemoryStore, RegistryStore};

    fn filled(form: &mut ControlForm) {
        form.set_value(FormField::Id, "DB-MY-100");
        form.set_value(FormField::ControlFamily, "Data Protection");
        form.set_value(FormField::ControlType, "Technical");
        form.set_value(FormField::Description, "Encrypt binlogs");
        form.set_value(FormField::Statement, "Binary logs must be encrypted");
        form.set_value(FormField::Recommendation, "Set binlog_encryption=ON");
        form.set_value(FormField::ThrCode, "mysqld:\n  binlog_encryption: 'ON'\n");
    }

    fn new_form() -> ControlForm {
        ControlForm::create(Some(&TechnologyId::from("mysql"))).unwrap()
    }

    #[test]
    fn new_control_needs_technology() {
        let err = ControlForm::create(None).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains(NO_TECHNOLOGY));
    }

    #[test]
    fn blank_form_reports_every_required_field() {
        let errors = new_form().validate().unwrap_err();
        let fields: Vec<FormField> = errors.keys().copied().collect();
        assert_eq!(
            fields,
            vec![
                FormField::Id,
                FormField::ControlFamily,
                FormField::ControlType,
                FormField::Description,
                FormField::Statement,
                FormField::Recommendation,
                FormField::ThrCode,
            ]
        );
        assert_eq!(errors[&FormField::Statement], "Statement is required");
        assert_eq!(errors[&FormField::ThrCode], "THR code is required");
    }

    #[test]
    fn whitespace_only_counts_as_blank() {
        let mut form = new_form();
        filled(&mut form);
        form.set_value(FormField::Recommendation, "   ");
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.contains_key(&FormField::Recommendation));
    }

    #[test]
    fn ranking_must_be_an_integer() {
        let mut form = new_form();
        filled(&mut form);
        form.set_value(FormField::Ranking, "high");
        let errors = form.validate().unwrap_err();
        assert_eq!(errors[&FormField::Ranking], "Ranking must be a whole number");

        form.set_value(FormField::Ranking, " 7 ");
        assert_eq!(form.validate().unwrap().ranking, Some(7));
    }

    #[test]
    fn optional_fields_become_none_when_blank() {
        let mut form = new_form();
        filled(&mut form);
        let control = form.validate().unwrap();
        assert_eq!(control.id.as_str(), "DB-MY-100");
        assert_eq!(control.tech_id.as_str(), "mysql");
        assert_eq!(control.ranking, None);
        assert_eq!(control.monitor_id, None);
        assert_eq!(control.comments, None);
    }

    #[test]
    fn edit_form_locks_id_and_keeps_technology() {
        let original = crate::model::control::fixtures::control("OS-WIN-001", "win-11", Some(3));
        let mut form = ControlForm::edit(&original);
        assert!(form.is_read_only(FormField::Id));
        assert!(!form.set_value(FormField::Id, "OTHER"));
        assert_eq!(form.value(FormField::Ranking), "3");

        form.set_value(FormField::Statement, "changed");
        let control = form.validate().unwrap();
        assert_eq!(control.id, original.id);
        assert_eq!(control.tech_id, original.tech_id);
        assert_eq!(control.statement, "changed");
    }

    #[test]
    fn field_order_wraps() {
        assert_eq!(FormField::Id.prev(), FormField::Comments);
        assert_eq!(FormField::Comments.next(), FormField::Id);
        assert_eq!(FormField::Ranking.next(), FormField::MonitorId);
    }

    #[test]
    fn invalid_yaml_is_only_a_warning() {
        let mut form = new_form();
        filled(&mut form);
        assert_eq!(form.thr_code_warning(), None);
        form.set_value(FormField::ThrCode, "key: [unclosed");
        assert!(form.thr_code_warning().is_some());
        assert!(form.validate().is_ok());
    }

    #[test]
    fn draft_fills_fields() {
        let mut form = new_form();
        form.apply_draft(&ControlDraft {
            id: "X-1".into(),
            control_family: "Audit".into(),
            ranking: Some(4),
            comments: Some("note".into()),
            ..ControlDraft::default()
        });
        assert_eq!(form.value(FormField::Id), "X-1");
        assert_eq!(form.value(FormField::Ranking), "4");
        assert_eq!(form.value(FormField::Comments), "note");
    }

    #[tokio::test]
    async fn empty_statement_never_reaches_the_store() {
        let store = Arc::new(MemoryStore::new());
        let service = ControlsService::new(store.clone());
        let mut form = new_form();
        filled(&mut form);
        form.set_value(FormField::Statement, "");

        let outcome = form.submit(&service).await;

        assert!(matches!(outcome, SubmitOutcome::Invalid));
        assert_eq!(form.error(FormField::Statement), Some("Statement is required"));
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn failed_save_keeps_values_and_sets_banner() {
        let service = ControlsService::new(Arc::new(FailingStore));
        let mut form = new_form();
        filled(&mut form);

        let outcome = form.submit(&service).await;

        assert!(matches!(outcome, SubmitOutcome::Failed(_)));
        assert_eq!(form.banner(), Some(SAVE_FAILED_BANNER));
        assert_eq!(form.value(FormField::Statement), "Binary logs must be encrypted");
        assert_eq!(form.value(FormField::Id), "DB-MY-100");
    }

    #[tokio::test]
    async fn successful_submit_creates_and_refreshes() {
        let store: Arc<dyn RegistryStore> = Arc::new(sample_store());
        let service = ControlsService::new(store);
        service
            .set_context(FilterContext {
                technology_id: Some("mysql".into()),
                ..FilterContext::default()
            })
            .await
            .unwrap();

        let mut form = new_form();
        filled(&mut form);
        let outcome = form.submit(&service).await;

        assert!(matches!(outcome, SubmitOutcome::Saved(SaveOutcome::Created)));
        assert!(form.banner().is_none());
        assert!(
            service
                .snapshot()
                .controls
                .iter()
                .any(|c| c.id.as_str() == "DB-MY-100")
        );
    }
}
