//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::path::Path;

use thr_core::ControlDraft;

use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal on stdin the prompt cannot be answered, so the
/// operation is refused instead.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Read a control record for `--from-file`. `.yaml`/`.yml` files are
/// parsed as YAML, everything else as JSON.
pub fn read_control_file(path: &Path) -> Result<ControlDraft, CliError> {
    let contents = std::fs::read_to_string(path)?;
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

    if is_yaml {
        serde_yaml::from_str(&contents).map_err(|e| CliError::Validation {
            field: "from-file".into(),
            reason: format!("invalid YAML: {e}"),
        })
    } else {
        serde_json::from_str(&contents).map_err(|e| CliError::Validation {
            field: "from-file".into(),
            reason: format!("invalid JSON: {e}"),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn reads_yaml_and_json_records() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("c.yml");
        std::fs::write(&yaml, "id: OS-WIN-009\nstatement: Lock it down\nranking: 3\n").unwrap();
        let draft = read_control_file(&yaml).unwrap();
        assert_eq!(draft.id, "OS-WIN-009");
        assert_eq!(draft.ranking, Some(3));
        assert!(draft.description.is_empty());

        let json = dir.path().join("c.json");
        std::fs::write(&json, r#"{"id":"DB-1","tech_id":"mysql-8-0"}"#).unwrap();
        let draft = read_control_file(&json).unwrap();
        assert_eq!(draft.tech_id.as_deref(), Some("mysql-8-0"));
    }

    #[test]
    fn malformed_file_is_a_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            read_control_file(&path),
            Err(CliError::Validation { .. })
        ));
    }
}
