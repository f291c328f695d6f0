// src/validation/mod.rs

use serde_json::{Value, json};

/// Advisory finding from a structure check. The checked value is still used;
/// callers log the warning and continue with the degraded data.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationWarning {
    NotAnObject,
    MissingField(String),
    NullField(String),
}

impl ValidationWarning {
    pub fn hint(&self) -> (String, Option<Value>) {
        match self {
            Self::NotAnObject => (
                "Expected a JSON object at the top level.".to_string(),
                Some(json!({ "<field>": "<value>" })),
            ),
            Self::MissingField(field) => (
                format!("Missing expected field '{field}'."),
                Some(json!({ (field.clone()): "<required>" })),
            ),
            Self::NullField(field) => (format!("Field '{field}' is present but null."), None),
        }
    }
}

pub fn validate_structure(data: &Value, expected_fields: &[&str]) -> Vec<ValidationWarning> {
    let Some(object) = data.as_object() else {
        return vec![ValidationWarning::NotAnObject];
    };

    let mut warnings = Vec::new();
    for field in expected_fields {
        match object.get(*field) {
            None => warnings.push(ValidationWarning::MissingField((*field).to_string())),
            Some(Value::Null) => warnings.push(ValidationWarning::NullField((*field).to_string())),
            Some(_) => {}
        }
    }
    warnings
}

/// Log-and-continue wrapper used by the stages. Returns whether the value was
/// clean.
pub fn warn_on_gaps(stage: &str, data: &Value, expected_fields: &[&str]) -> bool {
    let warnings = validate_structure(data, expected_fields);
    for warning in &warnings {
        let (message, hint) = warning.hint();
        log::warn!("{stage}: degraded reply: {message}");
        if let Some(hint) = hint {
            log::warn!("{stage}: expected shape: {hint}");
        }
    }
    warnings.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_objects_produce_no_warnings() {
        let data = json!({"tasks": [], "plan_summary": "short"});
        assert!(validate_structure(&data, &["tasks", "plan_summary"]).is_empty());
    }

    #[test]
    fn missing_and_null_fields_are_reported_separately() {
        let data = json!({"tasks": null});
        let warnings = validate_structure(&data, &["tasks", "plan_summary"]);
        assert_eq!(
            warnings,
            vec![
                ValidationWarning::NullField("tasks".to_string()),
                ValidationWarning::MissingField("plan_summary".to_string()),
            ]
        );
    }

    #[test]
    fn non_objects_short_circuit() {
        let warnings = validate_structure(&json!([1, 2]), &["tasks"]);
        assert_eq!(warnings, vec![ValidationWarning::NotAnObject]);
    }

    #[test]
    fn hints_name_the_field() {
        let (message, hint) = ValidationWarning::MissingField("tasks".into()).hint();
        assert!(message.contains("tasks"));
        assert_eq!(hint.unwrap(), json!({"tasks": "<required>"}));
    }

    #[test]
    fn warn_on_gaps_reports_cleanliness() {
        assert!(warn_on_gaps("test", &json!({"a": 1}), &["a"]));
        assert!(!warn_on_gaps("test", &json!({}), &["a"]));
    }
}
