// src/sanitize/mod.rs

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::schema::MAX_INPUT_LEN;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Invalid or empty input provided")]
    Empty,
    #[error("Input exceeds the maximum length of {max} characters")]
    TooLong { max: usize },
    #[error("Input contains a blocked pattern: {0}")]
    Unsafe(String),
    #[error("Input must be plain text")]
    WrongType,
}

fn blocklist() -> &'static [(&'static str, Regex)] {
    static BLOCKLIST: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    BLOCKLIST.get_or_init(|| {
        [
            ("script tag", r"(?i)<\s*script"),
            ("javascript url", r"(?i)javascript\s*:"),
            ("base64 data url", r"(?i)data:[^,;]*;base64"),
            ("eval call", r"(?i)\beval\s*\("),
            ("exec call", r"(?i)\bexec\s*\("),
        ]
        .into_iter()
        .map(|(label, pattern)| (label, Regex::new(pattern).unwrap()))
        .collect()
    })
}

/// Pre-processing filter applied before the intake stage. Returns the cleaned
/// text or the reason the input cannot be processed.
pub fn sanitize(raw: &str) -> Result<String, InputError> {
    let cleaned = raw.trim();
    if cleaned.is_empty() {
        return Err(InputError::Empty);
    }
    if cleaned.chars().count() > MAX_INPUT_LEN {
        return Err(InputError::TooLong { max: MAX_INPUT_LEN });
    }
    for (label, pattern) in blocklist() {
        if pattern.is_match(cleaned) {
            return Err(InputError::Unsafe((*label).to_string()));
        }
    }
    Ok(cleaned.to_string())
}

/// Entry point for loosely-typed callers (demo scripts, JSON payloads).
pub fn sanitize_value(raw: &Value) -> Result<String, InputError> {
    match raw {
        Value::String(text) => sanitize(text),
        _ => Err(InputError::WrongType),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_and_trims_ordinary_text() {
        assert_eq!(sanitize("  plan a picnic  ").unwrap(), "plan a picnic");
    }

    #[test]
    fn rejects_empty_and_whitespace_input() {
        assert_eq!(sanitize(""), Err(InputError::Empty));
        assert_eq!(sanitize("   \n\t "), Err(InputError::Empty));
    }

    #[test]
    fn rejects_over_long_input() {
        let long = "a".repeat(MAX_INPUT_LEN + 1);
        assert_eq!(sanitize(&long), Err(InputError::TooLong { max: MAX_INPUT_LEN }));
        let exactly = "a".repeat(MAX_INPUT_LEN);
        assert!(sanitize(&exactly).is_ok());
    }

    #[test]
    fn rejects_script_tags() {
        assert!(matches!(
            sanitize("hello <script>alert(1)</script>"),
            Err(InputError::Unsafe(_))
        ));
        assert!(matches!(
            sanitize("hello < SCRIPT src=x>"),
            Err(InputError::Unsafe(_))
        ));
    }

    #[test]
    fn rejects_javascript_urls_and_data_urls() {
        assert!(matches!(
            sanitize("click javascript:doEvil()"),
            Err(InputError::Unsafe(_))
        ));
        assert!(matches!(
            sanitize("img src data:text/html;base64,PHNjcmlwdD4="),
            Err(InputError::Unsafe(_))
        ));
    }

    #[test]
    fn rejects_eval_and_exec_calls() {
        assert!(matches!(sanitize("please eval(payload)"), Err(InputError::Unsafe(_))));
        assert!(matches!(sanitize("run exec (cmd)"), Err(InputError::Unsafe(_))));
        // Words that merely contain the letters are fine.
        assert!(sanitize("medieval executive summary").is_ok());
    }

    #[test]
    fn wrong_type_inputs_are_reported() {
        assert_eq!(sanitize_value(&json!(42)), Err(InputError::WrongType));
        assert_eq!(sanitize_value(&json!(["a"])), Err(InputError::WrongType));
        assert_eq!(sanitize_value(&json!("fine")).unwrap(), "fine");
    }
}
