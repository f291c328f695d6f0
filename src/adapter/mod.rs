// src/adapter/mod.rs
//
// Best-effort text-to-structure for free-form model replies. Everything here
// is pure and total: unparseable input comes back empty, never as an error.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

fn json_block_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{[\s\S]*\}").unwrap())
}

/// Extract the first JSON object from a reply, tolerating code fences and
/// reasoning tags around it.
pub fn json_object_from_text(raw: &str) -> Option<Map<String, Value>> {
    let cleaned = raw
        .lines()
        .filter(|line| {
            let trimmed = line.trim_start();
            !trimmed.starts_with("```")
                && !trimmed.starts_with("<think>")
                && !trimmed.starts_with("</think>")
        })
        .collect::<Vec<_>>()
        .join("\n");

    let block = json_block_pattern().find(&cleaned)?.as_str();
    match serde_json::from_str::<Value>(block) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

/// Bullet lines (`-`, `•`, `*`) become entries; everything else is dropped.
pub fn bullet_lines(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            let trimmed = line.trim();
            trimmed
                .strip_prefix('-')
                .or_else(|| trimmed.strip_prefix('•'))
                .or_else(|| trimmed.strip_prefix('*'))
                .map(|content| content.trim_start_matches(['-', '•', '*', ' ']).trim())
                .filter(|content| !content.is_empty())
                .map(str::to_string)
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextAnalysis {
    pub missing_details: Vec<String>,
    pub questions: Vec<String>,
}

enum Bucket {
    Missing,
    Questions,
}

/// Bucket list entries under the most recently seen section header. Header
/// detection wins over entry extraction, so a bullet that mentions a header
/// keyword switches the bucket instead of becoming an entry.
pub fn analysis_from_text(text: &str) -> TextAnalysis {
    let mut analysis = TextAnalysis::default();
    let mut bucket: Option<Bucket> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let lower = line.to_lowercase();
        if lower.contains("missing") || lower.contains("gap") {
            bucket = Some(Bucket::Missing);
            continue;
        }
        if lower.contains("question") {
            bucket = Some(Bucket::Questions);
            continue;
        }

        let Some(entry) = list_entry(line) else {
            continue;
        };
        match bucket {
            Some(Bucket::Missing) => analysis.missing_details.push(entry),
            Some(Bucket::Questions) => analysis.questions.push(entry),
            None => {}
        }
    }

    analysis
}

fn list_entry(line: &str) -> Option<String> {
    const NUMBERED: [&str; 5] = ["1.", "2.", "3.", "4.", "5."];

    let content = if line.starts_with(['-', '•', '*']) {
        line.trim_start_matches(['-', '•', '*', ' '])
    } else if let Some(prefix) = NUMBERED.iter().find(|prefix| line.starts_with(*prefix)) {
        line[prefix.len()..].trim_start()
    } else {
        return None;
    };

    let content = content.trim();
    (!content.is_empty()).then(|| content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_json_object_from_fenced_reply() {
        let raw = "Here you go:\n```json\n{\"tasks\": [\"a\", \"b\"]}\n```\n";
        let object = json_object_from_text(raw).unwrap();
        assert_eq!(object["tasks"], serde_json::json!(["a", "b"]));
    }

    #[test]
    fn extracts_json_object_past_reasoning_tags() {
        let raw = "<think>\nsome hidden reasoning\n</think>\n{\"response\": \"ok\"}";
        let object = json_object_from_text(raw).unwrap();
        assert_eq!(object["response"], "ok");
    }

    #[test]
    fn returns_none_when_no_object_is_present() {
        assert!(json_object_from_text("no structure here").is_none());
        assert!(json_object_from_text("[1, 2, 3]").is_none());
        assert!(json_object_from_text("{broken json").is_none());
    }

    #[test]
    fn bullet_lines_recognize_each_marker() {
        let text = "intro\n- first task\n• second task\n* third task\nnot a task";
        assert_eq!(bullet_lines(text), vec!["first task", "second task", "third task"]);
    }

    #[test]
    fn bullet_lines_skip_empty_markers() {
        assert_eq!(bullet_lines("- \n-\n- real"), vec!["real"]);
    }

    #[test]
    fn analysis_buckets_follow_section_headers() {
        let text = "\
Missing details:
- no deadline set
- no budget named
Questions:
1. Who owns this?
2. When is it due?";
        let analysis = analysis_from_text(text);
        assert_eq!(analysis.missing_details, vec!["no deadline set", "no budget named"]);
        assert_eq!(analysis.questions, vec!["Who owns this?", "When is it due?"]);
    }

    #[test]
    fn entries_before_any_header_are_dropped() {
        let analysis = analysis_from_text("- floating entry\nQuestions:\n- Why?");
        assert!(analysis.missing_details.is_empty());
        assert_eq!(analysis.questions, vec!["Why?"]);
    }

    #[test]
    fn header_keywords_inside_bullets_switch_the_bucket() {
        let text = "Questions:\n- What gaps remain?\n- Who decides?";
        let analysis = analysis_from_text(text);
        // "gaps" re-routes the bucket rather than producing an entry.
        assert_eq!(analysis.missing_details, vec!["Who decides?"]);
        assert!(analysis.questions.is_empty());
    }

    #[test]
    fn unstructured_text_yields_an_empty_analysis() {
        assert_eq!(analysis_from_text("just prose, nothing else"), TextAnalysis::default());
    }
}
