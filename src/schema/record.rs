// src/schema/record.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{
    MAX_DESCRIPTION_LEN, MAX_INPUT_LEN, MAX_RESPONSE_LEN, clamp_text, clamp01, generate_id,
    utc_timestamp,
};

/// Task priority. Unknown values clamp to `Medium` instead of rejecting the
/// record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn coerce(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            _ => Self::Medium,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        Ok(raw.as_str().map(Self::coerce).unwrap_or_default())
    }
}

/// Task status. Unknown values clamp to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Blocked,
}

impl TaskStatus {
    pub fn coerce(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "pending" => Self::Pending,
            "in_progress" => Self::InProgress,
            "completed" => Self::Completed,
            "blocked" => Self::Blocked,
            _ => Self::Pending,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Blocked => write!(f, "blocked"),
        }
    }
}

impl<'de> Deserialize<'de> for TaskStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        Ok(raw.as_str().map(Self::coerce).unwrap_or_default())
    }
}

/// One unit of work within a plan. `details` is an open map; known keys are
/// `category`, `estimated_time` and the `ai_generated` provenance flag, but
/// extra keys are preserved as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub description: String,
    pub priority: Priority,
    pub status: TaskStatus,
    #[serde(default)]
    pub details: BTreeMap<String, Value>,
}

impl Task {
    pub fn new(description: &str, priority: Priority, details: BTreeMap<String, Value>) -> Self {
        Self {
            id: generate_id("task"),
            description: clamp_text(description, MAX_DESCRIPTION_LEN),
            priority,
            status: TaskStatus::Pending,
            details,
        }
    }

    pub fn category(&self) -> &str {
        self.details
            .get("category")
            .and_then(Value::as_str)
            .unwrap_or("general")
    }

    pub fn estimated_time(&self) -> Option<&str> {
        self.details.get("estimated_time").and_then(Value::as_str)
    }
}

/// Output of the intake stage. Exactly one of `response` (non-empty) or
/// `error` is set; the two constructors keep that invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntakeRecord {
    pub kind: String,
    pub input: String,
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
}

impl IntakeRecord {
    pub fn answered(input: &str, response: &str) -> Self {
        Self {
            kind: "intake".into(),
            input: clamp_text(input, MAX_INPUT_LEN),
            response: clamp_text(response, MAX_RESPONSE_LEN),
            error: None,
            timestamp: utc_timestamp(),
        }
    }

    pub fn rejected(input: &str, error: &str) -> Self {
        Self {
            kind: "intake".into(),
            input: clamp_text(input, MAX_INPUT_LEN),
            response: String::new(),
            error: Some(error.to_string()),
            timestamp: utc_timestamp(),
        }
    }
}

/// Output of the plan stage. Task order is presentation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRecord {
    pub kind: String,
    pub plan_id: String,
    pub tasks: Vec<Task>,
    pub timestamp: String,
}

impl PlanRecord {
    pub fn new(plan_id: String, tasks: Vec<Task>) -> Self {
        Self {
            kind: "plan".into(),
            plan_id,
            tasks,
            timestamp: utc_timestamp(),
        }
    }
}

/// A plan copy-extended with refinement metadata. The stage never mutates the
/// original plan record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinedPlan {
    #[serde(flatten)]
    pub plan: PlanRecord,
    pub refinement_status: String,
    pub missing_details_count: usize,
    pub completeness_score: f64,
    pub improvement_suggestions: Vec<String>,
}

impl RefinedPlan {
    pub fn reviewed(
        plan: &PlanRecord,
        status: &str,
        missing_count: usize,
        score: f64,
        suggestions: Vec<String>,
    ) -> Self {
        Self {
            plan: plan.clone(),
            refinement_status: status.to_string(),
            missing_details_count: missing_count,
            completeness_score: clamp01(score),
            improvement_suggestions: suggestions,
        }
    }
}

/// Output of the refinement stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementRecord {
    pub kind: String,
    pub refined_plan: RefinedPlan,
    pub questions: Vec<String>,
    pub missing_details: Vec<String>,
    pub timestamp: String,
}

impl RefinementRecord {
    pub fn new(refined_plan: RefinedPlan, questions: Vec<String>, missing_details: Vec<String>) -> Self {
        Self {
            kind: "refinement".into(),
            refined_plan,
            questions,
            missing_details,
            timestamp: utc_timestamp(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Clarification,
    TaskExecution,
    DetailGathering,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    pub id: String,
    pub kind: ActionKind,
    pub description: String,
    pub priority: Priority,
    #[serde(default)]
    pub details: BTreeMap<String, Value>,
}

impl ActionItem {
    pub fn new(
        kind: ActionKind,
        description: &str,
        priority: Priority,
        details: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            id: generate_id("action"),
            kind,
            description: clamp_text(description, MAX_DESCRIPTION_LEN),
            priority,
            details,
        }
    }
}

/// Consolidated view synthesized by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalView {
    pub summary: String,
    pub action_plan: Vec<ActionItem>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRecord {
    pub id: String,
    pub input: String,
    pub intake: IntakeRecord,
    pub plan: PlanRecord,
    pub refinement: RefinementRecord,
    #[serde(rename = "final")]
    pub final_view: FinalView,
    pub timestamp: String,
}

impl PipelineRecord {
    pub fn new(
        id: String,
        input: &str,
        intake: IntakeRecord,
        plan: PlanRecord,
        refinement: RefinementRecord,
        final_view: FinalView,
    ) -> Self {
        Self {
            id,
            input: input.to_string(),
            intake,
            plan,
            refinement,
            final_view,
            timestamp: utc_timestamp(),
        }
    }
}

/// Terminal failure shape. Still well-formed and serializable, with a
/// degraded final view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineFailureRecord {
    pub id: String,
    pub input: String,
    pub error: String,
    pub status: String,
    #[serde(rename = "final")]
    pub final_view: FinalView,
    pub timestamp: String,
}

impl PipelineFailureRecord {
    pub fn new(id: String, input: &str, error: &str, final_view: FinalView) -> Self {
        Self {
            id,
            input: input.to_string(),
            error: error.to_string(),
            status: "failed".into(),
            final_view,
            timestamp: utc_timestamp(),
        }
    }
}

/// What `Orchestrator::run` hands back: one of the two record shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PipelineReport {
    Completed(PipelineRecord),
    Failed(PipelineFailureRecord),
}

impl PipelineReport {
    pub fn id(&self) -> &str {
        match self {
            Self::Completed(record) => &record.id,
            Self::Failed(record) => &record.id,
        }
    }

    pub fn final_view(&self) -> &FinalView {
        match self {
            Self::Completed(record) => &record.final_view,
            Self::Failed(record) => &record.final_view,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn priority_coerces_unknown_values_to_medium() {
        assert_eq!(Priority::coerce("high"), Priority::High);
        assert_eq!(Priority::coerce("LOW"), Priority::Low);
        assert_eq!(Priority::coerce("urgent"), Priority::Medium);
        assert_eq!(Priority::coerce(""), Priority::Medium);
    }

    #[test]
    fn priority_deserializes_without_rejecting() {
        let p: Priority = serde_json::from_value(json!("critical")).unwrap();
        assert_eq!(p, Priority::Medium);
        let p: Priority = serde_json::from_value(json!(3)).unwrap();
        assert_eq!(p, Priority::Medium);
        let p: Priority = serde_json::from_value(json!("low")).unwrap();
        assert_eq!(p, Priority::Low);
    }

    #[test]
    fn status_coerces_unknown_values_to_pending() {
        assert_eq!(TaskStatus::coerce("in_progress"), TaskStatus::InProgress);
        assert_eq!(TaskStatus::coerce("done"), TaskStatus::Pending);
        let s: TaskStatus = serde_json::from_value(json!("cancelled")).unwrap();
        assert_eq!(s, TaskStatus::Pending);
    }

    #[test]
    fn priority_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"high\"");
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
    }

    #[test]
    fn task_clamps_description() {
        let long = "d".repeat(600);
        let task = Task::new(&long, Priority::High, BTreeMap::new());
        assert_eq!(task.description.chars().count(), 500);
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.id.starts_with("task_"));
    }

    #[test]
    fn task_detail_accessors_fall_back() {
        let task = Task::new("bare", Priority::Medium, BTreeMap::new());
        assert_eq!(task.category(), "general");
        assert_eq!(task.estimated_time(), None);
    }

    #[test]
    fn intake_constructors_keep_the_response_error_invariant() {
        let ok = IntakeRecord::answered("hello", "hi there");
        assert!(!ok.response.is_empty());
        assert!(ok.error.is_none());

        let bad = IntakeRecord::rejected("", "Invalid or empty input provided");
        assert!(bad.response.is_empty());
        assert!(bad.error.is_some());
        assert_eq!(bad.kind, "intake");
    }

    #[test]
    fn refined_plan_is_a_copy_with_clamped_score() {
        let plan = PlanRecord::new("plan_00000001".into(), Vec::new());
        let refined = RefinedPlan::reviewed(&plan, "reviewed", 2, 1.8, Vec::new());
        assert_eq!(refined.plan, plan);
        assert_eq!(refined.completeness_score, 1.0);
        assert_eq!(refined.missing_details_count, 2);
    }

    #[test]
    fn refined_plan_flattens_plan_fields() {
        let plan = PlanRecord::new("plan_00000002".into(), Vec::new());
        let refined = RefinedPlan::reviewed(&plan, "reviewed", 0, 0.6, Vec::new());
        let value = serde_json::to_value(&refined).unwrap();
        assert_eq!(value["plan_id"], "plan_00000002");
        assert_eq!(value["kind"], "plan");
        assert_eq!(value["refinement_status"], "reviewed");
    }

    #[test]
    fn task_round_trips_through_serde() {
        let mut details = BTreeMap::new();
        details.insert("category".to_string(), json!("planning"));
        details.insert("estimated_time".to_string(), json!("1 hour"));
        details.insert("extra".to_string(), json!({"nested": true}));
        let task = Task::new("Round trip", Priority::Low, details);

        let value = serde_json::to_value(&task).unwrap();
        let back: Task = serde_json::from_value(value).unwrap();
        assert_eq!(back, task);
    }

    #[test]
    fn failure_record_is_tagged_failed() {
        let view = FinalView {
            summary: "Error processing request: boom".into(),
            action_plan: Vec::new(),
            recommendations: Vec::new(),
        };
        let record = PipelineFailureRecord::new("pipeline_0000beef".into(), "x", "boom", view);
        assert_eq!(record.status, "failed");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["final"]["summary"], "Error processing request: boom");
    }
}
