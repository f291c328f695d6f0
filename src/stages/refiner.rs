// src/stages/refiner.rs

use std::sync::Arc;

use serde_json::Value;

use crate::adapter;
use crate::config::PipelineConfig;
use crate::llm::{Completion, CompletionClient, CompletionRequest, Message};
use crate::schema::clamp01;
use crate::schema::record::{PlanRecord, RefinedPlan, RefinementRecord, Task};
use crate::stages::StageError;
use crate::validation;

const SYSTEM_PROMPT: &str = "\
You are the refinement stage of a request-processing pipeline.

Your role:
- Review plans from the plan stage
- Identify missing or ambiguous details
- Generate clarifying questions
- Suggest improvements and calculate a completeness score

Guidelines:
- Look for missing details: timelines, resources, stakeholders, success criteria
- Generate 3-8 relevant clarifying questions
- Focus on practical, actionable questions
- Be thorough but not overwhelming";

const QUESTION_CAP: usize = 10;

/// Required information slots per task category. Detection rules exist for
/// the timeline, resources, stakeholders and success_criteria slots; other
/// slots have no rule and never report as missing.
fn required_slots(category: &str) -> &'static [&'static str] {
    match category {
        "planning" => &["timeline", "resources", "stakeholders", "success_criteria"],
        "problem_solving" => &[
            "problem_definition",
            "constraints",
            "success_metrics",
            "alternatives",
        ],
        "project" => &["requirements", "deliverables", "timeline", "budget", "team"],
        "event" => &["date", "location", "attendees", "agenda", "budget"],
        _ => &["objectives", "constraints", "success_criteria"],
    }
}

/// Third pipeline stage: analyzes a plan for completeness, producing
/// clarifying questions and a score.
pub struct RefinementStage {
    config: PipelineConfig,
    client: Arc<dyn CompletionClient>,
}

impl RefinementStage {
    pub fn new(config: PipelineConfig, client: Arc<dyn CompletionClient>) -> Self {
        Self { config, client }
    }

    pub fn refine(&self, plan: &PlanRecord) -> Result<RefinementRecord, StageError> {
        if self.config.ai_enabled {
            if let Some(record) = self.model_analysis(plan)? {
                return Ok(record);
            }
        }

        if self.config.fallback_enabled {
            let missing_details = identify_missing_details(&plan.tasks);
            let questions = generate_questions(&plan.tasks, &missing_details);
            let suggestions = improvement_suggestions(&missing_details);
            let score = completeness_score(plan.tasks.len(), missing_details.len());
            let refined = RefinedPlan::reviewed(
                plan,
                "reviewed",
                missing_details.len(),
                score,
                suggestions,
            );
            return Ok(RefinementRecord::new(refined, questions, missing_details));
        }

        let refined = RefinedPlan::reviewed(plan, "unreviewed", 0, 0.0, Vec::new());
        Ok(RefinementRecord::new(refined, Vec::new(), Vec::new()))
    }

    fn model_analysis(&self, plan: &PlanRecord) -> Result<Option<RefinementRecord>, StageError> {
        let plan_summary = serde_json::to_string_pretty(plan)?;
        let request = CompletionRequest {
            messages: vec![Message::user(format!(
                "Analyze this plan and identify what information is missing or unclear:\n\n\
                 {plan_summary}\n\n\
                 Please provide:\n\
                 1. A list of specific missing details or information gaps\n\
                 2. 3-8 clarifying questions that would help make this plan more complete and actionable\n\
                 3. A completeness score (0-1) for the current plan\n\
                 4. Specific suggestions for improvement\n\n\
                 Focus on practical details needed for successful execution."
            ))],
            system_prompt: SYSTEM_PROMPT.to_string(),
            expected_fields: vec![
                "missing_details",
                "questions",
                "completeness_score",
                "suggestions",
            ],
        };

        match self.client.complete(&request) {
            Ok(Completion::Structured(object)) => {
                validation::warn_on_gaps(
                    "refiner",
                    &Value::Object(object.clone()),
                    &["missing_details", "questions", "completeness_score", "suggestions"],
                );
                Ok(Some(structured_analysis(plan, &object)))
            }
            Ok(Completion::Text(text)) => Ok(Some(text_analysis(plan, &text))),
            Err(err) => {
                log::warn!("refiner: model path failed, falling through: {err}");
                Ok(None)
            }
        }
    }
}

fn structured_analysis(plan: &PlanRecord, object: &serde_json::Map<String, Value>) -> RefinementRecord {
    let missing_details = string_list(object.get("missing_details"));
    let questions = string_list(object.get("questions"));
    let suggestions = string_list(object.get("suggestions"));
    let score = object
        .get("completeness_score")
        .and_then(Value::as_f64)
        .unwrap_or(0.5);

    let refined = RefinedPlan::reviewed(plan, "ai_reviewed", missing_details.len(), score, suggestions);
    RefinementRecord::new(refined, questions, missing_details)
}

fn text_analysis(plan: &PlanRecord, text: &str) -> RefinementRecord {
    let analysis = adapter::analysis_from_text(text);

    let questions = if analysis.questions.is_empty() {
        vec!["What additional details would help make this plan more specific?".to_string()]
    } else {
        analysis.questions
    };
    let missing_details = if analysis.missing_details.is_empty() {
        vec!["More specific requirements and constraints needed".to_string()]
    } else {
        analysis.missing_details
    };

    let suggestions = vec!["Review the generated analysis for detailed recommendations".to_string()];
    let refined = RefinedPlan::reviewed(plan, "ai_reviewed", missing_details.len(), 0.6, suggestions);
    RefinementRecord::new(refined, questions, missing_details)
}

/// Scalar reply fields coerce to a one-element list; null and absent fields
/// coerce to empty.
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(entries)) => entries
            .iter()
            .map(|entry| match entry {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::String(text)) => vec![text.clone()],
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other.to_string()],
    }
}

fn identify_missing_details(tasks: &[Task]) -> Vec<String> {
    let mut missing = Vec::new();

    for task in tasks {
        let slots = required_slots(task.category());
        let description = &task.description;

        if slots.contains(&"timeline") && !has_timeline(task) {
            missing.push(format!("Specific timeline/deadline for task: {description}"));
        }
        if slots.contains(&"resources") && !has_resources(task) {
            missing.push(format!("Required resources for task: {description}"));
        }
        if slots.contains(&"stakeholders") && !has_stakeholders(task) {
            missing.push(format!("Responsible parties/stakeholders for task: {description}"));
        }
        if slots.contains(&"success_criteria") && !has_success_criteria(task) {
            missing.push(format!("Success criteria/acceptance criteria for task: {description}"));
        }
        if is_vague(description) {
            missing.push(format!("More specific details needed for task: {description}"));
        }
    }

    missing
}

fn has_timeline(task: &Task) -> bool {
    match task.estimated_time() {
        Some(estimate) => !estimate.is_empty() && !estimate.to_lowercase().contains("varies"),
        None => false,
    }
}

fn has_resources(task: &Task) -> bool {
    task.details.contains_key("resources") || task.details.contains_key("budget")
}

fn has_stakeholders(task: &Task) -> bool {
    task.details.contains_key("assignee") || task.details.contains_key("responsible_party")
}

fn has_success_criteria(task: &Task) -> bool {
    task.details.contains_key("success_criteria") || task.details.contains_key("acceptance_criteria")
}

fn is_vague(description: &str) -> bool {
    const VAGUE_VERBS: [&str; 6] = ["organize", "plan", "coordinate", "manage", "handle", "deal with"];
    let lower = description.to_lowercase();
    VAGUE_VERBS.iter().any(|verb| lower.contains(verb))
        && description.split_whitespace().count() < 5
}

fn generate_questions(tasks: &[Task], missing_details: &[String]) -> Vec<String> {
    let mut questions = Vec::new();

    for detail in missing_details {
        let lower = detail.to_lowercase();
        if lower.contains("timeline") {
            questions.push("What is the specific deadline or timeline for this task?".to_string());
        } else if lower.contains("resource") {
            questions
                .push("What resources (people, tools, budget) are needed for this task?".to_string());
        } else if lower.contains("stakeholder") {
            questions.push("Who is responsible for completing this task?".to_string());
        } else if lower.contains("success criteria") {
            questions
                .push("How will you know when this task is successfully completed?".to_string());
        } else if lower.contains("specific details") {
            questions.push(
                "Can you provide more specific details about what needs to be done?".to_string(),
            );
        }
    }

    let mut seen_categories: Vec<String> = Vec::new();
    for task in tasks {
        let category = task.category().to_string();
        if !seen_categories.contains(&category) {
            seen_categories.push(category);
        }
    }
    for category in &seen_categories {
        questions.extend(category_questions(category).iter().map(|q| (*q).to_string()));
    }

    dedup_keep_first(questions).into_iter().take(QUESTION_CAP).collect()
}

fn category_questions(category: &str) -> &'static [&'static str] {
    match category {
        "planning" => &[
            "What is the overall budget for this plan?",
            "Who are the key stakeholders that need to be involved?",
        ],
        "problem_solving" => &[
            "What is the root cause of this problem?",
            "What constraints do we need to work within?",
        ],
        "project" => &[
            "What are the specific deliverables expected?",
            "What is the project scope and what is out of scope?",
        ],
        "event" => &[
            "When and where will this event take place?",
            "How many people are expected to attend?",
        ],
        "general" => &[
            "What is the primary objective of this request?",
            "Are there any specific constraints or requirements?",
        ],
        _ => &[],
    }
}

fn dedup_keep_first(entries: Vec<String>) -> Vec<String> {
    let mut kept: Vec<String> = Vec::new();
    for entry in entries {
        if !kept.contains(&entry) {
            kept.push(entry);
        }
    }
    kept
}

// TODO: the +0.1 bonus applies to any non-empty task list regardless of how
// many details are missing; revisit the weighting.
fn completeness_score(task_count: usize, missing_count: usize) -> f64 {
    if task_count == 0 {
        return 0.0;
    }
    let base = 0.5;
    let penalty = f64::min(0.4, missing_count as f64 * 0.05);
    let bonus = 0.1;
    clamp01(base - penalty + bonus)
}

fn improvement_suggestions(missing_details: &[String]) -> Vec<String> {
    let mut suggestions = Vec::new();
    let lowered: Vec<String> = missing_details.iter().map(|d| d.to_lowercase()).collect();

    if lowered.iter().any(|d| d.contains("timeline")) {
        suggestions.push("Add specific deadlines and time estimates to tasks".to_string());
    }
    if lowered.iter().any(|d| d.contains("resource")) {
        suggestions.push("Identify and document required resources for each task".to_string());
    }
    if lowered.iter().any(|d| d.contains("stakeholder")) {
        suggestions.push("Assign responsible parties for each task".to_string());
    }
    if lowered.iter().any(|d| d.contains("success criteria")) {
        suggestions.push("Define clear success criteria and acceptance criteria".to_string());
    }
    if missing_details.len() > 5 {
        suggestions.push(
            "Consider breaking down complex tasks into smaller, more specific sub-tasks"
                .to_string(),
        );
    }
    suggestions
}
