// src/stages/planner.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Value, json};

use crate::adapter;
use crate::config::PipelineConfig;
use crate::llm::{Completion, CompletionClient, CompletionRequest, Message};
use crate::schema::generate_id;
use crate::schema::record::{IntakeRecord, PlanRecord, Priority, Task};
use crate::stages::StageError;
use crate::validation;

const SYSTEM_PROMPT: &str = "\
You are the plan stage of a request-processing pipeline.

Your role:
- Analyze the intake stage's initial assessment
- Create structured, step-by-step plans
- Break down complex requests into manageable tasks
- Prioritize tasks appropriately

Guidelines:
- Create 3-6 well-defined tasks
- Use clear, actionable descriptions
- Assign appropriate priorities (high, medium, low)
- Consider different categories: planning, problem_solving, project, event, general
- Include realistic time estimates

Focus on creating practical, executable plans that address the request comprehensively.";

/// Second pipeline stage: expands the intake output into an ordered task
/// list.
pub struct PlanStage {
    config: PipelineConfig,
    client: Arc<dyn CompletionClient>,
}

impl PlanStage {
    pub fn new(config: PipelineConfig, client: Arc<dyn CompletionClient>) -> Self {
        Self { config, client }
    }

    /// An intake record carrying an input error yields an empty plan; the
    /// error travels in-band, nothing is planned over invalid input.
    pub fn create_plan(&self, intake: &IntakeRecord) -> Result<PlanRecord, StageError> {
        let plan_id = generate_id("plan");

        if intake.error.is_some() {
            return Ok(PlanRecord::new(plan_id, Vec::new()));
        }

        if self.config.ai_enabled {
            let tasks = self.model_tasks(&intake.input, &intake.response);
            if !tasks.is_empty() {
                return Ok(PlanRecord::new(plan_id, tasks));
            }
        }

        if self.config.fallback_enabled {
            return Ok(PlanRecord::new(plan_id, rule_tasks(&intake.input)));
        }

        Ok(PlanRecord::new(plan_id, Vec::new()))
    }

    fn model_tasks(&self, input: &str, intake_response: &str) -> Vec<Task> {
        let request = CompletionRequest {
            messages: vec![Message::user(format!(
                "User request: {input}\n\
                 Initial assessment: {intake_response}\n\n\
                 Please create a detailed plan with 3-6 specific, actionable tasks. For each task, provide:\n\
                 - Clear, specific description\n\
                 - Priority level (high/medium/low)\n\
                 - Category (planning/problem_solving/project/event/general)\n\
                 - Realistic time estimate\n\n\
                 Focus on practical, executable tasks that directly address the request."
            ))],
            system_prompt: SYSTEM_PROMPT.to_string(),
            expected_fields: vec!["tasks", "plan_summary"],
        };

        match self.client.complete(&request) {
            Ok(Completion::Structured(object)) => {
                validation::warn_on_gaps(
                    "planner",
                    &Value::Object(object.clone()),
                    &["tasks", "plan_summary"],
                );
                match object.get("tasks") {
                    Some(Value::Array(entries)) => normalize_tasks(entries),
                    _ => Vec::new(),
                }
            }
            Ok(Completion::Text(text)) => tasks_from_text(&text),
            Err(err) => {
                log::warn!("planner: model path failed, falling through: {err}");
                Vec::new()
            }
        }
    }
}

/// Accepts task-like entries from the model: objects with optional fields or
/// bare strings. Anything else is dropped.
fn normalize_tasks(entries: &[Value]) -> Vec<Task> {
    let mut tasks = Vec::new();
    for entry in entries {
        match entry {
            Value::Object(fields) => {
                let description = fields
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or("AI-generated task");
                let priority = fields
                    .get("priority")
                    .and_then(Value::as_str)
                    .map(Priority::coerce)
                    .unwrap_or_default();
                let category = fields
                    .get("category")
                    .and_then(Value::as_str)
                    .unwrap_or("general");
                let estimated_time = fields
                    .get("estimated_time")
                    .and_then(Value::as_str)
                    .unwrap_or("varies");
                tasks.push(Task::new(
                    description,
                    priority,
                    model_details(category, estimated_time),
                ));
            }
            Value::String(description) => {
                tasks.push(Task::new(
                    description,
                    Priority::Medium,
                    model_details("general", "varies"),
                ));
            }
            _ => {}
        }
    }
    tasks
}

fn tasks_from_text(text: &str) -> Vec<Task> {
    let descriptions = adapter::bullet_lines(text);
    if descriptions.is_empty() {
        return default_tasks();
    }
    descriptions
        .into_iter()
        .map(|description| {
            Task::new(&description, Priority::Medium, model_details("general", "varies"))
        })
        .collect()
}

/// Recovery list used when a free-text reply has no recognizable tasks.
fn default_tasks() -> Vec<Task> {
    vec![
        Task::new(
            "Analyze and define project requirements",
            Priority::High,
            fallback_details("general", "1-2 hours"),
        ),
        Task::new(
            "Research and gather necessary resources",
            Priority::Medium,
            fallback_details("general", "1 hour"),
        ),
        Task::new(
            "Execute planned activities",
            Priority::Medium,
            fallback_details("general", "varies"),
        ),
    ]
}

fn rule_tasks(input: &str) -> Vec<Task> {
    if super::contains_any(input, &["plan", "organize", "schedule"]) {
        planning_tasks()
    } else if super::contains_any(input, &["problem", "issue", "solve", "fix"]) {
        problem_solving_tasks()
    } else if super::contains_any(input, &["project", "build", "create", "develop"]) {
        project_tasks()
    } else if super::contains_any(input, &["event", "meeting", "conference", "workshop"]) {
        event_tasks()
    } else {
        general_tasks(input)
    }
}

fn planning_tasks() -> Vec<Task> {
    vec![
        Task::new(
            "Define project scope and objectives",
            Priority::High,
            template_details("planning", "1-2 hours"),
        ),
        Task::new(
            "Identify required resources and constraints",
            Priority::High,
            template_details("planning", "30-60 minutes"),
        ),
        Task::new(
            "Create timeline and milestones",
            Priority::Medium,
            template_details("planning", "1 hour"),
        ),
        Task::new(
            "Assign responsibilities and roles",
            Priority::Medium,
            template_details("planning", "30 minutes"),
        ),
    ]
}

fn problem_solving_tasks() -> Vec<Task> {
    vec![
        Task::new(
            "Analyze and define the problem clearly",
            Priority::High,
            template_details("problem_solving", "30-60 minutes"),
        ),
        Task::new(
            "Research potential solutions and approaches",
            Priority::High,
            template_details("problem_solving", "1-2 hours"),
        ),
        Task::new(
            "Evaluate and select best solution approach",
            Priority::Medium,
            template_details("problem_solving", "45 minutes"),
        ),
        Task::new(
            "Implement solution and monitor results",
            Priority::Medium,
            template_details("problem_solving", "varies"),
        ),
    ]
}

fn project_tasks() -> Vec<Task> {
    vec![
        Task::new(
            "Define project requirements and specifications",
            Priority::High,
            template_details("project", "2-3 hours"),
        ),
        Task::new(
            "Design project architecture and structure",
            Priority::High,
            template_details("project", "1-2 hours"),
        ),
        Task::new(
            "Implement core functionality",
            Priority::Medium,
            template_details("project", "varies"),
        ),
        Task::new(
            "Test and validate implementation",
            Priority::Medium,
            template_details("project", "1-2 hours"),
        ),
    ]
}

fn event_tasks() -> Vec<Task> {
    vec![
        Task::new(
            "Define event purpose and target audience",
            Priority::High,
            template_details("event", "1 hour"),
        ),
        Task::new(
            "Plan event logistics and venue requirements",
            Priority::High,
            template_details("event", "2-3 hours"),
        ),
        Task::new(
            "Coordinate speakers, materials, and resources",
            Priority::Medium,
            template_details("event", "varies"),
        ),
        Task::new(
            "Execute event and gather feedback",
            Priority::Low,
            template_details("event", "event duration + 1 hour"),
        ),
    ]
}

fn general_tasks(input: &str) -> Vec<Task> {
    vec![
        Task::new(
            &format!("Analyze request: {input}"),
            Priority::High,
            template_details("general", "30 minutes"),
        ),
        Task::new(
            "Research relevant information and best practices",
            Priority::Medium,
            template_details("general", "1-2 hours"),
        ),
        Task::new(
            "Develop actionable recommendations",
            Priority::Medium,
            template_details("general", "45 minutes"),
        ),
    ]
}

fn template_details(category: &str, estimated_time: &str) -> BTreeMap<String, Value> {
    BTreeMap::from([
        ("category".to_string(), json!(category)),
        ("estimated_time".to_string(), json!(estimated_time)),
    ])
}

fn model_details(category: &str, estimated_time: &str) -> BTreeMap<String, Value> {
    let mut details = template_details(category, estimated_time);
    details.insert("ai_generated".to_string(), json!(true));
    details
}

fn fallback_details(category: &str, estimated_time: &str) -> BTreeMap<String, Value> {
    let mut details = template_details(category, estimated_time);
    details.insert("ai_generated".to_string(), json!(false));
    details
}
