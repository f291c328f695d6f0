// src/orchestrator/mod.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;

use crate::config::PipelineConfig;
use crate::llm::{CompletionClient, OllamaClient};
use crate::schema::generate_id;
use crate::schema::record::{
    ActionItem, ActionKind, FinalView, IntakeRecord, PipelineFailureRecord, PipelineRecord,
    PipelineReport, PlanRecord, Priority, RefinementRecord,
};
use crate::stages::{IntakeStage, PlanStage, RefinementStage, StageError};

/// Sequences the three stages and consolidates their outputs. Holds no locks
/// and no cross-call state; every run builds fresh records.
pub struct Orchestrator {
    intake: IntakeStage,
    planner: PlanStage,
    refiner: RefinementStage,
}

impl Orchestrator {
    pub fn new(config: PipelineConfig) -> Self {
        let client: Arc<dyn CompletionClient> = Arc::new(OllamaClient::new(&config));
        Self::with_client(config, client)
    }

    /// Seam for callers that bring their own backend.
    pub fn with_client(config: PipelineConfig, client: Arc<dyn CompletionClient>) -> Self {
        Self {
            intake: IntakeStage::new(config.clone(), Arc::clone(&client)),
            planner: PlanStage::new(config.clone(), Arc::clone(&client)),
            refiner: RefinementStage::new(config, client),
        }
    }

    /// Run one request through intake, planning and refinement. The returned
    /// report is always well-formed: a stage failure that escapes its own
    /// fallbacks becomes a failure record, never an error.
    pub fn run(&self, input: &str) -> PipelineReport {
        let pipeline_id = generate_id("pipeline");

        match self.run_stages(input) {
            Ok((intake, plan, refinement)) => {
                let final_view = consolidate(&intake, &plan, &refinement);
                PipelineReport::Completed(PipelineRecord::new(
                    pipeline_id,
                    input,
                    intake,
                    plan,
                    refinement,
                    final_view,
                ))
            }
            Err(err) => {
                log::error!("pipeline {pipeline_id} failed: {err}");
                PipelineReport::Failed(failure_record(pipeline_id, input, &err))
            }
        }
    }

    fn run_stages(
        &self,
        input: &str,
    ) -> Result<(IntakeRecord, PlanRecord, RefinementRecord), StageError> {
        let intake = self.intake.process(input)?;
        let plan = self.planner.create_plan(&intake)?;
        let refinement = self.refiner.refine(&plan)?;
        Ok((intake, plan, refinement))
    }
}

fn consolidate(
    intake: &IntakeRecord,
    plan: &PlanRecord,
    refinement: &RefinementRecord,
) -> FinalView {
    FinalView {
        summary: summary(intake, plan, refinement),
        action_plan: action_plan(plan, refinement),
        recommendations: recommendations(refinement),
    }
}

fn summary(intake: &IntakeRecord, plan: &PlanRecord, refinement: &RefinementRecord) -> String {
    format!(
        "Processing completed for request: '{}'. Generated {} tasks and identified {} clarifying questions. Initial assessment: {}",
        intake.input,
        plan.tasks.len(),
        refinement.questions.len(),
        intake.response
    )
}

fn action_plan(plan: &PlanRecord, refinement: &RefinementRecord) -> Vec<ActionItem> {
    let mut items = Vec::new();
    let questions = &refinement.questions;
    let missing_details = &refinement.missing_details;

    if !questions.is_empty() {
        items.push(ActionItem::new(
            ActionKind::Clarification,
            "Address clarifying questions before proceeding",
            Priority::High,
            BTreeMap::from([
                ("questions_count".to_string(), json!(questions.len())),
                (
                    "questions".to_string(),
                    json!(questions.iter().take(3).collect::<Vec<_>>()),
                ),
            ]),
        ));
    }

    for task in &plan.tasks {
        items.push(ActionItem::new(
            ActionKind::TaskExecution,
            &task.description,
            task.priority,
            BTreeMap::from([
                ("task_id".to_string(), json!(task.id)),
                ("category".to_string(), json!(task.category())),
                (
                    "estimated_time".to_string(),
                    json!(task.estimated_time().unwrap_or("unknown")),
                ),
            ]),
        ));
    }

    if !missing_details.is_empty() {
        items.push(ActionItem::new(
            ActionKind::DetailGathering,
            "Gather additional details for complete planning",
            Priority::Medium,
            BTreeMap::from([
                ("missing_details_count".to_string(), json!(missing_details.len())),
                (
                    "examples".to_string(),
                    json!(missing_details.iter().take(3).collect::<Vec<_>>()),
                ),
            ]),
        ));
    }

    items
}

fn recommendations(refinement: &RefinementRecord) -> Vec<String> {
    let mut recommendations = Vec::new();
    let refined = &refinement.refined_plan;

    if refined.completeness_score < 0.7 {
        recommendations.push(
            "Consider providing more specific details to improve plan completeness".to_string(),
        );
    }
    recommendations.extend(refined.improvement_suggestions.iter().cloned());
    if refinement.questions.len() > 5 {
        recommendations.push(
            "Break down your request into smaller, more specific components for better planning"
                .to_string(),
        );
    }
    if refinement.missing_details.len() > 3 {
        recommendations.push(
            "Define clear timelines, resources, and success criteria for better execution"
                .to_string(),
        );
    }
    recommendations
        .push("Review the generated questions and provide answers to refine the plan further".to_string());
    recommendations
}

fn failure_record(id: String, input: &str, err: &StageError) -> PipelineFailureRecord {
    let final_view = FinalView {
        summary: format!("Error processing request: {err}"),
        action_plan: Vec::new(),
        recommendations: vec![
            "Please try rephrasing your request".to_string(),
            "Ensure your input is clear and specific".to_string(),
        ],
    };
    PipelineFailureRecord::new(id, input, &err.to_string(), final_view)
}
