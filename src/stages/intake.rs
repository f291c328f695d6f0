use std::sync::Arc;

use serde_json::Value;

use crate::config::PipelineConfig;
use crate::llm::{Completion, CompletionClient, CompletionRequest, Message};
use crate::sanitize;
use crate::schema::record::IntakeRecord;
use crate::stages::StageError;
use crate::validation;

const SYSTEM_PROMPT: &str = "\
You are the intake stage of a request-processing pipeline.

Your role:
- Receive and process initial user requests
- Provide an immediate, helpful response
- Categorize the request for the downstream planning stage

Guidelines:
- Acknowledge the request clearly
- Explain how the request will be handled next
- Keep responses concise but informative";

/// First pipeline stage: validates raw input and produces the initial
/// response, model-backed when possible.
pub struct IntakeStage {
    config: PipelineConfig,
    client: Arc<dyn CompletionClient>,
}

impl IntakeStage {
    pub fn new(config: PipelineConfig, client: Arc<dyn CompletionClient>) -> Self {
        Self { config, client }
    }

    /// Invalid input short-circuits into a record with `error` set; anything
    /// else always yields a response, even with both paths disabled.
    pub fn process(&self, input: &str) -> Result<IntakeRecord, StageError> {
        let cleaned = match sanitize::sanitize(input) {
            Ok(cleaned) => cleaned,
            Err(err) => return Ok(IntakeRecord::rejected(input, &err.to_string())),
        };

        let response = self.generate_response(&cleaned);
        Ok(IntakeRecord::answered(&cleaned, &response))
    }

    fn generate_response(&self, input: &str) -> String {
        if self.config.ai_enabled {
            if let Some(response) = self.model_response(input) {
                return response;
            }
        }
        if self.config.fallback_enabled {
            return rule_response(input);
        }
        "I'm sorry, I'm unable to process your request at the moment. Please try again later."
            .to_string()
    }

    /// Model path. Any failure or unusable shape is soft; the caller falls
    /// through.
    fn model_response(&self, input: &str) -> Option<String> {
        let request = CompletionRequest {
            messages: vec![Message::user(format!(
                "User request: {input}\n\nPlease provide a helpful initial response and explain how this request will be handled."
            ))],
            system_prompt: SYSTEM_PROMPT.to_string(),
            expected_fields: vec!["response"],
        };

        match self.client.complete(&request) {
            Ok(Completion::Text(text)) => {
                let text = text.trim().to_string();
                (!text.is_empty()).then_some(text)
            }
            Ok(Completion::Structured(object)) => {
                validation::warn_on_gaps("intake", &Value::Object(object.clone()), &["response"]);
                object
                    .get("response")
                    .and_then(Value::as_str)
                    .map(|text| text.trim().to_string())
                    .filter(|text| !text.is_empty())
            }
            Err(err) => {
                log::warn!("intake: model path failed, falling through: {err}");
                None
            }
        }
    }
}

fn rule_response(input: &str) -> String {
    if super::contains_any(input, &["plan", "organize", "schedule", "prepare"]) {
        format!(
            "I can help you create a plan for: {input}. Let me coordinate with the planning stage to develop a structured approach."
        )
    } else if super::contains_any(input, &["question", "ask", "clarify", "explain"]) {
        format!(
            "I understand you need clarification about: {input}. I'll work with the refinement stage to provide detailed answers."
        )
    } else if super::contains_any(input, &["problem", "issue", "solve", "fix"]) {
        format!(
            "I'll help you address this issue: {input}. Let me coordinate the planning and refinement stages to develop a comprehensive solution."
        )
    } else {
        format!(
            "I'll help you with: {input}. Let me coordinate the appropriate stages to provide a comprehensive response."
        )
    }
}
