// src/llm/mod.rs

use std::time::Duration;

use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::adapter;
use crate::config::PipelineConfig;

#[derive(Debug, Clone)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub system_prompt: String,
    /// Field names the caller expects in a structured reply. Empty means the
    /// reply stays plain text.
    pub expected_fields: Vec<&'static str>,
}

#[derive(Debug, Clone)]
pub enum Completion {
    Text(String),
    Structured(Map<String, Value>),
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("reply missing 'response' field")]
    MalformedReply,
    #[error("no reply after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
}

/// Boundary to the generative backend. Implementations fail transiently;
/// callers treat any error as "no answer" and fall through to their rule
/// path.
pub trait CompletionClient: Send + Sync {
    fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError>;
}

/// Blocking client for a local Ollama endpoint.
pub struct OllamaClient {
    model: String,
    url: String,
    max_retries: u32,
    timeout: Duration,
}

impl OllamaClient {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            model: config.model.clone(),
            url: config.base_url.clone(),
            max_retries: config.max_retries.max(1),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let client = reqwest::blocking::Client::new();
        let payload = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false
        });

        let response = client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&payload)
            .send()?;
        let body: Value = response.json()?;

        match body.get("response").and_then(Value::as_str) {
            Some(text) => Ok(text.trim().to_string()),
            None => Err(LlmError::MalformedReply),
        }
    }
}

impl CompletionClient for OllamaClient {
    fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let prompt = render_prompt(request);
        let mut last = LlmError::RetriesExhausted {
            attempts: self.max_retries,
        };

        for attempt in 1..=self.max_retries {
            match self.generate(&prompt) {
                Ok(text) => return Ok(interpret_reply(text, &request.expected_fields)),
                Err(err) => {
                    log::warn!("model call attempt {attempt}/{} failed: {err}", self.max_retries);
                    last = err;
                }
            }
        }
        Err(last)
    }
}

fn render_prompt(request: &CompletionRequest) -> String {
    let mut prompt = String::new();
    if !request.system_prompt.is_empty() {
        prompt.push_str(request.system_prompt.trim());
        prompt.push_str("\n\n");
    }
    for message in &request.messages {
        prompt.push_str(message.content.trim());
        prompt.push('\n');
    }
    prompt
}

/// Structured replies are only attempted when the caller named expected
/// fields; otherwise the text passes through untouched.
fn interpret_reply(text: String, expected_fields: &[&'static str]) -> Completion {
    if !expected_fields.is_empty() {
        if let Some(object) = adapter::json_object_from_text(&text) {
            return Completion::Structured(object);
        }
    }
    Completion::Text(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_carry_the_user_role() {
        let message = Message::user("hello");
        assert_eq!(message.role, "user");
        assert_eq!(message.content, "hello");
    }

    #[test]
    fn prompt_places_system_text_first() {
        let request = CompletionRequest {
            messages: vec![Message::user("the request")],
            system_prompt: "the instructions".into(),
            expected_fields: Vec::new(),
        };
        let prompt = render_prompt(&request);
        assert!(prompt.starts_with("the instructions"));
        assert!(prompt.contains("the request"));
    }

    #[test]
    fn replies_parse_to_structures_only_when_fields_are_expected() {
        let reply = "{\"tasks\": []}".to_string();
        match interpret_reply(reply.clone(), &["tasks"]) {
            Completion::Structured(object) => assert!(object.contains_key("tasks")),
            Completion::Text(_) => panic!("expected a structured reply"),
        }
        match interpret_reply(reply, &[]) {
            Completion::Text(text) => assert!(text.contains("tasks")),
            Completion::Structured(_) => panic!("expected plain text"),
        }
    }

    #[test]
    fn unparseable_replies_stay_text() {
        match interpret_reply("no json here".to_string(), &["tasks"]) {
            Completion::Text(text) => assert_eq!(text, "no json here"),
            Completion::Structured(_) => panic!("expected plain text"),
        }
    }
}
