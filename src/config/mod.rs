// src/config/mod.rs

use std::env;

/// Per-run configuration, passed explicitly into each stage. The two path
/// flags gate which execution paths a stage attempts; the rest parameterizes
/// the model client.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub ai_enabled: bool,
    pub fallback_enabled: bool,
    pub model: String,
    pub base_url: String,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ai_enabled: true,
            fallback_enabled: true,
            model: "llama3".into(),
            base_url: "http://localhost:11434/api/generate".into(),
            max_retries: 3,
            timeout_secs: 30,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn disable_ai(mut self) -> Self {
        self.ai_enabled = false;
        self
    }

    pub fn disable_fallback(mut self) -> Self {
        self.fallback_enabled = false;
        self
    }

    /// Environment overrides, read once at startup by the demo binary.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(value) = env::var("PIPELINE_AI") {
            config.ai_enabled = truthy(&value);
        }
        if let Ok(value) = env::var("PIPELINE_FALLBACK") {
            config.fallback_enabled = truthy(&value);
        }
        if let Ok(model) = env::var("PIPELINE_MODEL") {
            config.model = model;
        }
        if let Ok(url) = env::var("PIPELINE_URL") {
            config.base_url = url;
        }
        config
    }
}

fn truthy(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_both_paths() {
        let config = PipelineConfig::default();
        assert!(config.ai_enabled);
        assert!(config.fallback_enabled);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn builder_methods_flip_flags() {
        let config = PipelineConfig::new().disable_ai().disable_fallback();
        assert!(!config.ai_enabled);
        assert!(!config.fallback_enabled);
    }

    #[test]
    fn builder_methods_override_client_settings() {
        let config = PipelineConfig::new()
            .with_model("mistral")
            .with_base_url("http://127.0.0.1:9999/api/generate");
        assert_eq!(config.model, "mistral");
        assert_eq!(config.base_url, "http://127.0.0.1:9999/api/generate");
    }

    #[test]
    fn truthy_accepts_common_spellings() {
        assert!(truthy("1"));
        assert!(truthy(" TRUE "));
        assert!(truthy("yes"));
        assert!(!truthy("0"));
        assert!(!truthy("off"));
    }
}
