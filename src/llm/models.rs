use crate::constants::DEFAULT_MAX_COMPLETION_TOKENS;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

/// Per-model request settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSpec {
    /// Provider identifier of the model
    pub id: &'static str,
    /// Display name
    pub label: &'static str,
    /// Value sent as `max_completion_tokens`
    pub max_completion_tokens: u32,
    /// `reasoning_format` toggle for models that emit their reasoning
    pub reasoning_format: Option<&'static str>,
    /// `reasoning_effort` toggle for models that accept it
    pub reasoning_effort: Option<&'static str>,
    /// Built-in server side tools enabled for the model
    pub builtin_tools: &'static [&'static str],
}

const MODELS: &[ModelSpec] = &[
    ModelSpec {
        id: "llama-3.3-70b-versatile",
        label: "Llama 3.3 70B Versatile",
        max_completion_tokens: 32768,
        reasoning_format: None,
        reasoning_effort: None,
        builtin_tools: &[],
    },
    ModelSpec {
        id: "llama-3.1-8b-instant",
        label: "Llama 3.1 8B Instant",
        max_completion_tokens: 8192,
        reasoning_format: None,
        reasoning_effort: None,
        builtin_tools: &[],
    },
    ModelSpec {
        id: "meta-llama/llama-4-scout-17b-16e-instruct",
        label: "Llama 4 Scout",
        max_completion_tokens: 8192,
        reasoning_format: None,
        reasoning_effort: None,
        builtin_tools: &[],
    },
    ModelSpec {
        id: "meta-llama/llama-4-maverick-17b-128e-instruct",
        label: "Llama 4 Maverick",
        max_completion_tokens: 8192,
        reasoning_format: None,
        reasoning_effort: None,
        builtin_tools: &[],
    },
    ModelSpec {
        id: "deepseek-r1-distill-llama-70b",
        label: "DeepSeek R1 Distill Llama 70B",
        max_completion_tokens: 131072,
        reasoning_format: Some("hidden"),
        reasoning_effort: None,
        builtin_tools: &[],
    },
    ModelSpec {
        id: "qwen/qwen3-32b",
        label: "Qwen 3 32B",
        max_completion_tokens: 40960,
        reasoning_format: Some("hidden"),
        reasoning_effort: None,
        builtin_tools: &[],
    },
    ModelSpec {
        id: "moonshotai/kimi-k2-instruct",
        label: "Kimi K2 Instruct",
        max_completion_tokens: 16384,
        reasoning_format: None,
        reasoning_effort: None,
        builtin_tools: &[],
    },
    ModelSpec {
        id: "openai/gpt-oss-120b",
        label: "GPT-OSS 120B",
        max_completion_tokens: 65536,
        reasoning_format: None,
        reasoning_effort: Some("medium"),
        builtin_tools: &["browser_search", "code_interpreter"],
    },
    ModelSpec {
        id: "openai/gpt-oss-20b",
        label: "GPT-OSS 20B",
        max_completion_tokens: 65536,
        reasoning_format: None,
        reasoning_effort: Some("medium"),
        builtin_tools: &[],
    },
];

static MODEL_TABLE: Lazy<HashMap<&'static str, &'static ModelSpec>> =
    Lazy::new(|| MODELS.iter().map(|m| (m.id, m)).collect());

/// Looks up a model by provider id.
pub fn model_spec(model: &str) -> Option<&'static ModelSpec> {
    MODEL_TABLE.get(model).copied()
}

/// Token limit for a model, falling back to the default for unknown ids.
pub fn max_completion_tokens(model: &str) -> u32 {
    model_spec(model)
        .map(|m| m.max_completion_tokens)
        .unwrap_or(DEFAULT_MAX_COMPLETION_TOKENS)
}

/// All known models in display order.
pub fn known_models() -> &'static [ModelSpec] {
    MODELS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_model_uses_its_own_limit() {
        assert_eq!(max_completion_tokens("llama-3.3-70b-versatile"), 32768);
        assert_eq!(
            model_spec("openai/gpt-oss-120b").unwrap().reasoning_effort,
            Some("medium")
        );
    }

    #[test]
    fn unknown_model_falls_back_to_default_limit() {
        assert!(model_spec("made-up-model").is_none());
        assert_eq!(
            max_completion_tokens("made-up-model"),
            DEFAULT_MAX_COMPLETION_TOKENS
        );
    }

    #[test]
    fn model_ids_are_unique() {
        assert_eq!(MODEL_TABLE.len(), known_models().len());
    }
}
