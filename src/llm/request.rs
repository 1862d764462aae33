use super::models::{max_completion_tokens, model_spec};
use super::ChatMessage;
use crate::constants::{DEFAULT_TEMPERATURE, DEFAULT_TOP_P};
use serde::Serialize;

/// Sampling and formatting options of a single run
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub temperature: f32,
    pub top_p: f32,
    /// Ask the provider for a JSON object instead of free text
    pub json_output: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            json_output: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypedField {
    #[serde(rename = "type")]
    pub kind: String,
}

impl TypedField {
    fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
        }
    }
}

/// Body of a streamed chat completion request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_completion_tokens: u32,
    pub top_p: f32,
    pub stream: bool,
    pub stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<TypedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<TypedField>,
}

impl ChatRequest {
    /// Builds the request for `model`, applying the model table's limits and
    /// toggles.
    pub fn new(model: &str, messages: Vec<ChatMessage>, options: &RunOptions) -> Self {
        let spec = model_spec(model);
        Self {
            model: model.to_string(),
            messages,
            temperature: options.temperature,
            max_completion_tokens: max_completion_tokens(model),
            top_p: options.top_p,
            stream: true,
            stop: None,
            response_format: options
                .json_output
                .then(|| TypedField::new("json_object")),
            reasoning_format: spec
                .and_then(|s| s.reasoning_format)
                .map(str::to_string),
            reasoning_effort: spec
                .and_then(|s| s.reasoning_effort)
                .map(str::to_string),
            tools: spec
                .map(|s| s.builtin_tools.iter().map(|t| TypedField::new(t)).collect())
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_MAX_COMPLETION_TOKENS;

    fn messages() -> Vec<ChatMessage> {
        vec![ChatMessage::system("be brief"), ChatMessage::user("hi")]
    }

    #[test]
    fn body_carries_streaming_fields() {
        let request = ChatRequest::new("llama-3.3-70b-versatile", messages(), &RunOptions::default());
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "llama-3.3-70b-versatile");
        assert_eq!(json["stream"], true);
        assert_eq!(json["max_completion_tokens"], 32768);
        assert_eq!(json["messages"][1]["role"], "user");
        assert!(json.as_object().unwrap().contains_key("stop"));
        assert!(json["stop"].is_null());
        assert!(json.get("response_format").is_none());
        assert!(json.get("tools").is_none());
    }

    #[test]
    fn json_output_requests_json_object() {
        let options = RunOptions {
            json_output: true,
            ..RunOptions::default()
        };
        let json = serde_json::to_value(ChatRequest::new("llama-3.1-8b-instant", messages(), &options)).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");
    }

    #[test]
    fn model_toggles_are_applied() {
        let request = ChatRequest::new("openai/gpt-oss-120b", messages(), &RunOptions::default());
        assert_eq!(request.reasoning_effort.as_deref(), Some("medium"));
        assert_eq!(request.tools.len(), 2);

        let request = ChatRequest::new("qwen/qwen3-32b", messages(), &RunOptions::default());
        assert_eq!(request.reasoning_format.as_deref(), Some("hidden"));
    }

    #[test]
    fn unknown_model_uses_default_limit() {
        let request = ChatRequest::new("someone/new-model", messages(), &RunOptions::default());
        assert_eq!(request.max_completion_tokens, DEFAULT_MAX_COMPLETION_TOKENS);
        assert!(request.reasoning_format.is_none());
        assert!(request.tools.is_empty());
    }
}
