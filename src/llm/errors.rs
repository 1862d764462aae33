/// Failures of a single inference request
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("Invalid API key format. Groq keys start with 'gsk_' and are at least 40 characters long")]
    InvalidCredential,
    #[error("Rate limit exceeded. Please wait a moment before trying again")]
    RateLimited,
    #[error("Invalid API key. Please check your Groq API key in settings")]
    Unauthorized,
    #[error("Groq service is temporarily unavailable (HTTP {0}). Please try again later")]
    ServiceUnavailable(u16),
    #[error("Groq API error (HTTP {status}): {message}")]
    ProviderError { status: u16, message: String },
    #[error("No response body received from Groq")]
    MissingResponseBody,
    #[error("Network error: {0}")]
    Transport(String),
    #[error("Stream consumer went away before the response completed")]
    Cancelled,
    #[error("Request queue is no longer running")]
    QueueClosed,
}

impl InferenceError {
    /// Maps a non-success HTTP status and its body to an error kind.
    ///
    /// The provider reports details as `{"error": {"message": ...}}`; the raw
    /// body is used when it does not.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            429 => InferenceError::RateLimited,
            401 => InferenceError::Unauthorized,
            s if s >= 500 => InferenceError::ServiceUnavailable(s),
            s => {
                let message = serde_json::from_str::<serde_json::Value>(body)
                    .ok()
                    .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                    .unwrap_or_else(|| {
                        let trimmed = body.trim();
                        if trimmed.is_empty() {
                            format!("request failed with status {}", s)
                        } else {
                            trimmed.to_string()
                        }
                    });
                InferenceError::ProviderError { status: s, message }
            }
        }
    }
}

impl From<reqwest::Error> for InferenceError {
    fn from(err: reqwest::Error) -> Self {
        InferenceError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_statuses() {
        assert_eq!(InferenceError::from_status(429, ""), InferenceError::RateLimited);
        assert_eq!(InferenceError::from_status(401, ""), InferenceError::Unauthorized);
        assert_eq!(
            InferenceError::from_status(503, "oops"),
            InferenceError::ServiceUnavailable(503)
        );
    }

    #[test]
    fn provider_error_carries_server_message() {
        let body = r#"{"error":{"message":"model `foo` does not exist","type":"invalid_request_error"}}"#;
        match InferenceError::from_status(404, body) {
            InferenceError::ProviderError { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "model `foo` does not exist");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn provider_error_falls_back_to_raw_body() {
        let err = InferenceError::from_status(400, "bad request\n");
        assert_eq!(err.to_string(), "Groq API error (HTTP 400): bad request");
    }

    #[test]
    fn rate_limit_message_mentions_rate_limit() {
        assert!(InferenceError::RateLimited.to_string().contains("Rate limit"));
    }
}
