use super::{InferenceTransport, TransportResponse};
use crate::constants::CHAT_COMPLETIONS_PATH;
use crate::llm::{ChatRequest, InferenceError};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Transport for Groq's OpenAI-compatible chat completions API
#[derive(Debug, Clone)]
pub struct GroqTransport {
    client: Client,
    /// Full URL of the chat completions endpoint
    endpoint: Url,
}

impl GroqTransport {
    /// Creates a transport posting to `<base_url>/chat/completions`
    ///
    /// # Arguments
    /// * `base_url` - API root, e.g. `https://api.groq.com/openai/v1`
    /// * `timeout` - Upper bound for a whole request, streaming included
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self, InferenceError> {
        let endpoint = Url::parse(&format!(
            "{}{}",
            base_url.as_str().trim_end_matches('/'),
            CHAT_COMPLETIONS_PATH
        ))
        .map_err(|e| InferenceError::Transport(format!("invalid endpoint: {}", e)))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl InferenceTransport for GroqTransport {
    async fn send(
        &self,
        credential: &str,
        request: &ChatRequest,
    ) -> Result<TransportResponse, InferenceError> {
        debug!(
            "POST {} model={} messages={}",
            self.endpoint,
            request.model,
            request.messages.len()
        );
        let res = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(credential)
            .json(request)
            .send()
            .await?;

        let status = res.status().as_u16();
        let body = res
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(InferenceError::from))
            .boxed();

        Ok(TransportResponse {
            status,
            body: Some(body),
        })
    }
}
