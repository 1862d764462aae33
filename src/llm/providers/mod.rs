use crate::llm::{ChatRequest, InferenceError};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::fmt::Debug;

pub mod groq;
#[cfg(test)]
pub mod scripted;

/// Response body as a sequence of raw network chunks
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, InferenceError>>;

/// Status line and body of a provider response
pub struct TransportResponse {
    pub status: u16,
    /// `None` when the transport could not expose a readable body
    pub body: Option<ByteStream>,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one chat completion request to the provider.
#[async_trait]
pub trait InferenceTransport: Debug + Send + Sync {
    async fn send(
        &self,
        credential: &str,
        request: &ChatRequest,
    ) -> Result<TransportResponse, InferenceError>;
}
