//! In-memory transport replaying canned responses.

use super::{InferenceTransport, TransportResponse};
use crate::llm::{ChatRequest, InferenceError};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub enum Scripted {
    /// Status plus body chunks
    Stream { status: u16, chunks: Vec<String> },
    /// Status without a readable body
    NoBody { status: u16 },
    /// The request never reached the provider
    Fail(InferenceError),
}

impl Scripted {
    /// A successful stream yielding `parts` as deltas, then the terminator.
    pub fn deltas(parts: &[&str]) -> Self {
        let mut chunks: Vec<String> = parts
            .iter()
            .map(|part| {
                format!(
                    "data: {}\n",
                    serde_json::json!({"choices": [{"delta": {"content": part}}]})
                )
            })
            .collect();
        chunks.push("data: [DONE]\n".to_string());
        Scripted::Stream {
            status: 200,
            chunks,
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Scripted::Stream {
            status,
            chunks: vec![body.to_string()],
        }
    }
}

#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<(String, ChatRequest)>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Scripted>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, response: Scripted) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<(String, ChatRequest)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceTransport for ScriptedTransport {
    async fn send(
        &self,
        credential: &str,
        request: &ChatRequest,
    ) -> Result<TransportResponse, InferenceError> {
        self.requests
            .lock()
            .unwrap()
            .push((credential.to_string(), request.clone()));
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Scripted::deltas(&[]));

        match next {
            Scripted::Stream { status, chunks } => Ok(TransportResponse {
                status,
                body: Some(
                    stream::iter(
                        chunks
                            .into_iter()
                            .map(|c| Ok::<_, InferenceError>(c.into_bytes())),
                    )
                    .boxed(),
                ),
            }),
            Scripted::NoBody { status } => Ok(TransportResponse { status, body: None }),
            Scripted::Fail(err) => Err(err),
        }
    }
}
