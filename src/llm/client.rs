use super::providers::{ByteStream, InferenceTransport};
use super::{
    decode_stream, validate_credential, ChatMessage, ChatRequest, InferenceError,
    RequestSerializer, RunOptions, StreamUpdate,
};
use crate::constants::THINKING_STATUS;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Entry point for every call to the inference provider.
///
/// Requests go through the injected [`RequestSerializer`], so clients sharing
/// a serializer never have more than one request in flight between them.
#[derive(Debug, Clone)]
pub struct InferenceClient {
    transport: Arc<dyn InferenceTransport>,
    serializer: RequestSerializer,
}

impl InferenceClient {
    pub fn new(transport: Arc<dyn InferenceTransport>, serializer: RequestSerializer) -> Self {
        Self {
            transport,
            serializer,
        }
    }

    #[cfg(test)]
    pub fn serializer(&self) -> &RequestSerializer {
        &self.serializer
    }

    /// Runs a conversation against `model` and returns the streamed text.
    ///
    /// # Arguments
    /// * `credential` - API key; checked before anything is queued
    /// * `model` - Provider model id
    /// * `conversation` - Ordered messages sent as-is
    /// * `options` - Sampling options and output format
    /// * `updates` - Optional consumer of status and delta updates. Dropping
    ///   its receiver cancels the request at the next update.
    ///
    /// # Returns
    /// * `Result<String, InferenceError>` - Full response text or classified error
    pub async fn run(
        &self,
        credential: &str,
        model: &str,
        conversation: Vec<ChatMessage>,
        options: &RunOptions,
        updates: Option<mpsc::Sender<StreamUpdate>>,
    ) -> Result<String, InferenceError> {
        validate_credential(credential)?;

        let request = ChatRequest::new(model, conversation, options);
        if let Some(tx) = &updates {
            tx.send(StreamUpdate::Status(Some(THINKING_STATUS.to_string())))
                .await
                .map_err(|_| InferenceError::Cancelled)?;
        }

        let transport = self.transport.clone();
        let credential = credential.to_string();
        debug!(
            "Queueing request behind {} pending ({} dispatched so far)",
            self.serializer.pending(),
            self.serializer.dispatched()
        );
        self.serializer
            .submit(async move {
                if updates.as_ref().is_some_and(|tx| tx.is_closed()) {
                    debug!("Consumer left before dispatch, skipping request");
                    return Err(InferenceError::Cancelled);
                }

                info!(
                    "Dispatching request to model {} ({} messages)",
                    request.model,
                    request.messages.len()
                );
                let response = transport.send(&credential, &request).await?;

                if !response.is_success() {
                    let body = match response.body {
                        Some(body) => read_to_string(body).await,
                        None => String::new(),
                    };
                    let err = InferenceError::from_status(response.status, &body);
                    warn!("Provider rejected request: {}", err);
                    return Err(err);
                }

                let body = response.body.ok_or(InferenceError::MissingResponseBody)?;
                let decoded = decode_stream(body, updates.as_ref()).await?;
                if decoded.malformed_frames > 0 {
                    warn!(
                        "{} of {} stream frames were malformed and skipped",
                        decoded.malformed_frames, decoded.frames
                    );
                }
                info!(
                    "Response complete: {} chars in {} frames",
                    decoded.text.len(),
                    decoded.frames
                );
                Ok(decoded.text)
            })
            .await
    }
}

async fn read_to_string(mut body: ByteStream) -> String {
    let mut bytes = Vec::new();
    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(chunk) => bytes.extend_from_slice(&chunk),
            Err(err) => {
                debug!("Error body truncated: {}", err);
                break;
            }
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::providers::scripted::{Scripted, ScriptedTransport};
    use std::time::Duration;

    const KEY: &str = "gsk_0123456789abcdefghijklmnopqrstuvwxyzABCD";

    fn client(responses: Vec<Scripted>) -> (InferenceClient, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new(responses));
        let client = InferenceClient::new(transport.clone(), RequestSerializer::new(Duration::ZERO));
        (client, transport)
    }

    fn conversation() -> Vec<ChatMessage> {
        vec![ChatMessage::system("You are terse."), ChatMessage::user("Say hello")]
    }

    async fn run(client: &InferenceClient) -> Result<String, InferenceError> {
        client
            .run(KEY, "llama-3.3-70b-versatile", conversation(), &RunOptions::default(), None)
            .await
    }

    #[tokio::test]
    async fn malformed_credential_never_reaches_the_queue() {
        let (client, transport) = client(vec![]);
        for key in ["", "sk-not-groq", "gsk_tooshort"] {
            let result = client
                .run(key, "llama-3.3-70b-versatile", conversation(), &RunOptions::default(), None)
                .await;
            assert_eq!(result, Err(InferenceError::InvalidCredential));
        }
        assert_eq!(transport.calls(), 0);
        assert_eq!(client.serializer().dispatched(), 0);
    }

    #[tokio::test]
    async fn streams_text_and_forwards_updates() {
        let (client, transport) = client(vec![Scripted::deltas(&["Hel", "lo"])]);
        let (tx, mut rx) = mpsc::channel(16);

        let text = client
            .run(KEY, "llama-3.3-70b-versatile", conversation(), &RunOptions::default(), Some(tx))
            .await
            .unwrap();
        assert_eq!(text, "Hello");

        let mut updates = Vec::new();
        while let Some(update) = rx.recv().await {
            updates.push(update);
        }
        assert_eq!(
            updates[0],
            StreamUpdate::Status(Some(THINKING_STATUS.to_string()))
        );
        assert_eq!(updates[1], StreamUpdate::Status(None));
        assert_eq!(
            updates.last(),
            Some(&StreamUpdate::Delta {
                delta: "lo".to_string(),
                accumulated: "Hello".to_string()
            })
        );

        let (credential, request) = &transport.requests()[0];
        assert_eq!(credential, KEY);
        assert!(request.stream);
        assert_eq!(request.messages, conversation());
    }

    #[tokio::test]
    async fn classifies_error_statuses() {
        let (client, _) = client(vec![
            Scripted::status(429, r#"{"error":{"message":"slow down"}}"#),
            Scripted::status(401, ""),
            Scripted::status(502, "bad gateway"),
            Scripted::status(400, r#"{"error":{"message":"context too long"}}"#),
            Scripted::NoBody { status: 200 },
        ]);

        assert_eq!(run(&client).await, Err(InferenceError::RateLimited));
        assert_eq!(run(&client).await, Err(InferenceError::Unauthorized));
        assert_eq!(run(&client).await, Err(InferenceError::ServiceUnavailable(502)));
        assert_eq!(
            run(&client).await,
            Err(InferenceError::ProviderError {
                status: 400,
                message: "context too long".to_string()
            })
        );
        assert_eq!(run(&client).await, Err(InferenceError::MissingResponseBody));
    }

    #[tokio::test]
    async fn a_failed_request_does_not_block_the_next_one() {
        let (client, transport) = client(vec![
            Scripted::Fail(InferenceError::Transport("dns failure".to_string())),
            Scripted::deltas(&["ok"]),
        ]);

        assert!(matches!(run(&client).await, Err(InferenceError::Transport(_))));
        assert_eq!(run(&client).await, Ok("ok".to_string()));
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn consumer_gone_before_dispatch_skips_the_request() {
        let (client, transport) = client(vec![Scripted::deltas(&["unused"])]);
        let blocker = client.serializer().clone();
        let busy = tokio::spawn(async move {
            blocker
                .submit(async {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok::<_, InferenceError>(())
                })
                .await
        });
        tokio::time::sleep(Duration::from_millis(5)).await;

        let (tx, rx) = mpsc::channel(4);
        let queued = tokio::spawn({
            let client = client.clone();
            async move {
                client
                    .run(KEY, "llama-3.3-70b-versatile", conversation(), &RunOptions::default(), Some(tx))
                    .await
            }
        });
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(client.serializer().pending(), 1);
        drop(rx);

        busy.await.unwrap().unwrap();
        assert_eq!(queued.await.unwrap(), Err(InferenceError::Cancelled));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn json_output_is_requested_from_the_provider() {
        let (client, transport) = client(vec![Scripted::deltas(&["{\"a\":1}"])]);
        let options = RunOptions {
            json_output: true,
            ..RunOptions::default()
        };
        let text = client
            .run(KEY, "unknown-model", conversation(), &options, None)
            .await
            .unwrap();

        assert_eq!(text, "{\"a\":1}");
        let request = &transport.requests()[0].1;
        assert!(request.response_format.is_some());
        assert_eq!(
            request.max_completion_tokens,
            crate::constants::DEFAULT_MAX_COMPLETION_TOKENS
        );
    }
}
