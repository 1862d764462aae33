//! Incremental decoder for server-sent chat completion streams.
//!
//! The provider answers with lines of the form `data: {json}` terminated by
//! `data: [DONE]`. Network chunks carry arbitrary slices of that text, so the
//! decoder buffers bytes until a full line is available and only ever parses
//! complete lines.

use super::InferenceError;
use crate::constants::{DATA_FRAME_PREFIX, STREAM_TERMINATOR};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Longest part of a rejected frame echoed to the logs
const MALFORMED_EXCERPT_CHARS: usize = 120;

/// Progress pushed to a stream consumer while a response is read
#[derive(Debug, Clone, PartialEq)]
pub enum StreamUpdate {
    /// Waiting status; `None` means the first token arrived
    Status(Option<String>),
    /// A new piece of text together with everything received so far
    Delta { delta: String, accumulated: String },
}

/// Result of decoding a whole response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedStream {
    /// Concatenation of every delta
    pub text: String,
    /// Data frames seen, malformed ones included
    pub frames: usize,
    /// Data frames skipped because they were not valid JSON
    pub malformed_frames: usize,
    /// Whether the terminator line was observed
    pub terminated: bool,
}

#[derive(Deserialize)]
struct ChunkFrame {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

impl ChunkFrame {
    fn into_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|content| !content.is_empty())
    }
}

/// Line-buffered decoder state for one response.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    pending: Vec<u8>,
    decoded: DecodedStream,
    first_delta_seen: bool,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes a network chunk, appending the resulting updates.
    ///
    /// Returns `true` once the terminator has been seen; anything after it is
    /// discarded.
    pub fn feed(&mut self, chunk: &[u8], updates: &mut Vec<StreamUpdate>) -> bool {
        if self.decoded.terminated {
            return true;
        }
        self.pending.extend_from_slice(chunk);

        let mut consumed = 0;
        while let Some(offset) = self.pending[consumed..].iter().position(|b| *b == b'\n') {
            let end = consumed + offset;
            let line = String::from_utf8_lossy(&self.pending[consumed..end]).into_owned();
            consumed = end + 1;
            if self.handle_line(&line, updates) {
                self.pending.clear();
                return true;
            }
        }
        self.pending.drain(..consumed);
        false
    }

    /// Handles a final line the source left without a trailing newline.
    pub fn flush(&mut self, updates: &mut Vec<StreamUpdate>) {
        if self.decoded.terminated || self.pending.is_empty() {
            return;
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        self.handle_line(&line, updates);
    }

    pub fn into_decoded(self) -> DecodedStream {
        self.decoded
    }

    fn handle_line(&mut self, line: &str, updates: &mut Vec<StreamUpdate>) -> bool {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line == STREAM_TERMINATOR {
            debug!("Stream terminator received after {} frames", self.decoded.frames);
            self.decoded.terminated = true;
            return true;
        }

        let Some(payload) = line.strip_prefix(DATA_FRAME_PREFIX) else {
            return false;
        };
        self.decoded.frames += 1;

        let frame = match serde_json::from_str::<ChunkFrame>(payload) {
            Ok(frame) => frame,
            Err(err) => {
                self.decoded.malformed_frames += 1;
                let excerpt: String = payload.chars().take(MALFORMED_EXCERPT_CHARS).collect();
                warn!("Skipping malformed stream frame ({}): {}", err, excerpt);
                return false;
            }
        };

        if let Some(delta) = frame.into_content() {
            if !self.first_delta_seen {
                self.first_delta_seen = true;
                updates.push(StreamUpdate::Status(None));
            }
            self.decoded.text.push_str(&delta);
            updates.push(StreamUpdate::Delta {
                delta,
                accumulated: self.decoded.text.clone(),
            });
        }
        false
    }
}

/// Reads `source` to the end (or to the terminator) and returns the text.
///
/// Updates are forwarded to `updates` as they are decoded. The channel is
/// bounded, so a slow consumer slows the read down; a consumer that drops its
/// receiver stops the read with [`InferenceError::Cancelled`].
pub async fn decode_stream<S, B>(
    mut source: S,
    updates: Option<&mpsc::Sender<StreamUpdate>>,
) -> Result<DecodedStream, InferenceError>
where
    S: Stream<Item = Result<B, InferenceError>> + Unpin,
    B: AsRef<[u8]>,
{
    let mut decoder = StreamDecoder::new();
    let mut batch = Vec::new();

    while let Some(chunk) = source.next().await {
        let chunk = chunk?;
        let terminated = decoder.feed(chunk.as_ref(), &mut batch);
        forward(updates, &mut batch).await?;
        if terminated {
            return Ok(decoder.into_decoded());
        }
    }

    decoder.flush(&mut batch);
    forward(updates, &mut batch).await?;
    Ok(decoder.into_decoded())
}

async fn forward(
    updates: Option<&mpsc::Sender<StreamUpdate>>,
    batch: &mut Vec<StreamUpdate>,
) -> Result<(), InferenceError> {
    let Some(tx) = updates else {
        batch.clear();
        return Ok(());
    };
    for update in batch.drain(..) {
        tx.send(update)
            .await
            .map_err(|_| InferenceError::Cancelled)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn frame(content: &str) -> String {
        format!(
            "data: {}\n",
            serde_json::json!({"choices": [{"delta": {"content": content}}]})
        )
    }

    fn chunks(parts: Vec<Vec<u8>>) -> impl Stream<Item = Result<Vec<u8>, InferenceError>> + Unpin {
        stream::iter(parts.into_iter().map(Ok::<Vec<u8>, InferenceError>))
    }

    async fn decode_bytes(bytes: &[u8], chunk_size: usize) -> DecodedStream {
        let parts = bytes.chunks(chunk_size).map(|c| c.to_vec()).collect();
        decode_stream(chunks(parts), None).await.unwrap()
    }

    async fn collect_updates(bytes: &[u8]) -> (DecodedStream, Vec<StreamUpdate>) {
        let (tx, mut rx) = mpsc::channel(64);
        let decoded = decode_stream(chunks(vec![bytes.to_vec()]), Some(&tx)).await.unwrap();
        drop(tx);
        let mut updates = Vec::new();
        while let Some(update) = rx.recv().await {
            updates.push(update);
        }
        (decoded, updates)
    }

    #[tokio::test]
    async fn hello_scenario_signals_thinking_end_once() {
        let body = format!("{}{}data: [DONE]\n", frame("Hel"), frame("lo"));
        let (decoded, updates) = collect_updates(body.as_bytes()).await;

        assert_eq!(decoded.text, "Hello");
        assert!(decoded.terminated);
        assert_eq!(
            updates,
            vec![
                StreamUpdate::Status(None),
                StreamUpdate::Delta {
                    delta: "Hel".to_string(),
                    accumulated: "Hel".to_string()
                },
                StreamUpdate::Delta {
                    delta: "lo".to_string(),
                    accumulated: "Hello".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn frames_split_across_chunks_decode_identically() {
        let body = format!(
            "{}{}{}data: [DONE]\n",
            frame("Grüße "),
            frame("from "),
            frame("🦀")
        );
        for size in [1, 2, 3, 7, 16, body.len()] {
            let decoded = decode_bytes(body.as_bytes(), size).await;
            assert_eq!(decoded.text, "Grüße from 🦀", "chunk size {}", size);
        }
    }

    #[tokio::test]
    async fn decoding_is_repeatable() {
        let body = format!("{}{}data: [DONE]\n", frame("same "), frame("text"));
        let first = decode_bytes(body.as_bytes(), 5).await;
        let second = decode_bytes(body.as_bytes(), 5).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn malformed_frame_is_skipped() {
        let clean = format!("{}{}data: [DONE]\n", frame("a"), frame("b"));
        let noisy = format!(
            "{}data: {{\"choices\": [{{\"delta\"\n{}data: [DONE]\n",
            frame("a"),
            frame("b")
        );

        let clean = decode_bytes(clean.as_bytes(), 4).await;
        let noisy = decode_bytes(noisy.as_bytes(), 4).await;
        assert_eq!(clean.text, noisy.text);
        assert_eq!(noisy.malformed_frames, 1);
        assert_eq!(clean.malformed_frames, 0);
    }

    #[tokio::test]
    async fn terminator_stops_reading_the_source() {
        let polled = Arc::new(AtomicUsize::new(0));
        let counter = polled.clone();
        let parts = vec![
            format!("{}data: [DONE]\n{}", frame("kept"), frame("dropped")).into_bytes(),
            frame("never read").into_bytes(),
        ];
        let source = chunks(parts).inspect(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let decoded = decode_stream(source, None).await.unwrap();
        assert_eq!(decoded.text, "kept");
        assert!(decoded.terminated);
        assert_eq!(polled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_source_returns_accumulated_text() {
        let body = format!("{}{}", frame("no "), frame("terminator").trim_end());
        let decoded = decode_bytes(body.as_bytes(), 8).await;
        assert_eq!(decoded.text, "no terminator");
        assert!(!decoded.terminated);
    }

    #[tokio::test]
    async fn non_data_lines_and_crlf_are_tolerated() {
        let body = format!(
            ": keep-alive\r\nevent: chunk\r\n\r\n{}data: {{\"choices\":[]}}\r\n{}data: [DONE]\r\n",
            frame("x").replace('\n', "\r\n"),
            frame("y").replace('\n', "\r\n"),
        );
        let decoded = decode_bytes(body.as_bytes(), 3).await;
        assert_eq!(decoded.text, "xy");
        assert!(decoded.terminated);
        assert_eq!(decoded.malformed_frames, 0);
    }

    #[tokio::test]
    async fn empty_deltas_do_not_end_thinking() {
        let body = format!(
            "data: {{\"choices\":[{{\"delta\":{{\"role\":\"assistant\",\"content\":\"\"}}}}]}}\n{}data: [DONE]\n",
            frame("hi")
        );
        let (decoded, updates) = collect_updates(body.as_bytes()).await;
        assert_eq!(decoded.text, "hi");
        assert_eq!(updates.first(), Some(&StreamUpdate::Status(None)));
        assert_eq!(
            updates
                .iter()
                .filter(|u| matches!(u, StreamUpdate::Status(_)))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn dropped_consumer_cancels_the_read() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let body = format!("{}data: [DONE]\n", frame("ignored"));
        let result = decode_stream(chunks(vec![body.into_bytes()]), Some(&tx)).await;
        assert_eq!(result, Err(InferenceError::Cancelled));
    }

    #[tokio::test]
    async fn transport_failure_mid_stream_is_reported() {
        let source = stream::iter(vec![
            Ok(frame("partial").into_bytes()),
            Err(InferenceError::Transport("connection reset".to_string())),
        ]);
        let result = decode_stream(source, None).await;
        assert_eq!(
            result,
            Err(InferenceError::Transport("connection reset".to_string()))
        );
    }
}
