//! Stream relay: channel-backed event delivery and SSE wire framing.
//!
//! The orchestration runs in an explicit producer task that pushes
//! `ChatEvent`s into a bounded channel; the transport layer drains the
//! `RelayStream` end. Every fragment is forwarded individually, in production
//! order. Dropping the stream aborts the producer, which cancels the
//! in-flight provider call and leaves no partial assistant reply behind.
//!
//! ```rust
//! use pchat::{ChatEvent, sse_frame};
//!
//! let frame = sse_frame(&ChatEvent::Chunk("Hi".into()));
//! assert_eq!(frame.render(), "event: chunk\ndata: {\"content\":\"Hi\"}\n\n");
//! ```

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::ChatEvent;

/// The caller disconnected; nothing further can be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RelayClosed;

#[derive(Debug, Clone)]
pub(crate) struct RelaySink {
    tx: mpsc::Sender<ChatEvent>,
}

impl RelaySink {
    pub(crate) async fn send(&self, event: ChatEvent) -> Result<(), RelayClosed> {
        self.tx.send(event).await.map_err(|_| RelayClosed)
    }
}

/// Caller end of one streamed chat turn.
#[derive(Debug)]
pub struct RelayStream {
    rx: mpsc::Receiver<ChatEvent>,
    producer: Option<JoinHandle<()>>,
}

impl RelayStream {
    pub(crate) fn channel(capacity: usize) -> (RelaySink, mpsc::Receiver<ChatEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (RelaySink { tx }, rx)
    }

    pub(crate) fn new(rx: mpsc::Receiver<ChatEvent>, producer: JoinHandle<()>) -> Self {
        Self {
            rx,
            producer: Some(producer),
        }
    }
}

impl Stream for RelayStream {
    type Item = ChatEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<ChatEvent>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for RelayStream {
    fn drop(&mut self) {
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
    }
}

/// One wire-level frame: a named event carrying a JSON payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: &'static str,
    pub data: String,
}

impl SseFrame {
    pub fn render(&self) -> String {
        format!("event: {}\ndata: {}\n\n", self.event, self.data)
    }
}

#[derive(Serialize)]
struct WireChunk<'a> {
    content: &'a str,
}

#[derive(Serialize)]
struct WireError<'a> {
    kind: &'static str,
    detail: &'a str,
}

#[derive(Serialize)]
struct WireUsage {
    input_tokens: u32,
    output_tokens: u32,
    total_tokens: u32,
}

#[derive(Serialize)]
struct WireDone<'a> {
    provider: String,
    model: &'a str,
    usage: WireUsage,
}

/// Serializes one `ChatEvent` to its wire frame.
pub fn sse_frame(event: &ChatEvent) -> SseFrame {
    match event {
        ChatEvent::Chunk(content) => SseFrame {
            event: "chunk",
            data: encode(&WireChunk { content }),
        },
        ChatEvent::Error(error) => SseFrame {
            event: "error",
            data: encode(&WireError {
                kind: error.wire_kind(),
                detail: &error.message,
            }),
        },
        ChatEvent::Done {
            provider,
            model,
            usage,
        } => SseFrame {
            event: "done",
            data: encode(&WireDone {
                provider: provider.to_string(),
                model,
                usage: WireUsage {
                    input_tokens: usage.input_tokens,
                    output_tokens: usage.output_tokens,
                    total_tokens: usage.total_tokens,
                },
            }),
        },
    }
}

fn encode<T: Serialize>(payload: &T) -> String {
    // The wire DTOs hold only strings and integers; serialization cannot fail.
    serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use pprovider::{ProviderError, ProviderId, TokenUsage};

    use super::*;
    use crate::ChatError;

    #[test]
    fn chunk_frames_carry_incremental_text() {
        let frame = sse_frame(&ChatEvent::Chunk("Hi there".into()));

        assert_eq!(frame.event, "chunk");
        assert_eq!(frame.data, r#"{"content":"Hi there"}"#);
        assert!(frame.render().ends_with("\n\n"));
    }

    #[test]
    fn error_frames_expose_classified_kind_and_detail() {
        let error = ChatError::from(ProviderError::rate_limited("slow down"));
        let frame = sse_frame(&ChatEvent::Error(error));

        assert_eq!(frame.event, "error");
        assert_eq!(frame.data, r#"{"kind":"rate_limited","detail":"slow down"}"#);
    }

    #[test]
    fn done_frames_report_serving_provider_and_usage() {
        let frame = sse_frame(&ChatEvent::Done {
            provider: ProviderId::Groq,
            model: "llama-3.3-70b-versatile".into(),
            usage: TokenUsage {
                input_tokens: 12,
                output_tokens: 6,
                total_tokens: 18,
            },
        });

        assert_eq!(frame.event, "done");
        let value: serde_json::Value =
            serde_json::from_str(&frame.data).expect("payload should be JSON");
        assert_eq!(value["provider"], "groq");
        assert_eq!(value["model"], "llama-3.3-70b-versatile");
        assert_eq!(value["usage"]["total_tokens"], 18);
    }
}
