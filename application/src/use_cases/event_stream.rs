//! Per-session event transport.
//!
//! One bounded single-producer/single-consumer channel per session. The
//! producer side ([`EventSink`]) waits for capacity, so a slow client slows
//! the orchestrator down instead of losing events. The consumer side
//! ([`EventStream`]) owns a drop guard on the session's cancellation token:
//! when the client goes away and the stream is dropped, the orchestrator
//! observes cancellation at its next suspension point.

use futures::Stream;
use lens_domain::AnalysisEvent;
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

/// The consumer is gone or the session was cancelled.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("event stream closed")]
pub struct SinkClosed;

/// Create the transport for one session.
pub fn event_channel(
    session_id: impl Into<String>,
    capacity: usize,
    token: CancellationToken,
) -> (EventSink, EventStream) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    let sink = EventSink {
        sender,
        token: token.clone(),
    };
    let stream = EventStream {
        session_id: session_id.into(),
        receiver,
        guard: Some(token.drop_guard()),
    };
    (sink, stream)
}

/// Producer half, owned by the orchestrator.
pub struct EventSink {
    sender: mpsc::Sender<AnalysisEvent>,
    token: CancellationToken,
}

impl EventSink {
    /// Deliver one event in order, waiting for channel capacity.
    ///
    /// Fails once the session is cancelled or the consumer dropped its end;
    /// in the latter case the session token is cancelled as well.
    pub async fn send(&self, event: AnalysisEvent) -> Result<(), SinkClosed> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(SinkClosed),
            sent = self.sender.send(event) => sent.map_err(|_| {
                self.token.cancel();
                SinkClosed
            }),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled() || self.sender.is_closed()
    }
}

/// Consumer half, handed to the transport (SSE response, terminal printer).
pub struct EventStream {
    session_id: String,
    receiver: mpsc::Receiver<AnalysisEvent>,
    guard: Option<DropGuard>,
}

impl EventStream {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn next_event(&mut self) -> Option<AnalysisEvent> {
        self.receiver.recv().await
    }

    /// Cancel the session explicitly; remaining buffered events are dropped.
    pub fn cancel(mut self) {
        if let Some(guard) = self.guard.take() {
            guard.disarm().cancel();
        }
    }
}

impl Stream for EventStream {
    type Item = AnalysisEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use futures::StreamExt;
    use lens_domain::EventPayload;

    fn event(seq: u64) -> AnalysisEvent {
        AnalysisEvent::new(seq, EventPayload::token(seq.to_string()), Utc::now())
    }

    #[tokio::test]
    async fn delivers_in_order() {
        let token = CancellationToken::new();
        let (sink, stream) = event_channel("s1", 4, token);
        for i in 0..3 {
            sink.send(event(i)).await.unwrap();
        }
        drop(sink);

        let seqs: Vec<u64> = stream.map(|e| e.sequence).collect().await;
        assert_eq!(seqs, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn dropping_stream_cancels_token() {
        let token = CancellationToken::new();
        let (sink, stream) = event_channel("s1", 1, token.clone());
        assert_eq!(stream.session_id(), "s1");
        drop(stream);

        assert!(token.is_cancelled());
        assert!(sink.is_closed());
        assert_eq!(sink.send(event(0)).await, Err(SinkClosed));
    }

    #[tokio::test]
    async fn explicit_cancel() {
        let token = CancellationToken::new();
        let (sink, stream) = event_channel("s1", 1, token.clone());
        stream.cancel();
        assert!(token.is_cancelled());
        assert!(sink.send(event(0)).await.is_err());
    }

    #[tokio::test]
    async fn send_waits_for_capacity_then_observes_cancellation() {
        let token = CancellationToken::new();
        let (sink, _stream) = event_channel("s1", 1, token.clone());
        sink.send(event(0)).await.unwrap();

        let blocked = tokio::spawn(async move { sink.send(event(1)).await });
        tokio::task::yield_now().await;
        assert!(!blocked.is_finished());

        token.cancel();
        assert_eq!(blocked.await.unwrap(), Err(SinkClosed));
    }
}
