use crate::core::StonkieError;
use crate::eventsource::{EventSourceExt, EventStream};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use log::debug;
use reqwest::{Response, StatusCode};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// A pull-based byte source, typically a streaming HTTP response body.
#[async_trait]
pub trait ChunkSource: Send {
    /// Pulls the next chunk. `Ok(None)` marks the end of input.
    async fn read(&mut self) -> Result<Option<Bytes>, StonkieError>;

    /// Releases the underlying transport. Later reads return `Ok(None)`.
    async fn close(&mut self) {}
}

/// Reads the body of a `reqwest` response chunk by chunk.
pub struct ResponseSource {
    response: Option<Response>,
}

impl ResponseSource {
    /// Wraps a response whose status was already checked.
    ///
    /// A `204 No Content` response has no body to stream and is rejected.
    pub fn new(response: Response) -> Result<Self, StonkieError> {
        if response.status() == StatusCode::NO_CONTENT {
            return Err(StonkieError::MissingBody);
        }
        Ok(Self {
            response: Some(response),
        })
    }
}

#[async_trait]
impl ChunkSource for ResponseSource {
    async fn read(&mut self) -> Result<Option<Bytes>, StonkieError> {
        match self.response.as_mut() {
            Some(response) => response.chunk().await.map_err(StonkieError::from),
            None => Ok(None),
        }
    }

    async fn close(&mut self) {
        if let Some(response) = self.response.take() {
            debug!("[Stream] releasing response body from {}", response.url());
        }
    }
}

/// Adapts any `Stream` of byte chunks.
pub struct ByteStreamSource<S> {
    stream: Option<S>,
}

impl<S> ByteStreamSource<S> {
    pub const fn new(stream: S) -> Self {
        Self {
            stream: Some(stream),
        }
    }
}

#[async_trait]
impl<S, E> ChunkSource for ByteStreamSource<S>
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin,
    E: Into<StonkieError> + Send,
{
    async fn read(&mut self) -> Result<Option<Bytes>, StonkieError> {
        match self.stream.as_mut() {
            Some(stream) => stream.next().await.transpose().map_err(Into::into),
            None => Ok(None),
        }
    }

    async fn close(&mut self) {
        self.stream = None;
    }
}

pub type ChunkSender = mpsc::Sender<Result<Bytes, StonkieError>>;
pub type ChannelSource = ByteStreamSource<ReceiverStream<Result<Bytes, StonkieError>>>;

/// A source fed from another task. Dropping every sender ends the input.
pub fn channel(buffer: usize) -> (ChunkSender, ChannelSource) {
    let (sender, receiver) = mpsc::channel(buffer);
    (sender, ByteStreamSource::new(ReceiverStream::new(receiver)))
}

/// Adapts a stream of already-parsed SSE events, the way a browser
/// `EventSource` delivers them. Each event is re-emitted as one `data: `
/// line, so it pairs with [`FrameFormat::Sse`](super::FrameFormat::Sse).
pub struct EventSourceSource {
    events: Option<EventStream>,
}

impl EventSourceSource {
    pub fn new(events: EventStream) -> Self {
        Self {
            events: Some(events),
        }
    }

    pub fn from_response(response: Response) -> Result<Self, StonkieError> {
        if response.status() == StatusCode::NO_CONTENT {
            return Err(StonkieError::MissingBody);
        }
        Ok(Self::new(response.events()))
    }
}

#[async_trait]
impl ChunkSource for EventSourceSource {
    async fn read(&mut self) -> Result<Option<Bytes>, StonkieError> {
        let Some(events) = self.events.as_mut() else {
            return Ok(None);
        };
        match events.next().await {
            Some(event) => Ok(Some(Bytes::from(event?.to_data_line()))),
            None => Ok(None),
        }
    }

    async fn close(&mut self) {
        self.events = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eventsource::events;
    use std::convert::Infallible;

    #[tokio::test]
    async fn test_byte_stream_source_reads_until_end() {
        let mut source = ByteStreamSource::new(futures::stream::iter(vec![
            Ok::<_, Infallible>(Bytes::from_static(b"a")),
            Ok(Bytes::from_static(b"b")),
        ]));
        assert_eq!(source.read().await.unwrap(), Some(Bytes::from_static(b"a")));
        assert_eq!(source.read().await.unwrap(), Some(Bytes::from_static(b"b")));
        assert_eq!(source.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_closed_source_reports_end() {
        let (sender, mut source) = channel(4);
        sender.send(Ok(Bytes::from_static(b"x"))).await.unwrap();
        source.close().await;
        assert_eq!(source.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_channel_source_propagates_errors() {
        let (sender, mut source) = channel(4);
        sender
            .send(Err(StonkieError::Transport("connection reset".to_string())))
            .await
            .unwrap();
        drop(sender);
        assert!(matches!(source.read().await, Err(StonkieError::Transport(_))));
        assert_eq!(source.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_event_source_emits_data_lines() {
        let body = futures::stream::iter(vec![Ok::<_, Infallible>(Bytes::from_static(
            b"event: insight\ndata: {\"status\":\"success\"}\n\ndata: [DONE]\n\n",
        ))]);
        let mut source = EventSourceSource::new(events(body));

        assert_eq!(
            source.read().await.unwrap(),
            Some(Bytes::from_static(b"data: {\"status\":\"success\"}\n"))
        );
        assert_eq!(
            source.read().await.unwrap(),
            Some(Bytes::from_static(b"data: [DONE]\n"))
        );
        assert_eq!(source.read().await.unwrap(), None);
    }
}
