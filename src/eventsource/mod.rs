use crate::core::StonkieError;
use async_stream::try_stream;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use log::warn;
use reqwest::Response;
use std::pin::Pin;
use std::{
    fmt::{self, Display, Formatter},
    time::Duration,
};
use thiserror::Error;

const EVENT_DELIMITER: &[u8] = b"\n\n";
const FIELD_SEPARATOR: char = ':';

pub type EventStream = Pin<Box<dyn Stream<Item = Result<Event, StonkieError>> + Send>>;

/// Possible errors that can occur while parsing SSE events
#[derive(Error, Debug)]
pub enum EventError {
    #[error("failed to parse retry value: {0}")]
    RetryParse(#[from] std::num::ParseIntError),
    #[error("invalid event format: event contains no data")]
    InvalidFormat,
}

/// A Server-Sent Event as dispatched by an `EventSource`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
    pub id: Option<String>,
    /// Type of the event, `None` means "message"
    pub event_type: Option<String>,
    /// The event payload, `data` lines joined with `\n`
    pub data: String,
    pub retry: Option<Duration>,
}

impl Display for Event {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Event {{ id: {:?}, event_type: {:?}, data: {}, retry: {:?} }}",
            self.id, self.event_type, self.data, self.retry
        )
    }
}

impl Event {
    /// Parses one event block (the text between two blank lines).
    ///
    /// Returns `Err(EventError::InvalidFormat)` when the block has no `data`
    /// field, which is the case for comment-only keep-alives.
    pub fn parse(input: &str) -> Result<Self, EventError> {
        let mut event = Self::default();
        let mut data_lines = Vec::new();

        for line in input.lines() {
            if line.is_empty() || line.starts_with(FIELD_SEPARATOR) {
                continue;
            }

            let (field, value) = line
                .split_once(FIELD_SEPARATOR)
                .map_or((line, ""), |(field, value)| (field, value.trim_start()));
            match field {
                "id" => event.id = Some(value.to_string()),
                "event" => event.event_type = Some(value.to_string()),
                "data" => data_lines.push(value),
                "retry" => {
                    let ms = value.parse::<u64>()?;
                    event.retry = Some(Duration::from_millis(ms));
                }
                _ => {}
            }
        }

        if data_lines.is_empty() {
            return Err(EventError::InvalidFormat);
        }

        event.data = data_lines.join("\n");
        Ok(event)
    }

    /// Re-encodes the payload as a single `data: ` line so it can be fed to a
    /// line-oriented consumer. Line breaks inside the payload can only sit
    /// between JSON tokens, so they are folded into spaces.
    pub fn to_data_line(&self) -> String {
        format!("data: {}\n", self.data.replace('\n', " "))
    }
}

/// Cuts a byte stream into SSE events.
///
/// Bytes are buffered undecoded until a whole event is present, so a UTF-8
/// sequence split across chunks is decoded intact.
pub fn events<S, E>(mut stream: S) -> EventStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
    E: Into<StonkieError> + Send + 'static,
{
    Box::pin(try_stream! {
        let mut buffer: Vec<u8> = Vec::with_capacity(1024);
        let mut scanned = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(Into::<StonkieError>::into)?;
            buffer.extend(chunk.iter().filter(|&&byte| byte != b'\r'));

            while let Some(event_end) = find_delimiter(&buffer, scanned) {
                let block = String::from_utf8_lossy(&buffer[..event_end]).into_owned();
                buffer.drain(..event_end + EVENT_DELIMITER.len());
                scanned = 0;
                if let Some(event) = parse_block(&block) {
                    yield event;
                }
            }
            // A delimiter can straddle the next chunk boundary.
            scanned = buffer.len().saturating_sub(EVENT_DELIMITER.len() - 1);
        }

        if !buffer.is_empty() {
            if let Some(event) = parse_block(&String::from_utf8_lossy(&buffer)) {
                yield event;
            }
        }
    })
}

fn find_delimiter(buffer: &[u8], from: usize) -> Option<usize> {
    buffer
        .get(from..)?
        .windows(EVENT_DELIMITER.len())
        .position(|window| window == EVENT_DELIMITER)
        .map(|offset| from + offset)
}

/// Blocks without data are keep-alives and are skipped. A malformed `retry`
/// field is dropped with a warning, the rest of the event still counts.
fn parse_block(block: &str) -> Option<Event> {
    match Event::parse(block) {
        Ok(event) => Some(event),
        Err(EventError::InvalidFormat) => None,
        Err(err @ EventError::RetryParse(_)) => {
            warn!("[EventSource] Ignoring retry field: {}", err);
            let without_retry = block
                .lines()
                .filter(|line| {
                    line.split_once(FIELD_SEPARATOR)
                        .map_or(*line, |(field, _)| field)
                        != "retry"
                })
                .collect::<Vec<_>>()
                .join("\n");
            Event::parse(&without_retry).ok()
        }
    }
}

/// Extension trait for converting a Response into a Stream of SSE Events.
pub trait EventSourceExt {
    fn events(self) -> EventStream;
}

impl EventSourceExt for Response {
    fn events(self) -> EventStream {
        events(self.bytes_stream())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn chunks(parts: Vec<&'static str>) -> impl Stream<Item = Result<Bytes, Infallible>> + Unpin {
        byte_chunks(parts.into_iter().map(str::as_bytes).collect())
    }

    fn byte_chunks(parts: Vec<&'static [u8]>) -> impl Stream<Item = Result<Bytes, Infallible>> + Unpin {
        futures::stream::iter(parts.into_iter().map(|p| Ok(Bytes::from_static(p))))
    }

    #[test]
    fn test_event_parse_empty() {
        assert!(matches!(Event::parse(""), Err(EventError::InvalidFormat)));
    }

    #[test]
    fn test_event_parse_no_data() {
        assert!(matches!(
            Event::parse("id: 123\nevent: test\n"),
            Err(EventError::InvalidFormat)
        ));
    }

    #[test]
    fn test_event_parse_complex() {
        let input = "id: 123\nevent: insight\n: comment\ndata: line1\ndata: line2\nretry: 5000\n\n";
        let event = Event::parse(input).unwrap();
        assert_eq!(event.id, Some("123".to_string()));
        assert_eq!(event.event_type, Some("insight".to_string()));
        assert_eq!(event.data, "line1\nline2");
        assert_eq!(event.retry, Some(Duration::from_millis(5000)));
    }

    #[test]
    fn test_event_parse_invalid_retry() {
        let input = "retry: invalid\ndata: test\n\n";
        assert!(matches!(Event::parse(input), Err(EventError::RetryParse(_))));
    }

    #[test]
    fn test_data_line_folds_newlines() {
        let event = Event::parse("data: {\"a\":\ndata: 1}\n").unwrap();
        assert_eq!(event.to_data_line(), "data: {\"a\": 1}\n");
    }

    #[tokio::test]
    async fn test_events_across_chunks() {
        let stream = events(chunks(vec![
            "data: {\"status\":\"succ",
            "ess\"}\r\n\r\n: ping\n\ndata: [DONE]\n\n",
        ]));
        let events: Vec<_> = stream.collect().await;

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].as_ref().unwrap().data, "{\"status\":\"success\"}");
        assert_eq!(events[1].as_ref().unwrap().data, "[DONE]");
    }

    #[tokio::test]
    async fn test_multibyte_char_split_across_chunks() {
        let text = "data: Revenue \u{20ac}5B\n\n".as_bytes();
        let split = text.iter().position(|&b| b == 0xE2).unwrap() + 1;
        let (head, tail) = text.split_at(split);
        let events: Vec<_> = events(byte_chunks(vec![head, tail])).collect().await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap().data, "Revenue \u{20ac}5B");
    }

    #[tokio::test]
    async fn test_delimiter_split_across_chunks() {
        let events: Vec<_> = events(chunks(vec!["data: one\n", "\ndata: two\n\n"]))
            .collect()
            .await;
        let data: Vec<_> = events.iter().map(|e| e.as_ref().unwrap().data.as_str()).collect();
        assert_eq!(data, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_bad_retry_keeps_event_data() {
        let events: Vec<_> = events(chunks(vec!["retry: soon\ndata: kept\n\n"])).collect().await;

        assert_eq!(events.len(), 1);
        let event = events[0].as_ref().unwrap();
        assert_eq!(event.data, "kept");
        assert_eq!(event.retry, None);
    }

    #[tokio::test]
    async fn test_trailing_event_without_delimiter() {
        let events: Vec<_> = events(chunks(vec!["data: tail"])).collect().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap().data, "tail");
    }
}
