use crate::core::StonkieError;
use clap::ValueEnum;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

pub const DEFAULT_TERMINATOR: &str = "[DONE]";

const DATA_FIELD: &str = "data:";
const IGNORED_SSE_FIELDS: [&str; 3] = ["event:", "id:", "retry:"];

/// How a response body is cut into frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FrameFormat {
    /// Undelimited running text, delivered as increments.
    #[value(name = "raw")]
    Raw,
    /// One JSON value per line.
    #[default]
    #[value(name = "ndjson")]
    Ndjson,
    /// One JSON value per `data: ` line.
    #[value(name = "sse")]
    Sse,
}

/// A complete unit extracted from a stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Increment of a raw text body
    Text(String),
    /// A parsed line
    Json(Value),
}

impl Frame {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            Self::Json(_) => None,
        }
    }

    pub const fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    /// Deserializes a JSON frame into one of the typed event schemas.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, StonkieError> {
        match self {
            Self::Json(value) => serde_json::from_value(value)
                .map_err(|e| StonkieError::ResponseFormat(format!("Unexpected frame shape: {e}"))),
            Self::Text(text) => Err(StonkieError::ResponseFormat(format!(
                "Expected a JSON frame, got text: {text}"
            ))),
        }
    }
}

/// Result of decoding one complete line.
#[derive(Debug, PartialEq)]
pub(crate) enum LineOutcome {
    /// Blank line or an SSE field that carries no payload
    Skip,
    Frame(Value),
    /// The end-of-stream sentinel
    Terminator,
}

/// Decodes one newline-terminated line of an `ndjson` or `sse` stream.
pub(crate) fn decode_line(
    line: &str,
    format: FrameFormat,
    terminator: &str,
) -> Result<LineOutcome, StonkieError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(LineOutcome::Skip);
    }

    let payload = match format {
        FrameFormat::Sse => match sse_payload(trimmed) {
            Some(payload) => payload,
            None => return Ok(LineOutcome::Skip),
        },
        FrameFormat::Ndjson | FrameFormat::Raw => trimmed,
    };

    if payload == terminator {
        return Ok(LineOutcome::Terminator);
    }

    let value: Value = serde_json::from_str(payload).map_err(|source| StonkieError::Decode {
        line: line.to_string(),
        source,
    })?;

    match value {
        Value::String(ref text) if text == terminator => Ok(LineOutcome::Terminator),
        value => Ok(LineOutcome::Frame(value)),
    }
}

/// Payload of an SSE line, or `None` for comments and non-data fields.
fn sse_payload(line: &str) -> Option<&str> {
    if line.starts_with(':') || IGNORED_SSE_FIELDS.iter().any(|f| line.starts_with(f)) {
        return None;
    }
    Some(line.strip_prefix(DATA_FIELD).map_or(line, str::trim_start))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(line: &str, format: FrameFormat) -> Result<LineOutcome, StonkieError> {
        decode_line(line, format, DEFAULT_TERMINATOR)
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        assert_eq!(decode("", FrameFormat::Ndjson).unwrap(), LineOutcome::Skip);
        assert_eq!(decode("   \t", FrameFormat::Sse).unwrap(), LineOutcome::Skip);
    }

    #[test]
    fn test_ndjson_line() {
        assert_eq!(
            decode(r#"{"type":"question","text":"Why?"}"#, FrameFormat::Ndjson).unwrap(),
            LineOutcome::Frame(json!({"type": "question", "text": "Why?"}))
        );
    }

    #[test]
    fn test_sse_prefix_is_stripped() {
        assert_eq!(
            decode(r#"data: {"status":"success"}"#, FrameFormat::Sse).unwrap(),
            LineOutcome::Frame(json!({"status": "success"}))
        );
        assert_eq!(
            decode(r#"data:{"status":"error"}"#, FrameFormat::Sse).unwrap(),
            LineOutcome::Frame(json!({"status": "error"}))
        );
        // Bare JSON lines are tolerated on SSE-like streams.
        assert_eq!(
            decode(r#"{"type":"status","message":"Thinking"}"#, FrameFormat::Sse).unwrap(),
            LineOutcome::Frame(json!({"type": "status", "message": "Thinking"}))
        );
    }

    #[test]
    fn test_sse_control_lines_are_skipped() {
        for line in [": keep-alive", "event: insight", "id: 7", "retry: 3000"] {
            assert_eq!(decode(line, FrameFormat::Sse).unwrap(), LineOutcome::Skip);
        }
    }

    #[test]
    fn test_ndjson_does_not_strip_data_prefix() {
        assert!(matches!(
            decode(r#"data: {"a":1}"#, FrameFormat::Ndjson),
            Err(StonkieError::Decode { .. })
        ));
    }

    #[test]
    fn test_terminator_detection() {
        assert_eq!(decode("data: [DONE]", FrameFormat::Sse).unwrap(), LineOutcome::Terminator);
        assert_eq!(decode("[DONE]", FrameFormat::Ndjson).unwrap(), LineOutcome::Terminator);
        assert_eq!(decode(r#""[DONE]""#, FrameFormat::Ndjson).unwrap(), LineOutcome::Terminator);
        assert_eq!(
            decode_line("data: <end>", FrameFormat::Sse, "<end>").unwrap(),
            LineOutcome::Terminator
        );
    }

    #[test]
    fn test_decode_error_keeps_raw_line() {
        match decode("data: {\"status\":", FrameFormat::Sse) {
            Err(StonkieError::Decode { line, .. }) => assert_eq!(line, "data: {\"status\":"),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn test_frame_decode_into_schema() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Question {
            text: String,
        }

        let frame = Frame::Json(json!({"text": "What drives margin?"}));
        assert_eq!(
            frame.decode::<Question>().unwrap(),
            Question {
                text: "What drives margin?".to_string()
            }
        );
        assert!(Frame::Text("plain".to_string()).decode::<Question>().is_err());
    }
}
