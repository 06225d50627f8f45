use serde::Deserialize;

/// Frames of the FAQ suggestion stream.
///
/// An `Error` frame is sent on purpose by the backend and is a normal frame,
/// not a stream failure.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FaqEvent {
    Question { text: String },
    Status { message: String },
    Error { message: String },
}
