use serde::{Deserialize, Serialize};

/// Body of `POST /api/company/analyze`.
#[derive(Debug, Serialize)]
pub struct AnalysisRequest<'a> {
    pub question: &'a str,
    pub ticker: &'a str,
}

/// Typed frames of the structured analysis stream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalysisEvent {
    /// A piece of the answer text
    Answer { body: String },
    /// A follow-up question the user may ask next
    RelatedQuestion { body: String },
}
