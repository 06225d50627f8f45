//! Caller-side state built from decoded stream frames.

mod chat;
mod insights;

pub use chat::{ChatLog, ChatMessage, Role, ANALYSIS_ERROR_MESSAGE, FAQ_ERROR_MESSAGE};
pub use insights::InsightFeed;
