use crate::api::types::{AnalysisEvent, FaqEvent};
use log::warn;

pub const ANALYSIS_ERROR_MESSAGE: &str = "Sorry, I encountered an error analyzing the data.";
pub const FAQ_ERROR_MESSAGE: &str = "Sorry, I encountered an error generating questions.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Holds the FAQ suggestions rather than a chat reply
    pub is_faq: bool,
    pub suggestions: Vec<String>,
    pub is_streaming: bool,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            is_faq: false,
            suggestions: Vec::new(),
            is_streaming: false,
        }
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self {
            role: Role::Bot,
            ..Self::user(content)
        }
    }

    fn faq(suggestions: Vec<String>) -> Self {
        Self {
            is_faq: true,
            suggestions,
            ..Self::bot("")
        }
    }
}

/// The chat panel for one ticker.
///
/// Every operation consumes the log and returns the next one, so a frame
/// handler can hold it by value and swap it on each event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatLog {
    messages: Vec<ChatMessage>,
    faq_questions: Vec<String>,
    status_shown: bool,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// The bot message an analysis stream is currently writing to.
    pub fn streaming_message(&self) -> Option<&ChatMessage> {
        self.messages.iter().rev().find(|m| m.is_streaming)
    }

    pub fn faq_questions(&self) -> &[String] {
        &self.faq_questions
    }

    #[must_use]
    pub fn ask(mut self, question: impl Into<String>) -> Self {
        self.messages.push(ChatMessage::user(question));
        self
    }

    /// Opens an empty streaming bot message for the next answer.
    #[must_use]
    pub fn begin_answer(mut self) -> Self {
        self.messages.push(ChatMessage {
            is_streaming: true,
            ..ChatMessage::bot("")
        });
        self
    }

    #[must_use]
    pub fn append_answer(mut self, text: &str) -> Self {
        match self.streaming_mut() {
            Some(message) => message.content.push_str(text),
            None => {
                self.messages.push(ChatMessage {
                    is_streaming: true,
                    ..ChatMessage::bot(text)
                });
            }
        }
        self
    }

    #[must_use]
    pub fn apply_analysis(mut self, event: AnalysisEvent) -> Self {
        match event {
            AnalysisEvent::Answer { body } => self.append_answer(&body),
            AnalysisEvent::RelatedQuestion { body } => {
                if self.streaming_mut().is_none() {
                    self = self.begin_answer();
                }
                if let Some(message) = self.streaming_mut() {
                    message.suggestions.push(body);
                }
                self
            }
        }
    }

    #[must_use]
    pub fn finish_answer(mut self) -> Self {
        if let Some(message) = self.streaming_mut() {
            message.is_streaming = false;
        }
        self
    }

    #[must_use]
    pub fn apply_faq(mut self, event: FaqEvent) -> Self {
        match event {
            FaqEvent::Question { text } => {
                self.faq_questions.push(text);
                let questions = self.faq_questions.clone();
                match self.messages.iter_mut().find(|m| m.is_faq) {
                    Some(message) => message.suggestions = questions,
                    None => self.messages.push(ChatMessage::faq(questions)),
                }
            }
            FaqEvent::Status { message } if !self.status_shown => {
                self.status_shown = true;
                self.messages.push(ChatMessage::bot(message));
            }
            FaqEvent::Status { .. } => {}
            FaqEvent::Error { message } => warn!("[Chat] FAQ stream reported: {message}"),
        }
        self
    }

    /// Closes any streaming answer and appends a bot error message.
    #[must_use]
    pub fn fail(self, message: &str) -> Self {
        let mut log = self.finish_answer();
        log.messages.push(ChatMessage::bot(message));
        log
    }

    /// Records a failed FAQ stream as an empty suggestion message carrying
    /// [`FAQ_ERROR_MESSAGE`], so the panel renders it where suggestions go.
    #[must_use]
    pub fn fail_faq(mut self) -> Self {
        self.messages.push(ChatMessage {
            content: FAQ_ERROR_MESSAGE.to_string(),
            ..ChatMessage::faq(Vec::new())
        });
        self
    }

    /// Clears the log when the ticker changes.
    #[must_use]
    pub fn reset(self) -> Self {
        Self::default()
    }

    fn streaming_mut(&mut self) -> Option<&mut ChatMessage> {
        self.messages.iter_mut().rev().find(|m| m.is_streaming)
    }
}
