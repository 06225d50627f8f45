use crate::api::types::{AnalysisEvent, FaqEvent, InsightEvent, InsightStatus};
use crate::core::formatter::write_insights;
use crate::core::StonkieError;
use crate::state::{ChatLog, InsightFeed, ANALYSIS_ERROR_MESSAGE, FAQ_ERROR_MESSAGE};
use crate::stream::{Frame, FrameHandler};
use colored::Colorize;
use log::{debug, warn};
use std::io::Write;
use std::ops::ControlFlow;
use tokio::sync::oneshot;

pub type CompletionReceiver = oneshot::Receiver<Result<(), String>>;

/// Tells the command that started a stream how it ended.
pub struct Completion(Option<oneshot::Sender<Result<(), String>>>);

impl Completion {
    pub fn new() -> (Self, CompletionReceiver) {
        let (sender, receiver) = oneshot::channel();
        (Self(Some(sender)), receiver)
    }

    fn succeed(&mut self) {
        if let Some(sender) = self.0.take() {
            let _ = sender.send(Ok(()));
        }
    }

    fn fail(&mut self, error: &StonkieError) {
        if let Some(sender) = self.0.take() {
            let _ = sender.send(Err(error.to_string()));
        }
    }
}

fn emit<W: Write>(writer: &mut W, text: &str) {
    if let Err(e) = writer
        .write_all(text.as_bytes())
        .and_then(|()| writer.flush())
    {
        warn!("[View] failed to write output: {e}");
    }
}

/// Prints a chat answer as it streams and keeps the chat log in step.
pub struct AnalysisView<W> {
    writer: W,
    log: ChatLog,
    completion: Completion,
}

impl<W: Write + Send + 'static> AnalysisView<W> {
    pub fn new(writer: W, question: &str, completion: Completion) -> Self {
        Self {
            writer,
            log: ChatLog::new().ask(question).begin_answer(),
            completion,
        }
    }
}

impl<W: Write + Send + 'static> FrameHandler for AnalysisView<W> {
    fn on_frame(&mut self, frame: Frame) -> ControlFlow<()> {
        let log = std::mem::take(&mut self.log);
        self.log = match frame {
            Frame::Text(text) => {
                emit(&mut self.writer, &text);
                log.append_answer(&text)
            }
            frame => match frame.decode::<AnalysisEvent>() {
                Ok(event) => {
                    if let AnalysisEvent::Answer { body } = &event {
                        emit(&mut self.writer, body);
                    }
                    log.apply_analysis(event)
                }
                Err(e) => {
                    warn!("[View] skipping analysis frame: {e}");
                    log
                }
            },
        };
        ControlFlow::Continue(())
    }

    fn on_error(&mut self, error: &StonkieError) {
        if !error.is_fatal() {
            warn!("[View] {error}");
            return;
        }
        self.log = std::mem::take(&mut self.log).fail(ANALYSIS_ERROR_MESSAGE);
        emit(
            &mut self.writer,
            &format!("\n{}\n", ANALYSIS_ERROR_MESSAGE.red()),
        );
        self.completion.fail(error);
    }

    fn on_complete(&mut self) {
        self.log = std::mem::take(&mut self.log).finish_answer();
        emit(&mut self.writer, "\n");

        let suggestions = self
            .log
            .last()
            .map(|message| message.suggestions.clone())
            .unwrap_or_default();
        if !suggestions.is_empty() {
            emit(
                &mut self.writer,
                &format!("\n{}\n", "Related questions".bold()),
            );
            for suggestion in &suggestions {
                emit(&mut self.writer, &format!("  • {suggestion}\n"));
            }
        }
        self.completion.succeed();
    }
}

/// Prints suggested questions as they arrive.
pub struct FaqView<W> {
    writer: W,
    log: ChatLog,
    completion: Completion,
}

impl<W: Write + Send + 'static> FaqView<W> {
    pub fn new(writer: W, completion: Completion) -> Self {
        Self {
            writer,
            log: ChatLog::new(),
            completion,
        }
    }
}

impl<W: Write + Send + 'static> FrameHandler for FaqView<W> {
    fn on_frame(&mut self, frame: Frame) -> ControlFlow<()> {
        let event = match frame.decode::<FaqEvent>() {
            Ok(event) => event,
            Err(e) => {
                warn!("[View] skipping FAQ frame: {e}");
                return ControlFlow::Continue(());
            }
        };

        let line = match &event {
            FaqEvent::Question { text } => Some(format!("  • {text}\n")),
            FaqEvent::Status { message } => Some(format!("{}\n", message.italic())),
            FaqEvent::Error { .. } => None,
        };
        let is_status = matches!(event, FaqEvent::Status { .. });
        let shown = self.log.messages().len();
        self.log = std::mem::take(&mut self.log).apply_faq(event);

        // Only the first status makes it into the log.
        let quiet = is_status && self.log.messages().len() == shown;
        if let Some(line) = line.filter(|_| !quiet) {
            emit(&mut self.writer, &line);
        }
        ControlFlow::Continue(())
    }

    fn on_error(&mut self, error: &StonkieError) {
        if !error.is_fatal() {
            warn!("[View] {error}");
            return;
        }
        self.log = std::mem::take(&mut self.log).fail_faq();
        emit(&mut self.writer, &format!("{}\n", FAQ_ERROR_MESSAGE.red()));
        self.completion.fail(error);
    }

    fn on_complete(&mut self) {
        debug!(
            "[View] FAQ stream finished with {} questions",
            self.log.faq_questions().len()
        );
        if self.log.faq_questions().is_empty() {
            emit(&mut self.writer, "No suggested questions\n");
        }
        self.completion.succeed();
    }
}

/// Streams revenue insight text, then prints the derived cards.
pub struct InsightView<W> {
    writer: W,
    feed: InsightFeed,
    completion: Completion,
}

impl<W: Write + Send + 'static> InsightView<W> {
    pub fn new(writer: W, completion: Completion) -> Self {
        Self {
            writer,
            feed: InsightFeed::new(),
            completion,
        }
    }
}

impl<W: Write + Send + 'static> FrameHandler for InsightView<W> {
    fn on_frame(&mut self, frame: Frame) -> ControlFlow<()> {
        let event = match frame.decode::<InsightEvent>() {
            Ok(event) => event,
            Err(e) => {
                warn!("[View] skipping insight frame: {e}");
                return ControlFlow::Continue(());
            }
        };

        if event.status == InsightStatus::Error {
            let errors = self.feed.errors().len();
            self.feed = std::mem::take(&mut self.feed).apply(event);
            if let Some(message) = self.feed.errors().get(errors) {
                emit(&mut self.writer, &format!("{}\n", message.red()));
            }
        } else {
            emit(&mut self.writer, event.content());
            self.feed = std::mem::take(&mut self.feed).apply(event);
        }
        ControlFlow::Continue(())
    }

    fn on_error(&mut self, error: &StonkieError) {
        if !error.is_fatal() {
            warn!("[View] {error}");
            return;
        }
        emit(
            &mut self.writer,
            &format!("\n{}\n", "Failed to load revenue insights".red()),
        );
        self.completion.fail(error);
    }

    fn on_complete(&mut self) {
        self.feed = std::mem::take(&mut self.feed).complete();
        let insights = self.feed.insights();
        if !insights.is_empty() {
            emit(&mut self.writer, &format!("\n\n{}\n", "Insights".bold()));
            if let Err(e) = write_insights(&mut self.writer, &insights) {
                warn!("[View] failed to write insights: {e}");
            }
        }
        self.completion.succeed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{channel, ByteStreamSource, ChunkSource, FrameFormat, StreamConfig, StreamConsumer};
    use bytes::Bytes;
    use pretty_assertions::assert_eq;
    use std::convert::Infallible;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn body(chunks: Vec<&'static str>) -> impl ChunkSource {
        ByteStreamSource::new(futures::stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok::<_, Infallible>(Bytes::from_static(c.as_bytes()))),
        ))
    }

    async fn run<H: FrameHandler>(
        format: FrameFormat,
        source: impl ChunkSource + 'static,
        view: H,
    ) {
        let mut handle = StreamConsumer::new(StreamConfig::new(format)).start(source, view);
        handle.wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_analysis_view_prints_increments() {
        colored::control::set_override(false);
        let out = SharedBuffer::default();
        let (completion, outcome) = Completion::new();
        let view = AnalysisView::new(out.clone(), "How is AAPL?", completion);

        run(FrameFormat::Raw, body(vec!["Revenue ", "grew."]), view).await;

        assert_eq!(out.text(), "Revenue grew.\n");
        assert_eq!(outcome.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn test_analysis_view_lists_related_questions() {
        colored::control::set_override(false);
        let out = SharedBuffer::default();
        let (completion, _outcome) = Completion::new();
        let view = AnalysisView::new(out.clone(), "Margins?", completion);

        run(
            FrameFormat::Ndjson,
            body(vec![
                "{\"type\":\"answer\",\"body\":\"Up 2%.\"}\n",
                "{\"type\":\"related_question\",\"body\":\"Why?\"}\n",
            ]),
            view,
        )
        .await;

        assert_eq!(out.text(), "Up 2%.\n\nRelated questions\n  • Why?\n");
    }

    #[tokio::test]
    async fn test_analysis_view_reports_transport_failure() {
        colored::control::set_override(false);
        let out = SharedBuffer::default();
        let (completion, outcome) = Completion::new();
        let view = AnalysisView::new(out.clone(), "Why?", completion);

        let (sender, source) = channel(4);
        sender.send(Ok(Bytes::from_static(b"Partial"))).await.unwrap();
        sender
            .send(Err(StonkieError::Transport("connection reset".to_string())))
            .await
            .unwrap();
        drop(sender);
        run(FrameFormat::Raw, source, view).await;

        assert_eq!(out.text(), format!("Partial\n{ANALYSIS_ERROR_MESSAGE}\n"));
        assert!(outcome.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn test_faq_view_shows_first_status_and_questions() {
        colored::control::set_override(false);
        let out = SharedBuffer::default();
        let (completion, outcome) = Completion::new();

        run(
            FrameFormat::Sse,
            body(vec![
                "data: {\"type\":\"status\",\"message\":\"Thinking\"}\n",
                "data: {\"type\":\"status\",\"message\":\"Still thinking\"}\n",
                "data: {\"type\":\"question\",\"text\":\"Q1\"}\n",
                "data: {\"type\":\"error\",\"message\":\"partial\"}\n",
                "data: {\"type\":\"question\",\"text\":\"Q2\"}\n",
            ]),
            FaqView::new(out.clone(), completion),
        )
        .await;

        assert_eq!(out.text(), "Thinking\n  • Q1\n  • Q2\n");
        assert_eq!(outcome.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn test_faq_view_reports_transport_failure() {
        colored::control::set_override(false);
        let out = SharedBuffer::default();
        let (completion, outcome) = Completion::new();

        let (sender, source) = channel(4);
        sender
            .send(Ok(Bytes::from_static(b"data: {\"type\":\"question\",\"text\":\"Q1\"}\n")))
            .await
            .unwrap();
        sender
            .send(Err(StonkieError::Transport("connection reset".to_string())))
            .await
            .unwrap();
        drop(sender);
        run(FrameFormat::Sse, source, FaqView::new(out.clone(), completion)).await;

        assert_eq!(out.text(), format!("  • Q1\n{FAQ_ERROR_MESSAGE}\n"));
        assert!(outcome.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn test_insight_view_prints_cards_on_completion() {
        colored::control::set_override(false);
        let out = SharedBuffer::default();
        let (completion, _outcome) = Completion::new();

        run(
            FrameFormat::Sse,
            body(vec![
                "data: {\"status\":\"streaming\",\"data\":{\"content\":\"- iPhone\\n\"}}\n",
                "data: {\"status\":\"success\",\"data\":{\"content\":\"- Services\"}}\n",
                "data: [DONE]\n",
            ]),
            InsightView::new(out.clone(), completion),
        )
        .await;

        assert_eq!(out.text(), "- iPhone\n- Services\n\nInsights\n1. iPhone\n2. Services\n");
    }
}
