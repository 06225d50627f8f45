use super::buffer::PendingBuffer;
use super::frame::{decode_line, Frame, FrameFormat, LineOutcome, DEFAULT_TERMINATOR};
use super::source::ChunkSource;
use crate::core::StonkieError;
use bytes::Bytes;
use log::{debug, warn};
use std::cell::Cell;
use std::future::Future;
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How a stream is framed and when it is considered stalled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    pub format: FrameFormat,
    /// Payload that ends the stream early. Ignored for [`FrameFormat::Raw`].
    pub terminator: String,
    /// Longest wait for a single chunk. `None` waits forever.
    pub idle_timeout: Option<Duration>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::new(FrameFormat::default())
    }
}

impl StreamConfig {
    pub fn new(format: FrameFormat) -> Self {
        Self {
            format,
            terminator: DEFAULT_TERMINATOR.to_string(),
            idle_timeout: None,
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: FrameFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_terminator(mut self, terminator: impl Into<String>) -> Self {
        self.terminator = terminator.into();
        self
    }

    #[must_use]
    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }
}

/// Receives the outcome of a stream.
///
/// Callbacks run on the stream's task, one at a time and in arrival order.
/// After a fatal error `on_complete` is never called.
pub trait FrameHandler: Send + 'static {
    /// Called once per complete frame. Returning `Break` stops the stream
    /// as if it had been cancelled.
    fn on_frame(&mut self, frame: Frame) -> ControlFlow<()>;

    /// Called for undecodable frames (recoverable) and for the single
    /// terminal transport error. See [`StonkieError::is_fatal`].
    fn on_error(&mut self, error: &StonkieError);

    fn on_complete(&mut self);
}

/// A [`FrameHandler`] built from three closures.
pub struct FnHandler<F, E, C> {
    on_frame: F,
    on_error: E,
    on_complete: C,
}

pub fn handler_fn<F, E, C>(on_frame: F, on_error: E, on_complete: C) -> FnHandler<F, E, C>
where
    F: FnMut(Frame) + Send + 'static,
    E: FnMut(&StonkieError) + Send + 'static,
    C: FnMut() + Send + 'static,
{
    FnHandler {
        on_frame,
        on_error,
        on_complete,
    }
}

impl<F, E, C> FrameHandler for FnHandler<F, E, C>
where
    F: FnMut(Frame) + Send + 'static,
    E: FnMut(&StonkieError) + Send + 'static,
    C: FnMut() + Send + 'static,
{
    fn on_frame(&mut self, frame: Frame) -> ControlFlow<()> {
        (self.on_frame)(frame);
        ControlFlow::Continue(())
    }

    fn on_error(&mut self, error: &StonkieError) {
        (self.on_error)(error);
    }

    fn on_complete(&mut self) {
        (self.on_complete)();
    }
}

thread_local! {
    /// Address of the gate whose callback is running on this thread, or 0.
    static DISPATCHING: Cell<usize> = const { Cell::new(0) };
}

/// Serializes callbacks against cancellation: once `close` returns, no
/// callback can start.
struct Gate {
    token: CancellationToken,
    dispatch: Mutex<()>,
}

struct DispatchScope(usize);

impl Drop for DispatchScope {
    fn drop(&mut self) {
        DISPATCHING.with(|current| current.set(self.0));
    }
}

impl Gate {
    fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            dispatch: Mutex::new(()),
        }
    }

    fn id(&self) -> usize {
        std::ptr::from_ref(self) as usize
    }

    fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }

    fn close(&self) {
        // Every dispatch checks the token under the lock, so setting it first
        // is enough to stop callbacks that have not started yet.
        self.token.cancel();
        // Inside a callback we must not wait. If it is ours, the lock is
        // already held up the stack. If it is another stream's, waiting while
        // holding that stream's lock could deadlock against it cancelling us.
        if DISPATCHING.with(Cell::get) == 0 {
            let _guard = self.dispatch.lock().unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn dispatch<R>(&self, callback: impl FnOnce() -> R) -> Option<R> {
        let _guard = self.dispatch.lock().unwrap_or_else(PoisonError::into_inner);
        if self.token.is_cancelled() {
            return None;
        }
        let _scope = DispatchScope(DISPATCHING.with(|current| current.replace(self.id())));
        Some(callback())
    }
}

/// One in-flight stream consumption.
///
/// Dropping the handle cancels the stream.
pub struct StreamHandle {
    gate: Arc<Gate>,
    task: Option<JoinHandle<()>>,
}

impl StreamHandle {
    /// Stops the stream and releases its source. Idempotent.
    ///
    /// No callback starts after this returns; a callback already running on
    /// another thread is waited for. Calling it from inside a callback is
    /// allowed, for this stream or another one. In that case it does not wait
    /// for the other stream's running callback, so two streams can cancel
    /// each other from their callbacks without deadlocking.
    pub fn cancel(&self) {
        if !self.gate.is_closed() {
            debug!("[Stream] cancellation requested");
        }
        self.gate.close();
    }

    pub fn is_cancelled(&self) -> bool {
        self.gate.is_closed()
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Waits for the read loop to exit, whether it completed, failed or was
    /// cancelled.
    pub async fn wait(&mut self) -> Result<(), StonkieError> {
        if let Some(task) = self.task.as_mut() {
            let result = task.await;
            self.task = None;
            result.map_err(|e| StonkieError::Transport(format!("stream task failed: {e}")))?;
        }
        Ok(())
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.gate.close();
        }
    }
}

/// Keeps at most one live stream for a given purpose. Installing a new
/// handle cancels the one it supersedes.
#[derive(Default)]
pub struct HandleSlot {
    current: Option<StreamHandle>,
}

impl HandleSlot {
    pub const fn new() -> Self {
        Self { current: None }
    }

    pub fn replace(&mut self, handle: StreamHandle) {
        if let Some(previous) = self.current.replace(handle) {
            debug!("[Stream] superseding previous stream");
            previous.cancel();
        }
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.current.take() {
            handle.cancel();
        }
    }

    pub fn current_mut(&mut self) -> Option<&mut StreamHandle> {
        self.current.as_mut()
    }

    pub fn is_active(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|handle| !handle.is_finished() && !handle.is_cancelled())
    }
}

/// Consumes streamed bodies and dispatches complete frames to a handler.
#[derive(Debug, Clone, Default)]
pub struct StreamConsumer {
    config: StreamConfig,
}

impl StreamConsumer {
    pub const fn new(config: StreamConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Starts reading `source` on a new task. Must be called within a tokio
    /// runtime. All outcomes are reported through `handler`.
    pub fn start<S, H>(&self, source: S, handler: H) -> StreamHandle
    where
        S: ChunkSource + 'static,
        H: FrameHandler,
    {
        self.start_with(async move { Ok(source) }, handler)
    }

    /// Like [`start`](Self::start), but opens the source on the stream task so
    /// that connection and status failures reach `handler.on_error`.
    pub fn start_with<F, S, H>(&self, connect: F, handler: H) -> StreamHandle
    where
        F: Future<Output = Result<S, StonkieError>> + Send + 'static,
        S: ChunkSource + 'static,
        H: FrameHandler,
    {
        let gate = Arc::new(Gate::new());
        let read_loop = ReadLoop {
            config: self.config.clone(),
            handler,
            gate: Arc::clone(&gate),
            buffer: PendingBuffer::new(),
        };
        let task = tokio::spawn(read_loop.run(connect));

        StreamHandle {
            gate,
            task: Some(task),
        }
    }
}

enum Step {
    Continue,
    Stop,
}

struct ReadLoop<H> {
    config: StreamConfig,
    handler: H,
    gate: Arc<Gate>,
    buffer: PendingBuffer,
}

impl<H: FrameHandler> ReadLoop<H> {
    async fn run<F, S>(mut self, connect: F)
    where
        F: Future<Output = Result<S, StonkieError>> + Send,
        S: ChunkSource,
    {
        let token = self.gate.token.clone();
        let opened = tokio::select! {
            biased;
            () = token.cancelled() => return,
            opened = connect => opened,
        };

        let mut source = match opened {
            Ok(source) => source,
            Err(err) => {
                warn!("[Stream] failed to open stream: {err}");
                self.emit_error(&err);
                return;
            }
        };

        self.pump(&mut source).await;
        source.close().await;
        debug!("[Stream] reader closed");
    }

    async fn pump<S: ChunkSource>(&mut self, source: &mut S) {
        let token = self.gate.token.clone();
        loop {
            let next = tokio::select! {
                biased;
                () = token.cancelled() => {
                    debug!("[Stream] stopped by cancellation");
                    return;
                }
                next = pull(source, self.config.idle_timeout) => next,
            };

            let step = match next {
                Ok(Some(chunk)) => {
                    self.buffer.push(&chunk);
                    self.drain()
                }
                Ok(None) => {
                    self.finish();
                    Step::Stop
                }
                Err(err) => {
                    warn!("[Stream] transport failure: {err}");
                    self.emit_error(&err);
                    Step::Stop
                }
            };

            if let Step::Stop = step {
                return;
            }
        }
    }

    /// Dispatches everything the buffer can resolve so far.
    fn drain(&mut self) -> Step {
        match self.config.format {
            FrameFormat::Raw => {
                let text = self.buffer.take_text();
                if text.is_empty() {
                    Step::Continue
                } else {
                    self.emit_frame(Frame::Text(text))
                }
            }
            FrameFormat::Ndjson | FrameFormat::Sse => {
                for line in self.buffer.drain_lines() {
                    if let Step::Stop = self.process_line(&line) {
                        return Step::Stop;
                    }
                }
                Step::Continue
            }
        }
    }

    fn process_line(&mut self, line: &str) -> Step {
        match decode_line(line, self.config.format, &self.config.terminator) {
            Ok(LineOutcome::Skip) => Step::Continue,
            Ok(LineOutcome::Frame(value)) => self.emit_frame(Frame::Json(value)),
            Ok(LineOutcome::Terminator) => {
                debug!("[Stream] terminator received");
                self.emit_complete();
                Step::Stop
            }
            Err(err) => {
                debug!("[Stream] skipping frame: {err}");
                self.emit_error(&err)
            }
        }
    }

    /// End of input: flush a trailing frame if it stands on its own.
    fn finish(&mut self) {
        let remainder = self.buffer.take_remainder();
        let step = match self.config.format {
            FrameFormat::Raw if remainder.is_empty() => Step::Continue,
            FrameFormat::Raw => self.emit_frame(Frame::Text(remainder)),
            FrameFormat::Ndjson | FrameFormat::Sse => {
                match decode_line(&remainder, self.config.format, &self.config.terminator) {
                    Ok(LineOutcome::Frame(value)) => self.emit_frame(Frame::Json(value)),
                    Ok(LineOutcome::Skip | LineOutcome::Terminator) => Step::Continue,
                    Err(_) => {
                        debug!(
                            "[Stream] discarding incomplete trailing fragment ({} bytes)",
                            remainder.len()
                        );
                        Step::Continue
                    }
                }
            }
        };

        if let Step::Continue = step {
            self.emit_complete();
        }
    }

    fn emit_frame(&mut self, frame: Frame) -> Step {
        let handler = &mut self.handler;
        match self.gate.dispatch(|| handler.on_frame(frame)) {
            Some(ControlFlow::Continue(())) => Step::Continue,
            Some(ControlFlow::Break(())) => {
                debug!("[Stream] handler stopped the stream");
                self.gate.token.cancel();
                Step::Stop
            }
            None => Step::Stop,
        }
    }

    fn emit_error(&mut self, error: &StonkieError) -> Step {
        let handler = &mut self.handler;
        match self.gate.dispatch(|| handler.on_error(error)) {
            Some(()) => Step::Continue,
            None => Step::Stop,
        }
    }

    fn emit_complete(&mut self) {
        let handler = &mut self.handler;
        self.gate.dispatch(|| handler.on_complete());
    }
}

async fn pull<S: ChunkSource>(
    source: &mut S,
    idle_timeout: Option<Duration>,
) -> Result<Option<Bytes>, StonkieError> {
    match idle_timeout {
        Some(limit) => tokio::time::timeout(limit, source.read())
            .await
            .map_err(|_| StonkieError::Timeout(limit))?,
        None => source.read().await,
    }
}
