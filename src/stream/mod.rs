//! Incremental consumption of streamed HTTP bodies.
//!
//! A [`StreamConsumer`] pulls chunks from a [`ChunkSource`], reassembles
//! frames that were split across reads, and hands each complete frame to a
//! [`FrameHandler`] in arrival order.

mod buffer;
mod consumer;
mod frame;
mod source;

pub use buffer::PendingBuffer;
pub use consumer::{
    handler_fn, FnHandler, FrameHandler, HandleSlot, StreamConfig, StreamConsumer, StreamHandle,
};
pub use frame::{Frame, FrameFormat, DEFAULT_TERMINATOR};
pub use source::{
    channel, ByteStreamSource, ChannelSource, ChunkSender, ChunkSource, EventSourceSource,
    ResponseSource,
};
