pub mod api;
pub mod cli;
pub mod core;
pub mod eventsource;
pub mod state;
pub mod stream;

pub use crate::api::{BackendClient, SymbolSearch};
pub use crate::core::{Config, StonkieError, StreamPurpose};
pub use crate::stream::{
    Frame, FrameFormat, FrameHandler, HandleSlot, StreamConfig, StreamConsumer, StreamHandle,
};
