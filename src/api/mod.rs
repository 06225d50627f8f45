pub mod client;
pub mod search;
pub mod types;

pub use client::BackendClient;
pub use search::SymbolSearch;
