mod config;
pub mod error;
pub mod formatter;

pub use config::Config;
pub use config::StreamFormats;
pub use config::StreamPurpose;
pub use config::BACKEND_URL_ENV;
pub use config::SEARCH_API_KEY_ENV;
pub use error::StonkieError;
