use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightStatus {
    Success,
    Error,
    Streaming,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InsightContent {
    #[serde(default)]
    pub content: String,
}

/// One `data:` frame of the revenue insight stream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InsightEvent {
    pub status: InsightStatus,
    #[serde(default)]
    pub data: Option<InsightContent>,
    #[serde(default)]
    pub message: Option<String>,
}

impl InsightEvent {
    pub fn content(&self) -> &str {
        self.data.as_ref().map_or("", |data| data.content.as_str())
    }
}

/// Which revenue breakdown the insights are about.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum InsightSegment {
    #[default]
    #[value(name = "all")]
    All,
    #[value(name = "product")]
    Product,
    #[value(name = "region")]
    Region,
}

impl InsightSegment {
    /// Trailing path segment of the insight endpoint, if any.
    pub const fn path_segment(self) -> Option<&'static str> {
        match self {
            Self::All => None,
            Self::Product => Some("product"),
            Self::Region => Some("region"),
        }
    }
}

/// A single insight card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueInsight {
    pub insight: String,
}
