mod analysis;
mod faq;
mod financial;
mod insights;
mod search;

pub use analysis::{AnalysisEvent, AnalysisRequest};
pub use faq::FaqEvent;
pub use financial::{Company, FinancialData, ReportType, SwotData, SwotResponse};
pub use insights::{InsightContent, InsightEvent, InsightSegment, InsightStatus, RevenueInsight};
pub use search::{SymbolMatch, SymbolSearchResponse};
