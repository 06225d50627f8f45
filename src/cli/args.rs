use clap::{Parser, Subcommand};

use crate::api::types::{InsightSegment, ReportType};
use crate::stream::FrameFormat;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Backend base URL, overrides config.toml and STONKIE_BACKEND_URL
    #[arg(long, global = true)]
    pub backend_url: Option<String>,

    /// Enable debug output
    #[arg(short, long, global = true, default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ask a question about a company and stream the answer
    Analyze {
        ticker: String,

        /// Your question
        #[arg(required = true)]
        question: Vec<String>,

        /// Frame format of the answer stream, defaults to the configured one
        #[arg(long, value_enum)]
        format: Option<FrameFormat>,
    },
    /// Stream suggested questions for a company
    Faq { ticker: String },
    /// Stream revenue insights
    Insights {
        ticker: String,

        #[arg(long, value_enum, default_value_t = InsightSegment::All)]
        segment: InsightSegment,

        /// Read the stream through the SSE event parser
        #[arg(long)]
        event_source: bool,
    },
    /// Print a financial statement
    Statement {
        ticker: String,

        #[arg(long, value_enum, default_value_t = ReportType::IncomeStatement)]
        report: ReportType,
    },
    /// Print the SWOT analysis of a company
    Swot { ticker: String },
    /// List the most viewed companies
    Trending,
    /// Look up tickers by company name or symbol
    Search {
        #[arg(required = true)]
        query: Vec<String>,
    },
}
