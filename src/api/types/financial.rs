use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    #[value(name = "income-statement")]
    IncomeStatement,
    #[value(name = "balance-sheet")]
    BalanceSheet,
    #[value(name = "cash-flow")]
    CashFlow,
}

impl ReportType {
    /// Path segment used by the backend.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IncomeStatement => "income_statement",
            Self::BalanceSheet => "balance_sheet",
            Self::CashFlow => "cash_flow",
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            Self::IncomeStatement => "Income Statement",
            Self::BalanceSheet => "Balance Sheet",
            Self::CashFlow => "Cash Flow",
        }
    }
}

/// A statement table: `columns[0]` names the metric, the rest are periods.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FinancialData {
    pub data: Vec<Map<String, Value>>,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SwotData {
    #[serde(default)]
    pub strength: Vec<String>,
    #[serde(default)]
    pub weakness: Vec<String>,
    #[serde(default)]
    pub opportunity: Vec<String>,
    #[serde(default)]
    pub threat: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SwotResponse {
    pub status: String,
    pub data: SwotData,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Company {
    pub name: String,
    pub ticker: String,
    #[serde(default)]
    pub logo_url: Option<String>,
}
