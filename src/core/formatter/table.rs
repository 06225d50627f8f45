use super::number::format_number;
use crate::api::types::{FinancialData, ReportType};
use crate::core::StonkieError;
use colored::Colorize;
use serde_json::Value;
use std::io::Write;

pub const THOUSANDS_CAPTION: &str = "All numbers are in thousands of USD.";

const HIGHLIGHTED_ROWS: [&str; 9] = [
    "total assets",
    "total liabilities",
    "total equity",
    "total revenue",
    "gross profit",
    "net income",
    "operating cash flow",
    "financing cash flow",
    "free cash flow",
];
const COLUMN_GAP: &str = "  ";

pub fn is_highlighted_row(metric: &str) -> bool {
    let metric = metric.trim().to_lowercase();
    HIGHLIGHTED_ROWS.contains(&metric.as_str())
}

/// Writes a statement as a text table in the backend's column order.
pub fn write_statement<W: Write>(
    writer: &mut W,
    report: ReportType,
    statement: &FinancialData,
) -> Result<(), StonkieError> {
    writeln!(writer, "{}", report.title().bold())?;
    writeln!(writer, "{}", THOUSANDS_CAPTION.dimmed())?;

    if statement.columns.is_empty() || statement.data.is_empty() {
        writeln!(writer, "No data available")?;
        return Ok(());
    }

    let rows: Vec<Vec<String>> = statement
        .data
        .iter()
        .map(|row| {
            statement
                .columns
                .iter()
                .enumerate()
                .map(|(index, column)| cell_text(row.get(column), index == 0))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = statement
        .columns
        .iter()
        .enumerate()
        .map(|(index, column)| {
            rows.iter()
                .map(|row| row[index].chars().count())
                .chain(std::iter::once(column.chars().count()))
                .max()
                .unwrap_or_default()
        })
        .collect();

    let header = layout(&statement.columns, &widths);
    writeln!(writer, "{}", header.underline())?;
    for row in &rows {
        let line = layout(row, &widths);
        if is_highlighted_row(&row[0]) {
            writeln!(writer, "{}", line.bold())?;
        } else {
            writeln!(writer, "{line}")?;
        }
    }
    Ok(())
}

/// Pads cells to their column widths: metric names left, figures right.
fn layout(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(index, (cell, width))| {
            if index == 0 {
                format!("{cell:<width$}")
            } else {
                format!("{cell:>width$}")
            }
        })
        .collect::<Vec<_>>()
        .join(COLUMN_GAP)
}

fn cell_text(value: Option<&Value>, is_metric: bool) -> String {
    match value {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(text)) if is_metric => text.clone(),
        Some(Value::Number(number)) if !is_metric => number
            .as_f64()
            .map_or_else(|| number.to_string(), |n| format_number(n, false)),
        Some(Value::String(text)) => text
            .trim()
            .parse::<f64>()
            .map_or_else(|_| text.clone(), |n| format_number(n, false)),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn statement() -> FinancialData {
        serde_json::from_value(json!({
            "columns": ["Breakdown", "2023", "2022"],
            "data": [
                {"Breakdown": "Total Revenue", "2023": 383285000, "2022": "394328000"},
                {"Breakdown": "Cost of revenue", "2023": 214137000, "2022": null},
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_headline_rows_match_case_insensitively() {
        assert!(is_highlighted_row("Total Revenue"));
        assert!(is_highlighted_row(" free cash flow "));
        assert!(!is_highlighted_row("Cost of revenue"));
    }

    #[test]
    fn test_statement_keeps_column_order_and_metric_names() {
        colored::control::set_override(false);
        let mut out = Vec::new();
        write_statement(&mut out, ReportType::IncomeStatement, &statement()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Income Statement");
        assert_eq!(lines[1], THOUSANDS_CAPTION);
        assert!(lines[2].starts_with("Breakdown"));
        assert!(lines[2].find("2023").unwrap() < lines[2].find("2022").unwrap());
        assert!(lines[3].starts_with("Total Revenue"));
        assert!(lines[4].starts_with("Cost of revenue"));
        assert!(lines[4].trim_end().ends_with('-'));
    }

    #[test]
    fn test_empty_statement() {
        colored::control::set_override(false);
        let mut out = Vec::new();
        write_statement(&mut out, ReportType::CashFlow, &FinancialData::default()).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("No data available"));
    }
}
