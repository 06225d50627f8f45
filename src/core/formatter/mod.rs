mod number;
mod table;

use crate::api::types::{Company, RevenueInsight, SwotData};
use crate::core::StonkieError;
use colored::Colorize;
use std::io::Write;

pub use number::format_number;
pub use table::{is_highlighted_row, write_statement, THOUSANDS_CAPTION};

pub fn write_swot<W: Write>(writer: &mut W, swot: &SwotData) -> Result<(), StonkieError> {
    let quadrants = [
        ("Strengths", &swot.strength),
        ("Weaknesses", &swot.weakness),
        ("Opportunities", &swot.opportunity),
        ("Threats", &swot.threat),
    ];
    for (title, points) in quadrants {
        writeln!(writer, "{}", title.bold())?;
        if points.is_empty() {
            writeln!(writer, "  (none)")?;
        }
        for point in points {
            writeln!(writer, "  • {point}")?;
        }
    }
    Ok(())
}

pub fn write_insights<W: Write>(
    writer: &mut W,
    insights: &[RevenueInsight],
) -> Result<(), StonkieError> {
    for (index, card) in insights.iter().enumerate() {
        writeln!(writer, "{} {}", format!("{}.", index + 1).cyan(), card.insight)?;
    }
    Ok(())
}

pub fn write_companies<W: Write>(writer: &mut W, companies: &[Company]) -> Result<(), StonkieError> {
    let width = companies
        .iter()
        .map(|c| c.ticker.chars().count())
        .max()
        .unwrap_or_default();
    for company in companies {
        writeln!(
            writer,
            "{}  {}",
            format!("{:<width$}", company.ticker).bold(),
            company.name
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swot_lists_every_quadrant() {
        colored::control::set_override(false);
        let swot = SwotData {
            strength: vec!["Brand".to_string()],
            threat: vec!["Regulation".to_string()],
            ..SwotData::default()
        };
        let mut out = Vec::new();
        write_swot(&mut out, &swot).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(
            text,
            "Strengths\n  • Brand\nWeaknesses\n  (none)\nOpportunities\n  (none)\nThreats\n  • Regulation\n"
        );
    }
}
