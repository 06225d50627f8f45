use crate::api::types::{InsightEvent, InsightStatus, RevenueInsight};

/// Revenue insights accumulated from the insight stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsightFeed {
    content: String,
    errors: Vec<String>,
    complete: bool,
}

impl InsightFeed {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn apply(mut self, event: InsightEvent) -> Self {
        match event.status {
            InsightStatus::Success | InsightStatus::Streaming => {
                self.content.push_str(event.content());
            }
            InsightStatus::Error => {
                let message = event
                    .message
                    .clone()
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| event.content().to_string());
                self.errors.push(message);
            }
        }
        self
    }

    #[must_use]
    pub fn complete(mut self) -> Self {
        self.complete = true;
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub const fn is_complete(&self) -> bool {
        self.complete
    }

    /// One card per non-empty line of the accumulated text.
    pub fn insights(&self) -> Vec<RevenueInsight> {
        self.content
            .lines()
            .map(strip_list_marker)
            .filter(|line| !line.is_empty())
            .map(|line| RevenueInsight {
                insight: line.to_string(),
            })
            .collect()
    }
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    for bullet in ["- ", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(bullet) {
            return rest.trim_start();
        }
    }

    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return rest.trim_start();
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::InsightContent;
    use pretty_assertions::assert_eq;

    fn event(status: InsightStatus, content: &str) -> InsightEvent {
        InsightEvent {
            status,
            data: Some(InsightContent {
                content: content.to_string(),
            }),
            message: None,
        }
    }

    #[test]
    fn test_content_accumulates_in_order() {
        let feed = InsightFeed::new()
            .apply(event(InsightStatus::Streaming, "- iPhone leads"))
            .apply(event(InsightStatus::Streaming, " growth\n"))
            .apply(event(InsightStatus::Success, "2. Services margin up\n"))
            .complete();

        assert!(feed.is_complete());
        assert_eq!(
            feed.insights(),
            vec![
                RevenueInsight {
                    insight: "iPhone leads growth".to_string()
                },
                RevenueInsight {
                    insight: "Services margin up".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_error_frames_are_recorded() {
        let feed = InsightFeed::new().apply(InsightEvent {
            status: InsightStatus::Error,
            data: None,
            message: Some("No revenue data".to_string()),
        });
        assert_eq!(feed.errors(), ["No revenue data".to_string()]);
        assert_eq!(feed.content(), "");
    }

    #[test]
    fn test_plain_lines_keep_leading_numbers() {
        assert_eq!(strip_list_marker("2024 revenue rose"), "2024 revenue rose");
        assert_eq!(strip_list_marker("  * Wearables"), "Wearables");
        assert_eq!(strip_list_marker("3) Mac"), "Mac");
    }
}
