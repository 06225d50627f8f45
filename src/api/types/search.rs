use super::financial::Company;
use crate::core::StonkieError;
use serde::Deserialize;

/// Body of an Alpha Vantage `SYMBOL_SEARCH` query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SymbolSearchResponse {
    #[serde(rename = "bestMatches")]
    pub best_matches: Option<Vec<SymbolMatch>>,
    /// Sent with status 200 instead of matches when the key is throttled.
    #[serde(rename = "Note", alias = "Information")]
    pub note: Option<String>,
    #[serde(rename = "Error Message")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SymbolMatch {
    #[serde(rename = "1. symbol")]
    pub symbol: String,
    #[serde(rename = "2. name")]
    pub name: String,
}

impl From<SymbolMatch> for Company {
    fn from(found: SymbolMatch) -> Self {
        Self {
            name: found.name,
            ticker: found.symbol,
            logo_url: None,
        }
    }
}

impl SymbolSearchResponse {
    pub fn into_companies(self) -> Result<Vec<Company>, StonkieError> {
        if let Some(matches) = self.best_matches {
            return Ok(matches.into_iter().map(Company::from).collect());
        }
        match (self.error_message, self.note) {
            (Some(error), _) => Err(StonkieError::ResponseFormat(error)),
            (None, Some(note)) => Err(StonkieError::RateLimited(note)),
            (None, None) => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_best_matches_become_companies() {
        let response: SymbolSearchResponse = serde_json::from_str(
            r#"{"bestMatches": [{
                "1. symbol": "TSCO.LON",
                "2. name": "Tesco PLC",
                "3. type": "Equity",
                "4. region": "United Kingdom"
            }]}"#,
        )
        .unwrap();

        assert_eq!(
            response.into_companies().unwrap(),
            vec![Company {
                name: "Tesco PLC".to_string(),
                ticker: "TSCO.LON".to_string(),
                logo_url: None,
            }]
        );
    }

    #[test]
    fn test_throttle_note_is_rate_limited() {
        let response: SymbolSearchResponse =
            serde_json::from_str(r#"{"Information": "Please slow down"}"#).unwrap();
        assert!(matches!(
            response.into_companies(),
            Err(StonkieError::RateLimited(note)) if note == "Please slow down"
        ));
    }

    #[test]
    fn test_empty_body_has_no_matches() {
        let response: SymbolSearchResponse = serde_json::from_str("{}").unwrap();
        assert!(response.into_companies().unwrap().is_empty());
    }
}
