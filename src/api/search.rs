use super::client::{check_status, endpoint_url, read_json};
use crate::api::types::{Company, SymbolSearchResponse};
use crate::core::{Config, StonkieError, SEARCH_API_KEY_ENV};
use log::debug;
use reqwest::Client;

const QUERY_PATH: [&str; 1] = ["query"];

/// Ticker lookup by company name, backed by Alpha Vantage `SYMBOL_SEARCH`.
#[derive(Debug, Clone)]
pub struct SymbolSearch {
    base_url: String,
    api_key: String,
    client: Client,
}

impl SymbolSearch {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_client(base_url, api_key, Client::new())
    }

    pub fn with_client(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        client: Client,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            api_key: api_key.into(),
            client,
        }
    }

    /// Fails with a `ConfigError` when no API key was configured.
    pub fn from_config(config: &Config) -> Result<Self, StonkieError> {
        let api_key = config.search_api_key.clone().ok_or_else(|| {
            StonkieError::ConfigError(format!("Ticker search needs {SEARCH_API_KEY_ENV} to be set"))
        })?;
        let mut builder = Client::builder();
        if let Some(timeout) = config.connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| StonkieError::ConfigError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(config.search_url.clone(), api_key, client))
    }

    /// Companies whose symbol or name matches `query`. A blank query matches
    /// nothing and makes no request.
    pub async fn search(&self, query: &str) -> Result<Vec<Company>, StonkieError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let request = self.client.get(endpoint_url(&self.base_url, QUERY_PATH)?).query(&[
            ("function", "SYMBOL_SEARCH"),
            ("keywords", query),
            ("apikey", self.api_key.as_str()),
        ]);
        let response = request.send().await.map_err(StonkieError::from)?;
        let response: SymbolSearchResponse = read_json(check_status(response).await?).await?;
        let companies = response.into_companies()?;
        debug!("[Search] {query}: {} matches", companies.len());
        Ok(companies)
    }
}
