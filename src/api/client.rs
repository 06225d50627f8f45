use crate::api::types::{
    AnalysisRequest, Company, FinancialData, InsightSegment, ReportType, SwotData, SwotResponse,
};
use crate::core::{Config, StonkieError};
use crate::stream::{EventSourceSource, ResponseSource};
use log::debug;
use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

const ANALYZE_PATH: [&str; 3] = ["api", "company", "analyze"];
const FAQ_PATH: [&str; 3] = ["api", "company", "faq"];
const MOST_VIEWED_PATH: [&str; 3] = ["api", "companies", "most-viewed"];
const EVENT_STREAM: &str = "text/event-stream";

/// Client for the Stonkie backend.
///
/// The streaming endpoints hand back a [`ChunkSource`](crate::stream::ChunkSource)
/// for a [`StreamConsumer`](crate::stream::StreamConsumer); the rest return
/// decoded payloads.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    client: Client,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    /// Builds a client for `config.backend_url`, honouring the connect timeout.
    pub fn from_config(config: &Config) -> Result<Self, StonkieError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| StonkieError::ConfigError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(config.backend_url.clone(), client))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url<I>(&self, segments: I) -> Result<Url, StonkieError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        endpoint_url(&self.base_url, segments)
    }

    /// Opens the analysis stream for a chat question.
    pub async fn open_analysis(
        &self,
        ticker: &str,
        question: &str,
    ) -> Result<ResponseSource, StonkieError> {
        let request = AnalysisRequest { question, ticker };
        let response = self
            .send(self.client.post(self.url(ANALYZE_PATH)?).json(&request))
            .await?;
        ResponseSource::new(response)
    }

    /// Opens the FAQ suggestion stream.
    pub async fn open_faq(&self, ticker: &str) -> Result<ResponseSource, StonkieError> {
        let request = self
            .client
            .get(self.url(FAQ_PATH)?)
            .query(&[("ticker", ticker), ("stream", "true")]);
        ResponseSource::new(self.send(request).await?)
    }

    /// Opens the revenue insight stream as a plain chunked body.
    pub async fn open_revenue_insights(
        &self,
        ticker: &str,
        segment: InsightSegment,
    ) -> Result<ResponseSource, StonkieError> {
        ResponseSource::new(self.insights_response(ticker, segment).await?)
    }

    /// Opens the revenue insight stream through the SSE event parser.
    pub async fn open_revenue_insight_events(
        &self,
        ticker: &str,
        segment: InsightSegment,
    ) -> Result<EventSourceSource, StonkieError> {
        EventSourceSource::from_response(self.insights_response(ticker, segment).await?)
    }

    async fn insights_response(
        &self,
        ticker: &str,
        segment: InsightSegment,
    ) -> Result<Response, StonkieError> {
        let mut path = vec!["api", "companies", ticker, "revenue", "insights"];
        path.extend(segment.path_segment());
        self.send(self.client.get(self.url(path)?).header(ACCEPT, EVENT_STREAM))
            .await
    }

    pub async fn financial_statement(
        &self,
        ticker: &str,
        report: ReportType,
    ) -> Result<FinancialData, StonkieError> {
        let ticker = ticker.to_lowercase();
        self.get_json(["api", "financial-data", ticker.as_str(), report.as_str()])
            .await
    }

    pub async fn swot(&self, ticker: &str) -> Result<SwotData, StonkieError> {
        let response: SwotResponse = self
            .get_json(["api", "companies", ticker, "swot"])
            .await?;
        debug!("[Backend] swot status: {}", response.status);
        Ok(response.data)
    }

    pub async fn most_viewed(&self) -> Result<Vec<Company>, StonkieError> {
        self.get_json(MOST_VIEWED_PATH).await
    }

    async fn get_json<T, I>(&self, segments: I) -> Result<T, StonkieError>
    where
        T: DeserializeOwned,
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let response = self.send(self.client.get(self.url(segments)?)).await?;
        read_json(response).await
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StonkieError> {
        let response = request.send().await.map_err(StonkieError::from)?;
        debug!(
            "[Backend] {} -> {}",
            response.url().path(),
            response.status()
        );
        check_status(response).await
    }
}

/// Appends `segments` to the path of `base_url`, percent-encoding each one, so
/// a ticker such as `BRK/B` stays a single segment.
pub(crate) fn endpoint_url<I>(base_url: &str, segments: I) -> Result<Url, StonkieError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut url = Url::parse(base_url)
        .map_err(|e| StonkieError::ConfigError(format!("Invalid base URL {base_url}: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| {
            StonkieError::ConfigError(format!("Base URL cannot take a path: {base_url}"))
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, StonkieError> {
    let path = response.url().path().to_string();
    let body = response
        .text()
        .await
        .map_err(|e| StonkieError::ResponseFormat(format!("Failed to get response text: {e}")))?;
    serde_json::from_str(&body)
        .map_err(|e| StonkieError::ResponseFormat(format!("Failed to parse {path}: {e}")))
}

pub(crate) async fn check_status(response: Response) -> Result<Response, StonkieError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            StonkieError::Authentication(format!("Request rejected with status {status}"))
        }
        StatusCode::NOT_FOUND => StonkieError::NotFound(body),
        StatusCode::TOO_MANY_REQUESTS => StonkieError::RateLimited(body),
        status => StonkieError::Status {
            status: status.as_u16(),
            body,
        },
    })
}
