// HTTP client for the airline's public timetable API

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, ORIGIN, REFERER, USER_AGENT};
use reqwest::{Response, Url};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::fetcher::{AirportDirectory, AirportMap, FetchError, Timetable, TimetableFetcher};
use crate::supplier::{SupplierAirportMap, SupplierTimetable, TimetableRequest};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Initialization error: {0}")]
    InitError(String),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    // Versioned API root; the version segment changes with each site release
    pub base_url: String,
    pub site_origin: String,
    pub language_code: String,
    pub user_agent: String,
    pub timeout_ms: u64,
    // Pause after every upstream timetable call to stay under the unpublished rate limit
    pub pacing_delay_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://be.wizzair.com/26.4.0/Api/".to_string(),
            site_origin: "https://wizzair.com".to_string(),
            language_code: "en-gb".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".to_string(),
            timeout_ms: 10_000,
            pacing_delay_ms: 250,
        }
    }
}

impl ClientConfig {
    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Url::parse(&self.base_url)
            .and_then(|base| base.join(path))
            .map_err(|e| ClientError::ConfigError(format!("invalid base url {}: {}", self.base_url, e)))
    }

    fn default_headers(&self) -> Result<HeaderMap, ClientError> {
        let header = |value: &str| {
            HeaderValue::from_str(value)
                .map_err(|e| ClientError::ConfigError(format!("invalid header value {:?}: {}", value, e)))
        };

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, header("application/json, text/plain, */*")?);
        headers.insert(CONTENT_TYPE, header("application/json;charset=UTF-8")?);
        headers.insert(ORIGIN, header(&self.site_origin)?);
        headers.insert(
            REFERER,
            header(&format!("{}/{}/flights/timetable", self.site_origin, self.language_code))?,
        );
        headers.insert(USER_AGENT, header(&self.user_agent)?);
        Ok(headers)
    }
}

// Talks to the airline API directly. Wrap it in the cached fetchers before
// handing it to a search.
pub struct AirlineApiClient {
    http: reqwest::Client,
    config: ClientConfig,
    airports_url: Url,
    timetable_url: Url,
}

impl AirlineApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .default_headers(config.default_headers()?)
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ClientError::InitError(e.to_string()))?;

        let mut airports_url = config.endpoint("asset/map")?;
        airports_url
            .query_pairs_mut()
            .append_pair("languageCode", &config.language_code);
        let timetable_url = config.endpoint("search/timetable")?;

        Ok(Self {
            http,
            config,
            airports_url,
            timetable_url,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

fn network_error(e: reqwest::Error) -> FetchError {
    FetchError::Network(e.to_string())
}

async fn ensure_success(response: Response) -> Result<Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| status.canonical_reason().unwrap_or_default().to_string());
    Err(FetchError::Status {
        status_code: status.as_u16(),
        message,
    })
}

#[async_trait]
impl TimetableFetcher for AirlineApiClient {
    async fn fetch_timetable(
        &self,
        origin: &str,
        destination: &str,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Arc<Timetable>, FetchError> {
        let payload = TimetableRequest::round_trip(origin, destination, date_from, date_to);
        debug!("Fetching timetable {}-{} {}..{}", origin, destination, date_from, date_to);

        let result = async {
            let response = self
                .http
                .post(self.timetable_url.clone())
                .json(&payload)
                .send()
                .await
                .map_err(network_error)?;
            let raw: SupplierTimetable = ensure_success(response)
                .await?
                .json()
                .await
                .map_err(|e| FetchError::Decode(e.to_string()))?;
            Timetable::try_from(raw)
        }
        .await;

        // Paced whether or not the call succeeded; upstream saw the request either way
        tokio::time::sleep(self.config.pacing_delay()).await;

        match &result {
            Ok(timetable) => info!(
                "Timetable {}-{}: {} outbound, {} return",
                origin,
                destination,
                timetable.outbound.len(),
                timetable.returns.len()
            ),
            Err(e) => warn!("Timetable {}-{} failed: {}", origin, destination, e),
        }
        result.map(Arc::new)
    }
}

#[async_trait]
impl AirportDirectory for AirlineApiClient {
    async fn fetch_airports(&self) -> Result<Arc<AirportMap>, FetchError> {
        debug!("Fetching airport map from {}", self.airports_url);

        let response = self
            .http
            .get(self.airports_url.clone())
            .send()
            .await
            .map_err(network_error)?;
        let raw: SupplierAirportMap = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        Ok(Arc::new(AirportMap::from(raw)))
    }
}
