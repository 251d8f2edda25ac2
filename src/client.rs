use crate::lookup::LookupResponse;
use crate::route::normalize_input;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Enter a character to look up")]
    EmptyQuery,
    #[error("API error: {}", .status.as_u16())]
    Status { status: StatusCode },
    #[error("request to lookup API failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("lookup API returned malformed JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

impl LookupError {
    /// HTTP status to report downstream when a lookup fails.
    pub fn upstream_status(&self) -> Option<StatusCode> {
        match self {
            LookupError::Status { status } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub timeout: Duration,
    /// Ask the API for its markdown summary (`output_format=md`).
    pub markdown: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000".to_string(),
            timeout: DEFAULT_TIMEOUT,
            markdown: false,
        }
    }
}

/// Thin client for the remote lookup API.
#[derive(Debug, Clone)]
pub struct LookupClient {
    base_url: String,
    markdown: bool,
    http: reqwest::Client,
}

impl LookupClient {
    pub fn new(config: ClientConfig) -> Result<Self, LookupError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("learncjk-web/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            markdown: config.markdown,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn lookup(&self, raw: &str) -> Result<LookupResponse, LookupError> {
        let ch = normalize_input(raw).ok_or(LookupError::EmptyQuery)?;
        let url = format!("{}/api/lookup", self.base_url);
        let mut query = vec![("char", ch)];
        if self.markdown {
            query.push(("output_format", "md"));
        }
        debug!(%url, char = ch, markdown = self.markdown, "Requesting lookup");
        let response = self.http.get(&url).query(&query).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(%status, char = ch, "Lookup API returned an error status");
            return Err(LookupError::Status { status });
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    pub async fn health(&self) -> Result<(), LookupError> {
        let url = format!("{}/healthz", self.base_url);
        let status = self.http.get(&url).send().await?.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(LookupError::Status { status })
        }
    }
}
