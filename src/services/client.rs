// Analysis Service Client
// Calls the remote /analyze and /train endpoints and normalizes their failures

use crate::models::{AnalysisRequest, AnalyzeResponse, ServiceErrorBody, TrainResponse};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::env;
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::config_store::ConfigStore;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:5000";
pub const API_URL_ENV: &str = "NEWSCHECK_API_URL";
pub const ANALYZE_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    Timeout,
    Transport,
    /// The server answered but nothing usable could be read from the body.
    Unknown,
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Timeout => "timeout",
            Self::Transport => "transport",
            Self::Unknown => "unknown",
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("network error ({kind}): {detail}")]
    Network { kind: NetworkErrorKind, detail: String },
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },
}

impl ClientError {
    fn network(kind: NetworkErrorKind, detail: impl Into<String>) -> Self {
        Self::Network {
            kind,
            detail: detail.into(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            NetworkErrorKind::Timeout
        } else {
            NetworkErrorKind::Transport
        };
        Self::network(kind, err.to_string())
    }
}

/// Seam between the request lifecycle and the transport.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalyzeResponse, ClientError>;
}

pub struct AnalysisClient {
    client: Client,
    base_url: String,
}

impl AnalysisClient {
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        Self::with_timeout(base_url, Duration::from_secs(ANALYZE_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: normalize_base_url(base_url),
        })
    }

    pub fn with_proxy(base_url: &str, proxy_url: &str) -> Result<Self, reqwest::Error> {
        let proxy = reqwest::Proxy::all(proxy_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(ANALYZE_TIMEOUT_SECS))
            .proxy(proxy)
            .build()?;

        Ok(Self {
            client,
            base_url: normalize_base_url(base_url),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Submit one analysis request. Exactly one HTTP attempt is made.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalyzeResponse, ClientError> {
        let url = self.endpoint("analyze");
        info!(
            mode = %request.mode(),
            chars = request.content().chars().count(),
            url = %url,
            "analysis.request"
        );

        let start = Instant::now();
        let (status, body) = self.post_json(&url, request).await?;
        let latency_ms = start.elapsed().as_millis() as i64;

        if !status.is_success() {
            let err = error_from_body(status, &body);
            warn!(status = status.as_u16(), latency_ms, error = %err, "analysis.response");
            return Err(err);
        }

        let data: AnalyzeResponse = serde_json::from_slice(&body).map_err(|e| {
            ClientError::network(NetworkErrorKind::Unknown, format!("invalid response body: {}", e))
        })?;

        info!(
            status = status.as_u16(),
            latency_ms,
            label = data.result.label,
            corroboration = data.corroboration.len(),
            "analysis.response"
        );
        Ok(data)
    }

    /// Ask the service to retrain its model. Returns the reported status string.
    pub async fn train(&self) -> Result<String, ClientError> {
        let url = self.endpoint("train");
        info!(url = %url, "train.request");

        let (status, body) = self.post_json(&url, &serde_json::json!({})).await?;
        if !status.is_success() {
            return Err(error_from_body(status, &body));
        }

        let data: TrainResponse = serde_json::from_slice(&body).map_err(|e| {
            ClientError::network(NetworkErrorKind::Unknown, format!("invalid response body: {}", e))
        })?;
        info!(status = %data.status, "train.response");
        Ok(data.status)
    }

    async fn post_json<T: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        payload: &T,
    ) -> Result<(StatusCode, Vec<u8>), ClientError> {
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        debug!(status = status.as_u16(), bytes = body.len(), "http.response_body");
        Ok((status, body.to_vec()))
    }
}

#[async_trait]
impl AnalysisBackend for AnalysisClient {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalyzeResponse, ClientError> {
        AnalysisClient::analyze(self, request).await
    }
}

fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Non-2xx: a JSON `error` string becomes a server error, anything else is unknown.
fn error_from_body(status: StatusCode, body: &[u8]) -> ClientError {
    match serde_json::from_slice::<ServiceErrorBody>(body) {
        Ok(ServiceErrorBody { error: Some(message) }) => ClientError::Server {
            status: status.as_u16(),
            message,
        },
        _ => ClientError::network(
            NetworkErrorKind::Unknown,
            format!("HTTP {} without error message", status.as_u16()),
        ),
    }
}

/// Resolve the service base URL: explicit value, then environment, then config file, then default.
pub fn resolve_api_base_url(explicit: Option<&str>, store: Option<&ConfigStore>) -> String {
    if let Some(url) = explicit.map(str::trim).filter(|u| !u.is_empty()) {
        return url.to_string();
    }

    if let Ok(val) = env::var(API_URL_ENV) {
        let v = val.trim();
        if !v.is_empty() {
            return v.to_string();
        }
    }

    if let Some(store) = store {
        match store.get_api_base_url() {
            Ok(Some(url)) if !url.trim().is_empty() => return url,
            Ok(_) => {}
            Err(e) => warn!(error = %e, "config.read_failed"),
        }
    }

    DEFAULT_API_BASE_URL.to_string()
}
