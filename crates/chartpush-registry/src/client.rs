//! ChartMuseum API client
//!
//! A thin uploader: archives are streamed from disk as the body of
//! `POST {base}/api/charts`. Redirects are never followed so credentials
//! stay on the configured origin.

use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::credentials::BasicAuth;
use crate::error::{RegistryError, Result};

/// Per-request timeout used when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("chartpush/", env!("CARGO_PKG_VERSION"));

const UPLOAD_PATH: &str = "api/charts";

/// Transport options for [`RegistryClient::new`]
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Skip TLS certificate verification (self-signed registries)
    pub insecure_skip_tls_verify: bool,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            insecure_skip_tls_verify: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Decoded ChartMuseum response body
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApiResponse {
    /// HTTP status code
    #[serde(skip)]
    pub status: u16,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub saved: Option<bool>,
    #[serde(default)]
    pub deleted: Option<i64>,
}

/// ChartMuseum registry client
#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: reqwest::Client,
    base_url: Url,
    credentials: Option<BasicAuth>,
    timeout: Duration,
}

impl RegistryClient {
    /// Create a client with its own HTTP transport
    pub fn new(
        base_url: &str,
        credentials: Option<BasicAuth>,
        options: &ClientOptions,
    ) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(options.timeout)
            .danger_accept_invalid_certs(options.insecure_skip_tls_verify)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| RegistryError::ClientBuild {
                message: e.to_string(),
            })?;

        if options.insecure_skip_tls_verify {
            tracing::warn!("TLS certificate verification disabled for {}", base_url);
        }

        Ok(Self {
            client,
            base_url,
            credentials,
            timeout: options.timeout,
        })
    }

    /// Base URL, always ending with `/`
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Endpoint charts are posted to
    pub fn upload_url(&self) -> Result<Url> {
        Ok(self.base_url.join(UPLOAD_PATH)?)
    }

    /// Stream an archive to the registry
    ///
    /// Non-2xx responses become [`RegistryError::Rejected`] carrying the
    /// server's `error` (or `message`) field when present.
    pub async fn upload_chart(&self, archive: &Path) -> Result<ApiResponse> {
        let file = tokio::fs::File::open(archive).await?;
        let size = file.metadata().await?.len();
        let url = self.upload_url()?;

        let mut request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, size)
            .body(reqwest::Body::from(file));

        if let Some(credentials) = &self.credentials {
            request = request.header(AUTHORIZATION, credentials.auth_header());
        }

        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        self.parse_response(response).await
    }

    async fn parse_response(&self, response: reqwest::Response) -> Result<ApiResponse> {
        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;

        let mut decoded: ApiResponse = serde_json::from_slice(&body).unwrap_or_default();
        decoded.status = status.as_u16();

        if status.is_success() {
            return Ok(decoded);
        }

        let message = decoded
            .error
            .filter(|e| !e.is_empty())
            .or(decoded.message.filter(|m| !m.is_empty()))
            .unwrap_or_else(|| {
                let text = String::from_utf8_lossy(&body).trim().to_string();
                if text.is_empty() {
                    status.canonical_reason().unwrap_or("unknown error").to_string()
                } else {
                    text
                }
            });

        Err(RegistryError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> RegistryError {
        if e.is_timeout() {
            RegistryError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else if e.is_connect() {
            RegistryError::Network {
                message: format!("Connection failed: {}", e),
            }
        } else {
            RegistryError::Network {
                message: e.to_string(),
            }
        }
    }
}

/// Validate the registry URL and make sure its path ends with `/`
fn parse_base_url(base_url: &str) -> Result<Url> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Err(RegistryError::InvalidRegistryUrl {
            url: String::new(),
            reason: "base URL can not be blank".to_string(),
        });
    }

    let mut url = Url::parse(trimmed).map_err(|e| RegistryError::InvalidRegistryUrl {
        url: trimmed.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(RegistryError::InvalidRegistryUrl {
            url: trimmed.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}
