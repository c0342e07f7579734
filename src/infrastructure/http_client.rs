//! HTTP page fetcher
//!
//! Retrieves raw page content with fixed identification headers and a bounded
//! timeout. Bytes are decoded leniently: invalid UTF-8 sequences are replaced,
//! never treated as a failure. There is no retry here; callers decide what a
//! failed page means for them.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::infrastructure::config::HttpConfig;

/// Page-scoped fetch failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out: {url}")]
    Timeout { url: String },

    #[error("connection failed for {url}: {message}")]
    Connection { url: String, message: String },

    #[error("HTTP error {status}: {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("failed to read response body from {url}: {message}")]
    Body { url: String, message: String },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            Self::Timeout { url }
            | Self::Connection { url, .. }
            | Self::HttpStatus { url, .. }
            | Self::Body { url, .. } => url,
        }
    }

    fn from_reqwest(url: &str, error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Connection {
                url: url.to_string(),
                message: error.to_string(),
            }
        }
    }
}

/// Anything that can turn a URL into page text
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// reqwest-backed fetcher
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&config.accept_language)
                .map_err(|e| anyhow!("Invalid Accept-Language header: {}", e))?,
        );

        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .gzip(true)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(10)
            } else {
                reqwest::redirect::Policy::none()
            })
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        debug!("🌐 HTTP GET: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("❌ HTTP error {}: {}", status, url);
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Body {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        debug!("Fetched {} bytes from {}", bytes.len(), url);
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation_with_defaults() {
        let client = HttpClient::with_config(HttpConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_invalid_language_header_is_rejected() {
        let config = HttpConfig {
            accept_language: "uk\nUA".to_string(),
            ..HttpConfig::default()
        };
        assert!(HttpClient::with_config(config).is_err());
    }

    #[test]
    fn test_fetch_error_exposes_url() {
        let err = FetchError::HttpStatus {
            url: "https://example.com/a".into(),
            status: 404,
        };
        assert_eq!(err.url(), "https://example.com/a");
        assert_eq!(err.to_string(), "HTTP error 404: https://example.com/a");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_a_connection_error() {
        let config = HttpConfig {
            timeout_seconds: 2,
            ..HttpConfig::default()
        };
        let client = HttpClient::with_config(config).unwrap();
        // Port 9 on loopback is reserved (discard) and normally closed
        let err = client.fetch("http://127.0.0.1:9/").await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::Connection { .. } | FetchError::Timeout { .. }
        ));
    }
}
