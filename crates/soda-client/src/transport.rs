//! HTTP transport seam.
//!
//! The client builds a [`DatasetRequest`] and hands it to a [`Transport`].
//! [`HttpTransport`] is the production implementation on top of `reqwest`;
//! tests substitute their own.

use crate::config::ClientConfig;
use crate::error::{Result, SodaError};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, USER_AGENT};
use url::Url;

/// Header carrying the application token.
pub const APP_TOKEN_HEADER: &str = "x-app-token";

/// A fully assembled GET request.
#[derive(Debug, Clone)]
pub struct DatasetRequest {
    pub url: Url,
    pub headers: HeaderMap,
}

/// Raw response: status plus the complete body.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Bytes,
}

/// Executes a single GET round trip.
///
/// Implementations report failures to obtain a response as
/// [`SodaError::Network`]. Any response, whatever its status, is returned as
/// `Ok` so classification can inspect the body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, request: DatasetRequest) -> Result<TransportResponse>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("soda-client")),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self { http })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, request: DatasetRequest) -> Result<TransportResponse> {
        let response = self
            .http
            .get(request.url)
            .headers(request.headers)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(TransportResponse { status, body })
    }
}

/// Standard SODA request headers.
pub(crate) fn request_headers(app_token: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(
        HeaderName::from_static(APP_TOKEN_HEADER),
        HeaderValue::from_str(app_token)
            .map_err(|_| SodaError::Config("Invalid app token format".to_string()))?,
    );
    Ok(headers)
}
