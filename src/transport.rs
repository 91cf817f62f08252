//! HTTP transport used by the session manager and the API client

use async_trait::async_trait;
use reqwest::{Client, Method};
use std::fmt::Debug;
use std::time::Duration;

use crate::config::SessionConfig;
use crate::error::Result;

/// A fully resolved outgoing request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Last value set for `name`, compared case-insensitively.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and raw body of a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends requests. A status of any kind is a response; only transport-level
/// failures are errors.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &SessionConfig) -> Result<Self> {
        let mut client_builder = Client::builder().timeout(Duration::from_secs(config.timeout));

        let local = config.base_url.contains("localhost") || config.base_url.contains("127.0.0.1");
        if local {
            client_builder = client_builder.no_proxy();
        }

        let client = client_builder.build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut request_builder = self.client.request(request.method, &request.url);

        for (name, value) in &request.headers {
            request_builder = request_builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            request_builder = request_builder.body(body);
        }

        let response = request_builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive_and_last_wins() {
        let request = HttpRequest::new(Method::GET, "http://x/api/me")
            .header("content-type", "text/plain")
            .header("Content-Type", "application/json");
        assert_eq!(request.header_value("CONTENT-TYPE"), Some("application/json"));
        assert_eq!(request.header_value("Authorization"), None);
    }

    #[test]
    fn test_success_range() {
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(301, "").is_success());
        assert!(!HttpResponse::new(401, "").is_success());
    }
}
