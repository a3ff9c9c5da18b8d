//! Remote fetchers
//!
//! A [`Fetcher`] turns a remote address into raw bytes. The caller supplies the
//! `reqwest::Client` so one connection pool serves a whole batch of
//! sequential fetches. Fetchers never write to storage; persisting the
//! payload is the orchestrator's job.

use async_trait::async_trait;
use tracing::debug;

use crate::error::FetchError;

/// Retrieves raw bytes from a remote source
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, client: &reqwest::Client) -> Result<Vec<u8>, FetchError>;

    /// Address for logging
    fn url(&self) -> &str;
}

/// HTTP(S) fetcher: method, URL, query parameters, and headers
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    method: reqwest::Method,
    url: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
}

impl HttpFetcher {
    pub fn new(method: reqwest::Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(reqwest::Method::GET, url)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, client: &reqwest::Client) -> Result<Vec<u8>, FetchError> {
        debug!(method = %self.method, url = %self.url, "Fetching");

        let mut request = client.request(self.method.clone(), &self.url);
        if !self.query.is_empty() {
            request = request.query(&self.query);
        }
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                url: self.url.clone(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    fn url(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_returns_body_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mmz4281/9900/E0.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"col1,col2\n1,2".to_vec()))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::get(format!("{}/mmz4281/9900/E0.csv", server.uri()));
        let client = reqwest::Client::new();
        let bytes = fetcher.fetch(&client).await.unwrap();
        assert_eq!(bytes, b"col1,col2\n1,2");
    }

    #[tokio::test]
    async fn test_fetch_forwards_query_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fixtures"))
            .and(query_param("date", "2026-08-28"))
            .and(header("X-Api-Key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::get(format!("{}/fixtures", server.uri()))
            .with_query("date", "2026-08-28")
            .with_header("X-Api-Key", "secret");
        let client = reqwest::Client::new();
        fetcher.fetch(&client).await.unwrap();
    }

    #[tokio::test]
    async fn test_not_found_status_is_recoverable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::get(format!("{}/missing.csv", server.uri()));
        let client = reqwest::Client::new();
        let err = fetcher.fetch(&client).await.unwrap_err();
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_server_error_status_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::get(format!("{}/E0.csv", server.uri()));
        let client = reqwest::Client::new();
        let err = fetcher.fetch(&client).await.unwrap_err();
        assert!(!err.is_recoverable());
        assert!(matches!(err, FetchError::Status { status, .. }
            if status == reqwest::StatusCode::SERVICE_UNAVAILABLE));
    }
}
