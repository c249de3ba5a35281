//! Page sources
//!
//! [`PageSource`] is the seam between the fetch loop and the network.
//! [`HttpPageSource`] is the real implementation; tests script their own.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::debug;

use super::types::{FetchError, PageBody, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::target::NovelTarget;

/// Something that can retrieve numbered reading pages
pub trait PageSource {
    /// Fetch web page `page` (1-based)
    fn fetch_page(&self, page: u32) -> impl Future<Output = Result<PageBody, FetchError>> + Send;
}

/// HTTP client settings
#[derive(Debug, Clone)]
pub struct HttpSourceOptions {
    /// Site origin, e.g. `https://thisaccessories.com`
    pub base_url: String,
    /// User-Agent header
    pub user_agent: String,
    /// Whole-request timeout
    pub timeout: Duration,
}

impl Default for HttpSourceOptions {
    fn default() -> Self {
        Self {
            base_url: crate::target::DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

/// Reading pages fetched over HTTP
pub struct HttpPageSource {
    client: Client,
    target: NovelTarget,
    base_url: String,
}

impl HttpPageSource {
    /// Build a source for `target`
    pub fn new(target: NovelTarget, options: &HttpSourceOptions) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(options.user_agent.clone())
            .timeout(options.timeout)
            .build()
            .map_err(|e| FetchError::Request {
                url: options.base_url.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            target,
            base_url: options.base_url.clone(),
        })
    }

    /// URL requested for `page`
    pub fn page_url(&self, page: u32) -> String {
        self.target.page_url(&self.base_url, page)
    }
}

impl PageSource for HttpPageSource {
    async fn fetch_page(&self, page: u32) -> Result<PageBody, FetchError> {
        let url = self.page_url(page);
        debug!(%url, page, "fetching page");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Request {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(PageBody::NotFound);
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| FetchError::Body {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        Ok(PageBody::Html(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source_for(server: &MockServer) -> HttpPageSource {
        let options = HttpSourceOptions {
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
            ..Default::default()
        };
        HttpPageSource::new(NovelTarget::parse("201").unwrap(), &options).unwrap()
    }

    #[tokio::test]
    async fn test_first_page_has_no_paged_param() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reading-base/"))
            .and(query_param("cat", "201"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>one</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let body = source_for(&server).fetch_page(1).await.unwrap();
        assert_eq!(body, PageBody::Html("<html>one</html>".to_string()));
    }

    #[tokio::test]
    async fn test_later_page_sends_paged_param() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reading-base/"))
            .and(query_param("cat", "201"))
            .and(query_param("paged", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_string("three"))
            .mount(&server)
            .await;

        let body = source_for(&server).fetch_page(3).await.unwrap();
        assert_eq!(body, PageBody::Html("three".to_string()));
    }

    #[tokio::test]
    async fn test_404_is_not_found_signal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let body = source_for(&server).fetch_page(9).await.unwrap();
        assert_eq!(body, PageBody::NotFound);
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = source_for(&server).fetch_page(2).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_connection_failure_is_transient() {
        let options = HttpSourceOptions {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout: Duration::from_secs(2),
            ..Default::default()
        };
        let source = HttpPageSource::new(NovelTarget::parse("5").unwrap(), &options).unwrap();

        let err = source.fetch_page(1).await.unwrap_err();
        assert!(matches!(err, FetchError::Request { .. }));
    }
}
