//! HTTP transport seam and its reqwest-backed implementation.

use std::future::Future;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use tokio::sync::OnceCell;

use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one request and returns the fully buffered response.
///
/// Implementations return non-2xx responses as data; only failures to
/// complete the round-trip are errors.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

/// A [`Transport`] over one pooled [`reqwest::Client`].
///
/// The client is built on first use and shared by every call afterwards.
/// It always requests gzip/deflate, sends `Accept: application/json`, and
/// applies the configured timeout to the whole request including the body.
#[derive(Debug)]
pub struct ReqwestTransport {
    config: ClientConfig,
    client: OnceCell<reqwest::Client>,
}

impl ReqwestTransport {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    /// Wrap an already-built client. Its configuration is used as-is: the
    /// timeout and user agent set on a `ClientBuilder` do not apply to it,
    /// even when passed through `build_with_transport`.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self {
            config: ClientConfig::default(),
            client: OnceCell::new_with(Some(client)),
        }
    }

    /// The shared client, built on the first call.
    pub async fn client(&self) -> Result<&reqwest::Client, TransportError> {
        self.client
            .get_or_try_init(|| async { build_client(&self.config) })
            .await
    }
}

fn build_client(config: &ClientConfig) -> Result<reqwest::Client, TransportError> {
    tracing::debug!(timeout = ?config.timeout, "building shared HTTP client");
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    reqwest::Client::builder()
        .timeout(config.timeout)
        .gzip(true)
        .deflate(true)
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .build()
        .map_err(|e| TransportError::Build(e.to_string()))
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let client = self.client().await?;

        let mut builder = client.request(request.method.into(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = header_pairs(response.headers());
        let body = response.bytes().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Every header, in order. Values that are not visible ASCII are kept as
/// lossy UTF-8.
fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}
