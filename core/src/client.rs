//! Verb-level facade over the request/transport/decode pipeline.
//!
//! # Design
//! Every operation has the same shape: count the call in flight, build the
//! request, send it, optionally decode, and on any failure report the error
//! under the operation's name before returning it. The busy guard lives for
//! the whole call, so the count is released on success, on error, and when
//! the caller drops the future mid-flight.
//!
//! Each verb has two forms. `*_raw` returns the [`HttpResponse`] envelope
//! whatever its status. `*_json` additionally requires a 2xx status and
//! decodes the body into the caller's type.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::busy::{ActivityTracker, BusySurface, NoopSurface};
use crate::config::ClientConfig;
use crate::decode::decode;
use crate::error::ClientError;
use crate::http::{HttpMethod, HttpResponse};
use crate::request::{build_request, resolve_url, Payload};
use crate::telemetry::{ErrorReporter, TelemetrySink, TracingSink};
use crate::transport::{ReqwestTransport, Transport};

/// Asynchronous JSON API client.
///
/// Cheap to clone; clones share the transport, the busy counter and the
/// telemetry sink.
pub struct ApiClient<T = ReqwestTransport> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    transport: T,
    base_url: Option<String>,
    activity: ActivityTracker,
    reporter: ErrorReporter,
}

impl<T> Clone for ApiClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for ApiClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .field("activity", &self.inner.activity)
            .finish_non_exhaustive()
    }
}

impl ApiClient<ReqwestTransport> {
    pub fn new(config: ClientConfig) -> Self {
        Self::builder().config(config).build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn base_url(&self) -> Option<&str> {
        self.inner.base_url.as_deref()
    }

    pub async fn get_raw(&self, url: &str) -> Result<HttpResponse, ClientError> {
        self.execute(HttpMethod::Get, url, Payload::empty(), "get_raw")
            .await
    }

    pub async fn get_json<R>(&self, url: &str) -> Result<R, ClientError>
    where
        R: DeserializeOwned,
    {
        self.execute_json(HttpMethod::Get, url, Payload::empty(), "get_json")
            .await
    }

    pub async fn post_raw<B>(
        &self,
        url: &str,
        payload: Payload<'_, B>,
    ) -> Result<HttpResponse, ClientError>
    where
        B: Serialize + ?Sized + Sync,
    {
        self.execute(HttpMethod::Post, url, payload, "post_raw").await
    }

    pub async fn post_json<R, B>(&self, url: &str, body: &B) -> Result<R, ClientError>
    where
        R: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        self.execute_json(HttpMethod::Post, url, Payload::json(body), "post_json")
            .await
    }

    pub async fn put_raw<B>(
        &self,
        url: &str,
        payload: Payload<'_, B>,
    ) -> Result<HttpResponse, ClientError>
    where
        B: Serialize + ?Sized + Sync,
    {
        self.execute(HttpMethod::Put, url, payload, "put_raw").await
    }

    pub async fn put_json<R, B>(&self, url: &str, body: &B) -> Result<R, ClientError>
    where
        R: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        self.execute_json(HttpMethod::Put, url, Payload::json(body), "put_json")
            .await
    }

    pub async fn patch_raw<B>(
        &self,
        url: &str,
        payload: Payload<'_, B>,
    ) -> Result<HttpResponse, ClientError>
    where
        B: Serialize + ?Sized + Sync,
    {
        self.execute(HttpMethod::Patch, url, payload, "patch_raw")
            .await
    }

    pub async fn patch_json<R, B>(&self, url: &str, body: &B) -> Result<R, ClientError>
    where
        R: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        self.execute_json(HttpMethod::Patch, url, Payload::json(body), "patch_json")
            .await
    }

    pub async fn delete_raw(&self, url: &str) -> Result<HttpResponse, ClientError> {
        self.execute(HttpMethod::Delete, url, Payload::empty(), "delete_raw")
            .await
    }

    pub async fn delete_json<R>(&self, url: &str) -> Result<R, ClientError>
    where
        R: DeserializeOwned,
    {
        self.execute_json(HttpMethod::Delete, url, Payload::empty(), "delete_json")
            .await
    }

    /// Any method with any payload shape, returning the envelope.
    pub async fn request_raw<B>(
        &self,
        method: HttpMethod,
        url: &str,
        payload: Payload<'_, B>,
    ) -> Result<HttpResponse, ClientError>
    where
        B: Serialize + ?Sized + Sync,
    {
        self.execute(method, url, payload, "request_raw").await
    }

    /// Any method with any payload shape, decoding a 2xx body into `R`.
    pub async fn request_json<R, B>(
        &self,
        method: HttpMethod,
        url: &str,
        payload: Payload<'_, B>,
    ) -> Result<R, ClientError>
    where
        R: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        self.execute_json(method, url, payload, "request_json")
            .await
    }

    async fn execute<B>(
        &self,
        method: HttpMethod,
        url: &str,
        payload: Payload<'_, B>,
        op: &'static str,
    ) -> Result<HttpResponse, ClientError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let url = resolve_url(self.base_url(), url);
        let span = call_span(op, method, &url);
        async {
            let _busy = self.inner.activity.enter();
            self.round_trip(method, &url, payload)
                .await
                .map_err(|e| self.inner.reporter.report(e, op))
        }
        .instrument(span)
        .await
    }

    async fn execute_json<R, B>(
        &self,
        method: HttpMethod,
        url: &str,
        payload: Payload<'_, B>,
        op: &'static str,
    ) -> Result<R, ClientError>
    where
        R: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        let url = resolve_url(self.base_url(), url);
        let span = call_span(op, method, &url);
        async {
            let _busy = self.inner.activity.enter();
            let result: Result<R, ClientError> = async {
                let response = self.round_trip(method, &url, payload).await?;
                check_status(&response)?;
                Ok(decode(response)?)
            }
            .await;
            result.map_err(|e| self.inner.reporter.report(e, op))
        }
        .instrument(span)
        .await
    }

    async fn round_trip<B>(
        &self,
        method: HttpMethod,
        url: &str,
        payload: Payload<'_, B>,
    ) -> Result<HttpResponse, ClientError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let request = build_request(method, url, payload)?;
        let response = self.inner.transport.send(request).await?;
        tracing::debug!(
            status = response.status,
            bytes = response.body.len(),
            "response received"
        );
        Ok(response)
    }
}

fn call_span(op: &'static str, method: HttpMethod, url: &str) -> tracing::Span {
    tracing::debug_span!(
        "api_call",
        op,
        method = method.as_str(),
        url,
        request_id = %Uuid::new_v4()
    )
}

/// Reject non-2xx responses before a typed decode.
fn check_status(response: &HttpResponse) -> Result<(), ClientError> {
    if response.is_success() {
        return Ok(());
    }
    Err(ClientError::Status {
        status: response.status,
        body: response.text(),
    })
}

/// Builder for [`ApiClient`].
pub struct ClientBuilder {
    config: ClientConfig,
    busy_surface: Arc<dyn BusySurface>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            config: ClientConfig::default(),
            busy_surface: Arc::new(NoopSurface),
            telemetry: Arc::new(TracingSink),
        }
    }
}

impl ClientBuilder {
    /// Replace the whole configuration, e.g. with [`ClientConfig::from_env`].
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = Some(base_url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn busy_surface(mut self, surface: Arc<dyn BusySurface>) -> Self {
        self.busy_surface = surface;
        self
    }

    pub fn telemetry(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = sink;
        self
    }

    /// Build a client on the shared reqwest transport. The underlying HTTP
    /// client is constructed lazily on the first request.
    pub fn build(self) -> ApiClient<ReqwestTransport> {
        let transport = ReqwestTransport::new(self.config.clone());
        self.build_with_transport(transport)
    }

    pub fn build_with_transport<T: Transport>(self, transport: T) -> ApiClient<T> {
        let base_url = self
            .config
            .base_url
            .map(|url| url.trim_end_matches('/').to_string());
        ApiClient {
            inner: Arc::new(Inner {
                transport,
                base_url,
                activity: ActivityTracker::new(self.busy_surface),
                reporter: ErrorReporter::new(self.telemetry),
            }),
        }
    }
}
