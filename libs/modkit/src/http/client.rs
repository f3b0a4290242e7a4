//! Traced HTTP client used for outbound integrations.
//!
//! Wraps `reqwest::Client`, opens an `outgoing_http` span per request and
//! injects a W3C `traceparent` header.

use crate::http::simple_otel;
use tracing::{Instrument, Level};

#[derive(Clone)]
pub struct TracedClient {
    inner: reqwest::Client,
}

impl TracedClient {
    pub fn new(inner: reqwest::Client) -> Self {
        Self { inner }
    }

    /// Client with an overall request timeout.
    pub fn with_timeout(timeout: std::time::Duration) -> reqwest::Result<Self> {
        let inner = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { inner })
    }

    /// Execute a built request, injecting trace headers from the current span.
    pub async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        let span = tracing::span!(
            Level::INFO, "outgoing_http",
            http.method = %req.method(),
            http.url = %redacted(req.url()),
            http.status_code = tracing::field::Empty,
            error = tracing::field::Empty,
            trace_id = tracing::field::Empty,
            otel.kind = "client",
        );

        simple_otel::inject_trace_context(req.headers_mut(), &span);
        if let Some(trace_id) = req
            .headers()
            .get(simple_otel::TRACEPARENT)
            .and_then(|v| v.to_str().ok())
            .and_then(simple_otel::parse_trace_id)
        {
            span.record("trace_id", trace_id.as_str());
        }

        let response = self.inner.execute(req).instrument(span.clone()).await?;

        span.record("http.status_code", response.status().as_u16());
        if response.status().is_client_error() || response.status().is_server_error() {
            span.record("error", true);
        }

        Ok(response)
    }

    /// Build and execute a request prepared with [`TracedClient::request`].
    pub async fn send(&self, builder: reqwest::RequestBuilder) -> reqwest::Result<reqwest::Response> {
        let req = builder.build()?;
        self.execute(req).await
    }

    pub async fn get(&self, url: &str) -> reqwest::Result<reqwest::Response> {
        let req = self.inner.get(url).build()?;
        self.execute(req).await
    }

    pub fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.inner.request(method, url)
    }
}

/// Query strings carry credentials for some upstreams; keep them out of logs.
fn redacted(url: &reqwest::Url) -> String {
    let mut u = url.clone();
    u.set_query(None);
    u.to_string()
}

impl From<reqwest::Client> for TracedClient {
    fn from(c: reqwest::Client) -> Self {
        Self::new(c)
    }
}

impl Default for TracedClient {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}
