//! The HTTP transport seam and its `reqwest` implementation.

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::{Result, TransportError};
use crate::request::HttpRequest;
use crate::response::HttpResponse;

/// Executes fully resolved requests.
///
/// [`ReqwestTransport`] is the default; tests substitute an in-memory
/// implementation.
#[async_trait]
pub trait HttpTransport: Send + Sync + 'static {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// [`HttpTransport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a preconfigured client (timeouts, proxies, default headers).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = reqwest::Method::from_bytes(request.method().as_str().as_bytes()).map_err(|_| {
            TransportError::InvalidMethod {
                method: request.method().to_string(),
            }
        })?;

        let mut builder = self.client.request(method, request.url().clone());
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.into_body() {
            builder = builder.body(body.into_bytes());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await?;

        Ok(HttpResponse::new(status, headers, body))
    }
}

// ---------------------------------------------------------------------------
// PreparedRequest
// ---------------------------------------------------------------------------

/// A resolved request that has not been sent yet.
///
/// Returned by async functions whose declared type is `PreparedRequest`; the
/// caller decides when to execute it.
#[derive(Clone)]
pub struct PreparedRequest {
    request: HttpRequest,
    transport: Arc<dyn HttpTransport>,
}

impl PreparedRequest {
    pub(crate) fn new(request: HttpRequest, transport: Arc<dyn HttpTransport>) -> Self {
        Self { request, transport }
    }

    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    /// Sends the request. The response status is not checked.
    pub async fn execute(self) -> crate::Result<HttpResponse> {
        Ok(self.transport.execute(self.request).await?)
    }
}

impl std::fmt::Debug for PreparedRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedRequest")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}
