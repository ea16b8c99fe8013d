//! The configured top-level object and its builder.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::client::Client;
use crate::converter::{
    ConverterFactory, ConverterRegistry, RequestParameterConverter, ResponseConverter,
    SuspendResponseConverter,
};
use crate::errors::{
    RestfitError, Result, BASE_URL_NEEDS_TRAILING_SLASH, BASE_URL_REQUIRED, BASE_URL_SCHEME_NOT_FOUND,
};
use crate::service::RestfitService;
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::type_data::TypeData;

/// Base URL, transport and converter factories shared by every service
/// created from it.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct Restfit {
    inner: Arc<Inner>,
}

struct Inner {
    base_url: String,
    transport: Arc<dyn HttpTransport>,
    converters: ConverterRegistry,
    expect_success: bool,
}

impl Restfit {
    pub fn builder() -> RestfitBuilder {
        RestfitBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn transport(&self) -> Arc<dyn HttpTransport> {
        Arc::clone(&self.inner.transport)
    }

    pub fn converters(&self) -> &ConverterRegistry {
        &self.inner.converters
    }

    /// Whether non-2xx responses are turned into failures.
    pub fn expect_success(&self) -> bool {
        self.inner.expect_success
    }

    /// Returns a dispatcher bound to this configuration.
    pub fn client(&self) -> Client {
        Client::new(self.clone())
    }

    /// Assigns the dispatcher to a generated implementation and returns it.
    pub fn create<S: RestfitService>(&self, mut service: S) -> S {
        service.set_client(self.client());
        service
    }

    pub fn next_response_converter(
        &self,
        skip_past: Option<&dyn ConverterFactory>,
        type_data: &TypeData,
    ) -> Option<Box<dyn ResponseConverter>> {
        self.inner
            .converters
            .next_response_converter(skip_past, type_data, self)
    }

    pub fn next_suspend_response_converter(
        &self,
        skip_past: Option<&dyn ConverterFactory>,
        type_data: &TypeData,
    ) -> Option<Box<dyn SuspendResponseConverter>> {
        self.inner
            .converters
            .next_suspend_response_converter(skip_past, type_data, self)
    }

    pub fn next_request_parameter_converter(
        &self,
        skip_past: Option<&dyn ConverterFactory>,
        parameter_type: &TypeData,
        request_type: &TypeData,
    ) -> Option<Box<dyn RequestParameterConverter>> {
        self.inner
            .converters
            .next_request_parameter_converter(skip_past, parameter_type, request_type)
    }
}

impl fmt::Debug for Restfit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Restfit")
            .field("base_url", &self.inner.base_url)
            .field("converters", &self.inner.converters)
            .field("expect_success", &self.inner.expect_success)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for [`Restfit`].
pub struct RestfitBuilder {
    base_url: String,
    check_url: bool,
    transport: Option<Arc<dyn HttpTransport>>,
    converters: ConverterRegistry,
    expect_success: bool,
}

impl Default for RestfitBuilder {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            check_url: true,
            transport: None,
            converters: ConverterRegistry::default(),
            expect_success: true,
        }
    }
}

impl RestfitBuilder {
    /// Base URL that relative request URLs are joined onto. Must end with `/`.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Disables base URL validation.
    pub fn check_url(mut self, check_url: bool) -> Self {
        self.check_url = check_url;
        self
    }

    pub fn transport<T: HttpTransport>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn shared_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Appends a factory; factories are consulted in the order they were added.
    pub fn converter_factory<F: ConverterFactory + 'static>(mut self, factory: F) -> Self {
        self.converters.push(Arc::new(factory));
        self
    }

    /// When enabled (the default), non-2xx responses become failures.
    pub fn expect_success(mut self, expect_success: bool) -> Self {
        self.expect_success = expect_success;
        self
    }

    pub fn build(self) -> Result<Restfit> {
        if self.check_url {
            validate_base_url(&self.base_url)?;
        }
        debug!(
            base_url = %self.base_url,
            converter_factories = self.converters.len(),
            expect_success = self.expect_success,
            "restfit configured"
        );
        Ok(Restfit {
            inner: Arc::new(Inner {
                base_url: self.base_url,
                transport: self
                    .transport
                    .unwrap_or_else(|| Arc::new(ReqwestTransport::new())),
                converters: self.converters,
                expect_success: self.expect_success,
            }),
        })
    }
}

fn validate_base_url(base_url: &str) -> Result<()> {
    let reason = if base_url.is_empty() {
        Some(BASE_URL_REQUIRED)
    } else if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        Some(BASE_URL_SCHEME_NOT_FOUND)
    } else if !base_url.ends_with('/') {
        Some(BASE_URL_NEEDS_TRAILING_SLASH)
    } else {
        None
    };
    match reason {
        Some(reason) => Err(RestfitError::InvalidBaseUrl {
            base_url: base_url.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason_for(base_url: &str) -> &'static str {
        match Restfit::builder().base_url(base_url).build() {
            Err(RestfitError::InvalidBaseUrl { reason, .. }) => reason,
            other => panic!("expected InvalidBaseUrl, got {other:?}"),
        }
    }

    #[test]
    fn base_url_must_end_with_slash() {
        assert_eq!(reason_for("https://api.example.com/v1"), BASE_URL_NEEDS_TRAILING_SLASH);
    }

    #[test]
    fn base_url_is_required() {
        assert_eq!(reason_for(""), BASE_URL_REQUIRED);
    }

    #[test]
    fn base_url_needs_http_scheme() {
        assert_eq!(reason_for("ftp://files.example.com/"), BASE_URL_SCHEME_NOT_FOUND);
    }

    #[test]
    fn unchecked_builder_accepts_any_base_url() {
        let restfit = Restfit::builder().check_url(false).build().unwrap();
        assert_eq!(restfit.base_url(), "");
        assert!(restfit.expect_success());
    }

    #[test]
    fn clones_share_configuration() {
        let restfit = Restfit::builder()
            .base_url("https://api.example.com/")
            .expect_success(false)
            .build()
            .unwrap();
        let client = restfit.client();
        assert_eq!(client.restfit().base_url(), "https://api.example.com/");
        assert!(!client.restfit().expect_success());
    }
}
