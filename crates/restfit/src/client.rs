//! The request dispatcher invoked by generated implementations.

use tracing::{debug, warn};

use crate::converter::default_suspend_converter;
use crate::errors::{RestfitError, Result};
use crate::request::RequestData;
use crate::response::{CallResult, HttpResponse};
use crate::restfit::Restfit;
use crate::transport::PreparedRequest;
use crate::type_data::{downcast_value, Erased, TypeData};

const HTTP_RESPONSE_TYPE: &str = "restfit::HttpResponse";

/// Executes [`RequestData`] and converts the outcome to the declared type.
///
/// Cheap to clone; every clone shares the same [`Restfit`] configuration.
/// A call resolves to `Ok(Some(value))`, or, when the declared return type is
/// nullable, to `Ok(None)` for any failure. Non-nullable calls surface the
/// failure as `Err`.
#[derive(Clone, Debug)]
pub struct Client {
    restfit: Restfit,
}

impl Client {
    pub(crate) fn new(restfit: Restfit) -> Self {
        Self { restfit }
    }

    pub fn restfit(&self) -> &Restfit {
        &self.restfit
    }

    /// Dispatches a blocking function through the first matching response converter.
    pub fn request<T: Send + 'static>(&self, request_data: RequestData) -> Result<Option<T>> {
        let return_type = request_data.return_type().clone();
        let outcome = match self.restfit.next_response_converter(None, &return_type) {
            Some(converter) => converter
                .convert(SuspendCall::new(self.clone(), request_data))
                .and_then(downcast_value::<T>),
            None => Err(RestfitError::NoResponseConverter {
                type_name: return_type.to_string(),
            }),
        };
        self.settle(outcome, &return_type)
    }

    /// Dispatches an async function.
    ///
    /// A declared `PreparedRequest` is returned unsent. Otherwise the first
    /// matching suspend converter, or the built-in default, converts the
    /// [`CallResult`] of executing the request.
    pub async fn suspend_request<T: Send + 'static>(&self, request_data: RequestData) -> Result<Option<T>> {
        let return_type = request_data.return_type().clone();
        let outcome = self
            .execute_and_convert(request_data)
            .await
            .and_then(downcast_value::<T>);
        self.settle(outcome, &return_type)
    }

    /// Converts a `#[request_type]` argument with the first matching parameter converter.
    pub fn convert_parameter_type<T: Send + 'static>(
        &self,
        data: Erased,
        parameter_type: &TypeData,
        request_type: &TypeData,
    ) -> Result<T> {
        let converter = self
            .restfit
            .next_request_parameter_converter(None, parameter_type, request_type)
            .ok_or_else(|| RestfitError::NoParameterConverter {
                parameter_type: parameter_type.to_string(),
                request_type: request_type.to_string(),
            })?;
        converter.convert(data).and_then(downcast_value::<T>)
    }

    async fn execute_and_convert(&self, request_data: RequestData) -> Result<Erased> {
        let return_type = request_data.return_type().clone();

        if return_type.is::<PreparedRequest>() {
            let request = request_data.into_request(self.restfit.base_url())?;
            return Ok(Box::new(PreparedRequest::new(request, self.restfit.transport())));
        }

        let converter = match self.restfit.next_suspend_response_converter(None, &return_type) {
            Some(converter) => converter,
            None => default_suspend_converter(&return_type).ok_or_else(|| {
                RestfitError::NoSuspendResponseConverter {
                    type_name: return_type.to_string(),
                }
            })?,
        };

        let result = self.execute(request_data).await;
        converter.convert(result).await
    }

    async fn execute(&self, request_data: RequestData) -> CallResult {
        let request = match request_data.into_request(self.restfit.base_url()) {
            Ok(request) => request,
            Err(error) => return CallResult::Failure(error),
        };
        let method = request.method().to_string();
        let url = request.url().to_string();
        debug!(method = %method, url = %url, "executing request");

        match self.restfit.transport().execute(request).await {
            Ok(response) if self.restfit.expect_success() && !response.is_success() => {
                debug!(method = %method, url = %url, status = response.status(), "unsuccessful response");
                CallResult::Failure(RestfitError::Status {
                    status: response.status(),
                    url,
                    response: Box::new(response),
                })
            }
            Ok(response) => CallResult::Success(response),
            Err(error) => CallResult::Failure(error.into()),
        }
    }

    fn settle<T>(&self, outcome: Result<T>, return_type: &TypeData) -> Result<Option<T>> {
        match outcome {
            Ok(value) => Ok(Some(value)),
            Err(error) if return_type.is_nullable() => {
                warn!(return_type = %return_type, error = %error, "suppressing failure for nullable return type");
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }
}

// ---------------------------------------------------------------------------
// SuspendCall
// ---------------------------------------------------------------------------

/// A not-yet-executed call handed to [`crate::converter::ResponseConverter`]s.
#[derive(Debug)]
pub struct SuspendCall {
    client: Client,
    request_data: RequestData,
}

impl SuspendCall {
    fn new(client: Client, request_data: RequestData) -> Self {
        Self { client, request_data }
    }

    /// Declared return type of the generated function.
    pub fn return_type(&self) -> &TypeData {
        self.request_data.return_type()
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Executes the request and returns the raw response.
    ///
    /// Unsuccessful statuses are errors while success is expected.
    pub async fn execute(self) -> Result<HttpResponse> {
        let request_data = self
            .request_data
            .with_return_type(TypeData::new::<HttpResponse>(HTTP_RESPONSE_TYPE, false, Vec::new()));
        self.client
            .suspend_request::<HttpResponse>(request_data)
            .await?
            .ok_or_else(|| RestfitError::missing_value(HTTP_RESPONSE_TYPE))
    }
}
