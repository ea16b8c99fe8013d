//! Converter SPI.
//!
//! Converters adapt the raw outcome of a call into the declared return type
//! of a generated function, or adapt an argument into the type the request
//! needs. They are produced by [`ConverterFactory`] implementations that are
//! registered on [`crate::RestfitBuilder`] and consulted in registration order;
//! the first factory returning `Some` wins.
//!
//! | Converter | Used for |
//! |-----------|----------|
//! | [`ResponseConverter`] | blocking functions; receives a [`SuspendCall`] it may run later |
//! | [`SuspendResponseConverter`] | async functions; receives the finished [`CallResult`] |
//! | [`RequestParameterConverter`] | `#[request_type]` arguments |
//!
//! A factory that wants to decorate another converter asks the registry for
//! the next match after itself, e.g.
//! `restfit.next_suspend_response_converter(Some(self), type_data)`.

mod builtin;
mod registry;

use async_trait::async_trait;

pub use builtin::decode_body;
pub(crate) use builtin::default_suspend_converter;
pub use registry::ConverterRegistry;

use crate::client::SuspendCall;
use crate::errors::Result;
use crate::response::CallResult;
use crate::restfit::Restfit;
use crate::type_data::{Erased, TypeData};

/// Produces the return value of a blocking function.
pub trait ResponseConverter: Send + Sync {
    /// Wraps `call` into the declared return type. The call has not been
    /// executed yet.
    fn convert(&self, call: SuspendCall) -> Result<Erased>;
}

/// Produces the return value of an async function from the call outcome.
#[async_trait]
pub trait SuspendResponseConverter: Send + Sync {
    async fn convert(&self, result: CallResult) -> Result<Erased>;
}

/// Converts a function argument before it is applied to the request.
pub trait RequestParameterConverter: Send + Sync {
    fn convert(&self, data: Erased) -> Result<Erased>;
}

/// Creates converters for the types it supports.
///
/// Every method defaults to "not supported".
pub trait ConverterFactory: Send + Sync {
    fn response_converter(
        &self,
        _type_data: &TypeData,
        _restfit: &Restfit,
    ) -> Option<Box<dyn ResponseConverter>> {
        None
    }

    fn suspend_response_converter(
        &self,
        _type_data: &TypeData,
        _restfit: &Restfit,
    ) -> Option<Box<dyn SuspendResponseConverter>> {
        None
    }

    fn request_parameter_converter(
        &self,
        _parameter_type: &TypeData,
        _request_type: &TypeData,
    ) -> Option<Box<dyn RequestParameterConverter>> {
        None
    }
}
