//! `Call<T>`: a deferred call that can be awaited or enqueued with a callback.

use std::fmt;
use std::future::IntoFuture;
use std::marker::PhantomData;

use futures::future::{BoxFuture, FutureExt};
use tokio::task::JoinHandle;

use crate::client::SuspendCall;
use crate::converter::{decode_body, ConverterFactory, ResponseConverter};
use crate::errors::{RestfitError, Result};
use crate::restfit::Restfit;
use crate::type_data::{downcast_value, Erased, FromErased, TypeData};

/// Qualified name that [`CallConverterFactory`] claims.
pub const CALL_TYPE_NAME: &str = "restfit::Call";

/// Type-erased future that a [`Call`] is assembled from.
pub type ErasedFuture = BoxFuture<'static, Result<Erased>>;

/// Receives the outcome of [`Call::enqueue`].
pub trait Callback<T>: Send + 'static {
    fn on_response(self, value: T);
    fn on_error(self, error: RestfitError);
}

/// A request that runs when executed, awaited or enqueued.
pub struct Call<T> {
    inner: ErasedFuture,
    _value: PhantomData<fn() -> T>,
}

impl<T: Send + 'static> Call<T> {
    /// Runs the call to completion.
    pub async fn execute(self) -> Result<T> {
        self.inner.await.and_then(downcast_value::<T>)
    }

    /// Runs the call on the current tokio runtime and reports to `callback`.
    ///
    /// # Panics
    ///
    /// When called outside a tokio runtime.
    pub fn enqueue<C: Callback<T>>(self, callback: C) -> JoinHandle<()> {
        tokio::spawn(async move {
            match self.execute().await {
                Ok(value) => callback.on_response(value),
                Err(error) => callback.on_error(error),
            }
        })
    }
}

impl<T: Send + 'static> FromErased for Call<T> {
    type Parts = ErasedFuture;

    fn from_erased(parts: Self::Parts) -> Self {
        Self {
            inner: parts,
            _value: PhantomData,
        }
    }
}

impl<T: Send + 'static> IntoFuture for Call<T> {
    type Output = Result<T>;
    type IntoFuture = BoxFuture<'static, Result<T>>;

    fn into_future(self) -> Self::IntoFuture {
        self.execute().boxed()
    }
}

impl<T> fmt::Debug for Call<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

/// Produces [`Call`] return values for blocking functions.
#[derive(Debug, Default, Clone, Copy)]
pub struct CallConverterFactory;

impl ConverterFactory for CallConverterFactory {
    fn response_converter(
        &self,
        type_data: &TypeData,
        _restfit: &Restfit,
    ) -> Option<Box<dyn ResponseConverter>> {
        if !type_data.is_named(CALL_TYPE_NAME) {
            return None;
        }
        let value_type = type_data.type_arg(0)?.clone();
        Some(Box::new(CallResponseConverter {
            call_type: type_data.clone(),
            value_type,
        }))
    }
}

struct CallResponseConverter {
    call_type: TypeData,
    value_type: TypeData,
}

impl ResponseConverter for CallResponseConverter {
    fn convert(&self, call: SuspendCall) -> Result<Erased> {
        let value_type = self.value_type.clone();
        let future: ErasedFuture = async move {
            let response = call.execute().await?;
            decode_body(&value_type, response)
        }
        .boxed();
        self.call_type.assemble(Box::new(future))
    }
}
