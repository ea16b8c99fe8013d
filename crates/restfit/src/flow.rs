//! `Flow<T>`: a lazily executed call exposed as a stream.

use std::fmt;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{self, BoxStream, Stream, StreamExt};

use crate::client::SuspendCall;
use crate::converter::{decode_body, ConverterFactory, ResponseConverter};
use crate::errors::Result;
use crate::restfit::Restfit;
use crate::type_data::{downcast_value, Erased, FromErased, TypeData};

/// Qualified name that [`FlowConverterFactory`] claims.
pub const FLOW_TYPE_NAME: &str = "restfit::Flow";

/// Type-erased item stream that a [`Flow`] is assembled from.
pub type ErasedStream = BoxStream<'static, Result<Erased>>;

/// Stream of decoded values produced by a blocking function.
///
/// Nothing is sent until the stream is first polled.
pub struct Flow<T> {
    inner: ErasedStream,
    _item: PhantomData<fn() -> T>,
}

impl<T: Send + 'static> Flow<T> {
    /// Wraps an already typed stream.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<T>> + Send + 'static,
    {
        Self::from_erased(
            stream
                .map(|item| item.map(|value| Box::new(value) as Erased))
                .boxed(),
        )
    }
}

impl<T: Send + 'static> FromErased for Flow<T> {
    type Parts = ErasedStream;

    fn from_erased(parts: Self::Parts) -> Self {
        Self {
            inner: parts,
            _item: PhantomData,
        }
    }
}

impl<T: 'static> Stream for Flow<T> {
    type Item = Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner
            .poll_next_unpin(cx)
            .map(|item| item.map(|result| result.and_then(downcast_value::<T>)))
    }
}

impl<T> fmt::Debug for Flow<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flow").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

/// Produces [`Flow`] return values for blocking functions.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlowConverterFactory;

impl ConverterFactory for FlowConverterFactory {
    fn response_converter(
        &self,
        type_data: &TypeData,
        _restfit: &Restfit,
    ) -> Option<Box<dyn ResponseConverter>> {
        if !type_data.is_named(FLOW_TYPE_NAME) {
            return None;
        }
        let item_type = type_data.type_arg(0)?.clone();
        Some(Box::new(FlowResponseConverter {
            flow_type: type_data.clone(),
            item_type,
        }))
    }
}

struct FlowResponseConverter {
    flow_type: TypeData,
    item_type: TypeData,
}

impl ResponseConverter for FlowResponseConverter {
    fn convert(&self, call: SuspendCall) -> Result<Erased> {
        let item_type = self.item_type.clone();
        let items: ErasedStream = stream::once(async move {
            let response = call.execute().await?;
            decode_body(&item_type, response)
        })
        .boxed();
        self.flow_type.assemble(Box::new(items))
    }
}
