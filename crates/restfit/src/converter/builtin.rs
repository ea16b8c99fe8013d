use async_trait::async_trait;
use bytes::Bytes;

use super::SuspendResponseConverter;
use crate::errors::Result;
use crate::response::{CallResult, HttpResponse};
use crate::type_data::{Erased, TypeData};

/// Decodes `response` into the type described by `type_data`.
///
/// `HttpResponse` is returned raw and `Bytes` yields the body unchanged.
/// Any other type needs the body decoder captured by [`crate::type_data!`],
/// which covers `()`, `String`, `Vec<u8>` and every `DeserializeOwned` type.
pub fn decode_body(type_data: &TypeData, response: HttpResponse) -> Result<Erased> {
    if type_data.is::<HttpResponse>() {
        return Ok(Box::new(response));
    }
    if type_data.is::<Bytes>() {
        return Ok(Box::new(response.into_body()));
    }
    type_data.decode(&response)
}

/// Returns the built-in converter when it can produce `type_data`.
pub(crate) fn default_suspend_converter(type_data: &TypeData) -> Option<Box<dyn SuspendResponseConverter>> {
    let supported = type_data.is::<HttpResponse>() || type_data.is::<Bytes>() || type_data.has_decoder();
    if !supported {
        return None;
    }
    Some(Box::new(DefaultSuspendConverter {
        type_data: type_data.clone(),
    }))
}

struct DefaultSuspendConverter {
    type_data: TypeData,
}

#[async_trait]
impl SuspendResponseConverter for DefaultSuspendConverter {
    async fn convert(&self, result: CallResult) -> Result<Erased> {
        let response = result.into_result()?;
        decode_body(&self.type_data, response)
    }
}
