//! Parameter converters registered by [`crate::client`].

use restfit::{downcast_value, ConverterFactory, Erased, RequestParameterConverter, TypeData};

use crate::model::UserId;

/// Converts `#[request_type(String)]` arguments of type [`UserId`].
#[derive(Debug, Default, Clone, Copy)]
pub struct UserIdConverterFactory;

impl ConverterFactory for UserIdConverterFactory {
    fn request_parameter_converter(
        &self,
        parameter_type: &TypeData,
        request_type: &TypeData,
    ) -> Option<Box<dyn RequestParameterConverter>> {
        if parameter_type.is::<UserId>() && request_type.is::<String>() {
            Some(Box::new(UserIdToString))
        } else {
            None
        }
    }
}

struct UserIdToString;

impl RequestParameterConverter for UserIdToString {
    fn convert(&self, data: Erased) -> restfit::Result<Erased> {
        let id = downcast_value::<UserId>(data)?;
        Ok(Box::new(format!("user-{}", id.0)))
    }
}
