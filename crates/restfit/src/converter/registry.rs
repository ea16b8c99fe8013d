use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::{ConverterFactory, RequestParameterConverter, ResponseConverter, SuspendResponseConverter};
use crate::restfit::Restfit;
use crate::type_data::TypeData;

/// Ordered list of converter factories.
///
/// Resolution is a linear scan starting after `skip_past` (or at the front);
/// the first factory that returns a converter wins.
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    factories: Vec<Arc<dyn ConverterFactory>>,
}

impl ConverterRegistry {
    pub fn new(factories: Vec<Arc<dyn ConverterFactory>>) -> Self {
        Self { factories }
    }

    pub fn push(&mut self, factory: Arc<dyn ConverterFactory>) {
        self.factories.push(factory);
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub fn next_response_converter(
        &self,
        skip_past: Option<&dyn ConverterFactory>,
        type_data: &TypeData,
        restfit: &Restfit,
    ) -> Option<Box<dyn ResponseConverter>> {
        let found = self.candidates(skip_past).find_map(|(index, factory)| {
            factory
                .response_converter(type_data, restfit)
                .map(|converter| (index, converter))
        });
        log_resolution("response", type_data, found.as_ref().map(|(index, _)| *index));
        found.map(|(_, converter)| converter)
    }

    pub fn next_suspend_response_converter(
        &self,
        skip_past: Option<&dyn ConverterFactory>,
        type_data: &TypeData,
        restfit: &Restfit,
    ) -> Option<Box<dyn SuspendResponseConverter>> {
        let found = self.candidates(skip_past).find_map(|(index, factory)| {
            factory
                .suspend_response_converter(type_data, restfit)
                .map(|converter| (index, converter))
        });
        log_resolution("suspend", type_data, found.as_ref().map(|(index, _)| *index));
        found.map(|(_, converter)| converter)
    }

    pub fn next_request_parameter_converter(
        &self,
        skip_past: Option<&dyn ConverterFactory>,
        parameter_type: &TypeData,
        request_type: &TypeData,
    ) -> Option<Box<dyn RequestParameterConverter>> {
        let found = self.candidates(skip_past).find_map(|(index, factory)| {
            factory
                .request_parameter_converter(parameter_type, request_type)
                .map(|converter| (index, converter))
        });
        log_resolution("parameter", parameter_type, found.as_ref().map(|(index, _)| *index));
        found.map(|(_, converter)| converter)
    }

    /// Factories after `skip_past`, or all of them when it is `None` or unknown.
    fn candidates<'a>(
        &'a self,
        skip_past: Option<&dyn ConverterFactory>,
    ) -> impl Iterator<Item = (usize, &'a Arc<dyn ConverterFactory>)> + 'a {
        let start = skip_past
            .and_then(|skip| {
                self.factories
                    .iter()
                    .position(|factory| same_factory(factory.as_ref(), skip))
            })
            .map_or(0, |index| index + 1);
        self.factories.iter().enumerate().skip(start)
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("factories", &self.factories.len())
            .finish()
    }
}

fn same_factory(a: &dyn ConverterFactory, b: &dyn ConverterFactory) -> bool {
    std::ptr::eq(a as *const _ as *const (), b as *const _ as *const ())
}

fn log_resolution(kind: &str, type_data: &TypeData, index: Option<usize>) {
    match index {
        Some(index) => trace!(kind, type_data = %type_data, index, "converter resolved"),
        None => trace!(kind, type_data = %type_data, "no converter registered"),
    }
}
