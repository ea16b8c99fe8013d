//! A small user-directory API declared with restfit.
//!
//! The `_<Name>Impl` types are generated by `build.rs` and included next to
//! their traits. [`client`] shows the usual wiring.

pub mod api;
pub mod converters;
pub mod model;

use restfit::{FlowConverterFactory, Restfit};

use crate::converters::UserIdConverterFactory;

/// Configures a [`Restfit`] with the converters the sandbox APIs rely on.
pub fn client(base_url: &str) -> restfit::Result<Restfit> {
    Restfit::builder()
        .base_url(base_url)
        .converter_factory(FlowConverterFactory)
        .converter_factory(UserIdConverterFactory)
        .build()
}
