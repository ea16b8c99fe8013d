//! Runtime for Restfit, a declarative HTTP client.
//!
//! An annotated trait is turned into a concrete `_<Name>Impl` by the code
//! generator in `restfit-codegen`. Every generated function builds a
//! [`RequestData`] and hands it to a [`Client`], which executes it through an
//! [`HttpTransport`] and converts the outcome into the declared return type
//! using the converter factories registered on [`Restfit`].
//!
//! ```ignore
//! #[restfit::api]
//! pub trait GithubApi {
//!     #[get("repos/{owner}/{repo}")]
//!     async fn repo(&self, #[path("owner")] owner: String, #[path("repo")] repo: String)
//!         -> restfit::Result<Repo>;
//! }
//!
//! restfit::include_generated!("_GithubApiImpl.rs");
//!
//! let restfit = Restfit::builder().base_url("https://api.github.com/").build()?;
//! let api = restfit.create_github_api();
//! ```
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`client`] | The dispatcher (`Client`) and `SuspendCall` |
//! | [`converter`] | Converter traits, factories and the ordered registry |
//! | [`request`] | `HttpMethod`, `HttpRequestBuilder`, `RequestData` |
//! | [`response`] | `HttpResponse`, `CallResult` |
//! | [`type_data`] | Runtime type descriptors and type erasure helpers |
//! | [`transport`] | `HttpTransport` seam, `reqwest` transport, `PreparedRequest` |
//! | [`flow`], [`call`] | Optional wrapper return types and their converters |

pub mod call;
pub mod client;
pub mod converter;
pub mod errors;
pub mod flow;
pub mod request;
pub mod response;
mod restfit;
pub mod service;
pub mod transport;
pub mod type_data;

#[doc(hidden)]
pub mod internal;

pub use call::{Call, CallConverterFactory, Callback};
pub use client::{Client, SuspendCall};
pub use converter::{
    ConverterFactory, ConverterRegistry, RequestParameterConverter, ResponseConverter,
    SuspendResponseConverter,
};
pub use errors::{RestfitError, Result, TransportError};
pub use flow::{Flow, FlowConverterFactory};
pub use request::{Body, HttpMethod, HttpRequest, HttpRequestBuilder, Part, RequestData};
pub use response::{CallResult, HttpResponse};
pub use self::restfit::{Restfit, RestfitBuilder};
pub use restfit_macros::api;
pub use service::RestfitService;
pub use transport::{HttpTransport, PreparedRequest, ReqwestTransport};
pub use type_data::{downcast_value, Erased, FromErased, TypeData};

/// Builds a [`TypeData`] for `$ty`, capturing its body decoder and shape
/// assembler where the type supports them.
///
/// ```ignore
/// let td = restfit::type_data!(Flow<User>, "restfit::Flow", false,
///     restfit::type_data!(User, "crate::model::User", false));
/// ```
#[macro_export]
macro_rules! type_data {
    ($ty:ty, $name:expr, $nullable:expr $(, $arg:expr)* $(,)?) => {{
        #[allow(unused_imports)]
        use $crate::internal::{
            AssembleFallback as _, AssembleViaFromErased as _, DecodeFallback as _,
            DecodeViaDeserialize as _,
        };
        let probe = $crate::internal::Probe::<$ty>::new();
        $crate::TypeData::new::<$ty>($name, $nullable, ::std::vec![$($arg),*])
            .with_decoder((&probe).decoder())
            .with_assembler((&probe).assembler())
    }};
}

/// Includes a generated implementation from `$OUT_DIR/restfit/`.
///
/// The path is relative to the generator's output root, e.g.
/// `restfit::include_generated!("api/github/_GithubApiImpl.rs")`.
#[macro_export]
macro_rules! include_generated {
    ($path:literal) => {
        include!(concat!(env!("OUT_DIR"), "/restfit/", $path));
    };
}
