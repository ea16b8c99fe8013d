//! The `#[restfit::api]` attribute.
//!
//! Implementations are produced by the build-time generator; this attribute
//! only checks the declaration where it is written and removes the inert
//! restfit attributes so the trait compiles on its own. Every rule violation
//! is reported as a compile error at the offending span.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Error, FnArg, ImplItem, Item, TraitItem};

use restfit_codegen::annotations::{is_function_attribute, is_parameter_attribute};

/// Marks a trait as a restfit API.
///
/// ```ignore
/// #[restfit::api]
/// pub trait UsersApi {
///     #[get("users/{id}")]
///     async fn user(&self, #[path("id")] id: u64) -> restfit::Result<User>;
/// }
/// ```
#[proc_macro_attribute]
pub fn api(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return Error::new(proc_macro2::Span::call_site(), "#[restfit::api] takes no arguments")
            .to_compile_error()
            .into();
    }

    let mut item = parse_macro_input!(item as Item);
    let errors = restfit_codegen::validate(&item)
        .into_iter()
        .map(|error| error.to_compile_error());
    strip_annotations(&mut item);

    quote! {
        #item
        #(#errors)*
    }
    .into()
}

/// Removes restfit attributes from functions and their parameters.
fn strip_annotations(item: &mut Item) {
    match item {
        Item::Trait(item_trait) => {
            for trait_item in &mut item_trait.items {
                if let TraitItem::Fn(function) = trait_item {
                    function.attrs.retain(|attr| !is_function_attribute(attr));
                    strip_parameters(function.sig.inputs.iter_mut());
                }
            }
        }
        Item::Impl(item_impl) => {
            for impl_item in &mut item_impl.items {
                if let ImplItem::Fn(function) = impl_item {
                    function.attrs.retain(|attr| !is_function_attribute(attr));
                    strip_parameters(function.sig.inputs.iter_mut());
                }
            }
        }
        _ => {}
    }
}

fn strip_parameters<'a>(inputs: impl Iterator<Item = &'a mut FnArg>) {
    for input in inputs {
        if let FnArg::Typed(typed) = input {
            typed.attrs.retain(|attr| !is_parameter_attribute(attr));
        }
    }
}
