//! Support items for generated code and the exported macros. Not a stable API.

use std::any::TypeId;
use std::fmt::Display;
use std::marker::PhantomData;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;

use crate::client::Client;
use crate::errors::Result;
use crate::response::HttpResponse;
use crate::type_data::{assemble_shape, BodyDecoder, Erased, FromErased, ShapeAssembler};

/// Characters left unescaped in a substituted path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Returns the client of a generated implementation.
///
/// # Panics
///
/// When the implementation was constructed directly and never passed through
/// [`crate::Restfit::create`].
pub fn require_client<'a>(client: &'a Option<Client>, implementation: &str) -> &'a Client {
    match client {
        Some(client) => client,
        None => panic!(
            "restfit client was not initialized on {implementation}; create it with Restfit::create"
        ),
    }
}

/// One path placeholder: its name, the value and whether it is pre-encoded.
pub type PathValue<'a> = (&'a str, &'a dyn Display, bool);

/// Replaces every `{name}` of `template` in a single pass.
///
/// Values are percent-encoded unless marked as encoded. Inserted text is not
/// scanned again, and placeholders without a value are kept as written.
pub fn substitute_path(template: &str, values: &[PathValue<'_>]) -> String {
    let mut url = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        url.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            url.push_str(&rest[open..]);
            return url;
        };
        let name = &after[..close];
        match values.iter().find(|(placeholder, _, _)| *placeholder == name) {
            Some((_, value, true)) => url.push_str(&value.to_string()),
            Some((_, value, false)) => url.extend(utf8_percent_encode(&value.to_string(), PATH_SEGMENT)),
            None => url.push_str(&rest[open..open + close + 2]),
        }
        rest = &after[close + 1..];
    }
    url.push_str(rest);
    url
}

// ---------------------------------------------------------------------------
// Hook probes for `type_data!`
//
// Method resolution prefers the impl on `Probe<T>` (whose bound must hold) over
// the unbounded fallback on `&Probe<T>`, so `(&probe).decoder()` yields a
// decoder exactly when `T: DeserializeOwned`.
// ---------------------------------------------------------------------------

pub struct Probe<T>(PhantomData<fn() -> T>);

impl<T> Probe<T> {
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Probe<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub trait DecodeViaDeserialize {
    fn decoder(&self) -> Option<BodyDecoder>;
}

impl<T: DeserializeOwned + Send + 'static> DecodeViaDeserialize for Probe<T> {
    fn decoder(&self) -> Option<BodyDecoder> {
        Some(decode_value::<T>)
    }
}

pub trait DecodeFallback {
    fn decoder(&self) -> Option<BodyDecoder>;
}

impl<T> DecodeFallback for &Probe<T> {
    fn decoder(&self) -> Option<BodyDecoder> {
        None
    }
}

pub trait AssembleViaFromErased {
    fn assembler(&self) -> Option<ShapeAssembler>;
}

impl<T: FromErased> AssembleViaFromErased for Probe<T> {
    fn assembler(&self) -> Option<ShapeAssembler> {
        Some(assemble_shape::<T>)
    }
}

pub trait AssembleFallback {
    fn assembler(&self) -> Option<ShapeAssembler>;
}

impl<T> AssembleFallback for &Probe<T> {
    fn assembler(&self) -> Option<ShapeAssembler> {
        None
    }
}

fn decode_value<T: DeserializeOwned + Send + 'static>(response: &HttpResponse) -> Result<Erased> {
    let target = TypeId::of::<T>();
    if target == TypeId::of::<()>() {
        return Ok(Box::new(()));
    }
    if target == TypeId::of::<String>() {
        return Ok(Box::new(response.text()?));
    }
    if target == TypeId::of::<Vec<u8>>() {
        return Ok(Box::new(response.body().to_vec()));
    }
    Ok(Box::new(response.json::<T>()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_values_are_encoded_unless_marked() {
        let values: [PathValue<'_>; 1] = [("id", &"a b/c", false)];
        assert_eq!(substitute_path("users/{id}/repos", &values), "users/a%20b%2Fc/repos");
        let values: [PathValue<'_>; 1] = [("path", &"dir/file.txt", true)];
        assert_eq!(substitute_path("files/{path}", &values), "files/dir/file.txt");
    }

    #[test]
    fn every_occurrence_is_replaced() {
        let values: [PathValue<'_>; 1] = [("id", &7, false)];
        assert_eq!(substitute_path("{id}/{id}", &values), "7/7");
    }

    #[test]
    fn inserted_values_are_not_substituted_again() {
        let values: [PathValue<'_>; 2] = [("owner", &"{repo}", true), ("repo", &"restfit", false)];
        assert_eq!(substitute_path("{owner}/{repo}", &values), "{repo}/restfit");
    }

    #[test]
    fn unknown_and_unclosed_placeholders_are_kept() {
        let values: [PathValue<'_>; 1] = [("id", &1, false)];
        assert_eq!(substitute_path("{other}/{id}/{tail", &values), "{other}/1/{tail");
    }

    #[test]
    #[should_panic(expected = "_GithubApiImpl")]
    fn missing_client_panics_with_implementation_name() {
        let client: Option<Client> = None;
        require_client(&client, "_GithubApiImpl");
    }

    #[test]
    fn text_and_unit_bypass_json() {
        let response = HttpResponse::new(200, vec![], "plain text");
        let text = decode_value::<String>(&response).unwrap();
        assert_eq!(*text.downcast::<String>().unwrap(), "plain text");
        let unit = decode_value::<()>(&response).unwrap();
        assert!(unit.downcast::<()>().is_ok());
    }
}
