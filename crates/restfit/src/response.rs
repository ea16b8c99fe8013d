//! HTTP response value and the normalised call outcome.

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::errors::{RestfitError, Result};

/// A fully-read HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Returns the first value of the header `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Reads the body as UTF-8 text.
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.to_vec()).map_err(|e| RestfitError::Decode {
            type_name: "String".to_string(),
            message: e.to_string(),
        })
    }

    /// Decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| RestfitError::Decode {
            type_name: std::any::type_name::<T>().to_string(),
            message: e.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// CallResult
// ---------------------------------------------------------------------------

/// Outcome of executing a request, handed to suspend converters.
///
/// Transport failures and (when success is expected) non-2xx responses arrive
/// as [`CallResult::Failure`], so a converter can build a wrapped result type
/// instead of raising.
#[derive(Debug)]
pub enum CallResult {
    Success(HttpResponse),
    Failure(RestfitError),
}

impl CallResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Converts into a `Result`, surfacing the failure as an error.
    pub fn into_result(self) -> Result<HttpResponse> {
        match self {
            Self::Success(response) => Ok(response),
            Self::Failure(error) => Err(error),
        }
    }
}

impl From<Result<HttpResponse>> for CallResult {
    fn from(result: Result<HttpResponse>) -> Self {
        match result {
            Ok(response) => Self::Success(response),
            Err(error) => Self::Failure(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Repo {
        name: String,
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let response = HttpResponse::new(
            200,
            vec![("Content-Type".to_string(), "application/json".to_string())],
            Bytes::new(),
        );
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(response.header("accept"), None);
    }

    #[test]
    fn json_decodes_body() {
        let response = HttpResponse::new(200, vec![], r#"{"name":"restfit"}"#);
        let repo: Repo = response.json().unwrap();
        assert_eq!(repo.name, "restfit");
    }

    #[test]
    fn json_failure_names_target_type() {
        let response = HttpResponse::new(200, vec![], "not json");
        let err = response.json::<Repo>().unwrap_err();
        assert!(err.to_string().contains("Repo"));
    }

    #[test]
    fn success_range_is_2xx() {
        assert!(HttpResponse::new(204, vec![], Bytes::new()).is_success());
        assert!(!HttpResponse::new(301, vec![], Bytes::new()).is_success());
        assert!(!HttpResponse::new(404, vec![], Bytes::new()).is_success());
    }
}
