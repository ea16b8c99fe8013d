//! Request model: HTTP method, body, the mutable request builder handed to
//! generated closures, and the per-call [`RequestData`] descriptor.

use std::any::Any;
use std::fmt;

use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use url::Url;
use uuid::Uuid;

use crate::errors::{RestfitError, Result};
use crate::type_data::TypeData;

/// Characters left unescaped in form fields and query components.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub(crate) const FORM_URL_ENCODED: &str = "application/x-www-form-urlencoded";
const JSON: &str = "application/json";
const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const OCTET_STREAM: &str = "application/octet-stream";

// ---------------------------------------------------------------------------
// HttpMethod
// ---------------------------------------------------------------------------

/// An HTTP method token.
///
/// Custom verbs are kept verbatim, including their case.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HttpMethod(String);

impl HttpMethod {
    /// Wraps `method` without normalising it.
    pub fn parse(method: impl Into<String>) -> Self {
        Self(method.into())
    }

    pub fn get() -> Self {
        Self::parse("GET")
    }

    pub fn post() -> Self {
        Self::parse("POST")
    }

    pub fn put() -> Self {
        Self::parse("PUT")
    }

    pub fn delete() -> Self {
        Self::parse("DELETE")
    }

    pub fn patch() -> Self {
        Self::parse("PATCH")
    }

    pub fn head() -> Self {
        Self::parse("HEAD")
    }

    pub fn options() -> Self {
        Self::parse("OPTIONS")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Body and parts
// ---------------------------------------------------------------------------

/// Encoded request body with an optional content type.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    bytes: Bytes,
    content_type: Option<String>,
}

impl Body {
    pub fn new(bytes: impl Into<Bytes>, content_type: Option<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type,
        }
    }

    /// Encodes `value` for transmission.
    ///
    /// Text and byte values are sent as-is; everything else is serialised as JSON.
    pub fn from_value<B: Serialize + 'static>(value: &B) -> Result<Self> {
        let any = value as &dyn Any;
        if let Some(body) = any.downcast_ref::<Body>() {
            return Ok(body.clone());
        }
        if let Some(text) = any.downcast_ref::<String>() {
            return Ok(Self::new(text.clone(), Some(TEXT_PLAIN.to_string())));
        }
        if let Some(text) = any.downcast_ref::<&'static str>() {
            return Ok(Self::new(*text, Some(TEXT_PLAIN.to_string())));
        }
        if let Some(bytes) = any.downcast_ref::<Vec<u8>>() {
            return Ok(Self::new(bytes.clone(), Some(OCTET_STREAM.to_string())));
        }
        if let Some(bytes) = any.downcast_ref::<Bytes>() {
            return Ok(Self::new(bytes.clone(), Some(OCTET_STREAM.to_string())));
        }
        let json = serde_json::to_vec(value).map_err(RestfitError::Encode)?;
        Ok(Self::new(json, Some(JSON.to_string())))
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

// `Body::from_value` short-circuits on a top-level `Body`; nested ones serialise as bytes.
impl Serialize for Body {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.bytes)
    }
}

/// One part of a `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    name: String,
    filename: Option<String>,
    body: Body,
}

impl Part {
    pub fn new(name: impl Into<String>, body: Body) -> Self {
        Self {
            name: name.into(),
            filename: None,
            body,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Overrides the content type of the part body.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.body.content_type = Some(content_type.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn body(&self) -> &Body {
        &self.body
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Pair {
    name: String,
    value: Option<String>,
    encoded: bool,
}

impl Pair {
    fn render(&self) -> String {
        let encode = |s: &str| {
            if self.encoded {
                s.to_string()
            } else {
                utf8_percent_encode(s, QUERY_COMPONENT).to_string()
            }
        };
        match &self.value {
            Some(value) => format!("{}={}", encode(&self.name), encode(value)),
            None => encode(&self.name),
        }
    }
}

// ---------------------------------------------------------------------------
// HttpRequestBuilder
// ---------------------------------------------------------------------------

/// Mutable request configuration.
///
/// Generated functions fill it from their annotations and arguments; a
/// `#[req_builder]` argument receives it last and may override anything.
#[derive(Debug, Default)]
pub struct HttpRequestBuilder {
    method: Option<HttpMethod>,
    url: String,
    headers: Vec<(String, String)>,
    query: Vec<Pair>,
    body: Option<Body>,
    fields: Vec<Pair>,
    parts: Vec<Part>,
}

impl HttpRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(&mut self, method: HttpMethod) -> &mut Self {
        self.method = Some(method);
        self
    }

    /// Replaces the relative or absolute request URL.
    pub fn url(&mut self, url: impl Into<String>) -> &mut Self {
        self.url = url.into();
        self
    }

    /// Appends a header; repeated names are all sent.
    pub fn header(&mut self, name: impl Into<String>, value: impl fmt::Display) -> &mut Self {
        self.headers.push((name.into(), value.to_string()));
        self
    }

    /// Appends a query parameter, percent-encoding name and value.
    pub fn query(&mut self, name: impl Into<String>, value: impl fmt::Display) -> &mut Self {
        self.push_query(name.into(), Some(value.to_string()), false)
    }

    /// Appends a query parameter whose name and value are already encoded.
    pub fn encoded_query(&mut self, name: impl Into<String>, value: impl fmt::Display) -> &mut Self {
        self.push_query(name.into(), Some(value.to_string()), true)
    }

    /// Appends a value-less query parameter.
    pub fn query_name(&mut self, name: impl fmt::Display, encoded: bool) -> &mut Self {
        self.push_query(name.to_string(), None, encoded)
    }

    fn push_query(&mut self, name: String, value: Option<String>, encoded: bool) -> &mut Self {
        self.query.push(Pair { name, value, encoded });
        self
    }

    /// Sets the body from any serialisable value; see [`Body::from_value`].
    pub fn set_body<B: Serialize + 'static>(&mut self, value: &B) -> Result<&mut Self> {
        self.body = Some(Body::from_value(value)?);
        Ok(self)
    }

    pub fn raw_body(&mut self, body: Body) -> &mut Self {
        self.body = Some(body);
        self
    }

    /// Appends a form field for `application/x-www-form-urlencoded` bodies.
    pub fn field(&mut self, name: impl Into<String>, value: impl fmt::Display, encoded: bool) -> &mut Self {
        self.fields.push(Pair {
            name: name.into(),
            value: Some(value.to_string()),
            encoded,
        });
        self
    }

    /// Appends a part for `multipart/form-data` bodies.
    pub fn part(&mut self, part: Part) -> &mut Self {
        self.parts.push(part);
        self
    }

    pub fn method_ref(&self) -> Option<&HttpMethod> {
        self.method.as_ref()
    }

    pub fn url_ref(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Resolves the URL against `base_url` and encodes the body.
    ///
    /// Absolute URLs are used unchanged; relative URLs are joined onto the
    /// base. Parts take precedence over form fields, which take precedence
    /// over an explicit body.
    pub fn build(self, base_url: &str) -> Result<HttpRequest> {
        let mut url = resolve_url(base_url, &self.url)?;

        if !self.query.is_empty() {
            let mut query: Vec<String> = url
                .query()
                .filter(|q| !q.is_empty())
                .map(|q| vec![q.to_string()])
                .unwrap_or_default();
            query.extend(self.query.iter().map(Pair::render));
            url.set_query(Some(&query.join("&")));
        }

        let method = self.method.ok_or_else(|| RestfitError::MissingMethod {
            url: url.to_string(),
        })?;

        let body = if !self.parts.is_empty() {
            Some(encode_multipart(&self.parts))
        } else if !self.fields.is_empty() {
            let form: Vec<String> = self.fields.iter().map(Pair::render).collect();
            Some(Body::new(form.join("&"), Some(FORM_URL_ENCODED.to_string())))
        } else {
            self.body
        };

        let mut headers = self.headers;
        if let Some(content_type) = body.as_ref().and_then(Body::content_type) {
            if !headers.iter().any(|(name, _)| name.eq_ignore_ascii_case("content-type")) {
                headers.push(("Content-Type".to_string(), content_type.to_string()));
            }
        }

        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
        })
    }
}

fn resolve_url(base_url: &str, url: &str) -> Result<Url> {
    let invalid = |source| RestfitError::InvalidUrl {
        url: url.to_string(),
        source,
    };
    match Url::parse(url) {
        Ok(absolute) => Ok(absolute),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = Url::parse(base_url).map_err(invalid)?;
            base.join(url).map_err(invalid)
        }
        Err(e) => Err(invalid(e)),
    }
}

fn encode_multipart(parts: &[Part]) -> Body {
    let boundary = format!("restfit-{}", Uuid::new_v4().simple());
    let mut out: Vec<u8> = Vec::new();
    for part in parts {
        out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        let mut disposition = format!(
            "Content-Disposition: form-data; name=\"{}\"",
            escape_header_value(&part.name)
        );
        if let Some(filename) = &part.filename {
            disposition.push_str(&format!("; filename=\"{}\"", escape_header_value(filename)));
        }
        out.extend_from_slice(disposition.as_bytes());
        out.extend_from_slice(b"\r\n");
        if let Some(content_type) = part.body.content_type() {
            let content_type = escape_header_value(content_type);
            out.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(part.body.bytes());
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    Body::new(out, Some(format!("multipart/form-data; boundary={boundary}")))
}

/// Percent-encodes `"`, CR and LF the way browsers do in part headers.
fn escape_header_value(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

// ---------------------------------------------------------------------------
// HttpRequest
// ---------------------------------------------------------------------------

/// A fully resolved request, ready for an [`crate::HttpTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    method: HttpMethod,
    url: Url,
    headers: Vec<(String, String)>,
    body: Option<Body>,
}

impl HttpRequest {
    pub fn method(&self) -> &HttpMethod {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Returns every value of the header `name`, compared case-insensitively.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect()
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    pub fn into_body(self) -> Option<Body> {
        self.body
    }
}

// ---------------------------------------------------------------------------
// RequestData
// ---------------------------------------------------------------------------

/// Closure that applies a generated function's annotations and arguments.
pub type RequestBuilderFn = Box<dyn FnOnce(&mut HttpRequestBuilder) -> Result<()> + Send>;

/// Everything the dispatcher needs to perform one call.
///
/// Created by generated code once per invocation and consumed by
/// [`crate::Client`].
pub struct RequestData {
    relative_url: String,
    http_method: HttpMethod,
    return_type: TypeData,
    builder: RequestBuilderFn,
}

impl RequestData {
    pub fn new<F>(
        relative_url: impl Into<String>,
        http_method: HttpMethod,
        return_type: TypeData,
        builder: F,
    ) -> Self
    where
        F: FnOnce(&mut HttpRequestBuilder) -> Result<()> + Send + 'static,
    {
        Self {
            relative_url: relative_url.into(),
            http_method,
            return_type,
            builder: Box::new(builder),
        }
    }

    pub fn relative_url(&self) -> &str {
        &self.relative_url
    }

    pub fn http_method(&self) -> &HttpMethod {
        &self.http_method
    }

    pub fn return_type(&self) -> &TypeData {
        &self.return_type
    }

    pub(crate) fn with_return_type(mut self, return_type: TypeData) -> Self {
        self.return_type = return_type;
        self
    }

    /// Runs the builder closure and resolves the request.
    ///
    /// The declared method is applied after the closure so that a body set by
    /// the closure precedes it, and only when the closure did not choose one.
    pub(crate) fn into_request(self, base_url: &str) -> Result<HttpRequest> {
        let mut builder = HttpRequestBuilder::new();
        builder.url(self.relative_url);
        (self.builder)(&mut builder)?;
        if builder.method.is_none() {
            builder.method(self.http_method);
        }
        builder.build(base_url)
    }
}

impl fmt::Debug for RequestData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestData")
            .field("relative_url", &self.relative_url)
            .field("http_method", &self.http_method)
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    const BASE: &str = "https://api.example.com/v1/";

    fn builder(url: &str) -> HttpRequestBuilder {
        let mut builder = HttpRequestBuilder::new();
        builder.method(HttpMethod::get()).url(url);
        builder
    }

    #[test]
    fn relative_url_is_joined_onto_base() {
        let request = builder("users/42").build(BASE).unwrap();
        assert_eq!(request.url().as_str(), "https://api.example.com/v1/users/42");
    }

    #[test]
    fn absolute_url_replaces_base() {
        let request = builder("https://other.example.org/x").build(BASE).unwrap();
        assert_eq!(request.url().as_str(), "https://other.example.org/x");
    }

    #[test]
    fn query_parameters_are_encoded_and_appended() {
        let mut b = builder("search?sort=asc");
        b.query("q", "a b&c").query_name("flag", false).encoded_query("raw", "x%20y");
        let request = b.build(BASE).unwrap();
        assert_eq!(request.url().query(), Some("sort=asc&q=a%20b%26c&flag&raw=x%20y"));
    }

    #[test]
    fn missing_method_is_an_error() {
        let mut b = HttpRequestBuilder::new();
        b.url("users");
        assert!(matches!(b.build(BASE), Err(RestfitError::MissingMethod { .. })));
    }

    #[test]
    fn string_body_is_sent_as_text() {
        let mut b = builder("notes");
        b.set_body(&"hello".to_string()).unwrap();
        let request = b.build(BASE).unwrap();
        assert_eq!(request.body().unwrap().bytes().as_ref(), b"hello");
        assert_eq!(request.header_values("content-type"), vec![TEXT_PLAIN]);
    }

    #[test]
    fn structured_body_is_sent_as_json() {
        #[derive(Serialize)]
        struct Note {
            title: String,
        }
        let mut b = builder("notes");
        b.set_body(&Note { title: "t".into() }).unwrap();
        let request = b.build(BASE).unwrap();
        assert_eq!(request.body().unwrap().bytes().as_ref(), br#"{"title":"t"}"#);
        assert_eq!(request.header_values("Content-Type"), vec![JSON]);
    }

    #[test]
    fn explicit_content_type_header_wins() {
        let mut b = builder("notes");
        b.header("Content-Type", "application/vnd.custom+json");
        b.set_body(&vec![1_u8, 2, 3]).unwrap();
        let request = b.build(BASE).unwrap();
        assert_eq!(request.header_values("content-type"), vec!["application/vnd.custom+json"]);
    }

    #[test]
    fn form_fields_become_urlencoded_body() {
        let mut b = builder("login");
        b.field("user", "jo doe", false).field("token", "a%2Fb", true);
        let request = b.build(BASE).unwrap();
        assert_eq!(request.body().unwrap().bytes().as_ref(), b"user=jo%20doe&token=a%2Fb");
        assert_eq!(request.header_values("content-type"), vec![FORM_URL_ENCODED]);
    }

    #[test]
    fn multipart_body_contains_every_part() {
        let mut b = builder("upload");
        b.part(Part::new("meta", Body::from_value(&"info".to_string()).unwrap()));
        b.part(
            Part::new("file", Body::new(vec![0_u8, 1], None))
                .with_filename("a.bin")
                .with_content_type("application/octet-stream"),
        );
        let request = b.build(BASE).unwrap();
        let content_type = request.header_values("content-type")[0].to_string();
        assert!(content_type.starts_with("multipart/form-data; boundary=restfit-"));
        let text = String::from_utf8_lossy(request.body().unwrap().bytes()).to_string();
        assert!(text.contains("name=\"meta\""));
        assert!(text.contains("name=\"file\"; filename=\"a.bin\""));
        assert!(text.trim_end().ends_with("--"));
    }

    #[test]
    fn part_headers_cannot_be_broken_out_of() {
        let mut b = builder("upload");
        b.part(
            Part::new("a\"b", Body::new(vec![1_u8], None))
                .with_filename("evil.txt\"\r\nX-Injected: 1")
                .with_content_type("text/plain\r\nX-Other: 2"),
        );
        let request = b.build(BASE).unwrap();
        let text = String::from_utf8_lossy(request.body().unwrap().bytes()).to_string();
        assert!(text.contains(
            "Content-Disposition: form-data; name=\"a%22b\"; filename=\"evil.txt%22%0D%0AX-Injected: 1\"\r\n"
        ));
        assert!(text.contains("Content-Type: text/plain%0D%0AX-Other: 2\r\n"));
        assert!(!text.contains("\r\nX-Injected"));
        assert!(!text.contains("\r\nX-Other"));
    }

    #[test]
    fn declared_method_applies_when_closure_sets_none() {
        let data = RequestData::new(
            "things",
            HttpMethod::parse("GET2"),
            TypeData::new::<()>("()", false, vec![]),
            |b: &mut HttpRequestBuilder| {
                b.set_body(&"payload".to_string())?;
                Ok(())
            },
        );
        let request = data.into_request(BASE).unwrap();
        assert_eq!(request.method().as_str(), "GET2");
        assert!(request.body().is_some());
    }

    #[test]
    fn closure_may_override_method_and_url() {
        let data = RequestData::new(
            "things",
            HttpMethod::get(),
            TypeData::new::<()>("()", false, vec![]),
            |b: &mut HttpRequestBuilder| {
                b.method(HttpMethod::post()).url("other");
                Ok(())
            },
        );
        let request = data.into_request(BASE).unwrap();
        assert_eq!(request.method(), &HttpMethod::post());
        assert_eq!(request.url().path(), "/v1/other");
    }
}
