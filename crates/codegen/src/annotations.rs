//! The restfit annotation vocabulary and its attribute parser.
//!
//! Attributes are recognised bare (`#[get("users")]`) or with the `restfit::`
//! prefix (`#[restfit::get("users")]`). Anything else is ignored.

use syn::punctuated::Punctuated;
use syn::{Attribute, Expr, ExprLit, Lit, Meta, Token};

/// Built-in verb shorthands and whether their requests carry a body.
const VERBS: [(&str, &str, bool); 7] = [
    ("get", "GET", false),
    ("post", "POST", true),
    ("put", "PUT", true),
    ("delete", "DELETE", false),
    ("patch", "PATCH", true),
    ("head", "HEAD", false),
    ("options", "OPTIONS", false),
];

/// Names accepted on trait functions.
pub const FUNCTION_ATTRIBUTES: [&str; 11] = [
    "get",
    "post",
    "put",
    "delete",
    "patch",
    "head",
    "options",
    "http",
    "headers",
    "form_url_encoded",
    "multipart",
];

/// Names accepted on function parameters.
pub const PARAMETER_ATTRIBUTES: [&str; 15] = [
    "path",
    "query",
    "query_name",
    "query_map",
    "header",
    "header_map",
    "req_builder",
    "body",
    "field",
    "field_map",
    "part",
    "url",
    "request_type",
    "tag",
    "streaming",
];

/// Marker placed on API traits.
pub const API_ATTRIBUTE: &str = "api";

// ---------------------------------------------------------------------------
// Function annotations
// ---------------------------------------------------------------------------

/// The HTTP method of a function, either a verb shorthand or `#[http(..)]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpMethodAnnotation {
    /// Verb token, kept verbatim for custom methods.
    pub method: String,
    pub path: String,
    pub has_body: bool,
    /// `true` for `#[http(..)]`.
    pub custom: bool,
}

impl HttpMethodAnnotation {
    /// Name used in diagnostics, e.g. `GET` or `HTTP`.
    pub fn label(&self) -> &str {
        if self.custom {
            "HTTP"
        } else {
            &self.method
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionAnnotation {
    Http(HttpMethodAnnotation),
    Headers(Vec<String>),
    FormUrlEncoded,
    Multipart,
}

// ---------------------------------------------------------------------------
// Parameter annotations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterAnnotation {
    Path { name: String, encoded: bool },
    Query { name: String, encoded: bool },
    QueryName { encoded: bool },
    QueryMap { encoded: bool },
    Header { name: String },
    HeaderMap,
    ReqBuilder,
    Body,
    Field { name: String, encoded: bool },
    FieldMap { encoded: bool },
    Part {
        name: String,
        content_type: Option<String>,
        filename: Option<String>,
    },
    Url,
    /// Modifier: convert the argument to this type before use.
    RequestType(syn::Type),
}

impl ParameterAnnotation {
    /// Whether this annotation assigns the parameter a role in the request.
    pub fn is_role(&self) -> bool {
        !matches!(self, Self::RequestType(_))
    }

    /// Name used in diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Path { .. } => "@Path",
            Self::Query { .. } => "@Query",
            Self::QueryName { .. } => "@QueryName",
            Self::QueryMap { .. } => "@QueryMap",
            Self::Header { .. } => "@Header",
            Self::HeaderMap => "@HeaderMap",
            Self::ReqBuilder => "@ReqBuilder",
            Self::Body => "@Body",
            Self::Field { .. } => "@Field",
            Self::FieldMap { .. } => "@FieldMap",
            Self::Part { .. } => "@Part",
            Self::Url => "@Url",
            Self::RequestType(_) => "@RequestType",
        }
    }
}

// ---------------------------------------------------------------------------
// Attribute classification
// ---------------------------------------------------------------------------

/// Returns the restfit name of `attr`, if it is bare or `restfit::`-prefixed.
pub fn attribute_name(attr: &Attribute) -> Option<String> {
    let path = attr.path();
    if path.leading_colon.is_some() && path.segments.len() == 1 {
        return None;
    }
    let segments: Vec<String> = path.segments.iter().map(|s| s.ident.to_string()).collect();
    match segments.as_slice() {
        [name] => Some(name.clone()),
        [krate, name] if krate == "restfit" => Some(name.clone()),
        _ => None,
    }
}

pub fn is_function_attribute(attr: &Attribute) -> bool {
    attribute_name(attr).is_some_and(|name| FUNCTION_ATTRIBUTES.contains(&name.as_str()))
}

pub fn is_parameter_attribute(attr: &Attribute) -> bool {
    attribute_name(attr).is_some_and(|name| PARAMETER_ATTRIBUTES.contains(&name.as_str()))
}

pub fn is_api_marker(attr: &Attribute) -> bool {
    attribute_name(attr).is_some_and(|name| name == API_ATTRIBUTE)
}

/// Returns `true` for attributes that declare an HTTP method.
pub fn is_http_method_attribute(attr: &Attribute) -> bool {
    attribute_name(attr)
        .is_some_and(|name| name == "http" || VERBS.iter().any(|(verb, _, _)| *verb == name))
}

/// Parses a function-level attribute. Non-restfit attributes yield `Ok(None)`.
pub fn parse_function_annotation(attr: &Attribute) -> syn::Result<Option<FunctionAnnotation>> {
    let Some(name) = attribute_name(attr) else {
        return Ok(None);
    };
    if let Some((_, method, has_body)) = VERBS.iter().find(|(verb, _, _)| *verb == name) {
        let args = Args::parse(attr)?;
        let path = args.string(0, "path")?.unwrap_or_default();
        return Ok(Some(FunctionAnnotation::Http(HttpMethodAnnotation {
            method: (*method).to_string(),
            path,
            has_body: *has_body,
            custom: false,
        })));
    }
    let annotation = match name.as_str() {
        "http" => {
            let args = Args::parse(attr)?;
            let method = args
                .string(0, "method")?
                .ok_or_else(|| syn::Error::new_spanned(attr, "#[http] requires a method"))?;
            FunctionAnnotation::Http(HttpMethodAnnotation {
                method,
                path: args.string(1, "path")?.unwrap_or_default(),
                has_body: args.bool(2, "has_body")?.unwrap_or(false),
                custom: true,
            })
        }
        "headers" => FunctionAnnotation::Headers(Args::parse(attr)?.strings()?),
        "form_url_encoded" => FunctionAnnotation::FormUrlEncoded,
        "multipart" => FunctionAnnotation::Multipart,
        _ => return Ok(None),
    };
    Ok(Some(annotation))
}

/// Parses a parameter-level attribute. Non-restfit attributes yield `Ok(None)`.
pub fn parse_parameter_annotation(attr: &Attribute) -> syn::Result<Option<ParameterAnnotation>> {
    let Some(name) = attribute_name(attr) else {
        return Ok(None);
    };
    if name == "request_type" {
        return Ok(Some(ParameterAnnotation::RequestType(attr.parse_args::<syn::Type>()?)));
    }
    if !PARAMETER_ATTRIBUTES.contains(&name.as_str()) {
        return Ok(None);
    }
    let args = Args::parse(attr)?;
    let encoded = args.flag("encoded")?;
    let required = |key: &str| -> syn::Result<String> {
        args.string(0, key)?
            .ok_or_else(|| syn::Error::new_spanned(attr, format!("#[{name}] requires a {key}")))
    };
    let annotation = match name.as_str() {
        "path" => ParameterAnnotation::Path {
            name: required("name")?,
            encoded,
        },
        "query" => ParameterAnnotation::Query {
            name: required("name")?,
            encoded,
        },
        "query_name" => ParameterAnnotation::QueryName { encoded },
        "query_map" => ParameterAnnotation::QueryMap { encoded },
        "header" => ParameterAnnotation::Header {
            name: required("name")?,
        },
        "header_map" => ParameterAnnotation::HeaderMap,
        "req_builder" => ParameterAnnotation::ReqBuilder,
        "body" => ParameterAnnotation::Body,
        "field" => ParameterAnnotation::Field {
            name: required("name")?,
            encoded,
        },
        "field_map" => ParameterAnnotation::FieldMap { encoded },
        "part" => ParameterAnnotation::Part {
            name: args.string(0, "name")?.unwrap_or_default(),
            content_type: args.named_string("content_type")?,
            filename: args.named_string("filename")?,
        },
        "url" => ParameterAnnotation::Url,
        // Reserved names without a runtime role yet; reported as unsupported.
        _ => {
            return Err(syn::Error::new_spanned(
                attr,
                format!("#[{name}] is not supported by restfit"),
            ))
        }
    };
    Ok(Some(annotation))
}

// ---------------------------------------------------------------------------
// Argument parsing
// ---------------------------------------------------------------------------

/// Positional and `key = value` arguments of one attribute.
struct Args {
    positional: Vec<Expr>,
    named: Vec<(String, Expr)>,
}

impl Args {
    fn parse(attr: &Attribute) -> syn::Result<Self> {
        let mut args = Self {
            positional: Vec::new(),
            named: Vec::new(),
        };
        if matches!(attr.meta, Meta::Path(_)) {
            return Ok(args);
        }
        let exprs = attr.parse_args_with(Punctuated::<Expr, Token![,]>::parse_terminated)?;
        for expr in exprs {
            match expr {
                Expr::Assign(assign) => match &*assign.left {
                    Expr::Path(path) if path.path.get_ident().is_some() => {
                        let key = path.path.segments[0].ident.to_string();
                        args.named.push((key, *assign.right));
                    }
                    other => return Err(syn::Error::new_spanned(other, "expected `name = value`")),
                },
                other => args.positional.push(other),
            }
        }
        Ok(args)
    }

    fn lookup(&self, index: usize, key: &str) -> Option<&Expr> {
        self.named
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, expr)| expr)
            .or_else(|| self.positional.get(index))
    }

    /// String at `index` or under `key`.
    fn string(&self, index: usize, key: &str) -> syn::Result<Option<String>> {
        self.lookup(index, key).map(expect_string).transpose()
    }

    fn named_string(&self, key: &str) -> syn::Result<Option<String>> {
        self.named
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, expr)| expect_string(expr))
            .transpose()
    }

    fn bool(&self, index: usize, key: &str) -> syn::Result<Option<bool>> {
        match self.lookup(index, key) {
            Some(Expr::Lit(ExprLit {
                lit: Lit::Bool(value), ..
            })) => Ok(Some(value.value)),
            Some(other) => Err(syn::Error::new_spanned(other, format!("`{key}` must be a bool"))),
            None => Ok(None),
        }
    }

    /// Every positional argument as a string.
    fn strings(&self) -> syn::Result<Vec<String>> {
        self.positional.iter().map(expect_string).collect()
    }

    /// `true` for a bare `key` argument or `key = true`.
    fn flag(&self, key: &str) -> syn::Result<bool> {
        let bare = self.positional.iter().any(|expr| match expr {
            Expr::Path(path) => path.path.is_ident(key),
            _ => false,
        });
        if bare {
            return Ok(true);
        }
        match self.named.iter().find(|(name, _)| name == key) {
            Some((_, Expr::Lit(ExprLit {
                lit: Lit::Bool(value), ..
            }))) => Ok(value.value),
            Some((_, other)) => Err(syn::Error::new_spanned(other, format!("`{key}` must be a bool"))),
            None => Ok(false),
        }
    }
}

fn expect_string(expr: &Expr) -> syn::Result<String> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Str(value), ..
        }) => Ok(value.value()),
        other => Err(syn::Error::new_spanned(other, "expected a string literal")),
    }
}
