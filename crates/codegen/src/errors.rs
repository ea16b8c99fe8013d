//! Generation diagnostics and build errors.
//!
//! Extraction never produces partial output: a declaration either yields a
//! [`crate::ClassData`] or a [`Diagnostics`] list with one [`GenerationError`]
//! per violated rule. Message texts live in [`messages`] so callers and tests
//! can match on them.

use std::fmt;
use std::path::PathBuf;

use proc_macro2::Span;
use thiserror::Error;

/// Diagnostic message texts.
///
/// Constants ending in a preposition or `Found:` are prefixes completed with
/// the offending name.
pub mod messages {
    pub const FOREIGN_INTERFACES_ARE_NOT_SUPPORTED: &str = "Foreign interfaces are not supported";
    pub const API_DECLARATIONS_MUST_BE_INTERFACES: &str = "API declarations must be interfaces.";
    pub const TYPE_PARAMETERS_ARE_UNSUPPORTED_ON: &str = "Type parameters are unsupported on";
    pub const INTERFACE_NEEDS_TO_HAVE_A_PACKAGE: &str = "Interface needs to have a package";
    pub const ASSOCIATED_TYPES_ARE_UNSUPPORTED_ON: &str = "Associated types are unsupported on";

    pub const NO_HTTP_ANNOTATION_AT: &str = "No Http annotation at";
    pub const ONLY_ONE_HTTP_METHOD_IS_ALLOWED: &str = "Only one HTTP method is allowed. Found:";
    pub const FUNCTIONS_MUST_TAKE_REF_SELF: &str = "Functions must take &self";
    pub const ANNOTATED_FUNCTIONS_MUST_NOT_HAVE_A_DEFAULT_BODY: &str =
        "Annotated functions must not have a default body";
    pub const RETURN_TYPE_MUST_BE_RESULT_OR_OPTION: &str = "Return type must be Result<T, E> or Option<T>";
    pub const ONLY_ONE_ENCODING_ANNOTATION_IS_ALLOWED: &str = "Only one encoding annotation is allowed.";
    pub const FORM_URL_ENCODED_CAN_ONLY_BE_SPECIFIED_ON_HTTP_METHODS_WITH_REQUEST_BODY: &str =
        "FormUrlEncoded can only be specified on HTTP methods with request body (e.g., @POST)";
    pub const MULTIPART_CAN_ONLY_BE_SPECIFIED_ON_HTTP_METHODS_WITH_REQUEST_BODY: &str =
        "Multipart can only be specified on HTTP methods with request body (e.g., @POST)";
    pub const FORM_ENCODED_METHOD_MUST_CONTAIN_AT_LEAST_ONE_FIELD_OR_FIELD_MAP: &str =
        "Form-encoded method must contain at least one @Field or @FieldMap.";
    pub const HEADERS_VALUE_MUST_BE_IN_FORM: &str = "@Headers value must be in the form \"Name: Value\". Found:";

    pub const MULTIPLE_URL_METHOD_ANNOTATIONS_FOUND: &str = "Multiple @Url method annotations found";
    pub const URL_CAN_ONLY_BE_USED_WITH_EMPTY: &str = "@Url can only be used with empty";
    pub const MISSING_EITHER_URL_OR_URL_PARAMETER: &str = "Missing either";
    pub const PATH_CAN_ONLY_BE_USED_WITH_RELATIVE_URL_ON: &str = "@Path can only be used with relative url on";

    pub const NO_RESTFIT_ANNOTATION_FOUND_AT_PARAMETER: &str = "No Restfit annotation found at parameter";
    pub const ONLY_ONE_ROLE_ANNOTATION_IS_ALLOWED_ON_PARAMETER: &str =
        "Only one role annotation is allowed on parameter";
    pub const REFERENCE_PARAMETERS_ARE_NOT_SUPPORTED: &str =
        "Reference parameters are not supported; use owned types";
    pub const PARAMETERS_MUST_BE_PLAIN_IDENTIFIERS: &str = "Parameters must be plain identifiers";
    pub const IN_RELATIVE_URL_PATH: &str = "in relative url path";
    pub const PATH_PARAMETER_TYPE_MAY_NOT_BE_NULLABLE: &str = "Path parameter type may not be nullable";
    pub const URL_PARAMETER_TYPE_MAY_NOT_BE_NULLABLE: &str = "Url parameter type may not be nullable";
    pub const NON_BODY_HTTP_METHOD_CANNOT_CONTAIN_BODY: &str = "Non-body HTTP method cannot contain @Body";
    pub const BODY_PARAMETERS_CANNOT_BE_USED_WITH_FORM_OR_MULTI_PART_ENCODING: &str =
        "@Body parameters cannot be used with form or multi-part encoding.";
    pub const FIELD_PARAMETERS_CAN_ONLY_BE_USED_WITH_FORM_ENCODING: &str =
        "@Field parameters can only be used with form encoding.";
    pub const PART_PARAMETERS_CAN_ONLY_BE_USED_WITH_MULTIPART_ENCODING: &str =
        "@Part parameters can only be used with multipart encoding.";
    pub const ONLY_ONE_REQUEST_BUILDER_IS_ALLOWED: &str = "Only one RequestBuilder is allowed. Found:";
    pub const REQ_BUILDER_PARAMETER_TYPE_NEEDS_TO_BE: &str =
        "@ReqBuilder parameter type needs to be: Box<dyn FnOnce(&mut HttpRequestBuilder) + Send>";
    pub const QUERY_MAP_PARAMETER_TYPE_MUST_BE_MAP: &str = "@QueryMap parameter type must be Map.";
    pub const HEADER_MAP_PARAMETER_TYPE_MUST_BE_MAP: &str = "@HeaderMap parameter type must be Map.";
    pub const FIELD_MAP_PARAMETER_TYPE_MUST_BE_MAP: &str = "@FieldMap parameter type must be Map.";

    pub const NAME_NEEDS_A_NAMED_IMPORT: &str =
        "Cannot resolve a name brought in by a glob import; import it by name. Found:";

    pub const PARENT_INTERFACE: &str = "Parent interface";
    pub const IS_NOT_A_RESTFIT_SERVICE: &str = "is not a restfit service";

    pub const PROPERTIES_NOT_SUPPORTED: &str = "Properties not supported by restfit";
}

// ---------------------------------------------------------------------------
// GenerationError / Diagnostics
// ---------------------------------------------------------------------------

/// Source position of a diagnostic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn of(span: Span) -> Self {
        let start = span.start();
        Self {
            line: start.line,
            column: start.column + 1,
        }
    }
}

/// One violated rule in an API declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationError {
    pub message: String,
    pub file: Option<PathBuf>,
    pub location: Location,
}

impl GenerationError {
    pub fn new(message: impl Into<String>, location: Location) -> Self {
        Self {
            message: message.into(),
            file: None,
            location,
        }
    }

    pub fn in_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(
                f,
                "{}:{}:{}: {}",
                file.display(),
                self.location.line,
                self.location.column,
                self.message
            ),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for GenerationError {}

/// All errors found in one or more declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    errors: Vec<GenerationError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: GenerationError) {
        self.errors.push(error);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GenerationError> {
        self.errors.iter()
    }

    /// Returns `true` when any message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.errors.iter().any(|e| e.message.contains(needle))
    }

    /// Attributes every error to `file`.
    pub fn in_file(self, file: &std::path::Path) -> Self {
        Self {
            errors: self
                .errors
                .into_iter()
                .map(|e| e.in_file(file))
                .collect(),
        }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, error) in self.errors.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}

impl From<GenerationError> for Diagnostics {
    fn from(error: GenerationError) -> Self {
        Self { errors: vec![error] }
    }
}

impl IntoIterator for Diagnostics {
    type Item = GenerationError;
    type IntoIter = std::vec::IntoIter<GenerationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

// ---------------------------------------------------------------------------
// BuildError
// ---------------------------------------------------------------------------

/// Failure of a scan, check or generate run.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk source directory {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to parse {}:{}:{}: {message}", .path.display(), .location.line, .location.column)]
    Parse {
        path: PathBuf,
        location: Location,
        message: String,
    },

    #[error("Invalid configuration {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("restfit generation failed:\n{0}")]
    Diagnostics(#[from] Diagnostics),
}
