//! Error types for parameter transformation, route registration and loading.

use std::collections::BTreeMap;
use std::path::PathBuf;

use http::Method;
use thiserror::Error;

use crate::types::Direction;

/// Single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FieldError {
    /// JSON Pointer (RFC 6901) to the offending field.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "{}: {}", path, self.message)
    }
}

/// Groups field errors by path, keeping every message.
fn group_by_field(errors: &[FieldError]) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for error in errors {
        grouped
            .entry(error.path.clone())
            .or_default()
            .push(error.message.clone());
    }
    grouped
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Client-supplied parameters failed the input schema.
#[derive(Debug, Clone, Error)]
#[error("bad request: {}", summarize(.errors))]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    /// Errors grouped by field path.
    pub fn fields(&self) -> BTreeMap<String, Vec<String>> {
        group_by_field(&self.errors)
    }
}

/// A handler returned a value that does not satisfy its declared output schema.
#[derive(Debug, Clone, Error)]
#[error("invalid response: {}", summarize(.errors))]
pub struct InternalContractError {
    pub errors: Vec<FieldError>,
}

impl InternalContractError {
    /// Errors grouped by field path.
    pub fn fields(&self) -> BTreeMap<String, Vec<String>> {
        group_by_field(&self.errors)
    }
}

/// Failure of [`Validator::validate`](crate::Validator::validate).
#[derive(Debug, Clone, Error)]
pub enum ValidateError {
    /// The rules convert to a schema the validator cannot compile.
    #[error("schema cannot be compiled: {message}")]
    InvalidSchema { message: String },

    #[error("validation failed with {} error(s)", errors.len())]
    Invalid { errors: Vec<FieldError> },
}

/// A schema source could not be turned into a usable validator.
#[derive(Debug, Clone, Error)]
pub enum SchemaResolutionError {
    #[error("no {direction} schema named \"{name}\"")]
    UnknownSchema { name: String, direction: Direction },

    #[error("schema \"{name}\" cannot be compiled: {message}")]
    InvalidSchema { name: String, message: String },
}

/// Errors raised by parameter transformers.
///
/// Transformers never swallow these; the host maps them to transport
/// status codes via [`TransformError::status_code`].
#[derive(Debug, Error)]
pub enum TransformError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    InternalContract(#[from] InternalContractError),

    #[error(transparent)]
    SchemaResolution(#[from] SchemaResolutionError),

    #[error("list mode is not supported by schema-validating transformers")]
    ListModeUnsupported,

    #[error("{transformer} cannot handle a {actual} payload")]
    UnsupportedPayload {
        transformer: &'static str,
        actual: &'static str,
    },

    #[error("media type \"{media_type}\" is not a valid header value")]
    InvalidMediaType { media_type: String },
}

impl TransformError {
    /// True when the client can fix the request to make it succeed.
    pub fn is_client_error(&self) -> bool {
        matches!(self, TransformError::Validation(_))
    }

    /// Returns the HTTP status code the host should answer with.
    pub fn status_code(&self) -> u16 {
        if self.is_client_error() {
            400
        } else {
            500
        }
    }
}

/// Errors while building an OpenAPI document.
#[derive(Debug, Error)]
pub enum DocumentationError {
    /// A transformer failed while its operation was being documented.
    #[error("cannot document {operation}: {source}")]
    Transform {
        operation: String,
        #[source]
        source: TransformError,
    },

    /// A documentation fragment could not be rendered as JSON.
    #[error("cannot render {operation}: {source}")]
    Serialize {
        operation: String,
        #[source]
        source: serde_json::Error,
    },

    /// Two operations claim the same documented path and verb.
    #[error("{verb} {path} is documented by both {first} and {second}")]
    DuplicateOperation {
        path: String,
        verb: String,
        first: String,
        second: String,
    },
}

impl DocumentationError {
    /// Operation that could not be documented.
    pub fn operation(&self) -> &str {
        match self {
            DocumentationError::Transform { operation, .. }
            | DocumentationError::Serialize { operation, .. } => operation,
            DocumentationError::DuplicateOperation { second, .. } => second,
        }
    }
}

/// Errors while populating a route registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{verb} {path} is already bound to {owner}.{existing}")]
    DuplicateRoute {
        owner: String,
        path: String,
        verb: Method,
        existing: String,
    },

    #[error("{owner}.{name} is already registered")]
    DuplicateHandler { owner: String, name: String },
}

/// Errors while loading manifests and schema documents.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid manifest: {message}")]
    InvalidManifest { message: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}
