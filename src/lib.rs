//! Declarative REST route binding.
//!
//! Handlers are bound to routes together with parameter transformers that
//! validate what comes in, validate what goes out, and describe both for
//! OpenAPI documentation. Documentation is generated from the same
//! descriptors used at request time.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use http::Method;
//! use restbind::{
//!     bind_route, AuthMode, DocumentationBuilder, DocumentationOptions, FieldRule, NoSchemas,
//!     Payload, RouteRegistry, Rules, SchemaValidating,
//! };
//! use serde_json::{json, Value};
//!
//! let search = bind_route([("/pets", Method::GET)])
//!     .input(SchemaValidating::new(
//!         Rules::new()
//!             .field("name", FieldRule::string().required())
//!             .field("tags", FieldRule::list(FieldRule::string())),
//!     ))
//!     .output(SchemaValidating::new(
//!         Rules::new().field("count", FieldRule::integer().required()),
//!     ))
//!     .auth(AuthMode::ApiKey)
//!     .bind(|_ctx: &NoSchemas, params: Value| {
//!         Ok::<_, String>(Payload::Json(json!({ "count": params["tags"].as_array().map_or(0, Vec::len) })))
//!     });
//!
//! // Request time: validate, call, validate.
//! let out = search
//!     .invoke(&NoSchemas, json!({ "name": "rex", "tags": ["a", "b"], "junk": 1 }))
//!     .unwrap();
//! assert_eq!(out.into_json().unwrap(), json!({ "count": 2 }));
//!
//! // Documentation time: same descriptors.
//! let mut registry = RouteRegistry::new();
//! registry.register("pets", "search", Arc::clone(search.descriptor())).unwrap();
//! let doc = DocumentationBuilder::new(DocumentationOptions::default(), registry.entries())
//!     .build(&NoSchemas)
//!     .unwrap();
//! assert_eq!(doc["paths"]["/pets"]["get"]["parameters"][1]["name"], "tags[]");
//! assert_eq!(doc["paths"]["/pets"]["get"]["security"], json!([{ "api_key": [] }]));
//! ```
//!
//! # Error kinds
//!
//! | Error | Fault | Status |
//! |-------|-------|--------|
//! | [`ValidationError`] | client sent bad parameters | 400 |
//! | [`InternalContractError`] | handler broke its output schema | 500 |
//! | [`SchemaResolutionError`] | named schema unknown | 500 |

mod binary;
mod convert;
mod error;
mod loader;
mod manifest;
mod openapi;
mod provider;
mod registry;
mod route;
mod rules;
mod security;
mod transform;
mod types;
mod validating;
mod validator;

pub use binary::{RawPayload, ANY_MEDIA_TYPE};
pub use convert::{field_to_json_schema, to_json_schema};
pub use error::{
    DocumentationError, FieldError, InternalContractError, LoadError, RegistryError,
    SchemaResolutionError, TransformError, ValidateError, ValidationError,
};
pub use loader::{is_url, load_json, load_json_auto, load_json_str, DocumentSource};
pub use manifest::{LoadedManifest, Manifest, NamedSchema};
pub use openapi::{openapi_path, DocumentationBuilder, DocumentationOptions, DocumentationPlugin};
pub use provider::{NoSchemas, ResolvedSchema, SchemaProvider, StaticSchemaProvider};
pub use registry::{RegisteredRoute, RouteRegistry};
pub use route::{
    bind_route, BoundMethod, InvokeError, PathList, RouteDecorator, RouteDescriptor, RouteOptions,
    RouteSpec, SharedTransformer, VerbList,
};
pub use rules::{FieldRule, FieldType, Rules};
pub use security::ApiKeySecurityPlugin;
pub use transform::{
    BodySpec, ParamTransformer, ParameterLocation, ParameterSpec, Passthrough, Payload, Responses,
};
pub use types::{json_type_name, AuthMode, Direction, API_KEY_HEADER, API_KEY_SCHEME};
pub use validating::{query_parameters_from_schema, SchemaSource, SchemaValidating};
pub use validator::Validator;

#[cfg(feature = "remote")]
pub use loader::load_json_url;
