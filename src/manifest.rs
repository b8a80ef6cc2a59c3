//! Route manifests: JSON descriptions of routes and named schemas.
//!
//! ```json
//! {
//!   "info": { "title": "Pets", "version": "1.0.0", "default_auth": "user" },
//!   "schemas": {
//!     "pet": { "input": { "name": { "type": "string" } }, "output": { ... } }
//!   },
//!   "routes": [
//!     {
//!       "owner": "pets",
//!       "name": "search",
//!       "routes": [[["/pets", "/animals"], "GET"]],
//!       "input": { "kind": "schema", "schema": "pet" },
//!       "output": { "kind": "binary", "media_types": ["image/png"] },
//!       "auth": "api_key",
//!       "cors": "*"
//!     }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use http::Method;
use serde::Deserialize;
use serde_json::Value;

use crate::binary::RawPayload;
use crate::error::{DocumentationError, LoadError};
use crate::openapi::{DocumentationBuilder, DocumentationOptions};
use crate::provider::StaticSchemaProvider;
use crate::registry::{RegisteredRoute, RouteRegistry};
use crate::route::{RouteDescriptor, RouteOptions, RouteSpec, SharedTransformer};
use crate::rules::Rules;
use crate::types::Direction;
use crate::validating::SchemaValidating;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

/// Input and output rules registered under one schema name.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NamedSchema {
    #[serde(default)]
    pub input: Option<Rules>,
    #[serde(default)]
    pub output: Option<Rules>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum SchemaRef {
    Named(String),
    Inline(Rules),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum TransformerEntry {
    Schema {
        schema: SchemaRef,
        #[serde(default)]
        list: bool,
    },
    Binary {
        #[serde(default)]
        media_types: Option<OneOrMany<String>>,
        #[serde(default)]
        required: bool,
    },
}

impl TransformerEntry {
    fn into_transformer(self) -> SharedTransformer {
        match self {
            TransformerEntry::Schema { schema, list } => {
                let transformer = match schema {
                    SchemaRef::Named(name) => SchemaValidating::new(name),
                    SchemaRef::Inline(rules) => SchemaValidating::new(rules),
                };
                Arc::new(transformer.list(list)) as SharedTransformer
            }
            TransformerEntry::Binary {
                media_types,
                required,
            } => {
                let media_types = media_types.map(OneOrMany::into_vec).unwrap_or_default();
                Arc::new(RawPayload::new(media_types, required)) as SharedTransformer
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RouteEntry {
    owner: String,
    name: String,
    routes: Vec<(OneOrMany<String>, OneOrMany<String>)>,
    #[serde(default)]
    input: Option<TransformerEntry>,
    #[serde(default)]
    output: Option<TransformerEntry>,
    #[serde(flatten)]
    options: RouteOptions,
}

/// Parsed manifest document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub info: DocumentationOptions,
    #[serde(default)]
    pub schemas: BTreeMap<String, NamedSchema>,
    #[serde(default)]
    routes: Vec<RouteEntry>,
}

/// Manifest turned into runtime objects.
#[derive(Debug, Clone)]
pub struct LoadedManifest {
    pub options: DocumentationOptions,
    pub schemas: StaticSchemaProvider,
    pub registry: RouteRegistry,
}

impl Manifest {
    /// Parse a manifest from a JSON value.
    pub fn from_value(value: Value) -> Result<Self, LoadError> {
        serde_json::from_value(value).map_err(|e| LoadError::InvalidManifest {
            message: e.to_string(),
        })
    }

    /// Number of route entries.
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Build the schema provider and route registry.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::InvalidManifest` for unknown HTTP verbs and
    /// `LoadError::Registry` for conflicting routes.
    pub fn load(self) -> Result<LoadedManifest, LoadError> {
        let mut schemas = StaticSchemaProvider::new();
        for (name, schema) in self.schemas {
            if let Some(input) = schema.input {
                schemas.insert(name.clone(), Direction::Input, input);
            }
            if let Some(output) = schema.output {
                schemas.insert(name, Direction::Output, output);
            }
        }

        let mut registry = RouteRegistry::new();
        for entry in self.routes {
            let specs = entry
                .routes
                .into_iter()
                .map(|(paths, verbs)| {
                    let verbs = verbs
                        .into_vec()
                        .iter()
                        .map(|verb| parse_verb(verb))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(RouteSpec::new(paths.into_vec(), verbs))
                })
                .collect::<Result<Vec<_>, LoadError>>()?;

            let descriptor = RouteDescriptor::new(
                specs,
                entry.input.map(TransformerEntry::into_transformer),
                entry.output.map(TransformerEntry::into_transformer),
                entry.options,
            );
            registry.register(entry.owner, entry.name, Arc::new(descriptor))?;
        }

        Ok(LoadedManifest {
            options: self.info,
            schemas,
            registry,
        })
    }
}

fn parse_verb(verb: &str) -> Result<Method, LoadError> {
    Method::from_bytes(verb.trim().to_ascii_uppercase().as_bytes()).map_err(|_| {
        LoadError::InvalidManifest {
            message: format!("invalid HTTP verb \"{verb}\""),
        }
    })
}

impl LoadedManifest {
    /// Build the OpenAPI document for every route in the manifest.
    pub fn openapi(&self) -> Result<Value, DocumentationError> {
        DocumentationBuilder::new(self.options.clone(), self.registry.entries())
            .build(&self.schemas)
    }

    /// Find a route by `owner.name`.
    pub fn route(&self, qualified_name: &str) -> Option<&RegisteredRoute> {
        let (owner, name) = qualified_name.rsplit_once('.')?;
        self.registry.handler(owner, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AuthMode;
    use serde_json::json;

    fn manifest() -> Value {
        json!({
            "info": { "title": "Pets", "default_auth": "user" },
            "schemas": {
                "pet": {
                    "input": { "name": { "type": "string", "required": true } },
                    "output": { "id": { "type": "integer", "required": true } }
                }
            },
            "routes": [
                {
                    "owner": "pets",
                    "name": "search",
                    "routes": [[["/pets", "/animals"], "get"]],
                    "input": { "kind": "schema", "schema": { "q": { "type": "string" } } },
                    "output": { "kind": "schema", "schema": "pet" },
                    "auth": "api_key",
                    "cors": "*",
                    "website": true
                },
                {
                    "owner": "pets",
                    "name": "photo",
                    "routes": [["/pets/<int:id>/photo", ["GET"]]],
                    "output": { "kind": "binary", "media_types": "image/png", "required": true }
                }
            ]
        })
    }

    #[test]
    fn loads_routes_and_schemas() {
        let loaded = Manifest::from_value(manifest()).unwrap().load().unwrap();
        assert_eq!(loaded.registry.len(), 2);
        assert_eq!(loaded.schemas.len(), 2);
        assert_eq!(loaded.options.title, "Pets");
        assert_eq!(loaded.options.version, "1.0.0");

        let search = loaded.route("pets.search").unwrap();
        assert_eq!(search.descriptor.routes().len(), 4);
        assert_eq!(search.descriptor.auth(), Some(&AuthMode::ApiKey));
        assert_eq!(search.descriptor.options().extra["website"], json!(true));
        assert!(loaded.route("pets.ghost").is_none());
    }

    #[test]
    fn openapi_from_manifest() {
        let loaded = Manifest::from_value(manifest()).unwrap().load().unwrap();
        let doc = loaded.openapi().unwrap();
        assert_eq!(
            doc["paths"]["/animals"]["get"]["security"],
            json!([{ "api_key": [] }])
        );
        assert!(doc["paths"]["/pets/{id}/photo"]["get"].get("security").is_none());
    }

    #[test]
    fn unknown_verbs_are_rejected() {
        let manifest = json!({
            "routes": [{ "owner": "a", "name": "b", "routes": [["/x", "GE T"]] }]
        });
        let err = Manifest::from_value(manifest).unwrap().load().unwrap_err();
        assert!(matches!(err, LoadError::InvalidManifest { .. }));
    }

    #[test]
    fn conflicting_routes_are_rejected() {
        let manifest = json!({
            "routes": [
                { "owner": "a", "name": "b", "routes": [["/x", "GET"]] },
                { "owner": "a", "name": "c", "routes": [["/x", "GET"]] }
            ]
        });
        let err = Manifest::from_value(manifest).unwrap().load().unwrap_err();
        assert!(matches!(err, LoadError::Registry(_)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn unknown_top_level_keys_are_rejected() {
        let err = Manifest::from_value(json!({ "paths": {} })).unwrap_err();
        assert!(matches!(err, LoadError::InvalidManifest { .. }));
    }
}
