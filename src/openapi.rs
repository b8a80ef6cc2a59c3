//! OpenAPI document assembly from registered routes.
//!
//! The document is rebuilt from the descriptors on every call; nothing is
//! cached between builds.

use http::Method;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::error::DocumentationError;
use crate::provider::SchemaProvider;
use crate::registry::RegisteredRoute;
use crate::route::RouteDescriptor;
use crate::security::ApiKeySecurityPlugin;
use crate::transform::{ParameterLocation, ParameterSpec, Responses};
use crate::types::AuthMode;

/// Document-wide settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DocumentationOptions {
    pub title: String,
    pub version: String,
    pub openapi_version: String,
    pub description: Option<String>,
    /// Auth mode assumed for routes that declare none.
    pub default_auth: Option<AuthMode>,
}

impl Default for DocumentationOptions {
    fn default() -> Self {
        Self {
            title: "API".to_string(),
            version: "1.0.0".to_string(),
            openapi_version: "3.0.0".to_string(),
            description: None,
            default_auth: None,
        }
    }
}

/// Hook into document assembly.
pub trait DocumentationPlugin: Send + Sync {
    /// Called once per build with the document's `components` object.
    fn init_spec(&self, _components: &mut Map<String, Value>) {}

    /// Called for the operations of one path.
    ///
    /// `routing` is `None` for operations added without routing metadata;
    /// plugins leave those to the default assembly.
    fn operation_helper(
        &self,
        _path: &str,
        _operations: &mut Map<String, Value>,
        _routing: Option<&RouteDescriptor>,
        _options: &DocumentationOptions,
    ) {
    }
}

/// Builds the OpenAPI document for a fixed set of routes.
pub struct DocumentationBuilder<'a> {
    options: DocumentationOptions,
    routes: &'a [RegisteredRoute],
    plugins: Vec<Box<dyn DocumentationPlugin>>,
    extra_operations: Vec<(String, Method, Value)>,
}

impl<'a> DocumentationBuilder<'a> {
    /// Builder with the API-key security plugin installed.
    pub fn new(options: DocumentationOptions, routes: &'a [RegisteredRoute]) -> Self {
        Self {
            options,
            routes,
            plugins: vec![Box::new(ApiKeySecurityPlugin)],
            extra_operations: Vec::new(),
        }
    }

    pub fn plugin(mut self, plugin: impl DocumentationPlugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    /// Add a hand-written operation that has no routing metadata.
    pub fn operation(mut self, path: impl Into<String>, verb: Method, operation: Value) -> Self {
        self.extra_operations.push((path.into(), verb, operation));
        self
    }

    /// Assemble the document.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentationError`] if a transformer cannot describe
    /// itself, e.g. because a named schema does not resolve, or if two
    /// routes (of different owners) document the same path and verb.
    pub fn build(&self, ctx: &dyn SchemaProvider) -> Result<Value, DocumentationError> {
        let mut components = Map::new();
        for plugin in &self.plugins {
            plugin.init_spec(&mut components);
        }

        let mut paths: Map<String, Value> = Map::new();
        let mut operation_count = 0;

        for entry in self.routes {
            let descriptor = &entry.descriptor;
            let multi_verb = descriptor.verbs().len() > 1;
            let multi_path = descriptor.paths().len() > 1;

            for (path_index, path) in descriptor.paths().into_iter().enumerate() {
                let (doc_path, path_params) = openapi_path(path);
                let mut operations = Map::new();

                for (_, verb) in descriptor.routes().iter().filter(|(p, _)| p == path) {
                    let mut operation_id = entry.qualified_name();
                    if multi_verb {
                        operation_id = format!("{}.{}", operation_id, verb.as_str().to_lowercase());
                    }
                    if multi_path {
                        operation_id = format!("{}.{}", operation_id, path_index + 1);
                    }

                    let operation =
                        self.operation_for(entry, verb, &path_params, &operation_id, ctx)?;
                    operations.insert(verb.as_str().to_lowercase(), operation);
                }

                for plugin in &self.plugins {
                    plugin.operation_helper(&doc_path, &mut operations, Some(descriptor), &self.options);
                }
                operation_count += operations.len();
                merge_operations(&mut paths, doc_path, operations)?;
            }
        }

        for (path, verb, operation) in &self.extra_operations {
            let mut operations = Map::new();
            operations.insert(verb.as_str().to_lowercase(), operation.clone());
            for plugin in &self.plugins {
                plugin.operation_helper(path, &mut operations, None, &self.options);
            }
            operation_count += operations.len();
            merge_operations(&mut paths, path.clone(), operations)?;
        }

        info!(
            paths = paths.len(),
            operations = operation_count,
            "built OpenAPI document"
        );

        let mut info = Map::new();
        info.insert("title".into(), Value::String(self.options.title.clone()));
        info.insert("version".into(), Value::String(self.options.version.clone()));
        if let Some(description) = &self.options.description {
            info.insert("description".into(), Value::String(description.clone()));
        }

        Ok(json!({
            "openapi": self.options.openapi_version,
            "info": info,
            "paths": paths,
            "components": components,
        }))
    }

    fn operation_for(
        &self,
        entry: &RegisteredRoute,
        verb: &Method,
        path_params: &[ParameterSpec],
        operation_id: &str,
        ctx: &dyn SchemaProvider,
    ) -> Result<Value, DocumentationError> {
        let transform = |source| DocumentationError::Transform {
            operation: operation_id.to_string(),
            source,
        };
        let serialize = |source| DocumentationError::Serialize {
            operation: operation_id.to_string(),
            source,
        };
        let descriptor = &entry.descriptor;
        let mut operation = Map::new();
        operation.insert("operationId".into(), Value::String(operation_id.to_string()));
        operation.insert("tags".into(), json!([entry.owner]));

        let mut parameters: Vec<ParameterSpec> = path_params.to_vec();
        if let Some(input) = descriptor.input() {
            if takes_query_parameters(verb) {
                parameters.extend(input.query_parameters(ctx).map_err(transform)?);
            } else {
                let body = input.request_body(ctx).map_err(transform)?;
                if !body.is_empty() {
                    let body = serde_json::to_value(&body).map_err(serialize)?;
                    operation.insert("requestBody".into(), body);
                }
            }
        }
        if !parameters.is_empty() {
            let parameters = serde_json::to_value(&parameters).map_err(serialize)?;
            operation.insert("parameters".into(), parameters);
        }

        let responses = match descriptor.output() {
            Some(output) => output.responses(ctx).map_err(transform)?,
            None => Responses::new(),
        };
        let responses = responses_object(&responses).map_err(serialize)?;
        operation.insert("responses".into(), responses);

        Ok(Value::Object(operation))
    }
}

fn takes_query_parameters(verb: &Method) -> bool {
    matches!(
        *verb,
        Method::GET | Method::DELETE | Method::HEAD | Method::OPTIONS
    )
}

fn responses_object(responses: &Responses) -> Result<Value, serde_json::Error> {
    let mut object = Map::new();
    for (status, body) in responses {
        let mut response = match serde_json::to_value(body)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        response.insert("description".into(), Value::String(describe_status(status)));
        object.insert(status.clone(), Value::Object(response));
    }
    if object.is_empty() {
        object.insert("200".into(), json!({ "description": describe_status("200") }));
    }
    Ok(Value::Object(object))
}

fn describe_status(status: &str) -> String {
    status
        .parse::<u16>()
        .ok()
        .and_then(|code| http::StatusCode::from_u16(code).ok())
        .and_then(|code| code.canonical_reason())
        .unwrap_or("Response")
        .to_string()
}

fn merge_operations(
    paths: &mut Map<String, Value>,
    path: String,
    operations: Map<String, Value>,
) -> Result<(), DocumentationError> {
    let entry = paths
        .entry(path.clone())
        .or_insert_with(|| Value::Object(Map::new()));
    let Value::Object(existing) = entry else {
        return Ok(());
    };
    for (verb, operation) in operations {
        if let Some(first) = existing.get(&verb) {
            warn!(%path, %verb, "operation documented twice");
            return Err(DocumentationError::DuplicateOperation {
                verb: verb.to_uppercase(),
                first: operation_name(first),
                second: operation_name(&operation),
                path,
            });
        }
        existing.insert(verb, operation);
    }
    Ok(())
}

fn operation_name(operation: &Value) -> String {
    operation
        .get("operationId")
        .and_then(Value::as_str)
        .unwrap_or("an unnamed operation")
        .to_string()
}

/// Rewrite `<converter:name>` placeholders as `{name}` and describe them.
///
/// `int` maps to integer, `float` to number, anything else to string.
pub fn openapi_path(path: &str) -> (String, Vec<ParameterSpec>) {
    let mut rendered = String::with_capacity(path.len());
    let mut params = Vec::new();
    let mut rest = path;

    while let Some(start) = rest.find('<') {
        let Some(len) = rest[start..].find('>') else {
            break;
        };
        let placeholder = &rest[start + 1..start + len];
        let (converter, name) = match placeholder.rsplit_once(':') {
            Some((converter, name)) => (converter.split('(').next().unwrap_or(converter), name),
            None => ("default", placeholder),
        };
        let kind = match converter.trim() {
            "int" => "integer",
            "float" => "number",
            _ => "string",
        };

        rendered.push_str(&rest[..start]);
        rendered.push('{');
        rendered.push_str(name.trim());
        rendered.push('}');
        params.push(ParameterSpec {
            name: name.trim().to_string(),
            location: ParameterLocation::Path,
            required: true,
            allow_empty_value: None,
            default: None,
            schema: json!({ "type": kind }),
        });
        rest = &rest[start + len + 1..];
    }
    rendered.push_str(rest);

    (rendered, params)
}
