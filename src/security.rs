//! API-key security requirements for documented operations.

use serde_json::{json, Map, Value};

use crate::openapi::{DocumentationOptions, DocumentationPlugin};
use crate::route::RouteDescriptor;
use crate::types::{AuthMode, API_KEY_HEADER, API_KEY_SCHEME};

/// Declares the `api_key` header scheme and requires it on every operation
/// whose route authenticates with `api_key`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiKeySecurityPlugin;

impl DocumentationPlugin for ApiKeySecurityPlugin {
    fn init_spec(&self, components: &mut Map<String, Value>) {
        let schemes = components
            .entry("securitySchemes")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(schemes) = schemes {
            schemes.insert(
                API_KEY_SCHEME.to_string(),
                json!({ "type": "apiKey", "in": "header", "name": API_KEY_HEADER }),
            );
        }
    }

    fn operation_helper(
        &self,
        _path: &str,
        operations: &mut Map<String, Value>,
        routing: Option<&RouteDescriptor>,
        options: &DocumentationOptions,
    ) {
        let Some(routing) = routing else {
            return;
        };
        let auth = routing.auth().or(options.default_auth.as_ref());
        if auth != Some(&AuthMode::ApiKey) {
            return;
        }

        for operation in operations.values_mut() {
            let Value::Object(operation) = operation else {
                continue;
            };
            let security = operation
                .entry("security")
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(requirements) = security {
                requirements.push(json!({ API_KEY_SCHEME: [] }));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::bind_route;
    use http::Method;

    fn operations() -> Map<String, Value> {
        let mut operations = Map::new();
        operations.insert("get".into(), json!({ "operationId": "a" }));
        operations.insert("post".into(), json!({ "operationId": "b" }));
        operations
    }

    #[test]
    fn declares_scheme_once() {
        let mut components = Map::new();
        ApiKeySecurityPlugin.init_spec(&mut components);
        ApiKeySecurityPlugin.init_spec(&mut components);
        assert_eq!(
            Value::Object(components),
            json!({
                "securitySchemes": {
                    "api_key": { "type": "apiKey", "in": "header", "name": "API-KEY" }
                }
            })
        );
    }

    #[test]
    fn api_key_routes_get_a_requirement() {
        let routing = bind_route([("/a", Method::GET)]).auth(AuthMode::ApiKey).build();
        let mut ops = operations();
        ApiKeySecurityPlugin.operation_helper(
            "/a",
            &mut ops,
            Some(&routing),
            &DocumentationOptions::default(),
        );
        assert_eq!(ops["get"]["security"], json!([{ "api_key": [] }]));
        assert_eq!(ops["post"]["security"], json!([{ "api_key": [] }]));
    }

    #[test]
    fn existing_requirements_are_kept() {
        let routing = bind_route([("/a", Method::GET)]).auth(AuthMode::ApiKey).build();
        let mut ops = Map::new();
        ops.insert("get".into(), json!({ "security": [{ "oauth": [] }] }));
        ApiKeySecurityPlugin.operation_helper(
            "/a",
            &mut ops,
            Some(&routing),
            &DocumentationOptions::default(),
        );
        assert_eq!(
            ops["get"]["security"],
            json!([{ "oauth": [] }, { "api_key": [] }])
        );
    }

    #[test]
    fn public_routes_are_untouched() {
        let routing = bind_route([("/a", Method::GET)]).auth(AuthMode::Public).build();
        let mut ops = operations();
        ApiKeySecurityPlugin.operation_helper(
            "/a",
            &mut ops,
            Some(&routing),
            &DocumentationOptions::default(),
        );
        assert_eq!(ops, operations());
    }

    #[test]
    fn missing_routing_defers_to_default_assembly() {
        let mut ops = operations();
        let options = DocumentationOptions {
            default_auth: Some(AuthMode::ApiKey),
            ..Default::default()
        };
        ApiKeySecurityPlugin.operation_helper("/a", &mut ops, None, &options);
        assert_eq!(ops, operations());
    }

    #[test]
    fn default_auth_applies_when_route_declares_none() {
        let routing = bind_route([("/a", Method::GET)]).build();
        let options = DocumentationOptions {
            default_auth: Some(AuthMode::ApiKey),
            ..Default::default()
        };
        let mut ops = operations();
        ApiKeySecurityPlugin.operation_helper("/a", &mut ops, Some(&routing), &options);
        assert!(ops["get"].get("security").is_some());

        let user = bind_route([("/a", Method::GET)]).auth(AuthMode::User).build();
        let mut ops = operations();
        ApiKeySecurityPlugin.operation_helper("/a", &mut ops, Some(&user), &options);
        assert!(ops["get"].get("security").is_none());
    }
}
