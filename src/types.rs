//! Core types shared by transformers, routes and documentation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Header carrying the API key for the `api_key` security scheme.
pub const API_KEY_HEADER: &str = "API-KEY";

/// Name of the API-key security scheme in `components.securitySchemes`.
pub const API_KEY_SCHEME: &str = "api_key";

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Which side of a handler call a schema applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Parameters received from the client.
    Input,
    /// Result produced by the handler.
    Output,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Input => "input",
            Direction::Output => "output",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication mode declared on a route.
///
/// Unknown modes are kept verbatim so host-specific values survive
/// a round trip through manifests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AuthMode {
    Public,
    User,
    ApiKey,
    Other(String),
}

impl AuthMode {
    pub fn parse(s: &str) -> Self {
        match s {
            "public" => AuthMode::Public,
            "user" => AuthMode::User,
            "api_key" => AuthMode::ApiKey,
            other => AuthMode::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AuthMode::Public => "public",
            AuthMode::User => "user",
            AuthMode::ApiKey => "api_key",
            AuthMode::Other(s) => s,
        }
    }
}

impl From<String> for AuthMode {
    fn from(s: String) -> Self {
        AuthMode::parse(&s)
    }
}

impl From<AuthMode> for String {
    fn from(mode: AuthMode) -> Self {
        mode.as_str().to_string()
    }
}

impl std::fmt::Display for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn direction_names() {
        assert_eq!(Direction::Input.to_string(), "input");
        assert_eq!(Direction::Output.to_string(), "output");
    }

    #[test]
    fn auth_mode_parse_known() {
        assert_eq!(AuthMode::parse("public"), AuthMode::Public);
        assert_eq!(AuthMode::parse("user"), AuthMode::User);
        assert_eq!(AuthMode::parse("api_key"), AuthMode::ApiKey);
    }

    #[test]
    fn auth_mode_keeps_unknown_values() {
        let mode = AuthMode::parse("jwt_partner");
        assert_eq!(mode, AuthMode::Other("jwt_partner".into()));
        assert_eq!(mode.as_str(), "jwt_partner");
    }

    #[test]
    fn auth_mode_serde_uses_wire_string() {
        let mode: AuthMode = serde_json::from_value(json!("api_key")).unwrap();
        assert_eq!(mode, AuthMode::ApiKey);
        assert_eq!(serde_json::to_value(AuthMode::User).unwrap(), json!("user"));
    }
}
