//! Field rules: the native validation schema.
//!
//! Rules are written as a mapping from field name to rule, either in Rust:
//!
//! ```
//! use restbind::{FieldRule, Rules};
//!
//! let rules = Rules::new()
//!     .field("name", FieldRule::string().required())
//!     .field("tags", FieldRule::list(FieldRule::string()));
//! assert_eq!(rules.len(), 2);
//! ```
//!
//! or as JSON, where `schema` holds the item rule of a list or the nested
//! mapping of a dict:
//!
//! ```json
//! {
//!   "name": { "type": "string", "required": true },
//!   "tags": { "type": "list", "schema": { "type": "string" } },
//!   "owner": { "type": "dict", "schema": { "id": { "type": "integer" } } }
//! }
//! ```
//!
//! Declaration order is preserved; it drives the order of documented
//! query parameters.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Declared type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Float,
    Number,
    Boolean,
    #[serde(alias = "object")]
    Dict,
    #[serde(alias = "array")]
    List,
    Date,
    Datetime,
}

impl FieldType {
    /// JSON Schema `type` keyword for this field type.
    pub fn json_type(&self) -> &'static str {
        match self {
            FieldType::String | FieldType::Date | FieldType::Datetime => "string",
            FieldType::Integer => "integer",
            FieldType::Float | FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Dict => "object",
            FieldType::List => "array",
        }
    }

    /// JSON Schema `format` keyword, if the type carries one.
    pub fn format(&self) -> Option<&'static str> {
        match self {
            FieldType::Float => Some("float"),
            FieldType::Date => Some("date"),
            FieldType::Datetime => Some("date-time"),
            _ => None,
        }
    }
}

/// Validation and normalization rule for one field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawFieldRule")]
pub struct FieldRule {
    pub kind: FieldType,
    pub required: bool,
    pub nullable: bool,
    /// Applied when the field is absent.
    pub default: Option<Value>,
    /// Enumeration of accepted values.
    pub allowed: Option<Vec<Value>>,
    /// Rule for list items.
    pub items: Option<Box<FieldRule>>,
    /// Nested rules for dict fields.
    pub properties: Option<Rules>,
    /// Convert string input to the declared scalar type before validating.
    pub coerce: bool,
}

impl FieldRule {
    pub fn new(kind: FieldType) -> Self {
        Self {
            kind,
            required: false,
            nullable: false,
            default: None,
            allowed: None,
            items: None,
            properties: None,
            coerce: false,
        }
    }

    pub fn string() -> Self {
        Self::new(FieldType::String)
    }

    pub fn integer() -> Self {
        Self::new(FieldType::Integer)
    }

    pub fn float() -> Self {
        Self::new(FieldType::Float)
    }

    pub fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    pub fn list(items: FieldRule) -> Self {
        let mut rule = Self::new(FieldType::List);
        rule.items = Some(Box::new(items));
        rule
    }

    pub fn dict(properties: Rules) -> Self {
        let mut rule = Self::new(FieldType::Dict);
        rule.properties = Some(properties);
        rule
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn allowed<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.allowed = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn coerce(mut self) -> Self {
        self.coerce = true;
        self
    }
}

#[derive(Deserialize)]
struct RawFieldRule {
    #[serde(rename = "type")]
    kind: FieldType,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    nullable: bool,
    #[serde(default)]
    default: Option<Value>,
    #[serde(default)]
    allowed: Option<Vec<Value>>,
    #[serde(default)]
    schema: Option<Value>,
    #[serde(default)]
    coerce: bool,
}

impl TryFrom<RawFieldRule> for FieldRule {
    type Error = String;

    fn try_from(raw: RawFieldRule) -> Result<Self, Self::Error> {
        let mut rule = FieldRule::new(raw.kind);
        rule.required = raw.required;
        rule.nullable = raw.nullable;
        rule.default = raw.default;
        rule.allowed = raw.allowed;
        rule.coerce = raw.coerce;

        if let Some(schema) = raw.schema {
            match raw.kind {
                FieldType::List => {
                    let items: FieldRule =
                        serde_json::from_value(schema).map_err(|e| format!("items: {e}"))?;
                    rule.items = Some(Box::new(items));
                }
                FieldType::Dict => {
                    let properties: Rules =
                        serde_json::from_value(schema).map_err(|e| e.to_string())?;
                    rule.properties = Some(properties);
                }
                other => {
                    return Err(format!(
                        "\"schema\" is only valid on dict and list fields, not {}",
                        other.json_type()
                    ))
                }
            }
        }

        Ok(rule)
    }
}

/// Ordered mapping of field name to rule.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct Rules {
    fields: Vec<(String, FieldRule)>,
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, replacing any previous rule with the same name.
    pub fn field(mut self, name: impl Into<String>, rule: FieldRule) -> Self {
        self.insert(name.into(), rule);
        self
    }

    pub fn insert(&mut self, name: String, rule: FieldRule) {
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = rule,
            None => self.fields.push((name, rule)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldRule)> {
        self.fields.iter().map(|(n, r)| (n.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl TryFrom<Map<String, Value>> for Rules {
    type Error = String;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut rules = Rules::new();
        for (name, value) in map {
            let rule: FieldRule =
                serde_json::from_value(value).map_err(|e| format!("field \"{name}\": {e}"))?;
            rules.insert(name, rule);
        }
        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserialize_preserves_declaration_order() {
        let rules: Rules = serde_json::from_value(json!({
            "zeta": { "type": "string" },
            "alpha": { "type": "integer" },
            "mid": { "type": "boolean" }
        }))
        .unwrap();
        let names: Vec<&str> = rules.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn list_schema_becomes_items() {
        let rule: FieldRule = serde_json::from_value(json!({
            "type": "list",
            "schema": { "type": "string", "allowed": ["a", "b"] }
        }))
        .unwrap();
        let items = rule.items.unwrap();
        assert_eq!(items.kind, FieldType::String);
        assert_eq!(items.allowed, Some(vec![json!("a"), json!("b")]));
    }

    #[test]
    fn dict_schema_becomes_properties() {
        let rule: FieldRule = serde_json::from_value(json!({
            "type": "dict",
            "schema": { "id": { "type": "integer", "required": true } }
        }))
        .unwrap();
        let properties = rule.properties.unwrap();
        assert!(properties.get("id").unwrap().required);
    }

    #[test]
    fn schema_on_scalar_is_rejected() {
        let result: Result<FieldRule, _> = serde_json::from_value(json!({
            "type": "string",
            "schema": { "type": "string" }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn type_aliases_accepted() {
        let rule: FieldRule = serde_json::from_value(json!({ "type": "array" })).unwrap();
        assert_eq!(rule.kind, FieldType::List);
        let rule: FieldRule = serde_json::from_value(json!({ "type": "object" })).unwrap();
        assert_eq!(rule.kind, FieldType::Dict);
    }

    #[test]
    fn insert_replaces_existing_field() {
        let rules = Rules::new()
            .field("id", FieldRule::string())
            .field("id", FieldRule::integer());
        assert_eq!(rules.len(), 1);
        assert_eq!(rules.get("id").unwrap().kind, FieldType::Integer);
    }
}
