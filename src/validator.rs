//! Document validation against field rules.

use serde_json::{Map, Value};

use crate::convert::{to_json_schema, to_validation_schema};
use crate::error::{FieldError, ValidateError};
use crate::rules::{FieldRule, FieldType, Rules};

/// Validator built from a rule mapping.
///
/// Validation normalizes first (purging unknown keys when configured,
/// applying defaults for absent fields, coercing declared scalars) and
/// then checks the normalized document against the converted schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Validator {
    rules: Rules,
    purge_unknown: bool,
    allow_unknown: bool,
}

impl Validator {
    /// Strict validator: unknown fields are rejected.
    pub fn new(rules: Rules) -> Self {
        Self {
            rules,
            purge_unknown: false,
            allow_unknown: false,
        }
    }

    /// Drop unknown fields instead of rejecting them.
    pub fn purge_unknown(mut self, purge: bool) -> Self {
        self.purge_unknown = purge;
        self
    }

    /// Keep unknown fields untouched.
    pub fn allow_unknown(mut self, allow: bool) -> Self {
        self.allow_unknown = allow;
        self
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    /// JSON-Schema-like description of the rules.
    pub fn json_schema(&self) -> Value {
        to_json_schema(&self.rules)
    }

    /// Validate a document, returning its canonical form.
    ///
    /// # Errors
    ///
    /// Returns `ValidateError::Invalid` with every field-level error found,
    /// or `ValidateError::InvalidSchema` if the rules do not compile.
    pub fn validate(&self, document: &Value) -> Result<Value, ValidateError> {
        let normalized = self.normalize(document);

        let closed = !(self.purge_unknown || self.allow_unknown);
        let schema = to_validation_schema(&self.json_schema(), closed);
        let compiled =
            jsonschema::validator_for(&schema).map_err(|e| ValidateError::InvalidSchema {
                message: e.to_string(),
            })?;

        let errors: Vec<FieldError> = compiled
            .iter_errors(&normalized)
            .map(|e| {
                let mut path = e.instance_path.to_string();
                if let jsonschema::error::ValidationErrorKind::Required { property } = &e.kind {
                    let name = property.as_str().map(String::from).unwrap_or_else(|| property.to_string());
                    path = format!("{}/{}", path, escape_pointer(&name));
                }
                FieldError {
                    path,
                    message: e.to_string(),
                }
            })
            .collect();

        if errors.is_empty() {
            Ok(normalized)
        } else {
            Err(ValidateError::Invalid { errors })
        }
    }

    fn normalize(&self, document: &Value) -> Value {
        match document {
            Value::Object(map) => Value::Object(self.normalize_mapping(map, &self.rules)),
            other => other.clone(),
        }
    }

    fn normalize_mapping(&self, map: &Map<String, Value>, rules: &Rules) -> Map<String, Value> {
        let mut result = Map::new();

        for (key, value) in map {
            match rules.get(key) {
                Some(rule) => {
                    result.insert(key.clone(), self.normalize_field(value, rule));
                }
                None if self.purge_unknown => {}
                None => {
                    result.insert(key.clone(), value.clone());
                }
            }
        }

        for (name, rule) in rules.iter() {
            let Some(default) = &rule.default else {
                continue;
            };
            let missing = match result.get(name) {
                None => true,
                Some(Value::Null) => !rule.nullable,
                Some(_) => false,
            };
            if missing {
                result.insert(name.to_string(), default.clone());
            }
        }

        result
    }

    fn normalize_field(&self, value: &Value, rule: &FieldRule) -> Value {
        let value = if rule.coerce {
            coerce(value, rule.kind)
        } else {
            value.clone()
        };

        match (value, rule) {
            (
                Value::Object(map),
                FieldRule {
                    properties: Some(properties),
                    ..
                },
            ) => Value::Object(self.normalize_mapping(&map, properties)),
            (
                Value::Array(items),
                FieldRule {
                    items: Some(item_rule),
                    ..
                },
            ) => Value::Array(
                items
                    .iter()
                    .map(|item| self.normalize_field(item, item_rule))
                    .collect(),
            ),
            (other, _) => other,
        }
    }
}

/// Convert string input to the declared scalar type when it parses.
///
/// Values that do not parse are left alone so validation reports them.
fn coerce(value: &Value, kind: FieldType) -> Value {
    let Value::String(s) = value else {
        return value.clone();
    };
    let trimmed = s.trim();
    match kind {
        FieldType::Integer => trimmed
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| value.clone()),
        FieldType::Float | FieldType::Number => trimmed
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| value.clone()),
        FieldType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Value::Bool(true),
            "false" | "0" | "no" | "off" => Value::Bool(false),
            _ => value.clone(),
        },
        _ => value.clone(),
    }
}

fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field_errors(err: ValidateError) -> Vec<FieldError> {
        match err {
            ValidateError::Invalid { errors } => errors,
            other => panic!("expected field errors, got {other:?}"),
        }
    }

    fn pet_rules() -> Rules {
        Rules::new()
            .field("name", FieldRule::string().required())
            .field("age", FieldRule::integer().coerce())
            .field(
                "size",
                FieldRule::string()
                    .allowed(["s", "m", "l"])
                    .default_value("m"),
            )
            .field("tags", FieldRule::list(FieldRule::string()))
            .field("note", FieldRule::string().nullable())
    }

    #[test]
    fn valid_document_gets_defaults() {
        let validator = Validator::new(pet_rules());
        let doc = validator.validate(&json!({ "name": "Rex" })).unwrap();
        assert_eq!(doc, json!({ "name": "Rex", "size": "m" }));
    }

    #[test]
    fn purge_drops_unknown_fields() {
        let validator = Validator::new(pet_rules()).purge_unknown(true);
        let doc = validator
            .validate(&json!({ "name": "Rex", "color": "brown" }))
            .unwrap();
        assert!(doc.get("color").is_none());
    }

    #[test]
    fn strict_rejects_unknown_fields() {
        let validator = Validator::new(pet_rules());
        let errors = field_errors(
            validator
                .validate(&json!({ "name": "Rex", "color": "brown" }))
                .unwrap_err(),
        );
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("color"));
    }

    #[test]
    fn allow_unknown_keeps_fields() {
        let validator = Validator::new(pet_rules()).allow_unknown(true);
        let doc = validator
            .validate(&json!({ "name": "Rex", "color": "brown" }))
            .unwrap();
        assert_eq!(doc["color"], "brown");
    }

    #[test]
    fn missing_required_reported_at_field_path() {
        let validator = Validator::new(pet_rules());
        let errors = field_errors(validator.validate(&json!({})).unwrap_err());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "/name");
    }

    #[test]
    fn every_violation_is_reported() {
        let validator = Validator::new(pet_rules());
        let errors = field_errors(
            validator
                .validate(&json!({ "size": "xl", "tags": [1], "age": "old" }))
                .unwrap_err(),
        );
        let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"/name"));
        assert!(paths.contains(&"/size"));
        assert!(paths.contains(&"/tags/0"));
        assert!(paths.contains(&"/age"));
    }

    #[test]
    fn coercion_converts_query_strings() {
        let validator = Validator::new(pet_rules());
        let doc = validator
            .validate(&json!({ "name": "Rex", "age": " 4 " }))
            .unwrap();
        assert_eq!(doc["age"], json!(4));
    }

    #[test]
    fn nullable_accepts_null() {
        let validator = Validator::new(pet_rules());
        assert!(validator
            .validate(&json!({ "name": "Rex", "note": null }))
            .is_ok());
        assert!(validator
            .validate(&json!({ "name": null }))
            .is_err());
    }

    #[test]
    fn purge_applies_to_nested_dicts() {
        let rules = Rules::new().field(
            "owner",
            FieldRule::dict(
                Rules::new().field("id", FieldRule::integer().default_value(0)),
            ),
        );
        let validator = Validator::new(rules).purge_unknown(true);
        let doc = validator
            .validate(&json!({ "owner": { "secret": "x" } }))
            .unwrap();
        assert_eq!(doc, json!({ "owner": { "id": 0 } }));
    }

    #[test]
    fn strict_validator_accepts_any_keys_in_bare_dicts() {
        let rules = Rules::new().field("meta", FieldRule::new(FieldType::Dict));
        let doc = Validator::new(rules)
            .validate(&json!({ "meta": { "a": 1, "b": [true] } }))
            .unwrap();
        assert_eq!(doc, json!({ "meta": { "a": 1, "b": [true] } }));
    }

    #[test]
    fn null_takes_the_default_unless_nullable() {
        let rules = Rules::new()
            .field("limit", FieldRule::integer().default_value(10))
            .field("label", FieldRule::string().nullable().default_value("none"));
        let doc = Validator::new(rules)
            .validate(&json!({ "limit": null, "label": null }))
            .unwrap();
        assert_eq!(doc, json!({ "limit": 10, "label": null }));
    }

    #[test]
    fn null_without_default_is_still_rejected() {
        let rules = Rules::new().field("limit", FieldRule::integer());
        let errors = field_errors(
            Validator::new(rules)
                .validate(&json!({ "limit": null }))
                .unwrap_err(),
        );
        assert_eq!(errors[0].path, "/limit");
    }

    #[test]
    fn coerce_helper() {
        assert_eq!(coerce(&json!("true"), FieldType::Boolean), json!(true));
        assert_eq!(coerce(&json!("2.5"), FieldType::Float), json!(2.5));
        assert_eq!(coerce(&json!("abc"), FieldType::Integer), json!("abc"));
        assert_eq!(coerce(&json!(3), FieldType::String), json!(3));
    }
}
