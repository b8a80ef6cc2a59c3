//! Schema conversion - turns field rules into JSON-Schema-like documents.
//!
//! The same conversion feeds documentation and live validation, so the
//! documented shape and the enforced shape cannot drift apart.

use serde_json::{json, Map, Value};

use crate::rules::{FieldRule, Rules};

/// Convert a rule mapping into an object schema.
///
/// The result always carries `type`, `properties` and `required` (the
/// latter possibly empty). Conversion is pure: the same rules always
/// yield the same document.
pub fn to_json_schema(rules: &Rules) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for (name, rule) in rules.iter() {
        if rule.required {
            required.push(Value::String(name.to_string()));
        }
        properties.insert(name.to_string(), field_to_json_schema(rule));
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Convert a single field rule.
pub fn field_to_json_schema(rule: &FieldRule) -> Value {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String(rule.kind.json_type().into()));

    if let Some(format) = rule.kind.format() {
        schema.insert("format".into(), Value::String(format.into()));
    }
    if rule.nullable {
        schema.insert("nullable".into(), Value::Bool(true));
    }
    if let Some(default) = &rule.default {
        schema.insert("default".into(), default.clone());
    }
    if let Some(allowed) = &rule.allowed {
        schema.insert("enum".into(), Value::Array(allowed.clone()));
    }
    if let Some(items) = &rule.items {
        schema.insert("items".into(), field_to_json_schema(items));
    }
    if let Some(properties) = &rule.properties {
        if let Value::Object(nested) = to_json_schema(properties) {
            for (key, value) in nested {
                if key != "type" {
                    schema.insert(key, value);
                }
            }
        }
    }

    Value::Object(schema)
}

/// Derive the schema handed to the JSON Schema validator.
///
/// `nullable` is folded into the type union (and into `enum` when one is
/// declared) and annotation-only keywords are dropped. With `closed`,
/// every object schema that declares `properties` gets
/// `additionalProperties: false`.
pub(crate) fn to_validation_schema(doc: &Value, closed: bool) -> Value {
    let mut schema = doc.clone();
    rewrite_for_validation(&mut schema, closed);
    schema
}

fn rewrite_for_validation(value: &mut Value, closed: bool) {
    let Value::Object(map) = value else {
        return;
    };

    map.remove("default");
    let nullable = matches!(map.remove("nullable"), Some(Value::Bool(true)));
    if nullable {
        if let Some(Value::String(kind)) = map.get("type") {
            let union = json!([kind, "null"]);
            map.insert("type".into(), union);
        }
        if let Some(Value::Array(allowed)) = map.get_mut("enum") {
            if !allowed.contains(&Value::Null) {
                allowed.push(Value::Null);
            }
        }
    }

    if closed && map.contains_key("properties") && !map.contains_key("additionalProperties") {
        map.insert("additionalProperties".into(), Value::Bool(false));
    }

    if let Some(Value::Object(props)) = map.get_mut("properties") {
        for prop in props.values_mut() {
            rewrite_for_validation(prop, closed);
        }
    }
    if let Some(items) = map.get_mut("items") {
        rewrite_for_validation(items, closed);
    }
}
