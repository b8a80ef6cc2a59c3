//! Schema-validated structured parameters.

use std::borrow::Cow;

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::error::{
    InternalContractError, SchemaResolutionError, TransformError, ValidateError, ValidationError,
};
use crate::provider::{ResolvedSchema, SchemaProvider};
use crate::rules::Rules;
use crate::transform::{
    BodySpec, ParamTransformer, ParameterLocation, ParameterSpec, Payload, Responses,
};
use crate::types::Direction;
use crate::validator::Validator;

const JSON_MEDIA_TYPE: &str = "application/json";

/// Where a schema-validating transformer gets its schema from.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaSource {
    /// Rule mapping; validated with unknown fields purged.
    Inline(Rules),
    /// Validator used as configured.
    Prebuilt(Validator),
    /// Resolved through the context's [`SchemaProvider`] on every call.
    Named(String),
}

impl From<Rules> for SchemaSource {
    fn from(rules: Rules) -> Self {
        SchemaSource::Inline(rules)
    }
}

impl From<Validator> for SchemaSource {
    fn from(validator: Validator) -> Self {
        SchemaSource::Prebuilt(validator)
    }
}

impl From<&str> for SchemaSource {
    fn from(name: &str) -> Self {
        SchemaSource::Named(name.to_string())
    }
}

impl From<String> for SchemaSource {
    fn from(name: String) -> Self {
        SchemaSource::Named(name)
    }
}

/// Transformer validating structured documents in both directions.
///
/// Input failures are client errors ([`ValidationError`]); output failures
/// are handler defects ([`InternalContractError`]).
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaValidating {
    source: SchemaSource,
    is_list: bool,
}

impl SchemaValidating {
    pub fn new(source: impl Into<SchemaSource>) -> Self {
        Self {
            source: source.into(),
            is_list: false,
        }
    }

    /// Declare that documents are collections.
    ///
    /// List mode is not supported: every operation on a list-mode
    /// transformer fails with [`TransformError::ListModeUnsupported`].
    pub fn list(mut self, is_list: bool) -> Self {
        self.is_list = is_list;
        self
    }

    pub fn source(&self) -> &SchemaSource {
        &self.source
    }

    pub fn is_list(&self) -> bool {
        self.is_list
    }

    /// Resolve the validator for `direction`.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::SchemaResolution`] if a named schema is unknown.
    pub fn validator<'a>(
        &'a self,
        ctx: &dyn SchemaProvider,
        direction: Direction,
    ) -> Result<Cow<'a, Validator>, TransformError> {
        if self.is_list {
            return Err(TransformError::ListModeUnsupported);
        }
        match &self.source {
            SchemaSource::Prebuilt(validator) => Ok(Cow::Borrowed(validator)),
            SchemaSource::Inline(rules) => Ok(Cow::Owned(purging(rules.clone()))),
            SchemaSource::Named(name) => {
                debug!(schema = %name, %direction, "resolving named schema");
                match ctx.schema_for(name, direction)? {
                    ResolvedSchema::Validator(validator) => Ok(Cow::Owned(validator)),
                    ResolvedSchema::Rules(rules) => Ok(Cow::Owned(purging(rules))),
                }
            }
        }
    }

    /// JSON-Schema-like description of the schema for `direction`.
    pub fn json_schema(
        &self,
        ctx: &dyn SchemaProvider,
        direction: Direction,
    ) -> Result<Value, TransformError> {
        Ok(self.validator(ctx, direction)?.json_schema())
    }
}

impl SchemaValidating {
    /// Name of the schema in error messages.
    fn schema_name(&self) -> &str {
        match &self.source {
            SchemaSource::Named(name) => name,
            SchemaSource::Inline(_) => "inline",
            SchemaSource::Prebuilt(_) => "prebuilt",
        }
    }

    /// Field errors are the client's fault on input and the handler's on
    /// output. A schema that does not compile is always a server fault.
    fn failure(&self, direction: Direction, err: ValidateError) -> TransformError {
        match (err, direction) {
            (ValidateError::InvalidSchema { message }, _) => {
                warn!(schema = self.schema_name(), %message, "schema does not compile");
                SchemaResolutionError::InvalidSchema {
                    name: self.schema_name().to_string(),
                    message,
                }
                .into()
            }
            (ValidateError::Invalid { errors }, Direction::Input) => {
                debug!(errors = errors.len(), "rejected request parameters");
                ValidationError { errors }.into()
            }
            (ValidateError::Invalid { errors }, Direction::Output) => {
                warn!(errors = errors.len(), "handler result violates its output schema");
                InternalContractError { errors }.into()
            }
        }
    }
}

fn purging(rules: Rules) -> Validator {
    Validator::new(rules).purge_unknown(true)
}

impl ParamTransformer for SchemaValidating {
    fn from_params(&self, ctx: &dyn SchemaProvider, params: Value) -> Result<Value, TransformError> {
        let validator = self.validator(ctx, Direction::Input)?;
        validator
            .validate(&params)
            .map_err(|err| self.failure(Direction::Input, err))
    }

    fn to_response(
        &self,
        ctx: &dyn SchemaProvider,
        result: Payload,
    ) -> Result<Payload, TransformError> {
        let actual = result.kind();
        let Payload::Json(document) = result else {
            return Err(TransformError::UnsupportedPayload {
                transformer: "schema-validating",
                actual,
            });
        };
        let validator = self.validator(ctx, Direction::Output)?;
        validator
            .validate(&document)
            .map(Payload::Json)
            .map_err(|err| self.failure(Direction::Output, err))
    }

    fn query_parameters(
        &self,
        ctx: &dyn SchemaProvider,
    ) -> Result<Vec<ParameterSpec>, TransformError> {
        let schema = self.json_schema(ctx, Direction::Input)?;
        Ok(query_parameters_from_schema(&schema))
    }

    fn request_body(&self, ctx: &dyn SchemaProvider) -> Result<BodySpec, TransformError> {
        let schema = self.json_schema(ctx, Direction::Input)?;
        Ok(BodySpec::new().with_content(JSON_MEDIA_TYPE, schema))
    }

    fn responses(&self, ctx: &dyn SchemaProvider) -> Result<Responses, TransformError> {
        let schema = self.json_schema(ctx, Direction::Output)?;
        let body = BodySpec::new().with_content(JSON_MEDIA_TYPE, schema);
        Ok(Responses::from([("200".to_string(), body)]))
    }
}

/// One query parameter per top-level property of an object schema.
///
/// Array parameters are named with a trailing `[]` so multi-value query
/// strings are read as arrays.
pub fn query_parameters_from_schema(schema: &Value) -> Vec<ParameterSpec> {
    let empty = Map::new();
    let properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .unwrap_or(&empty);
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    properties
        .iter()
        .map(|(name, spec)| {
            let kind = spec.get("type").and_then(Value::as_str).unwrap_or("string");
            let mut param_schema = if spec.get("properties").is_some() {
                let mut nested = spec.clone();
                if let Value::Object(map) = &mut nested {
                    map.remove("nullable");
                    map.remove("default");
                }
                nested
            } else {
                json!({ "type": kind })
            };
            if let Value::Object(map) = &mut param_schema {
                if let Some(items) = spec.get("items") {
                    map.insert("items".into(), items.clone());
                }
                if let Some(allowed) = spec.get("enum") {
                    map.insert("enum".into(), allowed.clone());
                }
            }

            let is_required = required.contains(&name.as_str());
            let name = if kind == "array" {
                format!("{name}[]")
            } else {
                name.clone()
            };

            ParameterSpec {
                name,
                location: ParameterLocation::Query,
                required: is_required,
                allow_empty_value: Some(
                    spec.get("nullable").and_then(Value::as_bool).unwrap_or(false),
                ),
                default: spec.get("default").cloned(),
                schema: param_schema,
            }
        })
        .collect()
}
