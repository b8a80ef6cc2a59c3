//! Parameter transformer capability and the documentation fragments it emits.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::TransformError;
use crate::provider::SchemaProvider;
use crate::types::json_type_name;

/// Value flowing out of a handler towards the host.
#[derive(Debug)]
pub enum Payload {
    /// Structured document, serialized as JSON by the host.
    Json(Value),
    /// Raw bytes with no response built around them yet.
    Bytes(Vec<u8>),
    /// Fully formed response, passed through untouched.
    Http(http::Response<Vec<u8>>),
}

impl Payload {
    /// Short name of the payload for error messages. JSON payloads report
    /// their value type.
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Json(value) => json_type_name(value),
            Payload::Bytes(_) => "bytes",
            Payload::Http(_) => "http response",
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_response(self) -> Option<http::Response<Vec<u8>>> {
        match self {
            Payload::Http(response) => Some(response),
            _ => None,
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(bytes)
    }
}

impl From<http::Response<Vec<u8>>> for Payload {
    fn from(response: http::Response<Vec<u8>>) -> Self {
        Payload::Http(response)
    }
}

/// Where a documented parameter travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Query,
    Path,
}

/// OpenAPI parameter object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_empty_value: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    pub schema: Value,
}

/// OpenAPI body (request body or response) with media types in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BodySpec {
    content: Vec<(String, Value)>,
}

impl BodySpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a media type entry carrying `schema`.
    pub fn with_content(mut self, media_type: impl Into<String>, schema: Value) -> Self {
        let media_type = media_type.into();
        match self.content.iter_mut().find(|(mt, _)| *mt == media_type) {
            Some((_, existing)) => *existing = schema,
            None => self.content.push((media_type, schema)),
        }
        self
    }

    pub fn schema(&self, media_type: &str) -> Option<&Value> {
        self.content
            .iter()
            .find(|(mt, _)| mt == media_type)
            .map(|(_, s)| s)
    }

    pub fn media_types(&self) -> impl Iterator<Item = &str> {
        self.content.iter().map(|(mt, _)| mt.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

struct ContentMap<'a>(&'a [(String, Value)]);

impl Serialize for ContentMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (media_type, schema) in self.0 {
            map.serialize_entry(media_type, &serde_json::json!({ "schema": schema }))?;
        }
        map.end()
    }
}

impl Serialize for BodySpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut body = serializer.serialize_struct("BodySpec", 1)?;
        body.serialize_field("content", &ContentMap(&self.content))?;
        body.end()
    }
}

/// Responses keyed by status code.
pub type Responses = BTreeMap<String, BodySpec>;

/// Converts between transport values and handler values, and describes
/// both sides for documentation.
///
/// Every method is mandatory; [`Passthrough`] is the no-op implementation.
pub trait ParamTransformer: fmt::Debug + Send + Sync {
    /// Turn raw request parameters into the handler's input.
    fn from_params(&self, ctx: &dyn SchemaProvider, params: Value) -> Result<Value, TransformError>;

    /// Turn the handler's result into the payload returned to the host.
    fn to_response(
        &self,
        ctx: &dyn SchemaProvider,
        result: Payload,
    ) -> Result<Payload, TransformError>;

    /// Query parameters, in declaration order.
    fn query_parameters(
        &self,
        ctx: &dyn SchemaProvider,
    ) -> Result<Vec<ParameterSpec>, TransformError>;

    fn request_body(&self, ctx: &dyn SchemaProvider) -> Result<BodySpec, TransformError>;

    fn responses(&self, ctx: &dyn SchemaProvider) -> Result<Responses, TransformError>;
}

/// Identity transformer with nothing to document.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl ParamTransformer for Passthrough {
    fn from_params(&self, _ctx: &dyn SchemaProvider, params: Value) -> Result<Value, TransformError> {
        Ok(params)
    }

    fn to_response(
        &self,
        _ctx: &dyn SchemaProvider,
        result: Payload,
    ) -> Result<Payload, TransformError> {
        Ok(result)
    }

    fn query_parameters(
        &self,
        _ctx: &dyn SchemaProvider,
    ) -> Result<Vec<ParameterSpec>, TransformError> {
        Ok(Vec::new())
    }

    fn request_body(&self, _ctx: &dyn SchemaProvider) -> Result<BodySpec, TransformError> {
        Ok(BodySpec::new())
    }

    fn responses(&self, _ctx: &dyn SchemaProvider) -> Result<Responses, TransformError> {
        Ok(Responses::new())
    }
}
