//! Raw binary payloads.

use http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderName, HeaderValue};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::TransformError;
use crate::provider::SchemaProvider;
use crate::transform::{BodySpec, ParamTransformer, ParameterSpec, Payload, Responses};

/// Media type used when none, or more than one, is declared.
pub const ANY_MEDIA_TYPE: &str = "*/*";

const X_CONTENT_TYPE_OPTIONS: HeaderName = HeaderName::from_static("x-content-type-options");
const ATTACHMENT: &str = "attachment; filename=file";

/// Binary passthrough: parameters are not field-validated and raw handler
/// output is wrapped into a download response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPayload {
    media_types: Vec<String>,
    required: bool,
}

impl RawPayload {
    /// An empty media type list falls back to `*/*`.
    pub fn new<I, S>(media_types: I, required: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut media_types: Vec<String> = media_types.into_iter().map(Into::into).collect();
        if media_types.is_empty() {
            media_types.push(ANY_MEDIA_TYPE.to_string());
        }
        Self {
            media_types,
            required,
        }
    }

    /// Single media type, not required.
    pub fn of(media_type: impl Into<String>) -> Self {
        Self::new([media_type.into()], false)
    }

    pub fn media_types(&self) -> &[String] {
        &self.media_types
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// `Content-Type` of wrapped responses.
    fn response_media_type(&self) -> &str {
        match self.media_types.as_slice() {
            [single] => single,
            _ => ANY_MEDIA_TYPE,
        }
    }

    fn binary_content(&self) -> BodySpec {
        self.media_types.iter().fold(BodySpec::new(), |body, mt| {
            body.with_content(
                mt.clone(),
                json!({
                    "type": "string",
                    "format": "binary",
                    "required": self.required,
                }),
            )
        })
    }

    fn to_http_response(&self, body: Vec<u8>) -> Result<http::Response<Vec<u8>>, TransformError> {
        let media_type = self.response_media_type();
        let content_type =
            HeaderValue::from_str(media_type).map_err(|_| TransformError::InvalidMediaType {
                media_type: media_type.to_string(),
            })?;
        let length = body.len();

        let mut response = http::Response::new(body);
        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, content_type);
        headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        headers.insert(CONTENT_DISPOSITION, HeaderValue::from_static(ATTACHMENT));
        headers.insert(CONTENT_LENGTH, HeaderValue::from(length));

        debug!(media_type, length, "wrapped raw payload into response");
        Ok(response)
    }
}

impl Default for RawPayload {
    fn default() -> Self {
        Self::new([ANY_MEDIA_TYPE], false)
    }
}

impl ParamTransformer for RawPayload {
    fn from_params(&self, _ctx: &dyn SchemaProvider, params: Value) -> Result<Value, TransformError> {
        Ok(params)
    }

    fn to_response(
        &self,
        _ctx: &dyn SchemaProvider,
        result: Payload,
    ) -> Result<Payload, TransformError> {
        match result {
            Payload::Http(response) => Ok(Payload::Http(response)),
            Payload::Bytes(bytes) => self.to_http_response(bytes).map(Payload::Http),
            Payload::Json(Value::String(text)) => {
                self.to_http_response(text.into_bytes()).map(Payload::Http)
            }
            other => Err(TransformError::UnsupportedPayload {
                transformer: "raw payload",
                actual: other.kind(),
            }),
        }
    }

    fn query_parameters(
        &self,
        _ctx: &dyn SchemaProvider,
    ) -> Result<Vec<ParameterSpec>, TransformError> {
        Ok(Vec::new())
    }

    fn request_body(&self, _ctx: &dyn SchemaProvider) -> Result<BodySpec, TransformError> {
        Ok(self.binary_content())
    }

    fn responses(&self, _ctx: &dyn SchemaProvider) -> Result<Responses, TransformError> {
        Ok(Responses::from([("200".to_string(), self.binary_content())]))
    }
}
