//! Route descriptors and the binding of handlers to them.
//!
//! Binding never fails: descriptors are plain metadata and anything
//! malformed in them surfaces only when a request or a documentation
//! build exercises it.
//!
//! ```
//! use http::Method;
//! use restbind::{bind_route, AuthMode, FieldRule, Payload, Rules, SchemaValidating};
//! use serde_json::json;
//!
//! let search = bind_route([(vec!["/pets", "/animals"], Method::GET)])
//!     .input(SchemaValidating::new(
//!         Rules::new().field("name", FieldRule::string()),
//!     ))
//!     .auth(AuthMode::ApiKey)
//!     .cors("*")
//!     .bind(|_ctx: &restbind::NoSchemas, params: serde_json::Value| {
//!         Ok::<_, std::convert::Infallible>(Payload::Json(json!([params])))
//!     });
//!
//! // OPTIONS is added for every path because CORS is enabled.
//! assert_eq!(search.descriptor().routes().len(), 4);
//! ```

use std::sync::Arc;

use http::Method;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::error::TransformError;
use crate::provider::SchemaProvider;
use crate::transform::{ParamTransformer, Passthrough, Payload};
use crate::types::AuthMode;

/// Transformer shared between a descriptor and its clones.
pub type SharedTransformer = Arc<dyn ParamTransformer>;

/// One or more paths of a route spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathList(Vec<String>);

impl From<&str> for PathList {
    fn from(path: &str) -> Self {
        PathList(vec![path.to_string()])
    }
}

impl From<String> for PathList {
    fn from(path: String) -> Self {
        PathList(vec![path])
    }
}

impl<S: Into<String>> From<Vec<S>> for PathList {
    fn from(paths: Vec<S>) -> Self {
        PathList(paths.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for PathList {
    fn from(paths: [S; N]) -> Self {
        PathList(paths.into_iter().map(Into::into).collect())
    }
}

/// One or more verbs of a route spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerbList(Vec<Method>);

impl From<Method> for VerbList {
    fn from(verb: Method) -> Self {
        VerbList(vec![verb])
    }
}

impl From<Vec<Method>> for VerbList {
    fn from(verbs: Vec<Method>) -> Self {
        VerbList(verbs)
    }
}

impl<const N: usize> From<[Method; N]> for VerbList {
    fn from(verbs: [Method; N]) -> Self {
        VerbList(verbs.into())
    }
}

/// `(paths, verbs)` as written at the binding site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    pub paths: Vec<String>,
    pub verbs: Vec<Method>,
}

impl RouteSpec {
    pub fn new(paths: impl Into<PathList>, verbs: impl Into<VerbList>) -> Self {
        Self {
            paths: paths.into().0,
            verbs: verbs.into().0,
        }
    }
}

impl<P: Into<PathList>, V: Into<VerbList>> From<(P, V)> for RouteSpec {
    fn from((paths, verbs): (P, V)) -> Self {
        RouteSpec::new(paths, verbs)
    }
}

/// Recognized route options plus host passthrough data.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RouteOptions {
    /// Authentication mode; documentation falls back to its default when unset.
    pub auth: Option<AuthMode>,
    /// `Access-Control-Allow-Origin` value. Setting it adds `OPTIONS`.
    pub cors: Option<String>,
    pub csrf: bool,
    pub save_session: bool,
    /// Keys consumed by the host router only.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            auth: None,
            cors: None,
            csrf: false,
            save_session: true,
            extra: Map::new(),
        }
    }
}

/// Immutable routing metadata attached to a handler.
#[derive(Debug, Clone)]
pub struct RouteDescriptor {
    routes: Vec<(String, Method)>,
    input: Option<SharedTransformer>,
    output: Option<SharedTransformer>,
    options: RouteOptions,
}

impl RouteDescriptor {
    /// Normalize route specs into deduplicated `(path, verb)` pairs.
    ///
    /// Each spec contributes `paths × verbs`, with `OPTIONS` appended to
    /// its verbs when CORS is enabled. A spec without verbs stands for `GET`.
    pub fn new<I, R>(
        routes: I,
        input: Option<SharedTransformer>,
        output: Option<SharedTransformer>,
        options: RouteOptions,
    ) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<RouteSpec>,
    {
        let mut pairs: Vec<(String, Method)> = Vec::new();

        for spec in routes.into_iter().map(Into::into) {
            let mut verbs: Vec<Method> = Vec::new();
            for verb in spec.verbs {
                if !verbs.contains(&verb) {
                    verbs.push(verb);
                }
            }
            if verbs.is_empty() {
                verbs.push(Method::GET);
            }
            if options.cors.is_some() && !verbs.contains(&Method::OPTIONS) {
                verbs.push(Method::OPTIONS);
            }

            for path in &spec.paths {
                for verb in &verbs {
                    let pair = (path.clone(), verb.clone());
                    if !pairs.contains(&pair) {
                        pairs.push(pair);
                    }
                }
            }
        }

        Self {
            routes: pairs,
            input,
            output,
            options,
        }
    }

    pub fn routes(&self) -> &[(String, Method)] {
        &self.routes
    }

    /// Distinct paths in declaration order.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = Vec::new();
        for (path, _) in &self.routes {
            if !paths.contains(&path.as_str()) {
                paths.push(path);
            }
        }
        paths
    }

    /// Distinct verbs in declaration order.
    pub fn verbs(&self) -> Vec<&Method> {
        let mut verbs: Vec<&Method> = Vec::new();
        for (_, verb) in &self.routes {
            if !verbs.contains(&verb) {
                verbs.push(verb);
            }
        }
        verbs
    }

    pub fn serves(&self, path: &str, verb: &Method) -> bool {
        self.routes.iter().any(|(p, v)| p == path && v == verb)
    }

    pub fn input(&self) -> Option<&dyn ParamTransformer> {
        self.input.as_deref()
    }

    pub fn output(&self) -> Option<&dyn ParamTransformer> {
        self.output.as_deref()
    }

    /// Input transformer, or [`Passthrough`] when none is declared.
    pub fn input_or_passthrough(&self) -> &dyn ParamTransformer {
        self.input.as_deref().unwrap_or(&Passthrough)
    }

    /// Output transformer, or [`Passthrough`] when none is declared.
    pub fn output_or_passthrough(&self) -> &dyn ParamTransformer {
        self.output.as_deref().unwrap_or(&Passthrough)
    }

    pub fn options(&self) -> &RouteOptions {
        &self.options
    }

    pub fn auth(&self) -> Option<&AuthMode> {
        self.options.auth.as_ref()
    }
}

/// Start binding a handler to `routes`.
pub fn bind_route<I, R>(routes: I) -> RouteDecorator
where
    I: IntoIterator<Item = R>,
    R: Into<RouteSpec>,
{
    RouteDecorator {
        routes: routes.into_iter().map(Into::into).collect(),
        input: None,
        output: None,
        options: RouteOptions::default(),
    }
}

/// Collects transformers and options before producing a descriptor.
#[derive(Debug, Clone)]
pub struct RouteDecorator {
    routes: Vec<RouteSpec>,
    input: Option<SharedTransformer>,
    output: Option<SharedTransformer>,
    options: RouteOptions,
}

impl RouteDecorator {
    pub fn input(self, transformer: impl ParamTransformer + 'static) -> Self {
        self.input_shared(Arc::new(transformer))
    }

    pub fn input_shared(mut self, transformer: SharedTransformer) -> Self {
        self.input = Some(transformer);
        self
    }

    pub fn output(self, transformer: impl ParamTransformer + 'static) -> Self {
        self.output_shared(Arc::new(transformer))
    }

    pub fn output_shared(mut self, transformer: SharedTransformer) -> Self {
        self.output = Some(transformer);
        self
    }

    /// Replace all options at once.
    pub fn options(mut self, options: RouteOptions) -> Self {
        self.options = options;
        self
    }

    pub fn auth(mut self, auth: AuthMode) -> Self {
        self.options.auth = Some(auth);
        self
    }

    pub fn cors(mut self, origin: impl Into<String>) -> Self {
        self.options.cors = Some(origin.into());
        self
    }

    pub fn csrf(mut self, csrf: bool) -> Self {
        self.options.csrf = csrf;
        self
    }

    pub fn save_session(mut self, save: bool) -> Self {
        self.options.save_session = save;
        self
    }

    /// Host-specific passthrough option.
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.extra.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> RouteDescriptor {
        RouteDescriptor::new(self.routes, self.input, self.output, self.options)
    }

    /// Attach the descriptor to `handler`.
    pub fn bind<F>(self, handler: F) -> BoundMethod<F> {
        let descriptor = Arc::new(self.build());
        debug!(routes = descriptor.routes().len(), "bound handler");
        BoundMethod {
            descriptor,
            handler,
        }
    }
}

/// Failure of a full transform-call-transform cycle.
#[derive(Debug, Error)]
pub enum InvokeError<E> {
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// Error returned by the handler itself, unchanged.
    #[error("handler failed: {0}")]
    Handler(E),
}

/// A handler together with its route descriptor.
#[derive(Debug, Clone)]
pub struct BoundMethod<F> {
    descriptor: Arc<RouteDescriptor>,
    handler: F,
}

impl<F> BoundMethod<F> {
    pub fn descriptor(&self) -> &Arc<RouteDescriptor> {
        &self.descriptor
    }

    /// The handler as it was passed to [`RouteDecorator::bind`].
    pub fn original(&self) -> &F {
        &self.handler
    }

    pub fn into_original(self) -> F {
        self.handler
    }

    /// Call the handler directly, bypassing transformers.
    pub fn call<C, E>(&self, ctx: &C, input: Value) -> Result<Payload, E>
    where
        F: Fn(&C, Value) -> Result<Payload, E>,
    {
        (self.handler)(ctx, input)
    }

    /// Run the host control flow: input transformer, handler, output transformer.
    ///
    /// Missing transformers behave as [`Passthrough`].
    pub fn invoke<C, E>(&self, ctx: &C, params: Value) -> Result<Payload, InvokeError<E>>
    where
        C: SchemaProvider,
        F: Fn(&C, Value) -> Result<Payload, E>,
    {
        let input = self
            .descriptor
            .input_or_passthrough()
            .from_params(ctx, params)?;
        let result = (self.handler)(ctx, input).map_err(InvokeError::Handler)?;
        Ok(self
            .descriptor
            .output_or_passthrough()
            .to_response(ctx, result)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::NoSchemas;
    use crate::rules::{FieldRule, Rules};
    use crate::validating::SchemaValidating;
    use serde_json::json;

    fn pairs(descriptor: &RouteDescriptor) -> Vec<(&str, &str)> {
        descriptor
            .routes()
            .iter()
            .map(|(p, v)| (p.as_str(), v.as_str()))
            .collect()
    }

    #[test]
    fn single_path_and_verb() {
        let descriptor = bind_route([("/pets", Method::GET)]).build();
        assert_eq!(pairs(&descriptor), [("/pets", "GET")]);
    }

    #[test]
    fn cross_product_of_paths_and_verbs() {
        let descriptor =
            bind_route([(vec!["/a", "/b"], vec![Method::GET, Method::POST])]).build();
        assert_eq!(
            pairs(&descriptor),
            [("/a", "GET"), ("/a", "POST"), ("/b", "GET"), ("/b", "POST")]
        );
    }

    #[test]
    fn duplicates_are_removed() {
        let descriptor = bind_route([
            RouteSpec::new("/a", vec![Method::GET, Method::GET]),
            RouteSpec::new(["/a"], Method::GET),
        ])
        .build();
        assert_eq!(pairs(&descriptor), [("/a", "GET")]);
    }

    #[test]
    fn cors_adds_options_once() {
        let descriptor = bind_route([("/a", Method::POST)]).cors("*").build();
        assert_eq!(pairs(&descriptor), [("/a", "POST"), ("/a", "OPTIONS")]);

        let descriptor = bind_route([("/a", vec![Method::OPTIONS, Method::GET])])
            .cors("https://example.com")
            .build();
        assert_eq!(pairs(&descriptor), [("/a", "OPTIONS"), ("/a", "GET")]);
    }

    #[test]
    fn no_options_without_cors() {
        let descriptor = bind_route([("/a", Method::GET)]).build();
        assert!(!descriptor.serves("/a", &Method::OPTIONS));
    }

    #[test]
    fn empty_verbs_mean_get() {
        let descriptor = bind_route([("/a", Vec::<Method>::new())]).build();
        assert_eq!(pairs(&descriptor), [("/a", "GET")]);
    }

    #[test]
    fn option_defaults() {
        let options = RouteOptions::default();
        assert!(!options.csrf);
        assert!(options.save_session);
        assert!(options.auth.is_none());
        assert!(options.cors.is_none());
    }

    #[test]
    fn options_deserialize_with_passthrough() {
        let options: RouteOptions = serde_json::from_value(json!({
            "auth": "api_key",
            "csrf": true,
            "website": true
        }))
        .unwrap();
        assert_eq!(options.auth, Some(AuthMode::ApiKey));
        assert!(options.csrf);
        assert!(options.save_session);
        assert_eq!(options.extra["website"], json!(true));
    }

    #[test]
    fn bound_method_behaves_like_the_handler() {
        let bound = bind_route([("/echo", Method::POST)]).bind(
            |_ctx: &NoSchemas, input: Value| -> Result<Payload, String> {
                if input.is_null() {
                    Err("empty".into())
                } else {
                    Ok(Payload::Json(input))
                }
            },
        );

        let out = bound.call(&NoSchemas, json!({ "a": 1 })).unwrap();
        assert_eq!(out.into_json().unwrap(), json!({ "a": 1 }));
        assert_eq!(bound.call(&NoSchemas, Value::Null).unwrap_err(), "empty");

        let original = bound.original();
        assert!(original(&NoSchemas, json!(1)).is_ok());
    }

    #[test]
    fn invoke_runs_both_transformers() {
        let bound = bind_route([("/pets", Method::GET)])
            .input(SchemaValidating::new(
                Rules::new().field("limit", FieldRule::integer().default_value(10)),
            ))
            .output(SchemaValidating::new(
                Rules::new().field("count", FieldRule::integer().required()),
            ))
            .bind(|_ctx: &NoSchemas, input: Value| {
                Ok::<_, String>(Payload::Json(json!({ "count": input["limit"], "debug": true })))
            });

        let out = bound.invoke(&NoSchemas, json!({})).unwrap();
        assert_eq!(out.into_json().unwrap(), json!({ "count": 10 }));
    }

    #[test]
    fn invoke_surfaces_each_failure_kind() {
        let bound = bind_route([("/pets", Method::GET)])
            .input(SchemaValidating::new(
                Rules::new().field("limit", FieldRule::integer()),
            ))
            .output(SchemaValidating::new(
                Rules::new().field("count", FieldRule::integer().required()),
            ))
            .bind(|_ctx: &NoSchemas, input: Value| {
                if input.get("limit").is_some() {
                    Ok(Payload::Json(json!({})))
                } else {
                    Err("no limit")
                }
            });

        let err = bound.invoke(&NoSchemas, json!({ "limit": "x" })).unwrap_err();
        assert!(matches!(err, InvokeError::Transform(TransformError::Validation(_))));

        let err = bound.invoke(&NoSchemas, json!({})).unwrap_err();
        assert!(matches!(err, InvokeError::Handler("no limit")));

        let err = bound.invoke(&NoSchemas, json!({ "limit": 1 })).unwrap_err();
        assert!(matches!(
            err,
            InvokeError::Transform(TransformError::InternalContract(_))
        ));
    }
}
