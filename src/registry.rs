//! Startup registry of route descriptors keyed by handler identity.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use tracing::debug;

use crate::error::RegistryError;
use crate::route::{BoundMethod, RouteDescriptor};

/// A descriptor registered under `owner.name`.
#[derive(Debug, Clone)]
pub struct RegisteredRoute {
    pub owner: String,
    pub name: String,
    pub descriptor: Arc<RouteDescriptor>,
}

impl RegisteredRoute {
    /// `owner.name`, the handler identity.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.owner, self.name)
    }
}

/// Descriptor set populated once at startup and read-only afterwards.
///
/// Within an owner, every `(path, verb)` pair maps to exactly one handler.
#[derive(Debug, Clone, Default)]
pub struct RouteRegistry {
    entries: Vec<RegisteredRoute>,
    by_route: HashMap<(String, String, Method), usize>,
    by_name: HashMap<(String, String), usize>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `descriptor` for handler `owner.name`.
    ///
    /// Nothing is registered when an error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if the handler name or any of its
    /// `(path, verb)` pairs is already taken within `owner`.
    pub fn register(
        &mut self,
        owner: impl Into<String>,
        name: impl Into<String>,
        descriptor: Arc<RouteDescriptor>,
    ) -> Result<&RegisteredRoute, RegistryError> {
        let owner = owner.into();
        let name = name.into();

        if self.by_name.contains_key(&(owner.clone(), name.clone())) {
            return Err(RegistryError::DuplicateHandler { owner, name });
        }
        for (path, verb) in descriptor.routes() {
            let key = (owner.clone(), path.clone(), verb.clone());
            if let Some(&index) = self.by_route.get(&key) {
                return Err(RegistryError::DuplicateRoute {
                    owner,
                    path: path.clone(),
                    verb: verb.clone(),
                    existing: self.entries[index].name.clone(),
                });
            }
        }

        let index = self.entries.len();
        for (path, verb) in descriptor.routes() {
            self.by_route
                .insert((owner.clone(), path.clone(), verb.clone()), index);
        }
        self.by_name.insert((owner.clone(), name.clone()), index);
        debug!(%owner, %name, routes = descriptor.routes().len(), "registered route");

        self.entries.push(RegisteredRoute {
            owner,
            name,
            descriptor,
        });
        Ok(&self.entries[index])
    }

    /// Register the descriptor carried by a bound handler.
    pub fn register_bound<F>(
        &mut self,
        owner: impl Into<String>,
        name: impl Into<String>,
        bound: &BoundMethod<F>,
    ) -> Result<&RegisteredRoute, RegistryError> {
        self.register(owner, name, Arc::clone(bound.descriptor()))
    }

    /// Handler bound to `verb path` within `owner`.
    pub fn lookup(&self, owner: &str, path: &str, verb: &Method) -> Option<&RegisteredRoute> {
        self.by_route
            .get(&(owner.to_string(), path.to_string(), verb.clone()))
            .map(|&index| &self.entries[index])
    }

    /// Handler registered as `owner.name`.
    pub fn handler(&self, owner: &str, name: &str) -> Option<&RegisteredRoute> {
        self.by_name
            .get(&(owner.to_string(), name.to_string()))
            .map(|&index| &self.entries[index])
    }

    /// All entries in registration order.
    pub fn entries(&self) -> &[RegisteredRoute] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::bind_route;

    fn descriptor(path: &str, verb: Method) -> Arc<RouteDescriptor> {
        Arc::new(bind_route([(path, verb)]).build())
    }

    #[test]
    fn lookup_by_route_and_name() {
        let mut registry = RouteRegistry::new();
        registry
            .register("pets", "search", descriptor("/pets", Method::GET))
            .unwrap();
        registry
            .register("pets", "create", descriptor("/pets", Method::POST))
            .unwrap();

        let found = registry.lookup("pets", "/pets", &Method::POST).unwrap();
        assert_eq!(found.name, "create");
        assert_eq!(found.qualified_name(), "pets.create");
        assert!(registry.handler("pets", "search").is_some());
        assert!(registry.lookup("pets", "/pets", &Method::DELETE).is_none());
    }

    #[test]
    fn same_route_in_another_owner_is_allowed() {
        let mut registry = RouteRegistry::new();
        registry
            .register("pets", "search", descriptor("/search", Method::GET))
            .unwrap();
        registry
            .register("users", "search", descriptor("/search", Method::GET))
            .unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn duplicate_route_is_rejected_atomically() {
        let mut registry = RouteRegistry::new();
        registry
            .register("pets", "search", descriptor("/pets", Method::GET))
            .unwrap();

        let both = Arc::new(bind_route([("/other", Method::GET), ("/pets", Method::GET)]).build());
        let err = registry.register("pets", "list", both).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateRoute { ref existing, .. } if existing == "search"));
        assert!(registry.lookup("pets", "/other", &Method::GET).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_handler_is_rejected() {
        let mut registry = RouteRegistry::new();
        registry
            .register("pets", "search", descriptor("/a", Method::GET))
            .unwrap();
        let err = registry
            .register("pets", "search", descriptor("/b", Method::GET))
            .unwrap_err();
        assert_eq!(err.to_string(), "pets.search is already registered");
    }

    #[test]
    fn bound_handlers_share_their_descriptor() {
        let bound = bind_route([("/a", Method::GET)]).bind(|| ());
        let mut registry = RouteRegistry::new();
        let entry = registry.register_bound("svc", "a", &bound).unwrap();
        assert!(Arc::ptr_eq(&entry.descriptor, bound.descriptor()));
    }
}
