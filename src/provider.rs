//! Named schema resolution.
//!
//! A schema-validating transformer may refer to its schema by name. The
//! name is resolved on every call through the [`SchemaProvider`] supplied
//! by the owning context; providers that want caching do it themselves.

use std::collections::HashMap;

use crate::error::SchemaResolutionError;
use crate::rules::Rules;
use crate::types::Direction;
use crate::validator::Validator;

/// What a provider hands back for a named schema.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedSchema {
    Validator(Validator),
    Rules(Rules),
}

impl From<Validator> for ResolvedSchema {
    fn from(validator: Validator) -> Self {
        ResolvedSchema::Validator(validator)
    }
}

impl From<Rules> for ResolvedSchema {
    fn from(rules: Rules) -> Self {
        ResolvedSchema::Rules(rules)
    }
}

/// Capability of resolving schema names for a direction.
pub trait SchemaProvider {
    /// # Errors
    ///
    /// Returns [`SchemaResolutionError`] if `name` is unknown for `direction`.
    fn schema_for(
        &self,
        name: &str,
        direction: Direction,
    ) -> Result<ResolvedSchema, SchemaResolutionError>;
}

/// Provider for contexts that never use named schemas.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSchemas;

impl SchemaProvider for NoSchemas {
    fn schema_for(
        &self,
        name: &str,
        direction: Direction,
    ) -> Result<ResolvedSchema, SchemaResolutionError> {
        Err(SchemaResolutionError::UnknownSchema {
            name: name.to_string(),
            direction,
        })
    }
}

/// Fixed name → (input, output) schema table.
#[derive(Debug, Clone, Default)]
pub struct StaticSchemaProvider {
    schemas: HashMap<(String, Direction), ResolvedSchema>,
}

impl StaticSchemaProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the schema used for `name` in `direction`.
    pub fn with(
        mut self,
        name: impl Into<String>,
        direction: Direction,
        schema: impl Into<ResolvedSchema>,
    ) -> Self {
        self.insert(name, direction, schema);
        self
    }

    pub fn insert(
        &mut self,
        name: impl Into<String>,
        direction: Direction,
        schema: impl Into<ResolvedSchema>,
    ) {
        self.schemas.insert((name.into(), direction), schema.into());
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl SchemaProvider for StaticSchemaProvider {
    fn schema_for(
        &self,
        name: &str,
        direction: Direction,
    ) -> Result<ResolvedSchema, SchemaResolutionError> {
        self.schemas
            .get(&(name.to_string(), direction))
            .cloned()
            .ok_or_else(|| SchemaResolutionError::UnknownSchema {
                name: name.to_string(),
                direction,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::FieldRule;

    #[test]
    fn static_provider_is_direction_aware() {
        let provider = StaticSchemaProvider::new()
            .with(
                "pet",
                Direction::Input,
                Rules::new().field("name", FieldRule::string()),
            )
            .with(
                "pet",
                Direction::Output,
                Validator::new(Rules::new().field("id", FieldRule::integer())),
            );

        assert!(matches!(
            provider.schema_for("pet", Direction::Input),
            Ok(ResolvedSchema::Rules(_))
        ));
        assert!(matches!(
            provider.schema_for("pet", Direction::Output),
            Ok(ResolvedSchema::Validator(_))
        ));
    }

    #[test]
    fn unknown_names_fail() {
        let provider = StaticSchemaProvider::new();
        let err = provider.schema_for("ghost", Direction::Output).unwrap_err();
        assert_eq!(err.to_string(), "no output schema named \"ghost\"");

        assert!(NoSchemas.schema_for("ghost", Direction::Input).is_err());
    }
}
