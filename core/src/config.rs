//! Ambient configuration (builder style, matching the teacher's
//! `migrations/src/config` module): schema name, statement timeout, and
//! the default identity generation used when a column tag doesn't spell
//! one out explicitly.

use std::time::Duration;

use crate::schema::IdentityGeneration;

/// Configuration threaded into `Introspector`/`Planner` entry points
/// (`pebble-migrate`) and used by the pool handle to pick the schema new
/// tables are assumed to live in.
#[derive(Debug, Clone, PartialEq)]
pub struct PebbleConfig {
    pub schema: String,
    pub statement_timeout: Option<Duration>,
    pub default_identity_generation: IdentityGeneration,
}

impl Default for PebbleConfig {
    fn default() -> Self {
        Self {
            schema: "public".to_string(),
            statement_timeout: None,
            default_identity_generation: IdentityGeneration::ByDefault,
        }
    }
}

impl PebbleConfig {
    pub fn builder() -> PebbleConfigBuilder {
        PebbleConfigBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PebbleConfigBuilder {
    config: PebbleConfig,
}

impl PebbleConfigBuilder {
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.config.schema = schema.into();
        self
    }

    pub fn statement_timeout(mut self, timeout: Duration) -> Self {
        self.config.statement_timeout = Some(timeout);
        self
    }

    pub fn default_identity_generation(mut self, generation: IdentityGeneration) -> Self {
        self.config.default_identity_generation = generation;
        self
    }

    pub fn build(self) -> PebbleConfig {
        self.config
    }
}
