//! Placeholder values backed by the [config] crate, so the same sources which configure the
//! framework (files, environment) can also provide values for object properties.

use crate::config::environment_config;
use config::{Config, ConfigError};
use derive_more::Constructor;
use spring_fluent::placeholder::VariableSource;

/// [VariableSource] resolving variables as string values of a [Config]. Nested keys use the
/// `config` path syntax, e.g. `${database.url}`.
#[derive(Clone, Debug, Constructor)]
pub struct ConfigVariableSource {
    config: Config,
}

impl ConfigVariableSource {
    /// Creates a source reading `spring-fluent.json` and `SPRING_FLUENT_` environment variables.
    pub fn from_environment() -> Result<Self, ConfigError> {
        environment_config().map(Self::new)
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl VariableSource for ConfigVariableSource {
    fn can_resolve_variable(&self, name: &str) -> bool {
        self.config.get_string(name).is_ok()
    }

    fn resolve_variable(&self, name: &str) -> Option<String> {
        self.config.get_string(name).ok()
    }
}
