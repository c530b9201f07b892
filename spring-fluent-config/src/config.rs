//! Context configuration loaded from the environment. Values start with opinionated defaults, which
//! can then be overwritten by the optional `spring-fluent.json` file and environment variables
//! prefixed with `SPRING_FLUENT_` (in that order of precedence).

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use spring_fluent::context::ContextConfig;

const CONFIG_ENV_PREFIX: &str = "SPRING_FLUENT";

/// Name of the default config file.
pub const CONFIG_FILE: &str = "spring-fluent.json";

/// Settings for application contexts and their supporting infrastructure.
#[non_exhaustive]
#[derive(Clone, Debug)]
pub struct FluentConfig {
    /// Should a default tracing logger be installed when creating a context.
    pub install_tracing_logger: bool,

    pub context: ContextConfig,
}

impl Default for FluentConfig {
    fn default() -> Self {
        Self {
            install_tracing_logger: true,
            context: ContextConfig::default(),
        }
    }
}

impl From<OptionalFluentConfig> for FluentConfig {
    fn from(value: OptionalFluentConfig) -> Self {
        let default = Self::default();
        let context = default.context;

        let (placeholder_prefix, placeholder_suffix) = (
            value
                .placeholder_prefix
                .unwrap_or(context.placeholder_prefix.clone()),
            value
                .placeholder_suffix
                .unwrap_or(context.placeholder_suffix.clone()),
        );

        Self {
            install_tracing_logger: value
                .install_tracing_logger
                .unwrap_or(default.install_tracing_logger),
            context: ContextConfig::new()
                .with_allow_definition_overriding(
                    value
                        .allow_definition_overriding
                        .unwrap_or(context.allow_definition_overriding),
                )
                .with_ignore_unresolvable_placeholders(
                    value
                        .ignore_unresolvable_placeholders
                        .unwrap_or(context.ignore_unresolvable_placeholders),
                )
                .with_placeholder_delimiters(placeholder_prefix, placeholder_suffix),
        }
    }
}

impl FluentConfig {
    /// Reads the config from [CONFIG_FILE] and `SPRING_FLUENT_` environment variables.
    pub fn init_from_environment() -> Result<Self, ConfigError> {
        environment_config().and_then(|config| Self::from_config(&config))
    }

    /// Reads the config from an already built [Config]. Missing keys keep their default values.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        config
            .clone()
            .try_deserialize::<OptionalFluentConfig>()
            .map(|config| config.into())
    }
}

pub(crate) fn environment_config() -> Result<Config, ConfigError> {
    Config::builder()
        .add_source(File::with_name(CONFIG_FILE).required(false))
        .add_source(Environment::with_prefix(CONFIG_ENV_PREFIX))
        .build()
}

#[derive(Deserialize)]
struct OptionalFluentConfig {
    install_tracing_logger: Option<bool>,
    allow_definition_overriding: Option<bool>,
    ignore_unresolvable_placeholders: Option<bool>,
    placeholder_prefix: Option<String>,
    placeholder_suffix: Option<String>,
}
