//! Bootstrapping of application contexts configured by [FluentConfig].

use crate::config::FluentConfig;
use crate::logging::install_tracing_logger;
use crate::variable_source::ConfigVariableSource;
use config::ConfigError;
use spring_fluent::context::{FluentApplicationContext, FluentApplicationContextBuilder};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("Error loading configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Creates a context builder using the given config, installing the tracing logger if requested.
pub fn create_context_builder(config: &FluentConfig) -> FluentApplicationContextBuilder {
    if config.install_tracing_logger && !install_tracing_logger() {
        debug!("Global tracing subscriber already installed.");
    }

    FluentApplicationContextBuilder::new().with_config(config.context.clone())
}

/// Creates a context configured from the environment, which resolves placeholders using
/// [ConfigVariableSource::from_environment].
pub fn create_default() -> Result<FluentApplicationContext, BootstrapError> {
    let config = FluentConfig::init_from_environment()?;
    let mut context = create_context_builder(&config).build();
    context.add_variable_source(Arc::new(ConfigVariableSource::from_environment()?));

    Ok(context)
}
