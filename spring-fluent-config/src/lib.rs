//! Environment-driven bootstrapping for [spring_fluent] application contexts.
//!
//! [create_default](context::create_default) reads [FluentConfig](config::FluentConfig) from
//! `spring-fluent.json` and `SPRING_FLUENT_` environment variables, optionally installs a tracing
//! logger and registers a [ConfigVariableSource](variable_source::ConfigVariableSource), so
//! `${placeholders}` in object definitions can be filled from the same sources.

pub mod config;
pub mod context;
pub mod logging;
pub mod variable_source;
