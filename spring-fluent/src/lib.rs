//! Fluent configuration of an inversion-of-control container. Objects are described in code with
//! [builders](builder::ObjectDefinitionBuilder) obtained from a
//! [FluentApplicationContext](context::FluentApplicationContext), which then creates, wires and
//! manages them. See [context] for a complete example.

pub mod aop;
pub mod builder;
pub mod context;
pub mod error;
pub mod factory;
pub mod instance_provider;
pub mod object;
pub mod object_definition;
pub mod object_registry;
pub mod placeholder;
pub mod post_processor;
pub mod scope;

#[cfg(feature = "derive")]
pub use spring_fluent_derive::{object_alias, Object};
