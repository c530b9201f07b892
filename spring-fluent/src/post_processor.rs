//! Hooks into object creation. [ObjectPostProcessor]s see every object created by a factory, while
//! [ObjectFactoryPostProcessor]s run once over all definitions before any singleton is created.

use crate::error::ContextError;
use crate::instance_provider::{ErrorPtr, ObjectInstance, ObjectInstanceBox};
use crate::object_registry::ObjectDefinitionRegistry;
use derivative::Derivative;
#[cfg(test)]
use mockall::automock;
use std::sync::Arc;

/// Processor called for each created object, before and after its init callback. Both stages may
/// return a different instance than the one received, which then replaces the original.
#[cfg_attr(test, automock)]
pub trait ObjectPostProcessor {
    /// Called with the fully configured object, before its init callback runs. The object is not
    /// shared with anyone at this point.
    fn post_process_before_initialization(
        &self,
        instance: ObjectInstanceBox,
        name: &str,
    ) -> Result<ObjectInstanceBox, ErrorPtr> {
        let _ = name;
        Ok(instance)
    }

    /// Called with the initialized object, before it's stored in its scope.
    fn post_process_after_initialization(
        &self,
        instance: ObjectInstance,
        name: &str,
    ) -> Result<ObjectInstance, ErrorPtr> {
        let _ = name;
        Ok(instance)
    }
}

pub type ObjectPostProcessorPtr = Arc<dyn ObjectPostProcessor + Send + Sync>;

pub type BeforeInitializationCallback =
    Arc<dyn Fn(ObjectInstanceBox, &str) -> Result<ObjectInstanceBox, ErrorPtr> + Send + Sync>;

pub type AfterInitializationCallback =
    Arc<dyn Fn(ObjectInstance, &str) -> Result<ObjectInstance, ErrorPtr> + Send + Sync>;

/// [ObjectPostProcessor] delegating to optional callbacks. Missing callbacks pass the instance
/// through unchanged.
#[derive(Clone, Default, Derivative)]
#[derivative(Debug)]
pub struct ObjectPostProcessorAdapter {
    #[derivative(Debug = "ignore")]
    before_initialization: Option<BeforeInitializationCallback>,
    #[derivative(Debug = "ignore")]
    after_initialization: Option<AfterInitializationCallback>,
}

impl ObjectPostProcessorAdapter {
    pub fn new(
        before_initialization: Option<BeforeInitializationCallback>,
        after_initialization: Option<AfterInitializationCallback>,
    ) -> Self {
        Self {
            before_initialization,
            after_initialization,
        }
    }

    pub fn before_initialization(callback: BeforeInitializationCallback) -> Self {
        Self::new(Some(callback), None)
    }

    pub fn after_initialization(callback: AfterInitializationCallback) -> Self {
        Self::new(None, Some(callback))
    }
}

impl ObjectPostProcessor for ObjectPostProcessorAdapter {
    fn post_process_before_initialization(
        &self,
        instance: ObjectInstanceBox,
        name: &str,
    ) -> Result<ObjectInstanceBox, ErrorPtr> {
        match &self.before_initialization {
            Some(callback) => callback(instance, name),
            None => Ok(instance),
        }
    }

    fn post_process_after_initialization(
        &self,
        instance: ObjectInstance,
        name: &str,
    ) -> Result<ObjectInstance, ErrorPtr> {
        match &self.after_initialization {
            Some(callback) => callback(instance, name),
            None => Ok(instance),
        }
    }
}

/// Processor which can modify object definitions after they have been registered, but before
/// any object is created.
pub trait ObjectFactoryPostProcessor {
    fn post_process_object_factory(
        &self,
        registry: &mut dyn ObjectDefinitionRegistry,
    ) -> Result<(), ContextError>;
}

pub type ObjectFactoryPostProcessorPtr = Arc<dyn ObjectFactoryPostProcessor + Send + Sync>;
