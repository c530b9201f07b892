//! Application contexts tie everything together. A [FluentApplicationContext] collects object
//! definitions described with [builders](crate::builder), and on [refresh](ApplicationContext::refresh)
//! registers them in a fresh [ObjectFactory], runs factory post-processors (e.g. placeholder
//! substitution) and creates all eager singletons.
//!
//! ```
//! use spring_fluent::context::FluentApplicationContext;
//! use spring_fluent::instance_provider::ObjectPtr;
//! use spring_fluent::object_definition::AutowireMode;
//! use spring_fluent::{object_alias, Object};
//!
//! trait Repository: Send + Sync {
//!     fn name(&self) -> &str;
//! }
//!
//! #[derive(Object, Default)]
//! #[object(rename_all = "PascalCase")]
//! struct DefaultRepository {
//!     name: String,
//! }
//!
//! #[object_alias]
//! impl Repository for DefaultRepository {
//!     fn name(&self) -> &str {
//!         &self.name
//!     }
//! }
//!
//! #[derive(Object, Default)]
//! #[object(rename_all = "PascalCase")]
//! struct Service {
//!     repository: Option<ObjectPtr<dyn Repository>>,
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut context = FluentApplicationContext::new();
//!
//! context
//!     .register_object::<Service>("Service")
//!     .with_autowire_mode(AutowireMode::ByName);
//! context
//!     .register_object::<DefaultRepository>("Repository")
//!     .add_property_value("Name", "Mathias")?;
//!
//! context.refresh()?;
//!
//! let service = context.get_object::<Service>("Service")?;
//! assert_eq!(service.repository.as_ref().unwrap().name(), "Mathias");
//! # Ok(())
//! # }
//! ```

use crate::builder::ObjectDefinitionBuilder;
use crate::error::{ContextError, ObjectInstanceProviderError};
use crate::factory::{ObjectFactory, ObjectFactoryBuilder, ScopeFactoryPtr};
use crate::instance_provider::{
    ObjectInstance, ObjectInstanceProvider, ObjectPtr, TypedObjectInstanceProvider,
};
use crate::object::Object;
use crate::object_definition::ObjectDefinition;
use crate::object_registry::DefaultObjectDefinitionRegistry;
use crate::placeholder::{
    VariablePlaceholderConfigurer, VariableSourcePtr, DEFAULT_PLACEHOLDER_PREFIX,
    DEFAULT_PLACEHOLDER_SUFFIX,
};
use crate::post_processor::{ObjectFactoryPostProcessorPtr, ObjectPostProcessorPtr};
use std::any::TypeId;
use std::sync::Arc;
use tracing::{debug, info};

/// Name given to contexts which were not named explicitly.
pub const DEFAULT_CONTEXT_NAME: &str = "spring.root";

pub type ApplicationContextPtr = Box<dyn ApplicationContext + Send + Sync>;

/// Context managing the lifecycle of objects.
pub trait ApplicationContext: ObjectInstanceProvider {
    fn name(&self) -> &str;

    /// (Re)creates all objects. Already existing singletons are destroyed first.
    fn refresh(&mut self) -> Result<(), ContextError>;

    /// Refreshes all ancestors, starting from the root, and then this context.
    fn refresh_all(&mut self) -> Result<(), ContextError>;

    /// Destroys all singletons. The context can be refreshed again afterwards.
    fn close(&mut self);

    fn is_active(&self) -> bool;
}

/// Configuration for [FluentApplicationContext].
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct ContextConfig {
    /// Whether registering a name twice replaces the previous definition or fails.
    pub allow_definition_overriding: bool,

    /// Leave placeholders without a value as-is instead of failing the refresh.
    pub ignore_unresolvable_placeholders: bool,

    pub placeholder_prefix: String,

    pub placeholder_suffix: String,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            allow_definition_overriding: true,
            ignore_unresolvable_placeholders: false,
            placeholder_prefix: DEFAULT_PLACEHOLDER_PREFIX.to_string(),
            placeholder_suffix: DEFAULT_PLACEHOLDER_SUFFIX.to_string(),
        }
    }
}

impl ContextConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allow_definition_overriding(mut self, allow: bool) -> Self {
        self.allow_definition_overriding = allow;
        self
    }

    pub fn with_ignore_unresolvable_placeholders(mut self, ignore: bool) -> Self {
        self.ignore_unresolvable_placeholders = ignore;
        self
    }

    pub fn with_placeholder_delimiters<P: Into<String>, S: Into<String>>(
        mut self,
        prefix: P,
        suffix: S,
    ) -> Self {
        self.placeholder_prefix = prefix.into();
        self.placeholder_suffix = suffix.into();
        self
    }
}

pub(crate) struct ObjectDefinitionEntry {
    pub(crate) name: String,
    pub(crate) definition: ObjectDefinition,
    pub(crate) post_processors: Vec<ObjectPostProcessorPtr>,
}

/// Builder for [FluentApplicationContext].
pub struct FluentApplicationContextBuilder {
    name: String,
    config: ContextConfig,
    parent: Option<ApplicationContextPtr>,
    factory_builder: ObjectFactoryBuilder,
}

impl FluentApplicationContextBuilder {
    pub fn new() -> Self {
        Self {
            name: DEFAULT_CONTEXT_NAME.to_string(),
            config: ContextConfig::default(),
            parent: None,
            factory_builder: ObjectFactoryBuilder::new(),
        }
    }

    pub fn with_name<N: Into<String>>(mut self, name: N) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_config(mut self, config: ContextConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the context used to resolve names not defined in the built one.
    pub fn with_parent(mut self, parent: ApplicationContextPtr) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Adds a custom scope, which can then be used with
    /// [with_scope](ObjectDefinitionBuilder::with_scope).
    pub fn with_scope_factory<N: ToString>(mut self, name: N, factory: ScopeFactoryPtr) -> Self {
        self.factory_builder = self.factory_builder.with_scope_factory(name, factory);
        self
    }

    pub fn build(self) -> FluentApplicationContext {
        let mut factory = self.factory_builder.build();
        factory.set_parent(self.parent);

        FluentApplicationContext {
            name: self.name,
            config: self.config,
            entries: vec![],
            variable_placeholder_configurer: None,
            factory_post_processors: vec![],
            object_post_processors: vec![],
            factory,
            active: false,
        }
    }
}

impl Default for FluentApplicationContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Application context configured with the fluent builder API.
pub struct FluentApplicationContext {
    name: String,
    config: ContextConfig,
    entries: Vec<ObjectDefinitionEntry>,
    // position among factory post-processors at the time it was created
    variable_placeholder_configurer: Option<(usize, VariablePlaceholderConfigurer)>,
    factory_post_processors: Vec<ObjectFactoryPostProcessorPtr>,
    object_post_processors: Vec<ObjectPostProcessorPtr>,
    factory: ObjectFactory,
    active: bool,
}

impl FluentApplicationContext {
    /// Creates a context with default configuration and no parent.
    pub fn new() -> Self {
        FluentApplicationContextBuilder::new().build()
    }

    /// Creates a context resolving unknown names through the given parent.
    pub fn with_parent(parent: ApplicationContextPtr) -> Self {
        FluentApplicationContextBuilder::new()
            .with_parent(parent)
            .build()
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub fn parent(&self) -> Option<&ApplicationContextPtr> {
        self.factory.parent()
    }

    /// Starts describing a new object with the given name.
    pub fn register_object<T: Object>(&mut self, name: &str) -> ObjectDefinitionBuilder<'_, T> {
        self.push_entry(name, ObjectDefinition::new::<T>())
    }

    /// Starts describing a new object inheriting settings from the named parent definition.
    pub fn register_child_object<T: Object>(
        &mut self,
        name: &str,
        parent_name: &str,
    ) -> ObjectDefinitionBuilder<'_, T> {
        let mut definition = ObjectDefinition::new::<T>();
        definition.parent_name = Some(parent_name.to_string());
        self.push_entry(name, definition)
    }

    fn push_entry<T: Object>(
        &mut self,
        name: &str,
        definition: ObjectDefinition,
    ) -> ObjectDefinitionBuilder<'_, T> {
        debug!(context = self.name.as_str(), name, "Describing object.");

        self.entries.push(ObjectDefinitionEntry {
            name: name.to_string(),
            definition,
            post_processors: vec![],
        });

        let index = self.entries.len() - 1;
        ObjectDefinitionBuilder::new(self, index)
    }

    pub(crate) fn entry(&self, index: usize) -> &ObjectDefinitionEntry {
        &self.entries[index]
    }

    pub(crate) fn entry_mut(&mut self, index: usize) -> &mut ObjectDefinitionEntry {
        &mut self.entries[index]
    }

    pub(crate) fn is_name_taken(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.name == name) || self.factory.contains_object(name)
    }

    /// Adds a source of placeholder values. The first call creates a
    /// [VariablePlaceholderConfigurer] shared by all sources.
    pub fn add_variable_source(&mut self, source: VariableSourcePtr) -> &mut Self {
        let position = self.factory_post_processors.len();
        let config = &self.config;

        self.variable_placeholder_configurer
            .get_or_insert_with(|| {
                (
                    position,
                    VariablePlaceholderConfigurer::new()
                        .with_placeholder_prefix(config.placeholder_prefix.clone())
                        .with_placeholder_suffix(config.placeholder_suffix.clone())
                        .with_ignore_unresolvable_placeholders(
                            config.ignore_unresolvable_placeholders,
                        ),
                )
            })
            .1
            .add_variable_source(source);

        self
    }

    pub fn variable_placeholder_configurer(&self) -> Option<&VariablePlaceholderConfigurer> {
        self.variable_placeholder_configurer
            .as_ref()
            .map(|(_, configurer)| configurer)
    }

    /// Adds a post-processor called for every object created by this context.
    pub fn add_object_post_processor(&mut self, post_processor: ObjectPostProcessorPtr) -> &mut Self {
        self.object_post_processors.push(post_processor);
        self
    }

    pub fn add_object_factory_post_processor(
        &mut self,
        post_processor: ObjectFactoryPostProcessorPtr,
    ) -> &mut Self {
        self.factory_post_processors.push(post_processor);
        self
    }

    pub fn refresh(&mut self) -> Result<(), ContextError> {
        if self.active {
            self.close();
        }

        info!(context = self.name.as_str(), "Refreshing application context.");

        self.factory.reset(Box::new(DefaultObjectDefinitionRegistry::new(
            self.config.allow_definition_overriding,
        )));

        for entry in &self.entries {
            self.factory
                .definition_registry_mut()
                .register_definition(&entry.name, entry.definition.clone())?;

            for post_processor in &entry.post_processors {
                self.factory.add_post_processor(post_processor.clone());
            }
        }

        for post_processor in &self.object_post_processors {
            self.factory.add_post_processor(post_processor.clone());
        }

        let mut factory_post_processors = self.factory_post_processors.clone();
        if let Some((position, configurer)) = &self.variable_placeholder_configurer {
            factory_post_processors.insert(
                (*position).min(factory_post_processors.len()),
                Arc::new(configurer.clone()),
            );
        }

        for post_processor in &factory_post_processors {
            post_processor.post_process_object_factory(self.factory.definition_registry_mut())?;
        }

        if let Err(error) = self.factory.pre_instantiate_singletons() {
            self.factory.destroy_singletons();
            return Err(error.into());
        }

        self.active = true;

        info!(context = self.name.as_str(), "Application context refreshed.");
        Ok(())
    }

    pub fn refresh_all(&mut self) -> Result<(), ContextError> {
        if let Some(parent) = self.factory.parent_mut() {
            parent.refresh_all()?;
        }

        self.refresh()
    }

    pub fn close(&mut self) {
        if !self.active {
            return;
        }

        info!(context = self.name.as_str(), "Closing application context.");

        self.factory.destroy_singletons();
        self.active = false;
    }

    fn check_active(&self) -> Result<(), ObjectInstanceProviderError> {
        if self.active {
            Ok(())
        } else {
            Err(ObjectInstanceProviderError::ContextNotActive(
                self.name.clone(),
            ))
        }
    }

    /// Returns the named object cast to `T`. [FactoryObject](crate::object::FactoryObject)s not
    /// castable to `T` are replaced by their products.
    pub fn get_object<T: ?Sized + 'static>(
        &mut self,
        name: &str,
    ) -> Result<ObjectPtr<T>, ObjectInstanceProviderError> {
        self.object::<T>(name)
    }

    /// Returns the only object castable to `T`.
    pub fn get_object_by_type<T: ?Sized + 'static>(
        &mut self,
    ) -> Result<ObjectPtr<T>, ObjectInstanceProviderError> {
        self.object_by_type::<T>()
    }

    /// Returns names of all objects castable to `T`, including ones from ancestor contexts.
    pub fn object_names_for_type<T: ?Sized + 'static>(&self) -> Vec<String> {
        self.object_names_for_type_typed::<T>()
    }

    pub fn contains_object(&self, name: &str) -> bool {
        self.factory.contains_object(name)
    }

    /// Names of all registered definitions, in registration order.
    pub fn object_definition_names(&self) -> Vec<String> {
        self.factory.definition_registry().definition_names()
    }
}

impl Default for FluentApplicationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FluentApplicationContext {
    fn drop(&mut self) {
        self.close();
    }
}

impl ObjectInstanceProvider for FluentApplicationContext {
    fn instance_by_name(
        &mut self,
        name: &str,
    ) -> Result<ObjectInstance, ObjectInstanceProviderError> {
        self.check_active()?;
        self.factory.instance_by_name(name)
    }

    fn object_names_for_type(&self, type_id: TypeId) -> Vec<String> {
        self.factory.object_names_for_type(type_id)
    }

    fn contains_object(&self, name: &str) -> bool {
        self.factory.contains_object(name)
    }
}

impl ApplicationContext for FluentApplicationContext {
    #[inline]
    fn name(&self) -> &str {
        &self.name
    }

    fn refresh(&mut self) -> Result<(), ContextError> {
        FluentApplicationContext::refresh(self)
    }

    fn refresh_all(&mut self) -> Result<(), ContextError> {
        FluentApplicationContext::refresh_all(self)
    }

    fn close(&mut self) {
        FluentApplicationContext::close(self)
    }

    #[inline]
    fn is_active(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use crate::context::{ContextConfig, FluentApplicationContext, FluentApplicationContextBuilder};
    use crate::error::{
        ConstructorArgumentError, ContextError, ObjectDefinitionRegistryError,
        ObjectInstanceProviderError, PropertyError,
    };
    use crate::instance_provider::ObjectPtr;
    use crate::object::{
        ConstructorArguments, FromResolvedValue, Object, PropertyDescriptor, ResolvedValue,
    };
    use crate::object_registry::ObjectDefinitionRegistry;
    use crate::placeholder::{MapVariableSource, MockVariableSource};
    use crate::post_processor::ObjectFactoryPostProcessor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct TestObject {
        name: String,
    }

    impl Object for TestObject {
        fn instantiate(
            _arguments: &mut ConstructorArguments,
        ) -> Result<Self, ConstructorArgumentError> {
            Ok(Self::default())
        }

        fn property_descriptors() -> Vec<PropertyDescriptor> {
            vec![PropertyDescriptor::new::<String>("Name")]
        }

        fn set_property(&mut self, name: &str, value: ResolvedValue) -> Result<(), PropertyError> {
            match name {
                "Name" => {
                    self.name = FromResolvedValue::from_resolved_value(value)?;
                    Ok(())
                }
                _ => Err(PropertyError::UnknownProperty(name.to_string())),
            }
        }
    }

    struct CountingFactoryPostProcessor(AtomicUsize);

    impl ObjectFactoryPostProcessor for CountingFactoryPostProcessor {
        fn post_process_object_factory(
            &self,
            registry: &mut dyn ObjectDefinitionRegistry,
        ) -> Result<(), ContextError> {
            self.0
                .fetch_add(registry.definition_names().len(), Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn should_require_refresh() {
        let mut context = FluentApplicationContext::new();
        context.register_object::<TestObject>("object");

        assert!(!context.is_active());
        assert!(matches!(
            context.get_object::<TestObject>("object"),
            Err(ObjectInstanceProviderError::ContextNotActive(_))
        ));

        context.refresh().unwrap();
        assert!(context.is_active());
        assert!(context.get_object::<TestObject>("object").is_ok());

        context.close();
        assert!(!context.is_active());
        assert!(context.get_object::<TestObject>("object").is_err());
    }

    #[test]
    fn should_recreate_singletons_on_refresh() {
        let mut context = FluentApplicationContext::new();
        context.register_object::<TestObject>("object");

        context.refresh().unwrap();
        let first = context.get_object::<TestObject>("object").unwrap();

        context.refresh().unwrap();
        let second = context.get_object::<TestObject>("object").unwrap();

        assert!(!ObjectPtr::ptr_eq(&first, &second));
        assert_eq!(context.object_definition_names(), vec!["object".to_string()]);
    }

    #[test]
    fn should_reject_duplicates_without_overriding() {
        let mut context = FluentApplicationContextBuilder::new()
            .with_config(ContextConfig::new().with_allow_definition_overriding(false))
            .build();
        context.register_object::<TestObject>("object");
        context.register_object::<TestObject>("object");

        assert!(matches!(
            context.refresh().unwrap_err(),
            ContextError::Registry(ObjectDefinitionRegistryError::DuplicateObjectName(name)) if name == "object"
        ));
    }

    #[test]
    fn should_override_duplicates_by_default() {
        let mut context = FluentApplicationContext::new();
        context
            .register_object::<TestObject>("object")
            .add_property_value("Name", "first")
            .unwrap();
        context
            .register_object::<TestObject>("object")
            .add_property_value("Name", "second")
            .unwrap();

        context.refresh().unwrap();
        assert_eq!(
            context.get_object::<TestObject>("object").unwrap().name,
            "second"
        );
    }

    #[test]
    fn should_run_factory_post_processors() {
        let post_processor = Arc::new(CountingFactoryPostProcessor(AtomicUsize::new(0)));

        let mut context = FluentApplicationContext::new();
        context.register_object::<TestObject>("a");
        context.register_object::<TestObject>("b");
        context.add_object_factory_post_processor(post_processor.clone());

        context.refresh().unwrap();
        assert_eq!(post_processor.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn should_share_variable_placeholder_configurer() {
        let mut first = MockVariableSource::new();
        first.expect_can_resolve_variable().return_const(false);

        let mut context = FluentApplicationContext::new();
        context
            .register_object::<TestObject>("object")
            .add_property_value("Name", "${name}")
            .unwrap();

        assert!(context.variable_placeholder_configurer().is_none());

        context
            .add_variable_source(Arc::new(first))
            .add_variable_source(Arc::new(
                MapVariableSource::new().with_variable("name", "resolved"),
            ));

        assert_eq!(
            context
                .variable_placeholder_configurer()
                .unwrap()
                .variable_sources()
                .len(),
            2
        );

        context.refresh().unwrap();
        assert_eq!(
            context.get_object::<TestObject>("object").unwrap().name,
            "resolved"
        );
    }

    #[test]
    fn should_fail_on_unresolvable_placeholder() {
        let mut context = FluentApplicationContext::new();
        context
            .register_object::<TestObject>("object")
            .add_property_value("Name", "${missing}")
            .unwrap();
        context.add_variable_source(Arc::new(MapVariableSource::new()));

        assert!(matches!(
            context.refresh().unwrap_err(),
            ContextError::Placeholder(_)
        ));
        assert!(!context.is_active());
    }

    #[test]
    fn should_resolve_through_parent() {
        let mut parent = FluentApplicationContextBuilder::new()
            .with_name("parent")
            .build();
        parent
            .register_object::<TestObject>("parent_object")
            .add_property_value("Name", "parent")
            .unwrap();

        let mut child = FluentApplicationContext::with_parent(Box::new(parent));
        child.register_object::<TestObject>("child_object");

        child.refresh_all().unwrap();

        assert_eq!(child.parent().unwrap().name(), "parent");
        assert!(child.contains_object("parent_object"));
        assert_eq!(
            child.get_object::<TestObject>("parent_object").unwrap().name,
            "parent"
        );
        assert_eq!(
            child.object_names_for_type::<TestObject>(),
            vec!["child_object".to_string(), "parent_object".to_string()]
        );
        assert!(child.get_object_by_type::<TestObject>().is_err());
    }
}
