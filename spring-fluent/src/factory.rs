//! Core functionality for creating objects. The [ObjectFactory] takes definitions from an
//! [ObjectDefinitionRegistry], instantiates and configures objects, runs them through registered
//! [post-processors](crate::post_processor) and keeps them in [scopes](crate::scope) for reuse.

use crate::context::ApplicationContextPtr;
use crate::error::{ObjectInstanceProviderError, UnsatisfiedDependencyError};
use crate::instance_provider::{
    ErrorPtr, ObjectInstance, ObjectInstanceBox, ObjectInstanceProvider,
};
use crate::object::{
    property_error, ConstructorArguments, FactoryObject, ReferenceType, ResolvedValue,
};
use crate::object_definition::{
    AutowireMode, DestroyCallback, Instantiation, ObjectDefinition, PropertyValue,
};
use crate::object_registry::{DefaultObjectDefinitionRegistry, ObjectDefinitionRegistry};
use crate::post_processor::ObjectPostProcessorPtr;
use crate::scope::{
    PrototypeScopeFactory, ScopeFactory, ScopePtr, SingletonScopeFactory, PROTOTYPE, SINGLETON,
};
use fxhash::{FxHashMap, FxHashSet};
use itertools::Itertools;
use std::any::{Any, TypeId};
use std::iter::once;
use std::sync::Arc;
use tracing::{debug, warn};

pub type ObjectDefinitionRegistryPtr = Box<dyn ObjectDefinitionRegistry + Send + Sync>;

pub type ScopeFactoryPtr = Box<dyn ScopeFactory + Send + Sync>;

pub type ScopeFactoryRegistry = FxHashMap<String, ScopeFactoryPtr>;

/// Builder for [ObjectFactory] with sensible defaults, for easy construction.
pub struct ObjectFactoryBuilder {
    definition_registry: ObjectDefinitionRegistryPtr,
    scope_factories: ScopeFactoryRegistry,
}

impl ObjectFactoryBuilder {
    /// Creates a new builder with a default configuration.
    pub fn new() -> Self {
        Self {
            definition_registry: Box::<DefaultObjectDefinitionRegistry>::default(),
            scope_factories: [
                (
                    SINGLETON.to_string(),
                    Box::<SingletonScopeFactory>::default() as ScopeFactoryPtr,
                ),
                (
                    PROTOTYPE.to_string(),
                    Box::<PrototypeScopeFactory>::default() as ScopeFactoryPtr,
                ),
            ]
            .into_iter()
            .collect(),
        }
    }

    /// Sets new [ObjectDefinitionRegistry].
    pub fn with_definition_registry(
        mut self,
        definition_registry: ObjectDefinitionRegistryPtr,
    ) -> Self {
        self.definition_registry = definition_registry;
        self
    }

    /// Sets new scope factories.
    pub fn with_scope_factories(mut self, scope_factories: ScopeFactoryRegistry) -> Self {
        self.scope_factories = scope_factories;
        self
    }

    /// Adds a new scope factory.
    pub fn with_scope_factory<T: ToString>(mut self, name: T, factory: ScopeFactoryPtr) -> Self {
        self.scope_factories.insert(name.to_string(), factory);
        self
    }

    /// Builds resulting [ObjectFactory].
    pub fn build(self) -> ObjectFactory {
        ObjectFactory::new(self.definition_registry, self.scope_factories)
    }
}

impl Default for ObjectFactoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct DisposableObject {
    name: String,
    instance: ObjectInstance,
    destroy_callback: DestroyCallback,
}

/// Generic factory for objects. Uses definitions from the [ObjectDefinitionRegistry] and
/// [scopes](crate::scope) to create and store instances for reuse. Names unknown to the registry
/// are resolved by the parent context, if present.
pub struct ObjectFactory {
    definition_registry: ObjectDefinitionRegistryPtr,
    scope_factories: ScopeFactoryRegistry,
    scopes: FxHashMap<String, ScopePtr>,
    post_processors: Vec<ObjectPostProcessorPtr>,
    objects_under_construction: Vec<String>,
    disposable_objects: Vec<DisposableObject>,
    parent: Option<ApplicationContextPtr>,
}

impl ObjectFactory {
    /// Creates a new factory with given registry and scope factories. The factory map should
    /// include built-in [SINGLETON] and [PROTOTYPE], since they are used by default definitions.
    pub fn new(
        definition_registry: ObjectDefinitionRegistryPtr,
        scope_factories: ScopeFactoryRegistry,
    ) -> Self {
        Self {
            definition_registry,
            scope_factories,
            scopes: Default::default(),
            post_processors: vec![],
            objects_under_construction: vec![],
            disposable_objects: vec![],
            parent: None,
        }
    }

    #[inline]
    pub fn definition_registry(&self) -> &dyn ObjectDefinitionRegistry {
        self.definition_registry.as_ref()
    }

    #[inline]
    pub fn definition_registry_mut(&mut self) -> &mut dyn ObjectDefinitionRegistry {
        self.definition_registry.as_mut()
    }

    /// Adds a post-processor called for every object created after this call.
    pub fn add_post_processor(&mut self, post_processor: ObjectPostProcessorPtr) {
        self.post_processors.push(post_processor);
    }

    #[inline]
    pub fn post_processors(&self) -> &[ObjectPostProcessorPtr] {
        &self.post_processors
    }

    /// Destroys all singletons and starts over with a new registry and no post-processors.
    pub fn reset(&mut self, definition_registry: ObjectDefinitionRegistryPtr) {
        self.destroy_singletons();
        self.definition_registry = definition_registry;
        self.scopes.clear();
        self.post_processors.clear();
        self.objects_under_construction.clear();
    }

    pub fn set_parent(&mut self, parent: Option<ApplicationContextPtr>) {
        self.parent = parent;
    }

    pub fn parent(&self) -> Option<&ApplicationContextPtr> {
        self.parent.as_ref()
    }

    pub fn parent_mut(&mut self) -> Option<&mut ApplicationContextPtr> {
        self.parent.as_mut()
    }

    /// Creates all singletons which are neither abstract nor lazy.
    pub fn pre_instantiate_singletons(&mut self) -> Result<(), ObjectInstanceProviderError> {
        for name in self.definition_registry.definition_names() {
            let definition = self.definition_registry.merged_definition(&name)?;
            if !definition.is_abstract && definition.is_singleton() && !definition.lazy_init {
                self.create_object(&name)?;
            }
        }

        Ok(())
    }

    /// Runs destroy callbacks of created singletons in reverse creation order and forgets all
    /// stored instances. Callback failures are logged, not propagated.
    pub fn destroy_singletons(&mut self) {
        while let Some(disposable) = self.disposable_objects.pop() {
            debug!(name = disposable.name.as_str(), "Destroying object.");

            match (disposable.destroy_callback)(&disposable.instance) {
                Some(Ok(())) => {}
                Some(Err(error)) => warn!(
                    name = disposable.name.as_str(),
                    %error,
                    "Error destroying object."
                ),
                None => warn!(
                    name = disposable.name.as_str(),
                    type_name = disposable.instance.type_name(),
                    "Destroy callback is not compatible with the object."
                ),
            }
        }

        for scope in self.scopes.values_mut() {
            scope.clear();
        }
    }

    fn scope_mut(
        &mut self,
        name: &str,
        scope_name: &str,
    ) -> Result<&mut ScopePtr, ObjectInstanceProviderError> {
        if !self.scopes.contains_key(scope_name) {
            let factory = self.scope_factories.get(scope_name).ok_or_else(|| {
                ObjectInstanceProviderError::UnrecognizedScope {
                    name: name.to_string(),
                    scope: scope_name.to_string(),
                }
            })?;

            self.scopes
                .insert(scope_name.to_string(), factory.create_scope());
        }

        self.scopes
            .get_mut(scope_name)
            .ok_or_else(|| ObjectInstanceProviderError::UnrecognizedScope {
                name: name.to_string(),
                scope: scope_name.to_string(),
            })
    }

    fn create_object(&mut self, name: &str) -> Result<ObjectInstance, ObjectInstanceProviderError> {
        let definition = self.definition_registry.merged_definition(name)?;
        if definition.is_abstract {
            return Err(ObjectInstanceProviderError::AbstractObject(
                name.to_string(),
            ));
        }

        if let Some(instance) = self.scope_mut(name, &definition.scope)?.instance(name) {
            return Ok(instance);
        }

        if self
            .objects_under_construction
            .iter()
            .any(|constructed| constructed == name)
        {
            return Err(ObjectInstanceProviderError::DependencyCycle(
                self.objects_under_construction
                    .iter()
                    .map(String::as_str)
                    .chain(once(name))
                    .join(" -> "),
            ));
        }

        self.objects_under_construction.push(name.to_string());
        let instance = self.construct_object(name, &definition);
        self.objects_under_construction.pop();

        let instance = instance?;

        self.scope_mut(name, &definition.scope)?
            .store_instance(name, instance.clone());

        Ok(instance)
    }

    fn construct_object(
        &mut self,
        name: &str,
        definition: &ObjectDefinition,
    ) -> Result<ObjectInstance, ObjectInstanceProviderError> {
        debug!(name, type_name = definition.type_name(), "Creating object.");

        for dependency in &definition.depends_on {
            self.instance_by_name(dependency)?;
        }

        let mut instance = self.instantiate(name, definition)?;

        let descriptors = definition.object_type.property_descriptors();
        let mut set_properties: FxHashSet<String> = Default::default();
        for (property, value) in definition.property_values.iter() {
            let reference_type = descriptors
                .iter()
                .find(|descriptor| descriptor.name == property)
                .and_then(|descriptor| descriptor.reference_type);

            let value = self.resolve_value(value, reference_type)?;
            definition
                .object_type
                .set_property(instance.as_mut(), property, value)
                .map_err(|error| property_error(name, property, error))?;

            set_properties.insert(property.to_string());
        }

        self.autowire(name, definition, instance.as_mut(), &mut set_properties)?;
        self.check_dependencies(name, definition, &set_properties)?;

        for post_processor in &self.post_processors {
            instance = post_processor
                .post_process_before_initialization(instance, name)
                .map_err(|source| ObjectInstanceProviderError::PostProcessing {
                    object: name.to_string(),
                    source,
                })?;
        }

        if let Some(init_callback) = &definition.init_callback {
            init_callback(instance.as_mut())
                .ok_or_else(|| ObjectInstanceProviderError::IncompatibleObject {
                    name: name.to_string(),
                    type_name: definition.type_name().to_string(),
                })?
                .map_err(|source| ObjectInstanceProviderError::Lifecycle {
                    object: name.to_string(),
                    source,
                })?;
        }

        let mut instance = ObjectInstance::new(
            Arc::<dyn Any + Send + Sync>::from(instance),
            definition.type_name(),
            definition.casts.clone(),
        );

        for post_processor in &self.post_processors {
            instance = post_processor
                .post_process_after_initialization(instance, name)
                .map_err(|source| ObjectInstanceProviderError::PostProcessing {
                    object: name.to_string(),
                    source,
                })?;
        }

        if let Some(destroy_callback) = &definition.destroy_callback {
            if definition.is_singleton() {
                self.disposable_objects.push(DisposableObject {
                    name: name.to_string(),
                    instance: instance.clone(),
                    destroy_callback: destroy_callback.clone(),
                });
            }
        }

        Ok(instance)
    }

    fn instantiate(
        &mut self,
        name: &str,
        definition: &ObjectDefinition,
    ) -> Result<ObjectInstanceBox, ObjectInstanceProviderError> {
        let mut arguments = Vec::with_capacity(definition.constructor_arguments.len());
        for argument in &definition.constructor_arguments {
            arguments.push(self.resolve_value(argument, None)?);
        }

        let mut arguments = ConstructorArguments::new(arguments);
        let creation_error = |source: ErrorPtr| ObjectInstanceProviderError::Creation {
            object: name.to_string(),
            source,
        };

        let instance = match &definition.instantiation {
            Instantiation::Constructor => definition
                .object_type
                .instantiate(&mut arguments)
                .map_err(|source| ObjectInstanceProviderError::ConstructorArguments {
                    object: name.to_string(),
                    source,
                })?,
            Instantiation::FactoryMethod(method) => {
                method(&mut arguments).map_err(creation_error)?
            }
            Instantiation::FactoryObject {
                name: factory_name,
                factory_type_name,
                method,
            } => {
                let factory = self.instance_by_name(factory_name)?;
                method(&factory, &mut arguments)
                    .ok_or_else(|| ObjectInstanceProviderError::IncompatibleObject {
                        name: factory_name.clone(),
                        type_name: factory_type_name.to_string(),
                    })?
                    .map_err(creation_error)?
            }
        };

        arguments
            .finish()
            .map_err(|source| ObjectInstanceProviderError::ConstructorArguments {
                object: name.to_string(),
                source,
            })?;

        Ok(instance)
    }

    fn resolve_value(
        &mut self,
        value: &PropertyValue,
        reference_type: Option<ReferenceType>,
    ) -> Result<ResolvedValue, ObjectInstanceProviderError> {
        Ok(match value {
            PropertyValue::String(value) => ResolvedValue::String(value.clone()),
            PropertyValue::Integer(value) => ResolvedValue::Integer(*value),
            PropertyValue::Float(value) => ResolvedValue::Float(*value),
            PropertyValue::Boolean(value) => ResolvedValue::Boolean(*value),
            PropertyValue::List(values) => ResolvedValue::List(
                values
                    .iter()
                    .map(|value| self.resolve_value(value, None))
                    .try_collect()?,
            ),
            PropertyValue::Reference(name) => {
                let instance = self.instance_by_name(name)?;
                ResolvedValue::Object(factory_product(name, instance, reference_type)?)
            }
        })
    }

    fn autowire(
        &mut self,
        name: &str,
        definition: &ObjectDefinition,
        instance: &mut (dyn Any + Send + Sync),
        set_properties: &mut FxHashSet<String>,
    ) -> Result<(), ObjectInstanceProviderError> {
        if definition.autowire_mode == AutowireMode::No {
            return Ok(());
        }

        for descriptor in definition.object_type.property_descriptors() {
            let reference_type = match descriptor.reference_type {
                Some(reference_type) if !set_properties.contains(descriptor.name) => {
                    reference_type
                }
                _ => continue,
            };

            let candidate = match definition.autowire_mode {
                AutowireMode::ByName => {
                    if descriptor.name != name && self.contains_object(descriptor.name) {
                        Some(descriptor.name.to_string())
                    } else {
                        None
                    }
                }
                AutowireMode::ByType => {
                    let mut candidates = self.object_names_for_type(reference_type.type_id);
                    candidates.retain(|candidate| candidate != name);

                    match candidates.len() {
                        0 => None,
                        1 => candidates.pop(),
                        _ => {
                            return Err(UnsatisfiedDependencyError::MultipleCandidates {
                                type_name: reference_type.type_name.to_string(),
                                names: candidates,
                            }
                            .into())
                        }
                    }
                }
                AutowireMode::No => None,
            };

            if let Some(candidate) = candidate {
                debug!(
                    name,
                    property = descriptor.name,
                    candidate = candidate.as_str(),
                    "Autowiring property."
                );

                let candidate_instance = self.instance_by_name(&candidate)?;
                let value = ResolvedValue::Object(factory_product(
                    &candidate,
                    candidate_instance,
                    Some(reference_type),
                )?);
                definition
                    .object_type
                    .set_property(instance, descriptor.name, value)
                    .map_err(|error| property_error(name, descriptor.name, error))?;

                set_properties.insert(descriptor.name.to_string());
            }
        }

        Ok(())
    }

    fn check_dependencies(
        &self,
        name: &str,
        definition: &ObjectDefinition,
        set_properties: &FxHashSet<String>,
    ) -> Result<(), ObjectInstanceProviderError> {
        match definition
            .object_type
            .property_descriptors()
            .into_iter()
            .find(|descriptor| {
                definition.dependency_check.applies_to(descriptor)
                    && !set_properties.contains(descriptor.name)
            }) {
            Some(descriptor) => Err(UnsatisfiedDependencyError::UnsetProperty {
                object: name.to_string(),
                property: descriptor.name.to_string(),
            }
            .into()),
            None => Ok(()),
        }
    }
}

/// Replaces a referenced factory object with its product, unless the factory itself is what the
/// property refers to.
fn factory_product(
    name: &str,
    instance: ObjectInstance,
    reference_type: Option<ReferenceType>,
) -> Result<ObjectInstance, ObjectInstanceProviderError> {
    let reference_type = match reference_type {
        Some(reference_type) if !instance.is_castable_to(reference_type.type_id) => reference_type,
        _ => return Ok(instance),
    };

    match instance.cast::<dyn FactoryObject>() {
        Some(factory) => {
            debug!(
                name,
                type_name = reference_type.type_name,
                "Using factory object product."
            );

            factory
                .object()
                .map_err(|source| ObjectInstanceProviderError::Creation {
                    object: name.to_string(),
                    source,
                })
        }
        None => Ok(instance),
    }
}

impl ObjectInstanceProvider for ObjectFactory {
    fn instance_by_name(
        &mut self,
        name: &str,
    ) -> Result<ObjectInstance, ObjectInstanceProviderError> {
        if self.definition_registry.is_name_registered(name) {
            return self.create_object(name);
        }

        match &mut self.parent {
            Some(parent) if parent.contains_object(name) => parent.instance_by_name(name),
            _ => Err(ObjectInstanceProviderError::NoNamedInstance(
                name.to_string(),
            )),
        }
    }

    fn object_names_for_type(&self, type_id: TypeId) -> Vec<String> {
        let mut names = self.definition_registry.names_for_type(type_id);
        if let Some(parent) = &self.parent {
            let inherited = parent
                .object_names_for_type(type_id)
                .into_iter()
                .filter(|name| !self.definition_registry.is_name_registered(name))
                .collect_vec();

            names.extend(inherited);
        }

        names
    }

    fn contains_object(&self, name: &str) -> bool {
        self.definition_registry.is_name_registered(name)
            || self
                .parent
                .as_ref()
                .map_or(false, |parent| parent.contains_object(name))
    }
}

#[cfg(test)]
mod tests {
    use crate::context::ApplicationContext;
    use crate::error::{
        ConstructorArgumentError, ContextError, ObjectDefinitionRegistryError,
        ObjectInstanceProviderError, PropertyError, UnsatisfiedDependencyError,
    };
    use crate::factory::{
        ObjectDefinitionRegistryPtr, ObjectFactory, ObjectFactoryBuilder, ScopeFactoryPtr,
    };
    use crate::instance_provider::{
        ErrorPtr, ObjectInstance, ObjectInstanceBox, ObjectInstanceProvider, ObjectPtr,
        TypedObjectInstanceProvider,
    };
    use crate::object::{
        ConstructorArguments, FactoryObject, FromResolvedValue, Object, PropertyDescriptor,
        ResolvedValue,
    };
    use crate::object_definition::{
        AutowireMode, DependencyCheck, Instantiation, ObjectDefinition, PropertyValue,
    };
    use crate::object_registry::{
        DefaultObjectDefinitionRegistry, MockObjectDefinitionRegistry, ObjectDefinitionRegistry,
    };
    use crate::post_processor::{MockObjectPostProcessor, ObjectPostProcessorAdapter};
    use crate::scope::{MockScope, MockScopeFactory, ScopePtr, PROTOTYPE, SINGLETON};
    use mockall::mock;
    use mockall::predicate::*;
    use std::any::{Any, TypeId};
    use std::sync::{Arc, Mutex};

    mock! {
        ParentContext {}

        impl ObjectInstanceProvider for ParentContext {
            fn instance_by_name(
                &mut self,
                name: &str,
            ) -> Result<ObjectInstance, ObjectInstanceProviderError>;

            fn object_names_for_type(&self, type_id: TypeId) -> Vec<String>;

            fn contains_object(&self, name: &str) -> bool;
        }

        impl ApplicationContext for ParentContext {
            fn name(&self) -> &str;

            fn refresh(&mut self) -> Result<(), ContextError>;

            fn refresh_all(&mut self) -> Result<(), ContextError>;

            fn close(&mut self);

            fn is_active(&self) -> bool;
        }
    }

    #[derive(Default)]
    struct TestObject {
        name: String,
        dependency: Option<ObjectPtr<TestObject>>,
    }

    impl Object for TestObject {
        fn instantiate(
            arguments: &mut ConstructorArguments,
        ) -> Result<Self, ConstructorArgumentError> {
            Ok(Self {
                name: arguments.next_optional()?.unwrap_or_default(),
                dependency: None,
            })
        }

        fn property_descriptors() -> Vec<PropertyDescriptor> {
            vec![
                PropertyDescriptor::new::<String>("name"),
                PropertyDescriptor::new::<Option<ObjectPtr<TestObject>>>("dependency"),
            ]
        }

        fn set_property(&mut self, name: &str, value: ResolvedValue) -> Result<(), PropertyError> {
            match name {
                "name" => self.name = FromResolvedValue::from_resolved_value(value)?,
                "dependency" => self.dependency = FromResolvedValue::from_resolved_value(value)?,
                _ => return Err(PropertyError::UnknownProperty(name.to_string())),
            }

            Ok(())
        }
    }

    struct TestObjectFactory {
        name: Option<String>,
    }

    impl FactoryObject for TestObjectFactory {
        fn object(&self) -> Result<ObjectInstance, ErrorPtr> {
            match &self.name {
                Some(name) => Ok(ObjectInstance::of(ObjectPtr::new(TestObject {
                    name: name.clone(),
                    dependency: None,
                }))),
                None => Err(Arc::new(PropertyError::UnknownProperty("name".to_string()))),
            }
        }
    }

    fn create_definition() -> ObjectDefinition {
        let mut definition = ObjectDefinition::new::<TestObject>();
        definition.scope = PROTOTYPE.to_string();
        definition
    }

    fn create_factory(definitions: Vec<(&str, ObjectDefinition)>) -> ObjectFactory {
        let mut registry = DefaultObjectDefinitionRegistry::default();
        for (name, definition) in definitions {
            registry.register_definition(name, definition).unwrap();
        }

        ObjectFactoryBuilder::new()
            .with_definition_registry(Box::new(registry))
            .build()
    }

    #[test]
    fn should_create_object_from_mocked_registry() {
        let mut registry = MockObjectDefinitionRegistry::new();
        registry
            .expect_is_name_registered()
            .with(eq("name"))
            .return_const(true);
        registry
            .expect_merged_definition()
            .with(eq("name"))
            .times(1)
            .returning(|_| Ok(create_definition()));

        let mut factory = ObjectFactoryBuilder::new()
            .with_definition_registry(Box::new(registry) as ObjectDefinitionRegistryPtr)
            .build();

        assert!(factory.object::<TestObject>("name").is_ok());
    }

    #[test]
    fn should_forward_registry_errors() {
        let mut registry = MockObjectDefinitionRegistry::new();
        registry.expect_is_name_registered().return_const(true);
        registry
            .expect_merged_definition()
            .returning(|name| {
                Err(ObjectDefinitionRegistryError::MissingParentDefinition {
                    name: name.to_string(),
                    parent: "parent".to_string(),
                })
            });

        let mut factory = ObjectFactoryBuilder::new()
            .with_definition_registry(Box::new(registry) as ObjectDefinitionRegistryPtr)
            .build();

        assert!(matches!(
            factory.instance_by_name("name").unwrap_err(),
            ObjectInstanceProviderError::Definition(
                ObjectDefinitionRegistryError::MissingParentDefinition { .. }
            )
        ));
    }

    #[test]
    fn should_not_return_missing_object() {
        let mut factory = create_factory(vec![]);
        assert!(matches!(
            factory.instance_by_name("name").unwrap_err(),
            ObjectInstanceProviderError::NoNamedInstance(name) if name == "name"
        ));
    }

    #[test]
    fn should_not_create_abstract_object() {
        let mut definition = create_definition();
        definition.is_abstract = true;

        let mut factory = create_factory(vec![("name", definition)]);
        assert!(matches!(
            factory.instance_by_name("name").unwrap_err(),
            ObjectInstanceProviderError::AbstractObject(name) if name == "name"
        ));
    }

    #[test]
    fn should_recognize_missing_scope() {
        let mut definition = create_definition();
        definition.scope = "custom".to_string();

        let mut factory = create_factory(vec![("name", definition)]);
        assert!(matches!(
            factory.instance_by_name("name").unwrap_err(),
            ObjectInstanceProviderError::UnrecognizedScope { scope, .. } if scope == "custom"
        ));
    }

    #[test]
    fn should_detect_dependency_cycles() {
        let mut a = create_definition();
        a.property_values.set("dependency", PropertyValue::reference("b"));
        let mut b = create_definition();
        b.depends_on = vec!["a".to_string()];

        let mut factory = create_factory(vec![("a", a), ("b", b)]);
        assert!(matches!(
            factory.instance_by_name("a").unwrap_err(),
            ObjectInstanceProviderError::DependencyCycle(chain) if chain == "a -> b -> a"
        ));
    }

    #[test]
    fn should_store_instance_in_custom_scope() {
        let mut definition = create_definition();
        definition.scope = "custom".to_string();

        let mut scope_factory = MockScopeFactory::new();
        scope_factory.expect_create_scope().times(1).returning(|| {
            let mut scope = MockScope::new();
            scope.expect_instance().with(eq("name")).return_const(None);
            scope
                .expect_store_instance()
                .withf(|name, _| name == "name")
                .times(1)
                .return_const(());

            Box::new(scope) as ScopePtr
        });

        let mut registry = DefaultObjectDefinitionRegistry::default();
        registry.register_definition("name", definition).unwrap();

        let mut factory = ObjectFactoryBuilder::new()
            .with_definition_registry(Box::new(registry))
            .with_scope_factory("custom", Box::new(scope_factory) as ScopeFactoryPtr)
            .build();

        assert!(factory.instance_by_name("name").is_ok());
    }

    #[test]
    fn should_reuse_singletons() {
        let mut definition = create_definition();
        definition.scope = SINGLETON.to_string();

        let mut factory = create_factory(vec![("name", definition)]);
        let first = factory.object::<TestObject>("name").unwrap();
        let second = factory.object::<TestObject>("name").unwrap();
        assert!(ObjectPtr::ptr_eq(&first, &second));

        let mut factory = create_factory(vec![("name", create_definition())]);
        let first = factory.object::<TestObject>("name").unwrap();
        let second = factory.object::<TestObject>("name").unwrap();
        assert!(!ObjectPtr::ptr_eq(&first, &second));
    }

    #[test]
    fn should_set_properties_and_constructor_arguments() {
        let mut a = create_definition();
        a.constructor_arguments = vec!["constructed".into()];
        a.property_values.set("dependency", PropertyValue::reference("b"));

        let mut b = create_definition();
        b.property_values.set("name", "b".into());

        let mut factory = create_factory(vec![("a", a), ("b", b)]);
        let object = factory.object::<TestObject>("a").unwrap();

        assert_eq!(object.name, "constructed");
        assert_eq!(object.dependency.as_ref().unwrap().name, "b");
    }

    #[test]
    fn should_reject_unused_constructor_arguments() {
        let mut definition = create_definition();
        definition.constructor_arguments = vec!["a".into(), "b".into()];

        let mut factory = create_factory(vec![("name", definition)]);
        assert!(matches!(
            factory.instance_by_name("name").unwrap_err(),
            ObjectInstanceProviderError::ConstructorArguments {
                source: ConstructorArgumentError::Unused(1),
                ..
            }
        ));
    }

    #[test]
    fn should_reject_unknown_property() {
        let mut definition = create_definition();
        definition.property_values.set("unknown", 1.into());

        let mut factory = create_factory(vec![("name", definition)]);
        assert!(matches!(
            factory.instance_by_name("name").unwrap_err(),
            ObjectInstanceProviderError::Property { property, .. } if property == "unknown"
        ));
    }

    #[test]
    fn should_autowire_by_name() {
        let mut a = create_definition();
        a.autowire_mode = AutowireMode::ByName;

        let mut factory = create_factory(vec![("a", a), ("dependency", create_definition())]);
        assert!(factory
            .object::<TestObject>("a")
            .unwrap()
            .dependency
            .is_some());
    }

    #[test]
    fn should_autowire_by_type() {
        let mut a = create_definition();
        a.autowire_mode = AutowireMode::ByType;

        let mut factory = create_factory(vec![("a", a.clone()), ("b", create_definition())]);
        assert!(factory
            .object::<TestObject>("a")
            .unwrap()
            .dependency
            .is_some());

        let mut factory = create_factory(vec![
            ("a", a),
            ("b", create_definition()),
            ("c", create_definition()),
        ]);
        assert!(matches!(
            factory.instance_by_name("a").unwrap_err(),
            ObjectInstanceProviderError::UnsatisfiedDependency(
                UnsatisfiedDependencyError::MultipleCandidates { names, .. }
            ) if names == vec!["b".to_string(), "c".to_string()]
        ));
    }

    #[test]
    fn should_check_dependencies() {
        let mut definition = create_definition();
        definition.dependency_check = DependencyCheck::Simple;

        let mut factory = create_factory(vec![("name", definition.clone())]);
        assert!(matches!(
            factory.instance_by_name("name").unwrap_err(),
            ObjectInstanceProviderError::UnsatisfiedDependency(
                UnsatisfiedDependencyError::UnsetProperty { property, .. }
            ) if property == "name"
        ));

        definition.property_values.set("name", "name".into());
        let mut factory = create_factory(vec![("name", definition)]);
        assert!(factory.instance_by_name("name").is_ok());
    }

    #[test]
    fn should_use_factory_method() {
        let mut definition = create_definition();
        definition.instantiation = Instantiation::FactoryMethod(Arc::new(
            |arguments: &mut ConstructorArguments| -> Result<ObjectInstanceBox, ErrorPtr> {
                let name: String = arguments
                    .next()
                    .map_err(|error| Arc::new(error) as ErrorPtr)?;

                Ok(Box::new(TestObject {
                    name: format!("factory {name}"),
                    dependency: None,
                }))
            },
        ));
        definition.constructor_arguments = vec!["argument".into()];

        let mut factory = create_factory(vec![("name", definition)]);
        assert_eq!(
            factory.object::<TestObject>("name").unwrap().name,
            "factory argument"
        );
    }

    #[test]
    fn should_run_post_processors_in_order() {
        let mut post_processor = MockObjectPostProcessor::new();
        post_processor
            .expect_post_process_before_initialization()
            .withf(|_, name| name == "name")
            .times(1)
            .returning(|instance, _| Ok(instance));
        post_processor
            .expect_post_process_after_initialization()
            .withf(|_, name| name == "name")
            .times(1)
            .returning(|instance, _| Ok(instance.with_value(TestObject {
                name: "replaced".to_string(),
                dependency: None,
            })));

        let mut factory = create_factory(vec![("name", create_definition())]);
        factory.add_post_processor(Arc::new(post_processor));

        assert_eq!(
            factory.object::<TestObject>("name").unwrap().name,
            "replaced"
        );
    }

    #[test]
    fn should_forward_post_processor_errors() {
        let mut factory = create_factory(vec![("name", create_definition())]);
        factory.add_post_processor(Arc::new(ObjectPostProcessorAdapter::before_initialization(
            Arc::new(|_: ObjectInstanceBox, _: &str| -> Result<ObjectInstanceBox, ErrorPtr> {
                Err(Arc::new(PropertyError::UnknownProperty("x".to_string())))
            }),
        )));

        assert!(matches!(
            factory.instance_by_name("name").unwrap_err(),
            ObjectInstanceProviderError::PostProcessing { .. }
        ));
    }

    #[test]
    fn should_run_lifecycle_callbacks() {
        let destroyed = Arc::new(Mutex::new(vec![]));

        let create_lifecycle_definition = |name: &str, destroyed: Arc<Mutex<Vec<String>>>| {
            let mut definition = create_definition();
            definition.scope = SINGLETON.to_string();
            definition.property_values.set("name", name.into());
            definition.init_callback = Some(Arc::new(
                |instance: &mut (dyn Any + Send + Sync)| -> Option<Result<(), ErrorPtr>> {
                    instance.downcast_mut::<TestObject>().map(|instance| {
                        instance.name.push('!');
                        Ok(())
                    })
                },
            ));
            definition.destroy_callback = Some(Arc::new(
                move |instance: &ObjectInstance| -> Option<Result<(), ErrorPtr>> {
                    instance.cast::<TestObject>().map(|instance| {
                        if let Ok(mut destroyed) = destroyed.lock() {
                            destroyed.push(instance.name.clone());
                        }
                        Ok(())
                    })
                },
            ));
            definition
        };

        let mut b = create_lifecycle_definition("b", destroyed.clone());
        b.depends_on = vec!["a".to_string()];

        let mut factory = create_factory(vec![
            ("b", b),
            ("a", create_lifecycle_definition("a", destroyed.clone())),
        ]);

        factory.pre_instantiate_singletons().unwrap();
        assert_eq!(factory.object::<TestObject>("a").unwrap().name, "a!");

        factory.destroy_singletons();
        assert_eq!(
            *destroyed.lock().unwrap(),
            vec!["b!".to_string(), "a!".to_string()]
        );
    }

    #[test]
    fn should_skip_lazy_singletons() {
        let mut definition = create_definition();
        definition.scope = SINGLETON.to_string();
        definition.lazy_init = true;
        definition.instantiation = Instantiation::FactoryMethod(Arc::new(
            |_: &mut ConstructorArguments| -> Result<ObjectInstanceBox, ErrorPtr> {
                Err(Arc::new(PropertyError::UnknownProperty("lazy".to_string())))
            },
        ));

        let mut factory = create_factory(vec![("name", definition)]);
        assert!(factory.pre_instantiate_singletons().is_ok());
        assert!(factory.instance_by_name("name").is_err());
    }

    #[test]
    fn should_list_names_for_type() {
        let mut factory = create_factory(vec![("a", create_definition())]);
        assert_eq!(
            factory.object_names_for_type(TypeId::of::<TestObject>()),
            vec!["a".to_string()]
        );
        assert!(factory.object_by_type::<u8>().is_err());
        assert!(factory.object_by_type::<TestObject>().is_ok());
        assert!(factory.contains_object("a"));
        assert!(!factory.contains_object("b"));
        assert!(factory.object::<u8>("a").is_err());
    }

    #[test]
    fn should_resolve_names_through_parent() {
        let mut parent = MockParentContext::new();
        parent
            .expect_contains_object()
            .returning(|name| name == "parent_object");
        parent
            .expect_instance_by_name()
            .with(eq("parent_object"))
            .times(1)
            .returning(|_| Ok(ObjectInstance::of(ObjectPtr::new(TestObject::default()))));
        parent
            .expect_object_names_for_type()
            .with(eq(TypeId::of::<TestObject>()))
            .returning(|_| vec!["a".to_string(), "parent_object".to_string()]);

        let mut factory = create_factory(vec![("a", create_definition())]);
        factory.set_parent(Some(Box::new(parent)));

        assert!(factory.contains_object("a"));
        assert!(factory.contains_object("parent_object"));
        assert!(!factory.contains_object("missing"));
        assert!(factory.object::<TestObject>("parent_object").is_ok());
        assert!(matches!(
            factory.instance_by_name("missing").unwrap_err(),
            ObjectInstanceProviderError::NoNamedInstance(_)
        ));
        assert_eq!(
            factory.object_names_for_type(TypeId::of::<TestObject>()),
            vec!["a".to_string(), "parent_object".to_string()]
        );
    }

    #[test]
    fn should_set_products_of_referenced_factory_objects() {
        let mut parent = MockParentContext::new();
        parent
            .expect_contains_object()
            .returning(|name| name.ends_with("factory"));
        parent.expect_instance_by_name().returning(|name| {
            let factory = TestObjectFactory {
                name: (name == "factory").then(|| "product".to_string()),
            };
            Ok(ObjectInstance::proxy(
                ObjectPtr::new(factory) as ObjectPtr<dyn FactoryObject>
            ))
        });

        let mut working = create_definition();
        working
            .property_values
            .set("dependency", PropertyValue::reference("factory"));

        let mut failing = create_definition();
        failing
            .property_values
            .set("dependency", PropertyValue::reference("failing_factory"));

        let mut factory = create_factory(vec![("working", working), ("failing", failing)]);
        factory.set_parent(Some(Box::new(parent)));

        let working = factory.object::<TestObject>("working").unwrap();
        assert_eq!(working.dependency.as_ref().unwrap().name, "product");

        assert!(matches!(
            factory.instance_by_name("failing"),
            Err(ObjectInstanceProviderError::Creation { object, .. }) if object == "failing_factory"
        ));
    }
}
