//! Fluent, strongly-typed construction of [ObjectDefinition]s. Builders are obtained from
//! [FluentApplicationContext::register_object] and write directly into the definition owned by the
//! context, so there's nothing to "finish" - dropping the builder is enough.
//!
//! Property selectors are validated against [Object::property_descriptors] immediately, so a typo
//! is reported when describing the object, not when the context gets refreshed:
//!
//! ```
//! use spring_fluent::context::FluentApplicationContext;
//! use spring_fluent::error::ObjectDefinitionError;
//! use spring_fluent::Object;
//!
//! #[derive(Object, Default)]
//! struct Repository {
//!     name: String,
//! }
//!
//! let mut context = FluentApplicationContext::new();
//! let result = context
//!     .register_object::<Repository>("repository")
//!     .add_property_value("nmae", "Mathias");
//!
//! assert!(matches!(
//!     result,
//!     Err(ObjectDefinitionError::InvalidPropertySelector { .. })
//! ));
//! ```

use crate::aop::{AutoProxyCreator, NamePointcut};
use crate::context::FluentApplicationContext;
use crate::error::ObjectDefinitionError;
use crate::instance_provider::{
    AliasCast, ErrorPtr, ObjectInstance, ObjectInstanceAnyPtr, ObjectInstanceBox, ObjectPtr,
};
use crate::object::{ConstructorArguments, Object};
use crate::object_definition::{
    AutowireMode, DependencyCheck, Instantiation, ObjectDefinition, PropertyValue,
};
use crate::object_registry::generate_object_name;
use crate::post_processor::ObjectPostProcessorAdapter;
use crate::scope::{PROTOTYPE, SINGLETON};
use std::any::{type_name, Any, TypeId};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::warn;

/// Builder for the definition of an object of type `T`.
pub struct ObjectDefinitionBuilder<'a, T: Object> {
    context: &'a mut FluentApplicationContext,
    index: usize,
    _phantom: PhantomData<fn() -> T>,
}

impl<'a, T: Object> ObjectDefinitionBuilder<'a, T> {
    pub(crate) fn new(context: &'a mut FluentApplicationContext, index: usize) -> Self {
        Self {
            context,
            index,
            _phantom: PhantomData,
        }
    }

    /// Name of the object being built.
    #[inline]
    pub fn name(&self) -> &str {
        &self.context.entry(self.index).name
    }

    #[inline]
    pub fn definition(&self) -> &ObjectDefinition {
        &self.context.entry(self.index).definition
    }

    #[inline]
    fn definition_mut(&mut self) -> &mut ObjectDefinition {
        &mut self.context.entry_mut(self.index).definition
    }

    fn validate_property(property: &str) -> Result<(), ObjectDefinitionError> {
        if T::has_property(property) {
            Ok(())
        } else {
            Err(ObjectDefinitionError::InvalidPropertySelector {
                type_name: type_name::<T>().to_string(),
                property: property.to_string(),
            })
        }
    }

    /// Appends a positional constructor argument.
    pub fn add_constructor_arg<V: Into<PropertyValue>>(mut self, value: V) -> Self {
        self.definition_mut()
            .constructor_arguments
            .push(value.into());
        self
    }

    pub fn add_constructor_args<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<PropertyValue>,
    {
        self.definition_mut()
            .constructor_arguments
            .extend(values.into_iter().map(Into::into));
        self
    }

    /// Appends a constructor argument referencing another object.
    pub fn add_constructor_arg_reference<N: Into<String>>(mut self, object_name: N) -> Self {
        self.definition_mut()
            .constructor_arguments
            .push(PropertyValue::reference(object_name));
        self
    }

    /// Makes sure given object is created before this one.
    pub fn add_depends_on<N: Into<String>>(mut self, object_name: N) -> Self {
        self.definition_mut().depends_on.push(object_name.into());
        self
    }

    pub fn add_property_value<V: Into<PropertyValue>>(
        mut self,
        property: &str,
        value: V,
    ) -> Result<Self, ObjectDefinitionError> {
        Self::validate_property(property)?;
        self.definition_mut()
            .property_values
            .set(property, value.into());
        Ok(self)
    }

    pub fn add_property_reference<N: Into<String>>(
        mut self,
        property: &str,
        object_name: N,
    ) -> Result<Self, ObjectDefinitionError> {
        Self::validate_property(property)?;
        self.definition_mut()
            .property_values
            .set(property, PropertyValue::reference(object_name));
        Ok(self)
    }

    /// Defines an anonymous object of type `U` and sets the given property to it. Returns the
    /// builder of the inner object, which gets a generated `type_name#N` name.
    pub fn add_property_inner_object<U: Object>(
        mut self,
        property: &str,
    ) -> Result<ObjectDefinitionBuilder<'a, U>, ObjectDefinitionError> {
        Self::validate_property(property)?;

        let inner_name = generate_object_name(type_name::<U>(), |name| {
            self.context.is_name_taken(name)
        });

        self.definition_mut()
            .property_values
            .set(property, PropertyValue::reference(inner_name.clone()));

        let context = self.context;
        Ok(context.register_object::<U>(&inner_name))
    }

    /// Adds a callback run for this object before its init method.
    pub fn add_post_process_before_initialization<F>(self, callback: F) -> Self
    where
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        let object_name = self.name().to_string();
        let adapter = ObjectPostProcessorAdapter::before_initialization(Arc::new(
            move |instance: ObjectInstanceBox, name: &str| -> Result<ObjectInstanceBox, ErrorPtr> {
                if name != object_name {
                    return Ok(instance);
                }

                Ok(match instance.downcast::<T>() {
                    Ok(object) => Box::new(callback(*object)) as ObjectInstanceBox,
                    Err(instance) => instance,
                })
            },
        ));

        self.context
            .entry_mut(self.index)
            .post_processors
            .push(Arc::new(adapter));
        self
    }

    /// Adds a callback run for this object after its init method. Objects which have already been
    /// shared (e.g. by a proxy created by another post-processor) are passed through unchanged.
    pub fn add_post_process_after_initialization<F>(self, callback: F) -> Self
    where
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        let object_name = self.name().to_string();
        let adapter = ObjectPostProcessorAdapter::after_initialization(Arc::new(
            move |instance: ObjectInstance, name: &str| -> Result<ObjectInstance, ErrorPtr> {
                if name != object_name {
                    return Ok(instance);
                }

                Ok(instance.try_map::<T, _>(&callback).unwrap_or_else(|instance| {
                    warn!(
                        name,
                        type_name = instance.type_name(),
                        "Cannot run after-initialization callback on a shared object."
                    );
                    instance
                }))
            },
        ));

        self.context
            .entry_mut(self.index)
            .post_processors
            .push(Arc::new(adapter));
        self
    }

    /// Makes the object castable to `A`, usually a trait the object implements. This is the
    /// builder counterpart of `#[object_alias]`.
    pub fn add_alias<A, F>(mut self, cast: F) -> Self
    where
        A: ?Sized + 'static,
        F: Fn(ObjectPtr<T>) -> ObjectPtr<A> + Send + Sync + 'static,
    {
        let alias = AliasCast {
            type_name: type_name::<A>(),
            cast: Arc::new(move |instance: ObjectInstanceAnyPtr| {
                instance
                    .downcast::<T>()
                    .map(|instance| Box::new(cast(instance)) as Box<dyn Any>)
            }),
        };

        Arc::make_mut(&mut self.definition_mut().casts).insert(TypeId::of::<A>(), alias);
        self
    }

    /// Wraps this object in a proxy exposed as `A`. The object needs to be castable to `A`.
    pub fn add_interceptor<A, F>(self, proxy_factory: F) -> Self
    where
        A: ?Sized + Send + Sync + 'static,
        F: Fn(ObjectPtr<A>) -> ObjectPtr<A> + Send + Sync + 'static,
    {
        let creator = AutoProxyCreator::<A>::new(NamePointcut::exact(self.name()), proxy_factory);
        self.context
            .entry_mut(self.index)
            .post_processors
            .push(Arc::new(creator));
        self
    }

    pub fn with_abstract(mut self, is_abstract: bool) -> Self {
        self.definition_mut().is_abstract = is_abstract;
        self
    }

    pub fn with_autowire_mode(mut self, autowire_mode: AutowireMode) -> Self {
        self.definition_mut().autowire_mode = autowire_mode;
        self
    }

    pub fn with_dependency_check(mut self, dependency_check: DependencyCheck) -> Self {
        self.definition_mut().dependency_check = dependency_check;
        self
    }

    /// Sets a method called when the owning context is closed. Applies to singletons only.
    pub fn with_destroy_method<F>(mut self, destroy_method: F) -> Self
    where
        F: Fn(&T) -> Result<(), ErrorPtr> + Send + Sync + 'static,
    {
        self.definition_mut().destroy_callback = Some(Arc::new(move |instance: &ObjectInstance| {
            instance
                .cast::<T>()
                .map(|instance| destroy_method(instance.as_ref()))
        }));
        self
    }

    /// Sets a method called after all properties are set and before-initialization
    /// post-processors have run.
    pub fn with_init_method<F>(mut self, init_method: F) -> Self
    where
        F: Fn(&mut T) -> Result<(), ErrorPtr> + Send + Sync + 'static,
    {
        self.definition_mut().init_callback = Some(Arc::new(
            move |instance: &mut (dyn Any + Send + Sync)| {
                instance
                    .downcast_mut::<T>()
                    .map(|instance| init_method(instance))
            },
        ));
        self
    }

    /// Creates the object with given function instead of [Object::instantiate]. Constructor
    /// arguments are passed to the function.
    pub fn with_factory_method<F>(mut self, factory_method: F) -> Self
    where
        F: Fn(&mut ConstructorArguments) -> Result<T, ErrorPtr> + Send + Sync + 'static,
    {
        self.definition_mut().instantiation =
            Instantiation::FactoryMethod(Arc::new(move |arguments: &mut ConstructorArguments| {
                factory_method(arguments).map(|instance| Box::new(instance) as ObjectInstanceBox)
            }));
        self
    }

    /// Creates the object by calling given function on another object, castable to `FT`.
    pub fn with_factory_object<FT, F, N>(mut self, factory_object_name: N, factory_method: F) -> Self
    where
        FT: ?Sized + 'static,
        F: Fn(&FT, &mut ConstructorArguments) -> Result<T, ErrorPtr> + Send + Sync + 'static,
        N: Into<String>,
    {
        self.definition_mut().instantiation = Instantiation::FactoryObject {
            name: factory_object_name.into(),
            factory_type_name: type_name::<FT>(),
            method: Arc::new(
                move |factory: &ObjectInstance, arguments: &mut ConstructorArguments| {
                    factory.cast::<FT>().map(|factory| {
                        factory_method(factory.as_ref(), arguments)
                            .map(|instance| Box::new(instance) as ObjectInstanceBox)
                    })
                },
            ),
        };
        self
    }

    pub fn with_lazy_init(mut self, lazy_init: bool) -> Self {
        self.definition_mut().lazy_init = lazy_init;
        self
    }

    pub fn with_resource_description<D: Into<String>>(mut self, description: D) -> Self {
        self.definition_mut().resource_description = Some(description.into());
        self
    }

    /// Switches between [SINGLETON] and [PROTOTYPE] scopes.
    pub fn with_singleton(mut self, singleton: bool) -> Self {
        self.definition_mut().scope = if singleton { SINGLETON } else { PROTOTYPE }.to_string();
        self
    }

    pub fn with_scope<S: Into<String>>(mut self, scope: S) -> Self {
        self.definition_mut().scope = scope.into();
        self
    }

    /// Inherits settings from another definition. Values set on this builder take precedence.
    pub fn with_parent<N: Into<String>>(mut self, parent_name: N) -> Self {
        self.definition_mut().parent_name = Some(parent_name.into());
        self
    }
}
