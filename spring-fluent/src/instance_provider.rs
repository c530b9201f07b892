//! Shared object instances and the providers handing them out.
//!
//! Instances are type-erased once created. Each [ObjectInstance] carries a cast table, which knows
//! how to turn the erased pointer into an [ObjectPtr] of its concrete type or any registered alias
//! (usually a `dyn Trait`). Asking for a type missing from the table is how compatibility checks are
//! performed throughout the crate.

use crate::error::{ObjectInstanceProviderError, UnsatisfiedDependencyError};
use crate::object::FactoryObject;
use crate::object_registry::internal::registered_aliases;
use derivative::Derivative;
use fxhash::FxHashMap;
use std::any::{type_name, Any, TypeId};
use std::error::Error;
use std::sync::Arc;

pub type ObjectPtr<T> = Arc<T>;

pub type ObjectInstanceAnyPtr = ObjectPtr<dyn Any + Send + Sync + 'static>;

pub type ErrorPtr = Arc<dyn Error + Send + Sync>;

/// Owned, type-erased instance - used before an object gets shared.
pub type ObjectInstanceBox = Box<dyn Any + Send + Sync + 'static>;

/// Casts a type-erased instance to a `Box<ObjectPtr<Target>>` erased as `Box<dyn Any>`. Returns the
/// original instance if the cast is not possible.
pub type CastFunction =
    Arc<dyn Fn(ObjectInstanceAnyPtr) -> Result<Box<dyn Any>, ObjectInstanceAnyPtr> + Send + Sync>;

/// A single entry in a cast table.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct AliasCast {
    pub type_name: &'static str,
    #[derivative(Debug = "ignore")]
    pub cast: CastFunction,
}

pub type CastTable = FxHashMap<TypeId, AliasCast>;

fn cast_concrete<T: Send + Sync + 'static>(
    instance: ObjectInstanceAnyPtr,
) -> Result<Box<dyn Any>, ObjectInstanceAnyPtr> {
    instance
        .downcast::<T>()
        .map(|instance| Box::new(instance) as Box<dyn Any>)
}

fn cast_proxy<T: ?Sized + Send + Sync + 'static>(
    instance: ObjectInstanceAnyPtr,
) -> Result<Box<dyn Any>, ObjectInstanceAnyPtr> {
    instance
        .downcast::<ObjectPtr<T>>()
        .map(|proxy| Box::new(ObjectPtr::clone(&*proxy)) as Box<dyn Any>)
}

/// Creates a cast table for a concrete type, containing the type itself and all aliases registered
/// with `#[object_alias]`.
pub fn concrete_cast_table<T: Send + Sync + 'static>() -> CastTable {
    let mut table: CastTable = registered_aliases(TypeId::of::<T>())
        .map(|alias| {
            let cast = alias.cast;
            (
                alias.alias_type,
                AliasCast {
                    type_name: alias.alias_name,
                    cast: Arc::new(cast),
                },
            )
        })
        .collect();

    table.insert(
        TypeId::of::<T>(),
        AliasCast {
            type_name: type_name::<T>(),
            cast: Arc::new(cast_concrete::<T>),
        },
    );

    table
}

/// A shared, type-erased object instance along with information on how to cast it.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct ObjectInstance {
    type_name: &'static str,
    #[derivative(Debug = "ignore")]
    instance: ObjectInstanceAnyPtr,
    #[derivative(Debug = "ignore")]
    casts: Arc<CastTable>,
}

impl ObjectInstance {
    pub fn new(
        instance: ObjectInstanceAnyPtr,
        type_name: &'static str,
        casts: Arc<CastTable>,
    ) -> Self {
        Self {
            type_name,
            instance,
            casts,
        }
    }

    /// Wraps a concrete instance, making it castable to itself and its registered aliases.
    pub fn of<T: Send + Sync + 'static>(instance: ObjectPtr<T>) -> Self {
        Self::new(
            instance as ObjectInstanceAnyPtr,
            type_name::<T>(),
            Arc::new(concrete_cast_table::<T>()),
        )
    }

    /// Wraps a proxy, which is castable only to the type it was created for.
    pub fn proxy<T: ?Sized + Send + Sync + 'static>(proxy: ObjectPtr<T>) -> Self {
        let mut casts = CastTable::default();
        casts.insert(
            TypeId::of::<T>(),
            AliasCast {
                type_name: type_name::<T>(),
                cast: Arc::new(cast_proxy::<T>),
            },
        );

        Self::new(
            ObjectPtr::new(proxy) as ObjectInstanceAnyPtr,
            type_name::<T>(),
            Arc::new(casts),
        )
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[inline]
    pub fn casts(&self) -> &Arc<CastTable> {
        &self.casts
    }

    #[inline]
    pub fn as_any(&self) -> &ObjectInstanceAnyPtr {
        &self.instance
    }

    #[inline]
    pub fn is_castable_to(&self, type_id: TypeId) -> bool {
        self.casts.contains_key(&type_id)
    }

    /// Tries to cast this instance to the given type.
    pub fn cast<T: ?Sized + 'static>(&self) -> Option<ObjectPtr<T>> {
        let alias = self.casts.get(&TypeId::of::<T>())?;
        (alias.cast)(self.instance.clone())
            .ok()
            .and_then(|instance| instance.downcast::<ObjectPtr<T>>().ok())
            .map(|instance| *instance)
    }

    /// Returns the underlying value if it's of type `T` and not shared with anyone, or gives back
    /// the instance otherwise.
    pub fn try_unwrap<T: Send + Sync + 'static>(self) -> Result<T, Self> {
        let Self {
            type_name,
            instance,
            casts,
        } = self;

        let instance = match instance.downcast::<T>() {
            Ok(instance) => instance,
            Err(instance) => {
                return Err(Self {
                    type_name,
                    instance,
                    casts,
                })
            }
        };

        ObjectPtr::try_unwrap(instance).map_err(|instance| Self {
            type_name,
            instance: instance as ObjectInstanceAnyPtr,
            casts,
        })
    }

    /// Replaces the underlying `T` value with the result of the given function, keeping the type
    /// information. Gives back the instance if it's not a `T` or is shared with anyone.
    pub fn try_map<T, F>(self, f: F) -> Result<Self, Self>
    where
        T: Send + Sync + 'static,
        F: FnOnce(T) -> T,
    {
        let type_name = self.type_name;
        let casts = self.casts.clone();

        self.try_unwrap::<T>().map(|value| Self {
            type_name,
            instance: ObjectPtr::new(f(value)) as ObjectInstanceAnyPtr,
            casts,
        })
    }

    /// Creates a new instance with the same type information, but different value. The value
    /// should be of the same type as the original.
    pub fn with_value<T: Send + Sync + 'static>(&self, value: T) -> Self {
        Self {
            type_name: self.type_name,
            instance: ObjectPtr::new(value) as ObjectInstanceAnyPtr,
            casts: self.casts.clone(),
        }
    }
}

/// Generic provider for object instances.
pub trait ObjectInstanceProvider {
    /// Returns an instance of the object with the given name, creating it if necessary.
    fn instance_by_name(&mut self, name: &str)
        -> Result<ObjectInstance, ObjectInstanceProviderError>;

    /// Returns the names of all non-abstract objects castable to the given type.
    fn object_names_for_type(&self, type_id: TypeId) -> Vec<String>;

    /// Checks if there's a definition with given name.
    fn contains_object(&self, name: &str) -> bool;
}

/// Helper trait for [ObjectInstanceProvider] providing strongly-typed access.
pub trait TypedObjectInstanceProvider {
    /// Returns a named object cast to `T`. When the object itself is not a `T`, but a
    /// [FactoryObject], the product of the factory is returned instead.
    fn object<T: ?Sized + 'static>(
        &mut self,
        name: &str,
    ) -> Result<ObjectPtr<T>, ObjectInstanceProviderError>;

    /// Returns the single object castable to `T`. Fails with
    /// [UnsatisfiedDependency](ObjectInstanceProviderError::UnsatisfiedDependency) when there's
    /// none or more than one.
    fn object_by_type<T: ?Sized + 'static>(
        &mut self,
    ) -> Result<ObjectPtr<T>, ObjectInstanceProviderError>;

    /// Typesafe version of [ObjectInstanceProvider::object_names_for_type].
    fn object_names_for_type_typed<T: ?Sized + 'static>(&self) -> Vec<String>;
}

impl<OIP: ObjectInstanceProvider + ?Sized> TypedObjectInstanceProvider for OIP {
    fn object<T: ?Sized + 'static>(
        &mut self,
        name: &str,
    ) -> Result<ObjectPtr<T>, ObjectInstanceProviderError> {
        let instance = self.instance_by_name(name)?;
        if let Some(instance) = instance.cast::<T>() {
            return Ok(instance);
        }

        let incompatible = || ObjectInstanceProviderError::IncompatibleObject {
            name: name.to_string(),
            type_name: type_name::<T>().to_string(),
        };

        let factory = instance
            .cast::<dyn FactoryObject>()
            .ok_or_else(incompatible)?;

        factory
            .object()
            .map_err(|source| ObjectInstanceProviderError::Creation {
                object: name.to_string(),
                source,
            })?
            .cast::<T>()
            .ok_or_else(incompatible)
    }

    fn object_by_type<T: ?Sized + 'static>(
        &mut self,
    ) -> Result<ObjectPtr<T>, ObjectInstanceProviderError> {
        let mut names = self.object_names_for_type(TypeId::of::<T>());
        match names.len() {
            0 => Err(UnsatisfiedDependencyError::NoCandidate(type_name::<T>().to_string()).into()),
            1 => {
                let name = names.remove(0);
                self.object::<T>(&name)
            }
            _ => Err(UnsatisfiedDependencyError::MultipleCandidates {
                type_name: type_name::<T>().to_string(),
                names,
            }
            .into()),
        }
    }

    #[inline]
    fn object_names_for_type_typed<T: ?Sized + 'static>(&self) -> Vec<String> {
        self.object_names_for_type(TypeId::of::<T>())
    }
}
