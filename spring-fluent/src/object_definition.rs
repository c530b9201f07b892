//! Object definitions describe how to create and configure a single named object. They are usually
//! produced by the fluent [builder](crate::builder), but can be constructed by hand when needed.

use crate::error::{ConstructorArgumentError, PropertyError};
use crate::instance_provider::{
    concrete_cast_table, CastTable, ErrorPtr, ObjectInstance, ObjectInstanceBox,
};
use crate::object::{ConstructorArguments, Object, PropertyDescriptor, ResolvedValue};
use crate::scope::SINGLETON;
use derivative::Derivative;
use std::any::{type_name, Any, TypeId};
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::sync::Arc;

/// Unresolved value of a property or constructor argument.
#[derive(Clone, PartialEq, Debug)]
pub enum PropertyValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    List(Vec<PropertyValue>),
    /// Reference to another object by name.
    Reference(String),
}

impl PropertyValue {
    #[inline]
    pub fn reference(name: impl Into<String>) -> Self {
        Self::Reference(name.into())
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

macro_rules! integer_property_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for PropertyValue {
                fn from(value: $ty) -> Self {
                    Self::Integer(value.into())
                }
            }
        )*
    };
}

integer_property_value!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for PropertyValue {
    fn from(value: f32) -> Self {
        Self::Float(value.into())
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl<V: Into<PropertyValue>> From<Vec<V>> for PropertyValue {
    fn from(value: Vec<V>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

/// Strategy for filling reference properties which were not set explicitly.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Default)]
pub enum AutowireMode {
    #[default]
    No,
    /// Inject an object named exactly as the property.
    ByName,
    /// Inject the only object castable to the property type.
    ByType,
}

/// Which properties must be set after explicit values and autowiring have been applied.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Default)]
pub enum DependencyCheck {
    #[default]
    None,
    /// Reference properties only.
    Objects,
    /// Non-reference properties only.
    Simple,
    All,
}

impl DependencyCheck {
    pub fn applies_to(&self, descriptor: &PropertyDescriptor) -> bool {
        match self {
            DependencyCheck::None => false,
            DependencyCheck::Objects => descriptor.is_reference(),
            DependencyCheck::Simple => !descriptor.is_reference(),
            DependencyCheck::All => true,
        }
    }
}

/// Ordered property values. Setting a property twice replaces the previous value in place.
#[derive(Clone, Default, PartialEq, Debug)]
pub struct PropertyValues {
    values: Vec<(String, PropertyValue)>,
}

impl PropertyValues {
    pub fn set(&mut self, name: impl Into<String>, value: PropertyValue) {
        let name = name.into();
        match self.values.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, existing)) => *existing = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.values
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut PropertyValue)> {
        self.values
            .iter_mut()
            .map(|(name, value)| (name.as_str(), value))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Type-erased operations on a concrete [Object] type.
pub trait ObjectType: Send + Sync {
    fn target_type_id(&self) -> TypeId;

    fn target_type_name(&self) -> &'static str;

    fn instantiate(
        &self,
        arguments: &mut ConstructorArguments,
    ) -> Result<ObjectInstanceBox, ConstructorArgumentError>;

    fn property_descriptors(&self) -> Vec<PropertyDescriptor>;

    /// Sets a property on an instance of the target type. Instances of other types are rejected.
    fn set_property(
        &self,
        instance: &mut (dyn Any + Send + Sync),
        name: &str,
        value: ResolvedValue,
    ) -> Result<(), PropertyError>;
}

pub type ObjectTypePtr = Arc<dyn ObjectType>;

/// [ObjectType] backed by an [Object] implementation.
pub struct TypedObjectType<T: Object>(PhantomData<fn() -> T>);

impl<T: Object> TypedObjectType<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }

    pub fn shared() -> ObjectTypePtr {
        Arc::new(Self::new())
    }
}

impl<T: Object> Default for TypedObjectType<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Object> ObjectType for TypedObjectType<T> {
    #[inline]
    fn target_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    #[inline]
    fn target_type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn instantiate(
        &self,
        arguments: &mut ConstructorArguments,
    ) -> Result<ObjectInstanceBox, ConstructorArgumentError> {
        T::instantiate(arguments).map(|instance| Box::new(instance) as ObjectInstanceBox)
    }

    #[inline]
    fn property_descriptors(&self) -> Vec<PropertyDescriptor> {
        T::property_descriptors()
    }

    fn set_property(
        &self,
        instance: &mut (dyn Any + Send + Sync),
        name: &str,
        value: ResolvedValue,
    ) -> Result<(), PropertyError> {
        match instance.downcast_mut::<T>() {
            Some(instance) => instance.set_property(name, value),
            None => Err(PropertyError::Conversion {
                expected: type_name::<T>().to_string(),
                found: "object of a different type".to_string(),
            }),
        }
    }
}

/// Init callback. Returns [None] if the instance is not of the expected type.
pub type InitCallback =
    Arc<dyn Fn(&mut (dyn Any + Send + Sync)) -> Option<Result<(), ErrorPtr>> + Send + Sync>;

/// Destroy callback. Returns [None] if the instance cannot be cast to the expected type.
pub type DestroyCallback =
    Arc<dyn Fn(&ObjectInstance) -> Option<Result<(), ErrorPtr>> + Send + Sync>;

/// Static factory method creating objects from constructor arguments.
pub type FactoryMethod = Arc<
    dyn Fn(&mut ConstructorArguments) -> Result<ObjectInstanceBox, ErrorPtr> + Send + Sync,
>;

/// Factory method invoked on another object. Returns [None] if the factory object is not of the
/// expected type.
pub type FactoryObjectMethod = Arc<
    dyn Fn(&ObjectInstance, &mut ConstructorArguments) -> Option<Result<ObjectInstanceBox, ErrorPtr>>
        + Send
        + Sync,
>;

/// How new instances are created.
#[derive(Clone, Default)]
pub enum Instantiation {
    /// Use [Object::instantiate].
    #[default]
    Constructor,
    FactoryMethod(FactoryMethod),
    FactoryObject {
        name: String,
        factory_type_name: &'static str,
        method: FactoryObjectMethod,
    },
}

impl Debug for Instantiation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Instantiation::Constructor => f.write_str("Constructor"),
            Instantiation::FactoryMethod(_) => f.write_str("FactoryMethod"),
            Instantiation::FactoryObject {
                name,
                factory_type_name,
                ..
            } => f
                .debug_struct("FactoryObject")
                .field("name", name)
                .field("factory_type_name", factory_type_name)
                .finish(),
        }
    }
}

/// Complete description of a single object.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct ObjectDefinition {
    #[derivative(Debug = "ignore")]
    pub object_type: ObjectTypePtr,

    /// Name of the definition to inherit settings from.
    pub parent_name: Option<String>,

    /// Abstract definitions serve only as templates for children and cannot be instantiated.
    pub is_abstract: bool,

    pub scope: String,

    /// Lazy singletons are not created on context refresh, but on first request.
    pub lazy_init: bool,

    pub autowire_mode: AutowireMode,

    pub dependency_check: DependencyCheck,

    /// Objects which need to be created before this one.
    pub depends_on: Vec<String>,

    pub constructor_arguments: Vec<PropertyValue>,

    pub property_values: PropertyValues,

    pub resource_description: Option<String>,

    #[derivative(Debug = "ignore")]
    pub init_callback: Option<InitCallback>,

    #[derivative(Debug = "ignore")]
    pub destroy_callback: Option<DestroyCallback>,

    pub instantiation: Instantiation,

    /// Types the created instances can be cast to.
    #[derivative(Debug = "ignore")]
    pub casts: Arc<CastTable>,
}

impl ObjectDefinition {
    /// Creates a default definition for given object type.
    pub fn new<T: Object>() -> Self {
        Self {
            object_type: TypedObjectType::<T>::shared(),
            parent_name: None,
            is_abstract: false,
            scope: SINGLETON.to_string(),
            lazy_init: false,
            autowire_mode: AutowireMode::default(),
            dependency_check: DependencyCheck::default(),
            depends_on: vec![],
            constructor_arguments: vec![],
            property_values: PropertyValues::default(),
            resource_description: None,
            init_callback: None,
            destroy_callback: None,
            instantiation: Instantiation::default(),
            casts: Arc::new(concrete_cast_table::<T>()),
        }
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.object_type.target_type_name()
    }

    #[inline]
    pub fn is_castable_to(&self, type_id: TypeId) -> bool {
        self.casts.contains_key(&type_id)
    }

    #[inline]
    pub fn is_singleton(&self) -> bool {
        self.scope == SINGLETON
    }

    /// Returns the definition resulting from inheriting settings from the given parent. Values set
    /// on the child take precedence.
    pub fn merge_with_parent(&self, parent: &ObjectDefinition) -> ObjectDefinition {
        let mut merged = self.clone();
        merged.parent_name = None;

        let mut property_values = parent.property_values.clone();
        for (name, value) in self.property_values.iter() {
            property_values.set(name, value.clone());
        }
        merged.property_values = property_values;

        if merged.constructor_arguments.is_empty() {
            merged.constructor_arguments = parent.constructor_arguments.clone();
        }

        if merged.init_callback.is_none() {
            merged.init_callback = parent.init_callback.clone();
        }

        if merged.destroy_callback.is_none() {
            merged.destroy_callback = parent.destroy_callback.clone();
        }

        if matches!(merged.instantiation, Instantiation::Constructor) {
            merged.instantiation = parent.instantiation.clone();
        }

        if merged.resource_description.is_none() {
            merged.resource_description = parent.resource_description.clone();
        }

        merged
    }
}
