//! The basic building block of the container is an [Object]: a type which can be instantiated and
//! then configured by setting named properties. Property names replace reflective member lookup -
//! the fluent builder validates every property selector against
//! [Object::property_descriptors] before accepting it.
//!
//! ## Describing objects
//!
//! For convenience, the trait can be automatically derived if the `derive` feature is enabled:
//!
//! ```
//! use spring_fluent::instance_provider::ObjectPtr;
//! use spring_fluent::{object_alias, Object};
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! #[derive(Object, Default)]
//! struct Repository {
//!     name: String,
//! }
//!
//! #[object_alias]
//! impl Greeter for Repository {
//!     fn greet(&self) -> String {
//!         format!("Hello {}!", self.name)
//!     }
//! }
//!
//! #[derive(Object, Default)]
//! #[object(rename_all = "PascalCase")]
//! struct Service {
//!     // reference property - can be autowired
//!     repository: Option<ObjectPtr<dyn Greeter>>,
//!     #[object(name = "Retries")]
//!     retry_count: u8,
//!     #[object(ignore)]
//!     _cache: Vec<String>,
//! }
//! # fn main() {}
//! ```
//!
//! ### Supported `#[object]` struct configuration
//!
//! * `constructor = "path"` - call `path(&mut ConstructorArguments)` instead of
//! `Default::default()`
//! * `rename_all = "case"` - convert field names to property names using one of: `PascalCase`,
//! `camelCase`, `snake_case`, `kebab-case`, `SCREAMING_SNAKE_CASE`
//!
//! ### Supported `#[object]` field configuration
//!
//! * `name = "name"` - use the given property name
//! * `ignore` - do not expose the field as a property
//!
//! ## Aliases
//!
//! `#[object_alias]` on a trait implementation makes the object castable to `dyn Trait`, which is
//! required to inject it into `ObjectPtr<dyn Trait>` properties or request it by that type.

use crate::error::{ConstructorArgumentError, ObjectInstanceProviderError, PropertyError};
use crate::instance_provider::{ErrorPtr, ObjectInstance, ObjectPtr};
use std::any::{type_name, TypeId};
use std::collections::VecDeque;
use std::fmt::{Display, Formatter};

/// Base trait for objects managed by the container.
pub trait Object: Send + Sync + Sized + 'static {
    /// Creates a new, unconfigured instance.
    fn instantiate(arguments: &mut ConstructorArguments) -> Result<Self, ConstructorArgumentError>;

    /// Lists all properties which can be set on this object.
    fn property_descriptors() -> Vec<PropertyDescriptor>;

    /// Sets given property to a resolved value.
    fn set_property(&mut self, name: &str, value: ResolvedValue) -> Result<(), PropertyError>;

    /// Checks if a property with given name exists.
    fn has_property(name: &str) -> bool {
        Self::property_descriptors()
            .iter()
            .any(|descriptor| descriptor.name == name)
    }
}

/// An object producing other objects. When an object implementing this trait (and castable to
/// `dyn FactoryObject`) is requested by a type it cannot be cast to, the product is returned
/// instead.
pub trait FactoryObject: Send + Sync {
    fn object(&self) -> Result<ObjectInstance, ErrorPtr>;
}

/// Type of the object referenced by a property.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct ReferenceType {
    pub type_id: TypeId,
    pub type_name: &'static str,
}

/// Information about a single settable property.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct PropertyDescriptor {
    pub name: &'static str,

    /// Set for properties holding other objects, which makes them eligible for autowiring.
    pub reference_type: Option<ReferenceType>,
}

impl PropertyDescriptor {
    pub fn new<T: FromResolvedValue>(name: &'static str) -> Self {
        Self {
            name,
            reference_type: T::reference_type(),
        }
    }

    #[inline]
    pub fn is_reference(&self) -> bool {
        self.reference_type.is_some()
    }
}

/// Property value with all references and placeholders resolved.
#[derive(Clone, Debug)]
pub enum ResolvedValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    List(Vec<ResolvedValue>),
    Object(ObjectInstance),
}

impl Display for ResolvedValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolvedValue::String(value) => write!(f, "string '{value}'"),
            ResolvedValue::Integer(value) => write!(f, "integer {value}"),
            ResolvedValue::Float(value) => write!(f, "float {value}"),
            ResolvedValue::Boolean(value) => write!(f, "boolean {value}"),
            ResolvedValue::List(values) => write!(f, "list of {} value(s)", values.len()),
            ResolvedValue::Object(instance) => write!(f, "object of type {}", instance.type_name()),
        }
    }
}

fn conversion_error<T: ?Sized>(value: &ResolvedValue) -> PropertyError {
    PropertyError::Conversion {
        expected: type_name::<T>().to_string(),
        found: value.to_string(),
    }
}

/// Conversion from a [ResolvedValue] to a property type.
pub trait FromResolvedValue: Sized {
    fn from_resolved_value(value: ResolvedValue) -> Result<Self, PropertyError>;

    /// Returns the referenced object type, if this is a reference property type.
    fn reference_type() -> Option<ReferenceType> {
        None
    }
}

impl FromResolvedValue for String {
    fn from_resolved_value(value: ResolvedValue) -> Result<Self, PropertyError> {
        match value {
            ResolvedValue::String(value) => Ok(value),
            ResolvedValue::Integer(value) => Ok(value.to_string()),
            ResolvedValue::Float(value) => Ok(value.to_string()),
            ResolvedValue::Boolean(value) => Ok(value.to_string()),
            value => Err(conversion_error::<Self>(&value)),
        }
    }
}

impl FromResolvedValue for bool {
    fn from_resolved_value(value: ResolvedValue) -> Result<Self, PropertyError> {
        match &value {
            ResolvedValue::Boolean(value) => Ok(*value),
            ResolvedValue::String(string) => string
                .trim()
                .parse()
                .map_err(|_| conversion_error::<Self>(&value)),
            _ => Err(conversion_error::<Self>(&value)),
        }
    }
}

impl FromResolvedValue for char {
    fn from_resolved_value(value: ResolvedValue) -> Result<Self, PropertyError> {
        match &value {
            ResolvedValue::String(string) => {
                let mut chars = string.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(conversion_error::<Self>(&value)),
                }
            }
            _ => Err(conversion_error::<Self>(&value)),
        }
    }
}

macro_rules! integer_from_resolved_value {
    ($($ty:ty),*) => {
        $(
            impl FromResolvedValue for $ty {
                fn from_resolved_value(value: ResolvedValue) -> Result<Self, PropertyError> {
                    match &value {
                        ResolvedValue::Integer(integer) => {
                            <$ty>::try_from(*integer).map_err(|_| conversion_error::<Self>(&value))
                        }
                        ResolvedValue::String(string) => string
                            .trim()
                            .parse()
                            .map_err(|_| conversion_error::<Self>(&value)),
                        _ => Err(conversion_error::<Self>(&value)),
                    }
                }
            }
        )*
    };
}

integer_from_resolved_value!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

macro_rules! float_from_resolved_value {
    ($($ty:ty),*) => {
        $(
            impl FromResolvedValue for $ty {
                fn from_resolved_value(value: ResolvedValue) -> Result<Self, PropertyError> {
                    match &value {
                        ResolvedValue::Float(float) => Ok(*float as $ty),
                        ResolvedValue::Integer(integer) => Ok(*integer as $ty),
                        ResolvedValue::String(string) => string
                            .trim()
                            .parse()
                            .map_err(|_| conversion_error::<Self>(&value)),
                        _ => Err(conversion_error::<Self>(&value)),
                    }
                }
            }
        )*
    };
}

float_from_resolved_value!(f32, f64);

impl<T: FromResolvedValue> FromResolvedValue for Option<T> {
    fn from_resolved_value(value: ResolvedValue) -> Result<Self, PropertyError> {
        T::from_resolved_value(value).map(Some)
    }

    #[inline]
    fn reference_type() -> Option<ReferenceType> {
        T::reference_type()
    }
}

impl<T: FromResolvedValue> FromResolvedValue for Vec<T> {
    fn from_resolved_value(value: ResolvedValue) -> Result<Self, PropertyError> {
        match value {
            ResolvedValue::List(values) => values.into_iter().map(T::from_resolved_value).collect(),
            value => Err(conversion_error::<Self>(&value)),
        }
    }
}

impl<T: ?Sized + 'static> FromResolvedValue for ObjectPtr<T> {
    /// Casts the object to `T`. [FactoryObject]s not castable to `T` are replaced by their
    /// products.
    fn from_resolved_value(value: ResolvedValue) -> Result<Self, PropertyError> {
        match &value {
            ResolvedValue::Object(instance) => {
                if let Some(object) = instance.cast::<T>() {
                    return Ok(object);
                }

                let factory = instance
                    .cast::<dyn FactoryObject>()
                    .ok_or_else(|| conversion_error::<Self>(&value))?;

                match factory.object() {
                    Ok(product) => product
                        .cast::<T>()
                        .ok_or_else(|| conversion_error::<Self>(&ResolvedValue::Object(product))),
                    Err(error) => Err(PropertyError::Conversion {
                        expected: type_name::<Self>().to_string(),
                        found: format!("{value} failing to create its product: {error}"),
                    }),
                }
            }
            _ => Err(conversion_error::<Self>(&value)),
        }
    }

    #[inline]
    fn reference_type() -> Option<ReferenceType> {
        Some(ReferenceType {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        })
    }
}

/// Positional constructor arguments, consumed in order during instantiation.
#[derive(Clone, Debug, Default)]
pub struct ConstructorArguments {
    arguments: VecDeque<ResolvedValue>,
    consumed: usize,
}

impl ConstructorArguments {
    pub fn new(arguments: Vec<ResolvedValue>) -> Self {
        Self {
            arguments: arguments.into(),
            consumed: 0,
        }
    }

    /// Takes the next argument and converts it to the requested type.
    pub fn next<T: FromResolvedValue>(&mut self) -> Result<T, ConstructorArgumentError> {
        let index = self.consumed;
        let argument = self
            .arguments
            .pop_front()
            .ok_or(ConstructorArgumentError::Missing(index))?;

        self.consumed += 1;
        T::from_resolved_value(argument)
            .map_err(|source| ConstructorArgumentError::Conversion { index, source })
    }

    /// Takes the next argument, if present.
    pub fn next_optional<T: FromResolvedValue>(
        &mut self,
    ) -> Result<Option<T>, ConstructorArgumentError> {
        if self.arguments.is_empty() {
            Ok(None)
        } else {
            self.next().map(Some)
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.arguments.len() + self.consumed
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of arguments not consumed yet.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.arguments.len()
    }

    pub(crate) fn finish(&self) -> Result<(), ConstructorArgumentError> {
        if self.arguments.is_empty() {
            Ok(())
        } else {
            Err(ConstructorArgumentError::Unused(self.arguments.len()))
        }
    }
}

pub(crate) fn property_error(
    object: &str,
    property: &str,
    source: PropertyError,
) -> ObjectInstanceProviderError {
    ObjectInstanceProviderError::Property {
        object: object.to_string(),
        property: property.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{ConstructorArgumentError, PropertyError};
    use crate::instance_provider::{ErrorPtr, ObjectInstance, ObjectPtr};
    use crate::object::{
        ConstructorArguments, FactoryObject, FromResolvedValue, PropertyDescriptor, ResolvedValue,
    };
    use std::any::TypeId;
    use std::sync::Arc;

    struct NumberFactory(Option<u32>);

    impl FactoryObject for NumberFactory {
        fn object(&self) -> Result<ObjectInstance, ErrorPtr> {
            self.0
                .map(|number| ObjectInstance::of(ObjectPtr::new(number)))
                .ok_or_else(|| {
                    Arc::new(PropertyError::UnknownProperty("number".to_string())) as ErrorPtr
                })
        }
    }

    #[test]
    fn should_parse_scalars_from_strings() {
        assert_eq!(
            i32::from_resolved_value(ResolvedValue::String(" 42 ".to_string())).unwrap(),
            42
        );
        assert!(bool::from_resolved_value(ResolvedValue::String("true".to_string())).unwrap());
        assert_eq!(
            f64::from_resolved_value(ResolvedValue::String("1.5".to_string())).unwrap(),
            1.5
        );
        assert_eq!(
            char::from_resolved_value(ResolvedValue::String("x".to_string())).unwrap(),
            'x'
        );
    }

    #[test]
    fn should_reject_out_of_range_integers() {
        assert!(matches!(
            u8::from_resolved_value(ResolvedValue::Integer(300)).unwrap_err(),
            PropertyError::Conversion { .. }
        ));
    }

    #[test]
    fn should_convert_lists() {
        let value = ResolvedValue::List(vec![
            ResolvedValue::Integer(1),
            ResolvedValue::String("2".to_string()),
        ]);
        assert_eq!(Vec::<u16>::from_resolved_value(value).unwrap(), vec![1, 2]);
    }

    #[test]
    fn should_convert_objects() {
        let value = ResolvedValue::Object(ObjectInstance::of(ObjectPtr::new(7_u32)));
        assert_eq!(
            *Option::<ObjectPtr<u32>>::from_resolved_value(value.clone())
                .unwrap()
                .unwrap(),
            7
        );
        assert!(ObjectPtr::<String>::from_resolved_value(value).is_err());
    }

    #[test]
    fn should_describe_reference_properties() {
        let descriptor = PropertyDescriptor::new::<Option<ObjectPtr<u32>>>("dependency");
        assert_eq!(
            descriptor.reference_type.unwrap().type_id,
            TypeId::of::<u32>()
        );
        assert!(!PropertyDescriptor::new::<String>("name").is_reference());
    }

    #[test]
    fn should_consume_constructor_arguments_in_order() {
        let mut arguments = ConstructorArguments::new(vec![
            ResolvedValue::String("a".to_string()),
            ResolvedValue::Integer(2),
        ]);

        assert_eq!(arguments.next::<String>().unwrap(), "a");
        assert_eq!(arguments.remaining(), 1);
        assert!(arguments.finish().is_err());
        assert_eq!(arguments.next::<i64>().unwrap(), 2);
        assert_eq!(
            arguments.next::<i64>().unwrap_err(),
            ConstructorArgumentError::Missing(2)
        );
        assert_eq!(arguments.next_optional::<i64>().unwrap(), None);
        assert!(arguments.finish().is_ok());
        assert_eq!(arguments.len(), 2);
    }

    #[test]
    fn should_convert_factory_object_products() {
        let factory = |number| {
            ResolvedValue::Object(ObjectInstance::proxy(
                ObjectPtr::new(NumberFactory(number)) as ObjectPtr<dyn FactoryObject>
            ))
        };

        assert_eq!(
            *ObjectPtr::<u32>::from_resolved_value(factory(Some(3))).unwrap(),
            3
        );

        match ObjectPtr::<u32>::from_resolved_value(factory(None)) {
            Err(PropertyError::Conversion { found, .. }) => {
                assert!(found.contains("Unknown property: number"), "{found}")
            }
            _ => panic!("factory error was not reported"),
        }
    }
}
