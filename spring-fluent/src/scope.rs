//! Object instances are contained in [Scope]s - containers which decide when to reuse or create an
//! instance. There's a global one for singletons, but custom ones can be registered by name with
//! the [ObjectFactoryBuilder](crate::factory::ObjectFactoryBuilder), e.g. tying the lifetime of
//! instances to a request or a thread.
//!
//! Note: scope resolution happens at instantiation time, so a [singleton](SINGLETON) object
//! depending on a [prototype](PROTOTYPE) one keeps the single prototype instance it received for
//! as long as the singleton lives.

use crate::instance_provider::ObjectInstance;
use fxhash::FxHashMap;
#[cfg(test)]
use mockall::automock;

pub type ScopePtr = Box<dyn Scope + Send + Sync>;

/// Name of the [SingletonScope].
pub const SINGLETON: &str = "SINGLETON";

/// Name of the [PrototypeScope].
pub const PROTOTYPE: &str = "PROTOTYPE";

/// A scope containing object instances. See module documentation for information on scopes.
#[cfg_attr(test, automock)]
pub trait Scope {
    /// Gets an instance of the named object, if available in this scope.
    fn instance(&self, name: &str) -> Option<ObjectInstance>;

    /// Stores given instance in the scope. The scope might not support storing instances and ignore
    /// it.
    fn store_instance(&mut self, name: &str, instance: ObjectInstance);

    /// Removes all stored instances.
    fn clear(&mut self);
}

/// Scope for instances shared between objects. Stateless objects are good candidates to be stored
/// in the singleton scope.
#[derive(Default)]
pub struct SingletonScope {
    instances: FxHashMap<String, ObjectInstance>,
}

impl Scope for SingletonScope {
    #[inline]
    fn instance(&self, name: &str) -> Option<ObjectInstance> {
        self.instances.get(name).cloned()
    }

    #[inline]
    fn store_instance(&mut self, name: &str, instance: ObjectInstance) {
        self.instances.insert(name.to_string(), instance);
    }

    #[inline]
    fn clear(&mut self) {
        self.instances.clear();
    }
}

/// A scope which creates a new instance of a given object on each request. Stateful objects
/// usually should be stored in a prototype scope.
#[derive(Default, Copy, Clone, Eq, PartialEq)]
pub struct PrototypeScope;

impl Scope for PrototypeScope {
    #[inline]
    fn instance(&self, _name: &str) -> Option<ObjectInstance> {
        None
    }

    #[inline]
    fn store_instance(&mut self, _name: &str, _instance: ObjectInstance) {}

    #[inline]
    fn clear(&mut self) {}
}

/// Factory for custom [Scope]s.
#[cfg_attr(test, automock)]
pub trait ScopeFactory {
    fn create_scope(&self) -> ScopePtr;
}

#[derive(Copy, Clone, Eq, PartialEq, Default)]
pub struct SingletonScopeFactory;

impl ScopeFactory for SingletonScopeFactory {
    fn create_scope(&self) -> ScopePtr {
        Box::<SingletonScope>::default()
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Default)]
pub struct PrototypeScopeFactory;

impl ScopeFactory for PrototypeScopeFactory {
    fn create_scope(&self) -> ScopePtr {
        Box::<PrototypeScope>::default()
    }
}

#[cfg(test)]
mod tests {
    use crate::instance_provider::{ObjectInstance, ObjectPtr};
    use crate::scope::{PrototypeScopeFactory, ScopeFactory, SingletonScopeFactory};

    #[test]
    fn should_support_singletons() {
        let factory = SingletonScopeFactory;
        let mut scope = factory.create_scope();

        scope.store_instance("name", ObjectInstance::of(ObjectPtr::new(0)));

        assert!(scope.instance("name").is_some());
        assert!(scope.instance("other").is_none());

        scope.clear();
        assert!(scope.instance("name").is_none());
    }

    #[test]
    fn should_support_prototypes() {
        let factory = PrototypeScopeFactory;
        let mut scope = factory.create_scope();

        scope.store_instance("name", ObjectInstance::of(ObjectPtr::new(0)));

        assert!(scope.instance("name").is_none());
    }
}
