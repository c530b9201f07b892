//! Functionality related to registering named [ObjectDefinition]s. An
//! [ObjectInstanceProvider](crate::instance_provider::ObjectInstanceProvider) creates objects based
//! on the definitions registered here.

use crate::error::ObjectDefinitionRegistryError;
use crate::object_definition::ObjectDefinition;
use fxhash::FxHashMap;
#[cfg(test)]
use mockall::automock;
use std::any::TypeId;
use tracing::debug;

/// A registry of object definitions, keyed by object name.
#[cfg_attr(test, automock)]
pub trait ObjectDefinitionRegistry {
    /// Adds a new definition. Handling of duplicate names is registry-dependent.
    fn register_definition(
        &mut self,
        name: &str,
        definition: ObjectDefinition,
    ) -> Result<(), ObjectDefinitionRegistryError>;

    /// Replaces an already registered definition.
    fn replace_definition(
        &mut self,
        name: &str,
        definition: ObjectDefinition,
    ) -> Result<(), ObjectDefinitionRegistryError>;

    /// Returns the definition with given name, as registered.
    fn definition(&self, name: &str) -> Option<ObjectDefinition>;

    /// Returns the definition with given name merged with all its ancestors.
    fn merged_definition(&self, name: &str)
        -> Result<ObjectDefinition, ObjectDefinitionRegistryError>;

    /// Returns all names in registration order.
    fn definition_names(&self) -> Vec<String>;

    /// Returns names of all non-abstract definitions castable to the given type, in registration
    /// order.
    fn names_for_type(&self, type_id: TypeId) -> Vec<String>;

    /// Checks if there's a definition with given name.
    fn is_name_registered(&self, name: &str) -> bool;
}

/// Registry keeping definitions in memory.
#[derive(Clone, Debug)]
pub struct DefaultObjectDefinitionRegistry {
    definitions: FxHashMap<String, ObjectDefinition>,
    names: Vec<String>,
    allow_definition_overriding: bool,
}

impl DefaultObjectDefinitionRegistry {
    pub fn new(allow_definition_overriding: bool) -> Self {
        Self {
            definitions: Default::default(),
            names: vec![],
            allow_definition_overriding,
        }
    }

    fn merge_ancestors(
        &self,
        definition: &ObjectDefinition,
        chain: &mut Vec<String>,
    ) -> Result<ObjectDefinition, ObjectDefinitionRegistryError> {
        let parent_name = match &definition.parent_name {
            Some(parent_name) => parent_name,
            None => return Ok(definition.clone()),
        };

        if chain.contains(parent_name) {
            return Err(ObjectDefinitionRegistryError::ParentCycle(
                chain.first().cloned().unwrap_or_default(),
            ));
        }

        let parent = self.definitions.get(parent_name).ok_or_else(|| {
            ObjectDefinitionRegistryError::MissingParentDefinition {
                name: chain.last().cloned().unwrap_or_default(),
                parent: parent_name.clone(),
            }
        })?;

        chain.push(parent_name.clone());

        let parent = self.merge_ancestors(parent, chain)?;
        Ok(definition.merge_with_parent(&parent))
    }
}

impl Default for DefaultObjectDefinitionRegistry {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ObjectDefinitionRegistry for DefaultObjectDefinitionRegistry {
    fn register_definition(
        &mut self,
        name: &str,
        definition: ObjectDefinition,
    ) -> Result<(), ObjectDefinitionRegistryError> {
        if self.definitions.contains_key(name) {
            if !self.allow_definition_overriding {
                return Err(ObjectDefinitionRegistryError::DuplicateObjectName(
                    name.to_string(),
                ));
            }

            debug!(name, "Overriding object definition.");
        } else {
            self.names.push(name.to_string());
        }

        debug!(name, type_name = definition.type_name(), "Registering object definition.");

        self.definitions.insert(name.to_string(), definition);
        Ok(())
    }

    fn replace_definition(
        &mut self,
        name: &str,
        definition: ObjectDefinition,
    ) -> Result<(), ObjectDefinitionRegistryError> {
        let existing = self
            .definitions
            .get_mut(name)
            .ok_or_else(|| ObjectDefinitionRegistryError::NoSuchDefinition(name.to_string()))?;

        *existing = definition;
        Ok(())
    }

    #[inline]
    fn definition(&self, name: &str) -> Option<ObjectDefinition> {
        self.definitions.get(name).cloned()
    }

    fn merged_definition(
        &self,
        name: &str,
    ) -> Result<ObjectDefinition, ObjectDefinitionRegistryError> {
        let definition = self
            .definitions
            .get(name)
            .ok_or_else(|| ObjectDefinitionRegistryError::NoSuchDefinition(name.to_string()))?;

        self.merge_ancestors(definition, &mut vec![name.to_string()])
    }

    #[inline]
    fn definition_names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn names_for_type(&self, type_id: TypeId) -> Vec<String> {
        self.names
            .iter()
            .filter(|name| {
                self.definitions.get(*name).map_or(false, |definition| {
                    !definition.is_abstract && definition.is_castable_to(type_id)
                })
            })
            .cloned()
            .collect()
    }

    #[inline]
    fn is_name_registered(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }
}

/// Generates a name for an anonymous object of given type: `type_name#N` with the smallest `N`
/// for which `is_taken` returns false.
pub fn generate_object_name<F: Fn(&str) -> bool>(type_name: &str, is_taken: F) -> String {
    (0..)
        .map(|counter| format!("{type_name}#{counter}"))
        .find(|name| !is_taken(name))
        .unwrap_or_else(|| type_name.to_string())
}

#[doc(hidden)]
pub mod internal {
    use crate::instance_provider::ObjectInstanceAnyPtr;
    use inventory::collect;
    pub use inventory::submit;
    use std::any::{Any, TypeId};

    /// Registration of an alias type (usually `dyn Trait`) for a concrete object type.
    #[derive(Clone, Copy)]
    pub struct ObjectAliasDefinition {
        pub alias_type: TypeId,
        pub target_type: TypeId,
        pub alias_name: &'static str,
        pub target_name: &'static str,
        pub cast: fn(ObjectInstanceAnyPtr) -> Result<Box<dyn Any>, ObjectInstanceAnyPtr>,
    }

    pub struct ObjectAliasRegisterer {
        pub register: fn() -> ObjectAliasDefinition,
    }

    collect!(ObjectAliasRegisterer);

    pub fn registered_aliases(target_type: TypeId) -> impl Iterator<Item = ObjectAliasDefinition> {
        inventory::iter::<ObjectAliasRegisterer>
            .into_iter()
            .map(|registerer| (registerer.register)())
            .filter(move |definition| definition.target_type == target_type)
    }
}
