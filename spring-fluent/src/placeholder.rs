//! Placeholder substitution in object definitions. Property values, constructor arguments and
//! object references can contain `${name}` tokens, which get replaced with values of variables
//! provided by [VariableSource]s when the context is refreshed.
//!
//! Resolved values can contain placeholders themselves - they are resolved recursively, with
//! circular references reported as errors.

use crate::error::{ContextError, PlaceholderError};
use crate::object_definition::PropertyValue;
use crate::object_registry::ObjectDefinitionRegistry;
use crate::post_processor::ObjectFactoryPostProcessor;
use derivative::Derivative;
use fxhash::FxHashMap;
#[cfg(test)]
use mockall::automock;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_PLACEHOLDER_PREFIX: &str = "${";

pub const DEFAULT_PLACEHOLDER_SUFFIX: &str = "}";

/// Source of variable values.
#[cfg_attr(test, automock)]
pub trait VariableSource {
    /// Checks if this source knows the given variable.
    fn can_resolve_variable(&self, name: &str) -> bool;

    /// Returns the variable value, if known.
    fn resolve_variable(&self, name: &str) -> Option<String>;
}

pub type VariableSourcePtr = Arc<dyn VariableSource + Send + Sync>;

/// [VariableSource] backed by an in-memory map.
#[derive(Clone, Default, Debug)]
pub struct MapVariableSource {
    variables: FxHashMap<String, String>,
}

impl MapVariableSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapVariableSource {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            variables: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

impl VariableSource for MapVariableSource {
    #[inline]
    fn can_resolve_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    #[inline]
    fn resolve_variable(&self, name: &str) -> Option<String> {
        self.variables.get(name).cloned()
    }
}

/// [VariableSource] reading process environment variables, optionally with a name prefix.
#[derive(Clone, Default, Debug)]
pub struct EnvironmentVariableSource {
    prefix: Option<String>,
}

impl EnvironmentVariableSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up `{prefix}{name}` instead of just `name`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    fn variable_name(&self, name: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}{name}"),
            None => name.to_string(),
        }
    }
}

impl VariableSource for EnvironmentVariableSource {
    fn can_resolve_variable(&self, name: &str) -> bool {
        std::env::var_os(self.variable_name(name)).is_some()
    }

    fn resolve_variable(&self, name: &str) -> Option<String> {
        std::env::var(self.variable_name(name)).ok()
    }
}

/// [ObjectFactoryPostProcessor] replacing placeholders with values from registered
/// [VariableSource]s. Sources are consulted in registration order.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct VariablePlaceholderConfigurer {
    #[derivative(Debug = "ignore")]
    variable_sources: Vec<VariableSourcePtr>,
    placeholder_prefix: String,
    placeholder_suffix: String,
    ignore_unresolvable_placeholders: bool,
}

impl Default for VariablePlaceholderConfigurer {
    fn default() -> Self {
        Self {
            variable_sources: vec![],
            placeholder_prefix: DEFAULT_PLACEHOLDER_PREFIX.to_string(),
            placeholder_suffix: DEFAULT_PLACEHOLDER_SUFFIX.to_string(),
            ignore_unresolvable_placeholders: false,
        }
    }
}

impl VariablePlaceholderConfigurer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_placeholder_prefix(mut self, placeholder_prefix: impl Into<String>) -> Self {
        self.placeholder_prefix = placeholder_prefix.into();
        self
    }

    pub fn with_placeholder_suffix(mut self, placeholder_suffix: impl Into<String>) -> Self {
        self.placeholder_suffix = placeholder_suffix.into();
        self
    }

    /// Leaves unresolvable placeholders as-is instead of failing.
    pub fn with_ignore_unresolvable_placeholders(mut self, ignore: bool) -> Self {
        self.ignore_unresolvable_placeholders = ignore;
        self
    }

    pub fn with_variable_source(mut self, source: VariableSourcePtr) -> Self {
        self.add_variable_source(source);
        self
    }

    pub fn add_variable_source(&mut self, source: VariableSourcePtr) {
        self.variable_sources.push(source);
    }

    #[inline]
    pub fn variable_sources(&self) -> &[VariableSourcePtr] {
        &self.variable_sources
    }

    #[inline]
    pub fn placeholder_prefix(&self) -> &str {
        &self.placeholder_prefix
    }

    #[inline]
    pub fn placeholder_suffix(&self) -> &str {
        &self.placeholder_suffix
    }

    #[inline]
    pub fn ignore_unresolvable_placeholders(&self) -> bool {
        self.ignore_unresolvable_placeholders
    }

    /// Replaces all placeholders in given text. The object name is used only for error reporting.
    pub fn resolve_placeholders(&self, object: &str, text: &str) -> Result<String, PlaceholderError> {
        self.parse_text(object, text, &mut vec![])
    }

    fn resolve_variable(&self, name: &str) -> Option<String> {
        self.variable_sources.iter().find_map(|source| {
            if source.can_resolve_variable(name) {
                source.resolve_variable(name)
            } else {
                None
            }
        })
    }

    fn parse_text(
        &self,
        object: &str,
        text: &str,
        visiting: &mut Vec<String>,
    ) -> Result<String, PlaceholderError> {
        if self.placeholder_prefix.is_empty() || self.placeholder_suffix.is_empty() {
            return Ok(text.to_string());
        }

        let mut result = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(start) = rest.find(&self.placeholder_prefix) {
            let inner = &rest[start + self.placeholder_prefix.len()..];
            let end = match self.find_placeholder_end(inner) {
                Some(end) => end,
                None => break,
            };

            result.push_str(&rest[..start]);

            let placeholder = self.parse_text(object, &inner[..end], visiting)?;
            if visiting.contains(&placeholder) {
                return Err(PlaceholderError::Circular {
                    object: object.to_string(),
                    placeholder,
                });
            }

            match self.resolve_variable(&placeholder) {
                Some(value) => {
                    visiting.push(placeholder);
                    let value = self.parse_text(object, &value, visiting)?;
                    visiting.pop();

                    result.push_str(&value);
                }
                None if self.ignore_unresolvable_placeholders => {
                    result.push_str(&self.placeholder_prefix);
                    result.push_str(&placeholder);
                    result.push_str(&self.placeholder_suffix);
                }
                None => {
                    return Err(PlaceholderError::Unresolvable {
                        object: object.to_string(),
                        placeholder,
                    })
                }
            }

            rest = &inner[end + self.placeholder_suffix.len()..];
        }

        result.push_str(rest);
        Ok(result)
    }

    // finds the suffix matching the already consumed prefix, skipping nested placeholders
    fn find_placeholder_end(&self, text: &str) -> Option<usize> {
        let mut depth = 0_usize;
        let mut index = 0;

        while index < text.len() {
            let rest = &text[index..];
            if rest.starts_with(&self.placeholder_suffix) {
                if depth == 0 {
                    return Some(index);
                }

                depth -= 1;
                index += self.placeholder_suffix.len();
            } else if rest.starts_with(&self.placeholder_prefix) {
                depth += 1;
                index += self.placeholder_prefix.len();
            } else {
                index += rest.chars().next().map_or(1, char::len_utf8);
            }
        }

        None
    }

    fn resolve_value(
        &self,
        object: &str,
        value: &mut PropertyValue,
    ) -> Result<bool, PlaceholderError> {
        match value {
            PropertyValue::String(text) | PropertyValue::Reference(text) => {
                let resolved = self.resolve_placeholders(object, text)?;
                if resolved == *text {
                    Ok(false)
                } else {
                    *text = resolved;
                    Ok(true)
                }
            }
            PropertyValue::List(values) => {
                let mut changed = false;
                for value in values {
                    changed |= self.resolve_value(object, value)?;
                }

                Ok(changed)
            }
            _ => Ok(false),
        }
    }
}

impl ObjectFactoryPostProcessor for VariablePlaceholderConfigurer {
    fn post_process_object_factory(
        &self,
        registry: &mut dyn ObjectDefinitionRegistry,
    ) -> Result<(), ContextError> {
        for name in registry.definition_names() {
            let mut definition = match registry.definition(&name) {
                Some(definition) => definition,
                None => continue,
            };

            let mut changed = false;
            for (_, value) in definition.property_values.iter_mut() {
                changed |= self.resolve_value(&name, value)?;
            }

            for value in &mut definition.constructor_arguments {
                changed |= self.resolve_value(&name, value)?;
            }

            if changed {
                debug!(name, "Resolved placeholders in object definition.");
                registry.replace_definition(&name, definition)?;
            }
        }

        Ok(())
    }
}
