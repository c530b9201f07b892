//! Name-based auto-proxying. An [AutoProxyCreator] replaces objects whose names match a
//! [NamePointcut] with proxies wrapping them. Proxies are created by user code, typically by
//! implementing the same trait as the target and delegating to it:
//!
//! ```
//! use spring_fluent::aop::{AutoProxyCreator, NamePointcut};
//! use spring_fluent::instance_provider::ObjectPtr;
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! struct InterceptingGreeter(ObjectPtr<dyn Greeter>);
//!
//! impl Greeter for InterceptingGreeter {
//!     fn greet(&self) -> String {
//!         format!("Intercepted: {}", self.0.greet())
//!     }
//! }
//!
//! let creator = AutoProxyCreator::<dyn Greeter>::new(
//!     NamePointcut::new(["*Service"]).unwrap(),
//!     |target| ObjectPtr::new(InterceptingGreeter(target)) as ObjectPtr<dyn Greeter>,
//! );
//! ```

use crate::instance_provider::{ErrorPtr, ObjectInstance, ObjectPtr};
use crate::post_processor::ObjectPostProcessor;
use derivative::Derivative;
use regex::Regex;
use std::any::type_name;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone, Debug)]
enum NamePattern {
    Exact(String),
    Wildcard(Regex),
}

impl NamePattern {
    fn matches(&self, name: &str) -> bool {
        match self {
            NamePattern::Exact(pattern) => pattern == name,
            NamePattern::Wildcard(regex) => regex.is_match(name),
        }
    }
}

/// Matches object names against a list of patterns, where `*` matches any sequence of characters.
#[derive(Clone, Debug, Default)]
pub struct NamePointcut {
    patterns: Vec<NamePattern>,
}

impl NamePointcut {
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        patterns
            .into_iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                if pattern.contains('*') {
                    let expression = pattern
                        .split('*')
                        .map(regex::escape)
                        .collect::<Vec<_>>()
                        .join(".*");

                    Regex::new(&format!("^{expression}$")).map(NamePattern::Wildcard)
                } else {
                    Ok(NamePattern::Exact(pattern.to_string()))
                }
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|patterns| Self { patterns })
    }

    /// Creates a pointcut matching exactly one name.
    pub fn exact(name: impl Into<String>) -> Self {
        Self {
            patterns: vec![NamePattern::Exact(name.into())],
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches(name))
    }
}

pub type ProxyFactory<T> = Arc<dyn Fn(ObjectPtr<T>) -> ObjectPtr<T> + Send + Sync>;

/// Post-processor wrapping matching objects castable to `T` in proxies. The resulting object can
/// only be cast to `T`.
#[derive(Derivative)]
#[derivative(Clone(bound = ""), Debug(bound = ""))]
pub struct AutoProxyCreator<T: ?Sized> {
    pointcut: NamePointcut,
    #[derivative(Debug = "ignore")]
    proxy_factory: ProxyFactory<T>,
}

impl<T: ?Sized + Send + Sync + 'static> AutoProxyCreator<T> {
    pub fn new<F>(pointcut: NamePointcut, proxy_factory: F) -> Self
    where
        F: Fn(ObjectPtr<T>) -> ObjectPtr<T> + Send + Sync + 'static,
    {
        Self {
            pointcut,
            proxy_factory: Arc::new(proxy_factory),
        }
    }

    #[inline]
    pub fn pointcut(&self) -> &NamePointcut {
        &self.pointcut
    }
}

impl<T: ?Sized + Send + Sync + 'static> ObjectPostProcessor for AutoProxyCreator<T> {
    fn post_process_after_initialization(
        &self,
        instance: ObjectInstance,
        name: &str,
    ) -> Result<ObjectInstance, ErrorPtr> {
        if !self.pointcut.matches(name) {
            return Ok(instance);
        }

        match instance.cast::<T>() {
            Some(target) => {
                debug!(name, proxy_type = type_name::<T>(), "Creating proxy.");
                Ok(ObjectInstance::proxy((self.proxy_factory)(target)))
            }
            None => Ok(instance),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::aop::{AutoProxyCreator, NamePointcut};
    use crate::instance_provider::{ObjectInstance, ObjectPtr};
    use crate::post_processor::ObjectPostProcessor;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    impl Greeter for String {
        fn greet(&self) -> String {
            self.clone()
        }
    }

    struct Proxy(ObjectPtr<dyn Greeter>);

    impl Greeter for Proxy {
        fn greet(&self) -> String {
            format!("Intercepted: {}", self.0.greet())
        }
    }

    fn create_instance() -> ObjectInstance {
        let target = ObjectPtr::new("Hello".to_string()) as ObjectPtr<dyn Greeter>;
        ObjectInstance::proxy(target)
    }

    #[test]
    fn should_match_wildcards() {
        let pointcut = NamePointcut::new(["*Service", "exact", "a*b*c", "dot.*"]).unwrap();

        assert!(pointcut.matches("UserService"));
        assert!(pointcut.matches("Service"));
        assert!(pointcut.matches("exact"));
        assert!(pointcut.matches("aXbYc"));
        assert!(pointcut.matches("dot.name"));
        assert!(!pointcut.matches("dotXname"));
        assert!(!pointcut.matches("ServiceImpl"));
        assert!(!pointcut.matches("exactly"));
    }

    #[test]
    fn should_proxy_matching_objects() {
        let creator = AutoProxyCreator::<dyn Greeter>::new(NamePointcut::exact("greeter"), |target| {
            ObjectPtr::new(Proxy(target)) as ObjectPtr<dyn Greeter>
        });

        let instance = creator
            .post_process_after_initialization(create_instance(), "greeter")
            .unwrap();
        assert_eq!(
            instance.cast::<dyn Greeter>().unwrap().greet(),
            "Intercepted: Hello"
        );

        let instance = creator
            .post_process_after_initialization(create_instance(), "other")
            .unwrap();
        assert_eq!(instance.cast::<dyn Greeter>().unwrap().greet(), "Hello");
    }

    #[test]
    fn should_skip_incompatible_objects() {
        let creator = AutoProxyCreator::<dyn Greeter>::new(NamePointcut::exact("value"), |target| {
            ObjectPtr::new(Proxy(target)) as ObjectPtr<dyn Greeter>
        });

        let instance = creator
            .post_process_after_initialization(ObjectInstance::of(ObjectPtr::new(1_u8)), "value")
            .unwrap();
        assert_eq!(*instance.cast::<u8>().unwrap(), 1);
    }
}
