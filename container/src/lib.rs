//! Shared-service registry with singleton lifetime.
//!
//! Services are registered once, keyed by their concrete type, and every
//! resolution returns a clone of the same `Arc`. There are no scoped or
//! transient lifetimes: one registration, one instance, for the life of the
//! container.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

/// Errors raised by service registration and resolution.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("no service registered for type {type_name}")]
    NotRegistered { type_name: &'static str },
    #[error("duplicate service registration for type {type_name}")]
    Duplicate { type_name: &'static str },
}

/// Type-keyed service locator.
///
/// Registration happens during application setup; afterwards the container
/// is shared immutably and only resolved from.
#[derive(Default)]
pub struct Container {
    services: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Container {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `service` as the singleton for its concrete type.
    pub fn register<T>(&mut self, service: Arc<T>) -> Result<(), ContainerError>
    where
        T: Any + Send + Sync,
    {
        let key = TypeId::of::<T>();
        if self.services.contains_key(&key) {
            return Err(ContainerError::Duplicate {
                type_name: type_name::<T>(),
            });
        }
        self.services.insert(key, service);
        Ok(())
    }

    /// Resolve the singleton registered for `T`.
    pub fn resolve<T>(&self) -> Result<Arc<T>, ContainerError>
    where
        T: Any + Send + Sync,
    {
        self.services
            .get(&TypeId::of::<T>())
            .and_then(|service| Arc::clone(service).downcast::<T>().ok())
            .ok_or(ContainerError::NotRegistered {
                type_name: type_name::<T>(),
            })
    }

    #[must_use]
    pub fn contains<T>(&self) -> bool
    where
        T: Any + Send + Sync,
    {
        self.services.contains_key(&TypeId::of::<T>())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("services", &self.services.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Greeter {
        greeting: &'static str,
    }

    #[derive(Debug)]
    struct Counter;

    #[test]
    fn resolves_registered_singleton() {
        let mut container = Container::new();
        container
            .register(Arc::new(Greeter { greeting: "hello" }))
            .unwrap();

        let first = container.resolve::<Greeter>().unwrap();
        let second = container.resolve::<Greeter>().unwrap();
        assert_eq!(first.greeting, "hello");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn missing_service_is_an_error() {
        let container = Container::new();
        let err = container.resolve::<Counter>().unwrap_err();
        assert!(matches!(err, ContainerError::NotRegistered { .. }));
        assert!(err.to_string().contains("Counter"));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut container = Container::new();
        container.register(Arc::new(Counter)).unwrap();
        let err = container.register(Arc::new(Counter)).unwrap_err();
        assert!(matches!(err, ContainerError::Duplicate { .. }));
    }

    #[test]
    fn contains_reports_registration() {
        let mut container = Container::new();
        assert!(!container.contains::<Counter>());
        container.register(Arc::new(Counter)).unwrap();
        assert!(container.contains::<Counter>());
        assert_eq!(container.len(), 1);
    }
}
