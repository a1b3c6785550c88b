//! Observer registration.

use core::fmt;

use super::events::EvaluationEvent;

type Observer = Box<dyn Fn(&EvaluationEvent) + Send + Sync>;

/// Errors that can occur during hook registration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HookRegistrationError {
    /// An observer with this name is already registered.
    #[error("hook '{0}' already registered")]
    DuplicateName(String),
}

/// Registry of named evaluation observers.
///
/// Observers run synchronously on the scheduling loop, in registration
/// order, so they should return quickly.
#[derive(Default)]
pub struct Hooks {
    observers: Vec<(String, Observer)>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("observers", &self.names())
            .finish()
    }
}

impl Hooks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer under a unique name.
    ///
    /// # Errors
    ///
    /// Returns [`HookRegistrationError::DuplicateName`] if the name is taken.
    pub fn register_observer(
        &mut self,
        name: impl Into<String>,
        observer: impl Fn(&EvaluationEvent) + Send + Sync + 'static,
    ) -> Result<(), HookRegistrationError> {
        let name = name.into();
        if self.observers.iter().any(|(existing, _)| *existing == name) {
            return Err(HookRegistrationError::DuplicateName(name));
        }
        self.observers.push((name, Box::new(observer)));
        Ok(())
    }

    /// Removes an observer. Returns true if it was registered.
    pub fn unregister(&mut self, name: &str) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| existing != name);
        self.observers.len() != before
    }

    /// Returns the registered observer names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.observers.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Returns true if no observers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Delivers an event to every observer.
    pub fn invoke(&self, event: &EvaluationEvent) {
        for (_, observer) in &self.observers {
            observer(event);
        }
    }
}
