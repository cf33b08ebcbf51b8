//! Validator lookup by identifier.
//!
//! Constraints name their validator with a string id; the registry maps those
//! ids to concrete [`ConstraintValidator`] implementations, populated once at
//! startup.

use std::collections::BTreeMap;

use crate::constraint::Constraint;
use crate::violation::ExecutionContext;
use crate::ValidationError;

/// What a validator is asked to check.
pub enum Subject<'a, T> {
    /// The whole object, for class constraints.
    Object(&'a T),
    /// One property value, for value constraints.
    Value(Option<&'a str>),
}

impl<T> Clone for Subject<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Subject<'_, T> {}

impl<T> Subject<'_, T> {
    pub fn describe(&self) -> &'static str {
        match self {
            Subject::Object(_) => "whole object",
            Subject::Value(_) => "property value",
        }
    }
}

/// Performs the check a constraint declares, reporting failures through the
/// execution context.
pub trait ConstraintValidator<T>: Send + Sync {
    fn validate(
        &self,
        subject: Subject<'_, T>,
        constraint: &dyn Constraint,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<(), ValidationError>;
}

/// Validators keyed by identifier.
pub struct ValidatorRegistry<T> {
    validators: BTreeMap<&'static str, Box<dyn ConstraintValidator<T>>>,
}

impl<T> Default for ValidatorRegistry<T> {
    fn default() -> Self {
        Self {
            validators: BTreeMap::new(),
        }
    }
}

impl<T> ValidatorRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<V>(&mut self, id: &'static str, validator: V) -> Result<(), ValidationError>
    where
        V: ConstraintValidator<T> + 'static,
    {
        if self.validators.contains_key(id) {
            return Err(ValidationError::DuplicateValidator(id.to_string()));
        }
        self.validators.insert(id, Box::new(validator));
        Ok(())
    }

    /// Builder form of [`ValidatorRegistry::register`].
    pub fn with<V>(mut self, id: &'static str, validator: V) -> Result<Self, ValidationError>
    where
        V: ConstraintValidator<T> + 'static,
    {
        self.register(id, validator)?;
        Ok(self)
    }

    pub fn get(&self, id: &str) -> Option<&dyn ConstraintValidator<T>> {
        self.validators.get(id).map(|v| v.as_ref())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.validators.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.validators.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}
