//! Generic constraint-validation engine.
//!
//! Given the declared [`ClassMetadata`] of a type, the engine resolves each
//! constraint's validator id through the [`ValidatorRegistry`] and invokes it
//! with either one property value or the whole object, depending on the
//! constraint's target kind.

use tracing::debug;

use crate::constraint::Constraint;
use crate::metadata::ClassMetadata;
use crate::registry::{ConstraintValidator, Subject, ValidatorRegistry};
use crate::translate::Translator;
use crate::violation::{ExecutionContext, ViolationList};
use crate::ValidationError;

pub struct ValidationEngine<T> {
    metadata: ClassMetadata<T>,
    registry: ValidatorRegistry<T>,
    translator: Option<Box<dyn Translator>>,
}

impl<T> ValidationEngine<T> {
    pub fn new(metadata: ClassMetadata<T>, registry: ValidatorRegistry<T>) -> Self {
        Self {
            metadata,
            registry,
            translator: None,
        }
    }

    /// Render violation messages through `translator`.
    pub fn with_translator<L: Translator + 'static>(mut self, translator: L) -> Self {
        self.translator = Some(Box::new(translator));
        self
    }

    pub fn metadata(&self) -> &ClassMetadata<T> {
        &self.metadata
    }

    pub fn registry(&self) -> &ValidatorRegistry<T> {
        &self.registry
    }

    /// Fail fast when a declared constraint names an unregistered validator.
    pub fn check_wiring(&self) -> Result<(), ValidationError> {
        match self
            .metadata
            .validator_ids()
            .find(|id| !self.registry.contains(id))
        {
            Some(missing) => Err(ValidationError::ValidatorNotFound(missing.to_string())),
            None => Ok(()),
        }
    }

    /// Run every declared constraint against `object`.
    ///
    /// Property constraints run first, then class constraints, each in
    /// declaration order.
    pub fn validate(&self, object: &T) -> Result<ViolationList, ValidationError> {
        self.run(object, None)
    }

    /// Same pass as [`ValidationEngine::validate`], with constraints naming
    /// `validator_id` checked by `validator` instead of the registered one.
    pub fn validate_with(
        &self,
        object: &T,
        validator_id: &str,
        validator: &dyn ConstraintValidator<T>,
    ) -> Result<ViolationList, ValidationError> {
        self.run(object, Some((validator_id, validator)))
    }

    fn run(
        &self,
        object: &T,
        substitute: Option<(&str, &dyn ConstraintValidator<T>)>,
    ) -> Result<ViolationList, ValidationError> {
        let mut ctx = ExecutionContext::new(self.translator.as_deref());

        for property in self.metadata.properties() {
            let value = property.read(object);
            ctx.set_property_path(Some(property.name()));
            for constraint in property.constraints() {
                self.dispatch(Subject::Value(value), constraint.as_ref(), substitute, &mut ctx)?;
            }
        }
        ctx.set_property_path(None);

        for constraint in self.metadata.constraints() {
            self.dispatch(Subject::Object(object), constraint.as_ref(), substitute, &mut ctx)?;
        }

        let violations = ctx.into_violations();
        debug!(
            class = self.metadata.class_name(),
            violations = violations.len(),
            "validation pass finished"
        );
        Ok(violations)
    }

    fn dispatch(
        &self,
        subject: Subject<'_, T>,
        constraint: &dyn Constraint,
        substitute: Option<(&str, &dyn ConstraintValidator<T>)>,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<(), ValidationError> {
        let id = constraint.validator_id();
        let validator: &dyn ConstraintValidator<T> = match substitute {
            Some((sub_id, validator)) if sub_id == id => validator,
            _ => self
                .registry
                .get(id)
                .ok_or_else(|| ValidationError::ValidatorNotFound(id.to_string()))?,
        };
        let before = ctx.violation_count();
        validator.validate(subject, constraint, ctx)?;
        debug!(
            validator = id,
            target = ?constraint.target_kind(),
            path = ctx.property_path(),
            added = ctx.violation_count() - before,
            "constraint checked"
        );
        Ok(())
    }
}
