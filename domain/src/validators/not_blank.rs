use crate::constraint::{Constraint, NotBlank};
use crate::registry::{ConstraintValidator, Subject};
use crate::violation::ExecutionContext;
use crate::ValidationError;

/// Rejects missing and whitespace-only property values.
#[derive(Clone, Copy, Debug, Default)]
pub struct NotBlankValidator;

impl<T> ConstraintValidator<T> for NotBlankValidator {
    fn validate(
        &self,
        subject: Subject<'_, T>,
        constraint: &dyn Constraint,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<(), ValidationError> {
        let Subject::Value(value) = subject else {
            return Err(ValidationError::UnexpectedSubject {
                validator_id: NotBlank::VALIDATOR_ID,
                subject: subject.describe(),
            });
        };
        if value.map_or(true, |v| v.trim().is_empty()) {
            ctx.add_violation(constraint.message());
        }
        Ok(())
    }
}
