//! Explicit constraint declarations for a validated type.

use crate::constraint::{Constraint, TargetKind};
use crate::ValidationError;

/// Reads one string property off an object.
pub type PropertyGetter<T> = fn(&T) -> Option<&str>;

/// Value constraints attached to a single property.
pub struct PropertyMetadata<T> {
    name: &'static str,
    getter: PropertyGetter<T>,
    constraints: Vec<Box<dyn Constraint>>,
}

impl<T> PropertyMetadata<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn read<'o>(&self, object: &'o T) -> Option<&'o str> {
        (self.getter)(object)
    }

    pub fn constraints(&self) -> &[Box<dyn Constraint>] {
        &self.constraints
    }
}

/// All constraints declared for `T`, in declaration order.
pub struct ClassMetadata<T> {
    class_name: &'static str,
    constraints: Vec<Box<dyn Constraint>>,
    properties: Vec<PropertyMetadata<T>>,
}

impl<T> ClassMetadata<T> {
    pub fn new(class_name: &'static str) -> Self {
        Self {
            class_name,
            constraints: Vec::new(),
            properties: Vec::new(),
        }
    }

    pub fn class_name(&self) -> &'static str {
        self.class_name
    }

    /// Attach a class constraint; it is handed the whole object.
    pub fn add_constraint<C>(mut self, constraint: C) -> Result<Self, ValidationError>
    where
        C: Constraint + 'static,
    {
        expect_target(&constraint, TargetKind::Class)?;
        self.constraints.push(Box::new(constraint));
        Ok(self)
    }

    /// Attach a value constraint to the property read by `getter`.
    ///
    /// Constraints for a name that is already declared join that property
    /// and keep reading it through the getter given first; later getters for
    /// the same name are not used.
    pub fn add_property_constraint<C>(
        mut self,
        name: &'static str,
        getter: PropertyGetter<T>,
        constraint: C,
    ) -> Result<Self, ValidationError>
    where
        C: Constraint + 'static,
    {
        expect_target(&constraint, TargetKind::Value)?;
        match self.properties.iter_mut().find(|p| p.name == name) {
            Some(property) => property.constraints.push(Box::new(constraint)),
            None => self.properties.push(PropertyMetadata {
                name,
                getter,
                constraints: vec![Box::new(constraint)],
            }),
        }
        Ok(self)
    }

    pub fn constraints(&self) -> &[Box<dyn Constraint>] {
        &self.constraints
    }

    pub fn properties(&self) -> &[PropertyMetadata<T>] {
        &self.properties
    }

    /// Every validator id referenced by a declared constraint.
    pub fn validator_ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.properties
            .iter()
            .flat_map(|p| p.constraints.iter())
            .chain(self.constraints.iter())
            .map(|c| c.validator_id())
    }
}

fn expect_target(constraint: &dyn Constraint, expected: TargetKind) -> Result<(), ValidationError> {
    let actual = constraint.target_kind();
    if actual != expected {
        return Err(ValidationError::TargetMismatch {
            validator_id: constraint.validator_id(),
            expected,
            actual,
        });
    }
    Ok(())
}
