//! Constraint declarations.
//!
//! A constraint is a plain descriptor: it names the validator that performs
//! the check, says whether it applies to a whole object or one property
//! value, and carries the message template used when the check fails. The
//! checks themselves live in [`crate::validators`].

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// What a constraint is attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum TargetKind {
    /// A single property value.
    Value,
    /// An entire object instance.
    Class,
}

/// Errors raised while building a constraint from declaration options.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConstraintError {
    #[error("the option \"{option}\" does not exist in constraint {constraint}")]
    UnknownOption {
        constraint: &'static str,
        option: String,
    },
    #[error("invalid options for constraint {constraint}: {reason}")]
    InvalidOptions {
        constraint: &'static str,
        reason: String,
    },
}

/// Descriptor a validation engine can introspect to dispatch a check.
pub trait Constraint: Debug + Send + Sync {
    fn target_kind(&self) -> TargetKind;
    /// Registry key of the validator implementing the check.
    fn validator_id(&self) -> &'static str;
    /// Message template (a translation key) used for violations.
    fn message(&self) -> &str;
}

/// Deserialize a declaration options bundle, rejecting keys outside `known`.
fn parse_options<T: DeserializeOwned>(
    constraint: &'static str,
    known: &[&str],
    options: &Value,
) -> Result<T, ConstraintError> {
    let map = match options {
        Value::Null => return from_value(constraint, Value::Object(Default::default())),
        Value::Object(map) => map,
        other => {
            return Err(ConstraintError::InvalidOptions {
                constraint,
                reason: format!("expected an options map, got {other}"),
            })
        }
    };
    if let Some(option) = map.keys().find(|k| !known.contains(&k.as_str())) {
        return Err(ConstraintError::UnknownOption {
            constraint,
            option: option.clone(),
        });
    }
    from_value(constraint, options.clone())
}

fn from_value<T: DeserializeOwned>(
    constraint: &'static str,
    value: Value,
) -> Result<T, ConstraintError> {
    serde_json::from_value(value).map_err(|e| ConstraintError::InvalidOptions {
        constraint,
        reason: e.to_string(),
    })
}

/// Class-level rule: the page url must not be used by another page of the
/// same site.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UniqueUrl {
    #[serde(default = "UniqueUrl::default_message")]
    message: String,
}

impl UniqueUrl {
    pub const NAME: &'static str = "UniqueUrl";
    pub const TARGET: TargetKind = TargetKind::Class;
    pub const VALIDATOR_ID: &'static str = "sonata.page.validator.unique_url";
    pub const DEFAULT_MESSAGE: &'static str = "error.uniq_url";
    const OPTIONS: &'static [&'static str] = &["message"];

    fn default_message() -> String {
        Self::DEFAULT_MESSAGE.to_string()
    }

    /// Build from declaration options; `message` is the only accepted key.
    pub fn from_options(options: &Value) -> Result<Self, ConstraintError> {
        parse_options(Self::NAME, Self::OPTIONS, options)
    }

    pub fn with_message<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Default for UniqueUrl {
    fn default() -> Self {
        Self::with_message(Self::DEFAULT_MESSAGE)
    }
}

impl Constraint for UniqueUrl {
    fn target_kind(&self) -> TargetKind {
        Self::TARGET
    }

    fn validator_id(&self) -> &'static str {
        Self::VALIDATOR_ID
    }

    fn message(&self) -> &str {
        &self.message
    }
}

/// Property-level rule: the value must be present and not whitespace only.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotBlank {
    #[serde(default = "NotBlank::default_message")]
    message: String,
}

impl NotBlank {
    pub const NAME: &'static str = "NotBlank";
    pub const TARGET: TargetKind = TargetKind::Value;
    pub const VALIDATOR_ID: &'static str = "not_blank";
    pub const DEFAULT_MESSAGE: &'static str = "error.not_blank";
    const OPTIONS: &'static [&'static str] = &["message"];

    fn default_message() -> String {
        Self::DEFAULT_MESSAGE.to_string()
    }

    pub fn from_options(options: &Value) -> Result<Self, ConstraintError> {
        parse_options(Self::NAME, Self::OPTIONS, options)
    }

    pub fn with_message<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Default for NotBlank {
    fn default() -> Self {
        Self::with_message(Self::DEFAULT_MESSAGE)
    }
}

impl Constraint for NotBlank {
    fn target_kind(&self) -> TargetKind {
        Self::TARGET
    }

    fn validator_id(&self) -> &'static str {
        Self::VALIDATOR_ID
    }

    fn message(&self) -> &str {
        &self.message
    }
}
