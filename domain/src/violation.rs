//! Violations collected during a validation pass.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::translate::Translator;

/// A failed rule, with its template and the text rendered from it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// The constraint message as declared (usually a translation key).
    pub message_template: String,
    /// Placeholder values, keyed with their delimiters, e.g. `%url%`.
    pub parameters: BTreeMap<String, String>,
    pub property_path: Option<String>,
    /// Translated text with placeholders substituted.
    pub message: String,
}

/// Ordered list of violations produced by one validation pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ViolationList(Vec<Violation>);

impl ViolationList {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.0.iter()
    }

    /// Violations reported against `path`.
    pub fn at_path<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a Violation> + 'a {
        self.0
            .iter()
            .filter(move |v| v.property_path.as_deref() == Some(path))
    }
}

impl<'a> IntoIterator for &'a ViolationList {
    type Item = &'a Violation;
    type IntoIter = std::slice::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Display for ViolationList {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            match &v.property_path {
                Some(path) => write!(f, "{}: {}", path, v.message)?,
                None => write!(f, "{}", v.message)?,
            }
        }
        Ok(())
    }
}

/// Mutable state of a single validation pass, handed to each validator.
pub struct ExecutionContext<'a> {
    translator: Option<&'a dyn Translator>,
    property_path: Option<&'static str>,
    violations: Vec<Violation>,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(translator: Option<&'a dyn Translator>) -> Self {
        Self {
            translator,
            property_path: None,
            violations: Vec::new(),
        }
    }

    /// Base path applied to violations raised while checking a property.
    pub(crate) fn set_property_path(&mut self, path: Option<&'static str>) {
        self.property_path = path;
    }

    pub fn property_path(&self) -> Option<&str> {
        self.property_path
    }

    pub fn build_violation<S: Into<String>>(&mut self, template: S) -> ViolationBuilder<'_, 'a> {
        ViolationBuilder {
            ctx: self,
            template: template.into(),
            parameters: BTreeMap::new(),
            path: None,
        }
    }

    /// Shorthand for a violation without parameters or extra path.
    pub fn add_violation<S: Into<String>>(&mut self, template: S) {
        self.build_violation(template).add();
    }

    pub fn violation_count(&self) -> usize {
        self.violations.len()
    }

    pub fn into_violations(self) -> ViolationList {
        ViolationList(self.violations)
    }

    fn render(&self, template: &str, parameters: &BTreeMap<String, String>) -> String {
        let text = self
            .translator
            .and_then(|t| t.translate(template))
            .unwrap_or(template);
        parameters
            .iter()
            .fold(text.to_string(), |acc, (k, v)| acc.replace(k.as_str(), v))
    }
}

/// Fluent builder returned by [`ExecutionContext::build_violation`].
pub struct ViolationBuilder<'c, 'a> {
    ctx: &'c mut ExecutionContext<'a>,
    template: String,
    parameters: BTreeMap<String, String>,
    path: Option<String>,
}

impl ViolationBuilder<'_, '_> {
    pub fn with_parameter<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Path relative to the property currently being validated, if any.
    pub fn at_path<S: Into<String>>(mut self, path: S) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn add(self) {
        let property_path = match (self.ctx.property_path, self.path) {
            (Some(base), Some(sub)) => Some(format!("{base}.{sub}")),
            (Some(base), None) => Some(base.to_string()),
            (None, sub) => sub,
        };
        let message = self.ctx.render(&self.template, &self.parameters);
        self.ctx.violations.push(Violation {
            message_template: self.template,
            parameters: self.parameters,
            property_path,
            message,
        });
    }
}
