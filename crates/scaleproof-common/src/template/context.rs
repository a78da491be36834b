//! Per-run substitution context

use std::collections::BTreeMap;

use minijinja::Value;

/// Named string substitutions for one scenario run.
///
/// Built once per run through [`ScenarioContext::builder`] and only read
/// afterwards; concurrent runs each get their own context (and therefore
/// their own namespace).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioContext {
    fields: BTreeMap<String, String>,
    namespace_field: Option<String>,
}

impl ScenarioContext {
    /// Create a new builder
    pub fn builder() -> ScenarioContextBuilder {
        ScenarioContextBuilder::default()
    }

    /// Look up a field value
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Whether a field is defined
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Name of the field holding the scenario namespace, if one was designated
    pub fn namespace_field(&self) -> Option<&str> {
        self.namespace_field.as_deref()
    }

    /// The scenario namespace, if one was designated
    pub fn namespace(&self) -> Option<&str> {
        self.namespace_field
            .as_deref()
            .and_then(|field| self.get(field))
    }

    /// Iterate over all fields in name order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Convert to a minijinja Value for rendering
    pub(crate) fn to_value(&self) -> Value {
        Value::from_iter(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v.clone()))),
        )
    }
}

/// Builder for [`ScenarioContext`]
#[derive(Debug, Default)]
pub struct ScenarioContextBuilder {
    fields: BTreeMap<String, String>,
    namespace_field: Option<String>,
}

impl ScenarioContextBuilder {
    /// Add a substitution field; a later call with the same name wins
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Add the field that names the scenario namespace.
    ///
    /// The orchestrator provisions this namespace before any templated
    /// resource and removes it last.
    pub fn namespace(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        let field = field.into();
        self.fields.insert(field.clone(), value.into());
        self.namespace_field = Some(field);
        self
    }

    /// Add every pair from an iterator
    pub fn fields<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in pairs {
            self.fields.insert(k.into(), v.into());
        }
        self
    }

    /// Build the immutable context
    pub fn build(self) -> ScenarioContext {
        ScenarioContext {
            fields: self.fields,
            namespace_field: self.namespace_field,
        }
    }
}
