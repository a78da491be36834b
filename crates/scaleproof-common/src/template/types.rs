//! Template inputs and rendered outputs

use serde::{Deserialize, Serialize};

use super::error::RenderError;

/// A named, unexpanded resource definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTemplate {
    /// Template identifier (e.g., "sutDeploymentTemplate")
    pub name: String,
    /// Definition text containing `{{FieldName}}` placeholders
    pub body: String,
}

impl ResourceTemplate {
    /// Create a template
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }
}

/// Ordered collection of templates.
///
/// Order is significant: it is the order resources are applied in (and the
/// reverse of the order they are torn down in).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateSet {
    templates: Vec<ResourceTemplate>,
}

impl TemplateSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a template, builder style
    pub fn with(mut self, name: impl Into<String>, body: impl Into<String>) -> Self {
        self.insert(ResourceTemplate::new(name, body));
        self
    }

    /// Add a template.
    ///
    /// Re-inserting an existing name replaces its body but keeps its position.
    pub fn insert(&mut self, template: ResourceTemplate) {
        match self.templates.iter_mut().find(|t| t.name == template.name) {
            Some(existing) => existing.body = template.body,
            None => self.templates.push(template),
        }
    }

    /// Look up a template by identifier
    pub fn get(&self, name: &str) -> Option<&ResourceTemplate> {
        self.templates.iter().find(|t| t.name == name)
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &ResourceTemplate> {
        self.templates.iter()
    }

    /// Number of templates
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl FromIterator<ResourceTemplate> for TemplateSet {
    fn from_iter<I: IntoIterator<Item = ResourceTemplate>>(iter: I) -> Self {
        let mut set = TemplateSet::new();
        for template in iter {
            set.insert(template);
        }
        set
    }
}

/// A fully substituted definition ready for submission to the cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedResource {
    template: String,
    manifest: String,
}

impl RenderedResource {
    /// Pair a template identifier with its rendered text
    pub fn new(template: impl Into<String>, manifest: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            manifest: manifest.into(),
        }
    }

    /// Build a definition from a typed object (e.g. a `k8s_openapi` Namespace).
    ///
    /// The object is serialized to JSON, which the cluster client accepts
    /// alongside YAML.
    pub fn from_typed<T: Serialize>(
        template: impl Into<String>,
        object: &T,
    ) -> Result<Self, RenderError> {
        let template = template.into();
        let manifest =
            serde_json::to_string_pretty(object).map_err(|e| RenderError::Serialization {
                template: template.clone(),
                message: e.to_string(),
            })?;
        Ok(Self { template, manifest })
    }

    /// Identifier of the template this was rendered from
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The rendered definition text
    pub fn manifest(&self) -> &str {
        &self.manifest
    }
}
