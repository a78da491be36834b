//! Render error types

use thiserror::Error;

/// Errors produced while rendering scenario templates.
///
/// Any of these is fatal to a run and is raised before the cluster is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// No template with this identifier exists in the set
    #[error("unknown template '{id}'")]
    UnknownTemplate {
        /// The identifier that was requested
        id: String,
    },

    /// A placeholder references a field the context does not define
    #[error("template '{template}' references undefined field '{field}'")]
    MissingField {
        /// Template containing the placeholder
        template: String,
        /// The undefined field name
        field: String,
    },

    /// The template text could not be parsed or evaluated
    #[error("template '{template}' is invalid: {message}")]
    Syntax {
        /// Offending template
        template: String,
        /// Parser/evaluator message
        message: String,
    },

    /// A typed definition could not be serialized
    #[error("failed to serialize '{template}': {message}")]
    Serialization {
        /// Identifier of the typed definition
        template: String,
        /// Serializer message
        message: String,
    },
}

impl RenderError {
    /// Identifier of the template that failed
    pub fn template(&self) -> &str {
        match self {
            Self::UnknownTemplate { id } => id,
            Self::MissingField { template, .. }
            | Self::Syntax { template, .. }
            | Self::Serialization { template, .. } => template,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_display() {
        let err = RenderError::MissingField {
            template: "sutDeploymentTemplate".to_string(),
            field: "SutDeploymentName".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "template 'sutDeploymentTemplate' references undefined field 'SutDeploymentName'"
        );
        assert_eq!(err.template(), "sutDeploymentTemplate");
    }

    #[test]
    fn test_unknown_template_display() {
        let err = RenderError::UnknownTemplate {
            id: "nope".to_string(),
        };
        assert!(err.to_string().contains("unknown template 'nope'"));
        assert_eq!(err.template(), "nope");
    }
}
