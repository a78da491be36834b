//! Error types for cluster-facing operations
//!
//! Errors are structured with fields to aid debugging when a scenario fails
//! against a live cluster. Variants carry the resource or operation that was
//! being attempted alongside the underlying cause.

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for cluster operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// The addressed object does not exist
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        /// Resource kind (e.g., "Deployment")
        kind: String,
        /// Resource name
        name: String,
        /// Resource namespace (empty for cluster-scoped resources)
        namespace: String,
    },

    /// Invalid input (malformed manifest, bad configuration)
    #[error("validation error: {message}")]
    Validation {
        /// Description of what's invalid
        message: String,
        /// The invalid field path (e.g., "metadata.name")
        field: Option<String>,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
    },

    /// A cluster call did not complete within its time bound
    #[error("timed out after {elapsed_ms}ms during {operation}")]
    Timeout {
        /// Operation that was in flight
        operation: String,
        /// How long we waited
        elapsed_ms: u128,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g., "apply", "create_client")
        context: String,
    },
}

impl Error {
    /// Create a not-found error for a namespaced or cluster-scoped object
    pub fn not_found(
        kind: impl Into<String>,
        name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: None,
        }
    }

    /// Create a validation error pointing at a specific field
    pub fn validation_for_field(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }

    /// Create a timeout error for an operation
    pub fn timeout(operation: impl Into<String>, elapsed: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_ms: elapsed.as_millis(),
        }
    }

    /// Create an internal error with the given message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: UNKNOWN_CONTEXT.to_string(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Whether this error means the addressed object is absent.
    ///
    /// Covers both our own `NotFound` and a raw 404 from the API server.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound { .. } => true,
            Error::Kube { source } => matches!(source, kube::Error::Api(ae) if ae.code == 404),
            _ => false,
        }
    }

    /// Check if this error is retryable
    ///
    /// Validation and serialization errors are not retryable (require a fix).
    /// Kubernetes errors are retryable unless they are 4xx responses.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube { source } => {
                !matches!(source, kube::Error::Api(ae) if (400..500).contains(&ae.code))
            }
            Error::NotFound { .. } => false,
            Error::Validation { .. } => false,
            Error::Serialization { .. } => false,
            Error::Timeout { .. } => true,
            Error::Internal { .. } => true,
        }
    }
}
