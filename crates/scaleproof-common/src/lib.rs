//! Common types for scaleproof: errors, templating, and Kubernetes utilities
//!
//! # Modules
//!
//! - [`template`] - Scenario templates, contexts, and the renderer
//! - [`kube_utils`] - Client construction and manifest parsing
//! - [`yaml`] - YAML parsing into `serde_json::Value`
//! - [`retry`] - Exponential backoff for transient failures
//! - [`telemetry`] - Tracing subscriber setup
//! - [`error`] - Error types shared across crates

#![deny(missing_docs)]

pub mod error;
pub mod kube_utils;
pub mod retry;
pub mod telemetry;
pub mod template;
pub mod yaml;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Field manager used for all server-side apply operations
pub const FIELD_MANAGER: &str = "scaleproof";

/// Label key stamped on namespaces created by a scenario run
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Label value stamped on namespaces created by a scenario run
pub const LABEL_MANAGED_BY_SCALEPROOF: &str = "scaleproof";
