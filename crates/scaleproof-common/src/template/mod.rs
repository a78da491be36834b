//! Scenario templating
//!
//! Resource definitions are authored as text with `{{FieldName}}` placeholders
//! and expanded against a [`ScenarioContext`]. Go-template style
//! `{{.FieldName}}` placeholders are accepted too, so manifests written for
//! other e2e suites can be reused unchanged.
//!
//! Rendering is strict: a placeholder without a matching context field is a
//! [`RenderError`]. Context fields that no template references are fine.

mod context;
mod engine;
mod error;
mod types;

pub use context::{ScenarioContext, ScenarioContextBuilder};
pub use engine::TemplateEngine;
pub use error::RenderError;
pub use types::{RenderedResource, ResourceTemplate, TemplateSet};
