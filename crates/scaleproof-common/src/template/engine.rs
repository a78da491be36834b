//! Template engine for resource definitions
//!
//! Uses minijinja with its default delimiters:
//! - Variables: `{{FieldName}}` (also `{{.FieldName}}`, Go-template style)
//! - Blocks: `{% ... %}`; names bound by `for`, `set` and `with` are local
//! - Comments: `{# ... #}`
//!
//! Undefined fields are an error, never an empty string.

use minijinja::{Environment, ErrorKind, UndefinedBehavior};
use tracing::debug;

use super::context::ScenarioContext;
use super::error::RenderError;
use super::types::{RenderedResource, TemplateSet};

/// Identifiers that are literals, not context lookups
const LITERALS: &[&str] = &["true", "false", "none", "True", "False", "None"];

/// Expands templates against a [`ScenarioContext`]
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    /// Create an engine with strict undefined handling
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        Self { env }
    }

    /// Render one template from the set.
    ///
    /// # Errors
    ///
    /// - [`RenderError::UnknownTemplate`] if `id` is not in the set
    /// - [`RenderError::MissingField`] if a placeholder has no context field
    /// - [`RenderError::Syntax`] if the template text is malformed
    pub fn render(
        &self,
        templates: &TemplateSet,
        id: &str,
        ctx: &ScenarioContext,
    ) -> Result<RenderedResource, RenderError> {
        let template = templates
            .get(id)
            .ok_or_else(|| RenderError::UnknownTemplate { id: id.to_string() })?;
        let manifest = self.render_str(id, &template.body, ctx)?;
        Ok(RenderedResource::new(id, manifest))
    }

    /// Render every template in set order.
    ///
    /// The first failure aborts; no partial output is returned.
    pub fn render_all(
        &self,
        templates: &TemplateSet,
        ctx: &ScenarioContext,
    ) -> Result<Vec<RenderedResource>, RenderError> {
        let rendered = templates
            .iter()
            .map(|t| self.render(templates, &t.name, ctx))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = rendered.len(), "rendered templates");
        Ok(rendered)
    }

    /// Render a free-standing template string.
    ///
    /// `name` identifies the source in errors (e.g. "target:sut").
    pub fn render_str(
        &self,
        name: &str,
        source: &str,
        ctx: &ScenarioContext,
    ) -> Result<String, RenderError> {
        let normalized = normalize_placeholders(source);

        if let Some(field) = placeholder_roots(&normalized)
            .into_iter()
            .find(|field| !ctx.contains(field))
        {
            return Err(RenderError::MissingField {
                template: name.to_string(),
                field,
            });
        }

        self.env
            .render_str(&normalized, ctx.to_value())
            .map_err(|e| match e.kind() {
                ErrorKind::UndefinedError => RenderError::MissingField {
                    template: name.to_string(),
                    field: e
                        .detail()
                        .map(str::to_string)
                        .unwrap_or_else(|| "<unknown>".to_string()),
                },
                _ => RenderError::Syntax {
                    template: name.to_string(),
                    message: e.to_string(),
                },
            })
    }

    /// Whether a string contains any template syntax
    pub fn has_template_syntax(s: &str) -> bool {
        s.contains("{{") || s.contains("{%") || s.contains("{#")
    }
}

/// Strip the Go-template leading dot: `{{.Name}}` → `{{Name}}`, `{{- .Name}}` → `{{- Name}}`.
fn normalize_placeholders(template: &str) -> String {
    let mut result = String::with_capacity(template.len());
    let mut remaining = template;

    while let Some(start) = remaining.find("{{") {
        result.push_str(&remaining[..start + 2]);
        remaining = &remaining[start + 2..];

        // Whitespace-control marker and padding stay as written
        let prefix_len = remaining
            .char_indices()
            .find(|(i, c)| !(c.is_whitespace() || (*i == 0 && (*c == '-' || *c == '+'))))
            .map(|(i, _)| i)
            .unwrap_or(remaining.len());
        result.push_str(&remaining[..prefix_len]);
        remaining = &remaining[prefix_len..];

        let mut chars = remaining.chars();
        if chars.next() == Some('.') && chars.next().is_some_and(is_ident_start) {
            remaining = &remaining[1..];
        }
    }

    result.push_str(remaining);
    result
}

/// Root identifier of every `{{ ... }}` expression, in order of appearance.
///
/// `{{ Name | lower }}` yields `Name`; string and number literals yield nothing,
/// and neither do names the template binds itself.
fn placeholder_roots(template: &str) -> Vec<String> {
    let locals = block_bindings(template);
    let mut roots = Vec::new();
    let mut remaining = template;

    while let Some(start) = remaining.find("{{") {
        remaining = &remaining[start + 2..];
        let Some(end) = remaining.find("}}") else {
            break;
        };
        let expr = remaining[..end]
            .trim_start_matches(['-', '+'])
            .trim_start();
        remaining = &remaining[end + 2..];

        let ident: String = expr
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        let is_root = ident.chars().next().is_some_and(is_ident_start)
            && !LITERALS.contains(&ident.as_str())
            && !locals.contains(&ident);
        if is_root && !roots.contains(&ident) {
            roots.push(ident);
        }
    }

    roots
}

/// Names introduced by `{% for .. in %}`, `{% set .. = %}` and `{% with .. = %}`.
///
/// Scope is ignored: a name bound anywhere is local everywhere. Strict
/// rendering still rejects a use outside its scope.
fn block_bindings(template: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut remaining = template;

    while let Some(start) = remaining.find("{%") {
        remaining = &remaining[start + 2..];
        let Some(end) = remaining.find("%}") else {
            break;
        };
        let block = remaining[..end]
            .trim_matches(|c: char| c == '-' || c == '+' || c.is_whitespace());
        remaining = &remaining[end + 2..];

        let (keyword, rest) = block.split_once(char::is_whitespace).unwrap_or((block, ""));
        let targets = match keyword {
            "for" => {
                names.push("loop".to_string());
                rest.split_once(" in ").map_or(rest, |(lhs, _)| lhs)
            }
            "set" | "with" => rest.split_once('=').map_or(rest, |(lhs, _)| lhs),
            _ => continue,
        };
        for name in targets
            .split([',', '(', ')'])
            .map(str::trim)
            .filter(|n| n.chars().next().is_some_and(is_ident_start))
        {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }

    names
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}
