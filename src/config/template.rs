//! Strict `{{variable}}` substitution for configuration values.

use crate::error::{ConfigError, Result};
use handlebars::Handlebars;
use path_absolutize::Absolutize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Variables visible to configuration templates, filled in resolution order
pub(crate) struct TemplateContext {
    registry: Handlebars<'static>,
    vars: Map<String, Value>,
}

impl TemplateContext {
    pub(crate) fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(handlebars::no_escape);
        Self {
            registry,
            vars: Map::new(),
        }
    }

    /// Make `value` available to later templates as `{{key}}`
    pub(crate) fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.vars.insert(key.to_string(), Value::String(value.into()));
    }

    /// Render a template for config key `key`
    pub(crate) fn render(&self, key: &str, template: &str) -> Result<String> {
        let rendered = self
            .registry
            .render_template(template, &self.vars)
            .map_err(|e| ConfigError::UnresolvedTemplate {
                key: key.to_string(),
                template: template.to_string(),
                reason: e.to_string(),
            })?;

        if rendered.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: key.to_string(),
                reason: format!("template '{template}' rendered to an empty value"),
            }
            .into());
        }

        Ok(rendered)
    }

    /// Render a path template, absolutize it against `work_dir` and expose it as `{{key}}`
    pub(crate) fn resolve_path(&mut self, key: &str, template: &str, work_dir: &Path) -> Result<PathBuf> {
        let rendered = self.render(key, template)?;
        let path = absolutize(key, Path::new(&rendered), work_dir)?;
        self.insert(key, path.display().to_string());
        Ok(path)
    }
}

/// Normalize `path` into an absolute path, relative paths being taken from `work_dir`
pub(crate) fn absolutize(key: &str, path: &Path, work_dir: &Path) -> Result<PathBuf> {
    path.absolutize_from(work_dir)
        .map(|p| p.into_owned())
        .map_err(|e| {
            ConfigError::InvalidValue {
                key: key.to_string(),
                reason: format!("cannot normalize path {}: {e}", path.display()),
            }
            .into()
        })
}
