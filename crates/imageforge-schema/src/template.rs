use crate::env::EnvironmentInfo;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unable to render {field}: {message}")]
pub struct TemplateError {
    pub field: String,
    pub message: String,
}

/// Variables available to configuration templates.
///
/// Environment facts are only inserted when non-empty, so a template
/// referencing a missing fact fails with a named-variable error
/// instead of silently rendering an empty string.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    ctx: tera::Context,
}

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_env(mut self, env: &EnvironmentInfo) -> Self {
        self.set("subscription_id", &env.subscription_id);
        self.set("resource_group", &env.resource_group);
        self.set("location", &env.location);
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.ctx.insert("timestamp", &timestamp);
        self
    }

    pub fn with_device(mut self, device: &str) -> Self {
        self.set("device", device);
        self
    }

    pub fn with_mount_path(mut self, mount_path: &str) -> Self {
        self.set("mount_path", mount_path);
        self
    }

    fn set(&mut self, key: &str, value: &str) {
        if !value.is_empty() {
            self.ctx.insert(key, value);
        }
    }
}

/// Render a configuration template. `field` names the configuration
/// option being rendered so failures point at the offending field.
pub fn render(field: &str, template: &str, vars: &TemplateVars) -> Result<String, TemplateError> {
    tera::Tera::one_off(template, &vars.ctx, false).map_err(|e| TemplateError {
        field: field.to_owned(),
        message: flatten(&e),
    })
}

/// Wrap a shell command with the configured wrapper template. The
/// command text is available to the wrapper as `{{ command }}`. Pure
/// string substitution; no quoting or escaping is applied.
pub fn wrap_command(wrapper: &str, command: &str) -> Result<String, TemplateError> {
    let mut ctx = tera::Context::new();
    ctx.insert("command", command);
    tera::Tera::one_off(wrapper, &ctx, false).map_err(|e| TemplateError {
        field: "command_wrapper".to_owned(),
        message: flatten(&e),
    })
}

// Tera nests the useful message one level down ("Failed to render
// '__tera_one_off'" wraps the variable-not-found error).
fn flatten(e: &tera::Error) -> String {
    match std::error::Error::source(e) {
        Some(inner) => inner.to_string(),
        None => e.to_string(),
    }
}
