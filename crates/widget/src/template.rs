//! Template rendering boundary. The widget asks an injected engine for its
//! markup; the default engine is MiniJinja with the field template
//! registered up front.

use minijinja::Environment;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("unknown template: {0}")]
    Unknown(String),
    #[error("template: {0}")]
    Template(#[from] minijinja::Error),
}

/// Engine the widget renders through. Context is a JSON object so the trait
/// stays object-safe behind an `Arc<dyn TemplateEngine>`.
pub trait TemplateEngine: Send + Sync {
    fn render(&self, name: &str, ctx: &Value) -> Result<String, RenderError>;
}

pub const STYLE_UPLOAD_TEMPLATE: &str = "style_upload";

const STYLE_UPLOAD_SOURCE: &str = r#"<div class="style-upload-field">
  <h2>{{ title }}</h2>
  <label for="file_upload">{{ prompt }}</label>
  <input id="file_upload" type="file" name="file_upload" accept=".xml"/>
  {% if status %}<span class="upload-status">{{ status }}</span>{% endif %}
</div>
"#;

/// MiniJinja-backed engine.
pub struct JinjaEngine {
    env: Environment<'static>,
}

impl JinjaEngine {
    pub fn new() -> Result<Self, RenderError> {
        let mut env = Environment::new();
        env.add_template(STYLE_UPLOAD_TEMPLATE, STYLE_UPLOAD_SOURCE)?;
        Ok(Self { env })
    }
}

impl TemplateEngine for JinjaEngine {
    fn render(&self, name: &str, ctx: &Value) -> Result<String, RenderError> {
        let template = self
            .env
            .get_template(name)
            .map_err(|_| RenderError::Unknown(name.to_string()))?;
        Ok(template.render(ctx)?)
    }
}
