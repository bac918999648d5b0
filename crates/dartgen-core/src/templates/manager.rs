//! Loading and rendering of the Dart templates

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::Serialize;
use tera::{Context, Tera};

use crate::error::{Error, Result};

pub const MODEL_TEMPLATE: &str = "model.dart.tera";
pub const ENUM_TEMPLATE: &str = "enum.dart.tera";
pub const API_METHOD_TEMPLATE: &str = "api_method.dart.tera";

const BUILTIN_TEMPLATES: [(&str, &str); 3] = [
    (
        MODEL_TEMPLATE,
        include_str!("../../templates/dart/model.dart.tera"),
    ),
    (
        ENUM_TEMPLATE,
        include_str!("../../templates/dart/enum.dart.tera"),
    ),
    (
        API_METHOD_TEMPLATE,
        include_str!("../../templates/dart/api_method.dart.tera"),
    ),
];

/// Manages loading and rendering of code generation templates
#[derive(Debug, Clone)]
pub struct TemplateManager {
    /// Cached Tera template engine instance
    tera: Arc<Tera>,
    /// Directory the built-in templates were overridden from, if any
    template_dir: Option<PathBuf>,
}

impl TemplateManager {
    /// Create a manager with the built-in templates.
    ///
    /// Files in `template_dir` named like a built-in template replace it;
    /// other files in the directory are ignored.
    pub async fn new(template_dir: Option<PathBuf>) -> Result<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(Vec::new());

        let mut sources: Vec<(&str, String)> = BUILTIN_TEMPLATES
            .iter()
            .map(|(name, source)| (*name, source.to_string()))
            .collect();

        if let Some(dir) = &template_dir {
            if !tokio::fs::try_exists(dir).await.unwrap_or(false) {
                return Err(Error::template(format!(
                    "Template directory not found: {}",
                    dir.display()
                )));
            }
            for (name, source) in sources.iter_mut() {
                let path = dir.join(*name);
                if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                    log::info!("Using custom template {}", path.display());
                    *source = tokio::fs::read_to_string(&path).await?;
                }
            }
        }

        tera.add_raw_templates(sources).map_err(|e| {
            log::error!("Failed to parse templates: {}", e);
            Error::template(format!("Failed to parse templates: {e}"))
        })?;

        Ok(Self {
            tera: Arc::new(tera),
            template_dir,
        })
    }

    /// Override directory, if one was given
    pub fn template_dir(&self) -> Option<&Path> {
        self.template_dir.as_deref()
    }

    /// Check if a template exists
    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template(name).is_ok()
    }

    /// Render `template_name` with a serializable context
    pub fn render<T: Serialize>(&self, template_name: &str, context: &T) -> Result<String> {
        let tera_context = Context::from_serialize(context)?;
        log::debug!("Rendering template: {}", template_name);
        self.tera.render(template_name, &tera_context).map_err(|e| {
            let mut message = format!("Failed to render template '{template_name}': {e}");
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                message.push_str(&format!("\n  caused by: {cause}"));
                source = std::error::Error::source(cause);
            }
            Error::template(message)
        })
    }

    /// Render `template_name` and write the result, creating parent directories
    pub async fn render_to_file<T: Serialize>(
        &self,
        template_name: &str,
        context: &T,
        output_path: impl AsRef<Path>,
    ) -> Result<()> {
        let output_path = output_path.as_ref();
        let content = self.render(template_name, context)?;
        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        log::debug!("Writing {}", output_path.display());
        tokio::fs::write(output_path, content).await?;
        Ok(())
    }
}
