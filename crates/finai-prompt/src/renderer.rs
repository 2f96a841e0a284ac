//! Instruction prompt rendering
//!
//! [`PromptRenderer`] ties a [`FileLoader`] to a [`PromptRegistry`]: the named
//! template is read from the template directory on first use and rendered
//! against any serializable context.

use crate::{FileLoader, PromptError, PromptRegistry, PromptTemplate, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Template rendered by [`PromptRenderer::render_instruction_prompt`] unless configured otherwise
pub const DEFAULT_INSTRUCTION_TEMPLATE: &str = "instruction_prompt";

/// Renders instruction prompts from a template directory
#[derive(Debug)]
pub struct PromptRenderer {
    loader: FileLoader,
    instruction_template: String,
    registry: Arc<PromptRegistry>,
    cache_templates: bool,
}

impl PromptRenderer {
    /// Create a renderer reading templates from `template_dir`
    pub fn new(template_dir: impl Into<PathBuf>) -> Self {
        Self {
            loader: FileLoader::new(template_dir),
            instruction_template: DEFAULT_INSTRUCTION_TEMPLATE.to_string(),
            registry: Arc::new(PromptRegistry::new()),
            cache_templates: true,
        }
    }

    /// Use a different template for instruction prompts
    pub fn with_instruction_template(mut self, name: impl Into<String>) -> Self {
        self.instruction_template = name.into();
        self
    }

    /// Re-read template files on every render instead of memoising them
    pub fn with_caching(mut self, enabled: bool) -> Self {
        self.cache_templates = enabled;
        self
    }

    /// Name of the instruction template
    pub fn instruction_template(&self) -> &str {
        &self.instruction_template
    }

    /// The underlying loader
    pub fn loader(&self) -> &FileLoader {
        &self.loader
    }

    /// Render the instruction template against `context`
    ///
    /// Fails when the template file is absent or references a key the
    /// context does not provide.
    pub fn render_instruction_prompt<C: Serialize>(&self, context: &C) -> Result<String> {
        self.render(&self.instruction_template, context)
    }

    /// Render any template from the directory against `context`
    #[instrument(skip(self, context), fields(dir = %self.loader.base_path().display()))]
    pub fn render<C: Serialize>(&self, name: &str, context: &C) -> Result<String> {
        let vars = serde_json::to_value(context)
            .map_err(|e| PromptError::SerializationError(e.to_string()))?;

        let template = self.template(name)?;
        let prompt = template.render(&vars)?;

        debug!(template = name, chars = prompt.len(), "rendered prompt");
        Ok(prompt)
    }

    /// Drop memoised templates so the next render re-reads the files
    pub fn reload(&self) {
        self.registry.clear();
    }

    fn template(&self, name: &str) -> Result<Arc<dyn PromptTemplate>> {
        let load = || -> Result<Arc<dyn PromptTemplate>> {
            Ok(Arc::new(self.loader.load_template(name)?))
        };

        if self.cache_templates {
            self.registry.get_or_try_insert(name, load)
        } else {
            load()
        }
    }
}
