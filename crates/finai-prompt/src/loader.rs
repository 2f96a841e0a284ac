//! File-based template loader
//!
//! This module provides [`FileLoader`] for loading templates from a template
//! directory. A template named `instruction_prompt` is looked up as
//! `instruction_prompt.jinja`, `instruction_prompt.j2` or `instruction_prompt.md`,
//! in that order.

use crate::{JinjaTemplate, PromptError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Recognised template file extensions, in lookup order
const EXTENSIONS: [&str; 3] = ["jinja", "j2", "md"];

/// A file-based template loader
///
/// # Directory Structure
///
/// ```text
/// prompts/
/// ├── instruction_prompt.jinja
/// └── summary.j2
/// ```
///
/// # Examples
///
/// ```ignore
/// use finai_prompt::FileLoader;
///
/// let loader = FileLoader::new("./prompts");
/// let template = loader.load_template("instruction_prompt")?;
/// ```
#[derive(Debug, Clone)]
pub struct FileLoader {
    base_path: PathBuf,
}

impl FileLoader {
    /// Create a new file loader with the given base path
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Get the base path
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Path of the first existing file for `name`, if any
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        EXTENSIONS
            .iter()
            .map(|ext| self.base_path.join(format!("{name}.{ext}")))
            .find(|path| path.is_file())
    }

    /// Load a single template by name
    pub fn load_template(&self, name: &str) -> Result<JinjaTemplate> {
        let path = self.resolve(name).ok_or_else(|| PromptError::FileLoadError {
            path: self.base_path.join(name).display().to_string(),
            detail: format!(
                "No template file found (tried extensions: {})",
                EXTENSIONS.join(", ")
            ),
        })?;

        debug!(template = name, path = %path.display(), "loading template");

        let content = std::fs::read_to_string(&path).map_err(|e| PromptError::FileLoadError {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;

        JinjaTemplate::new(name, content)
    }
}
