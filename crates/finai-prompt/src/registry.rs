//! Prompt template registry
//!
//! This module provides [`PromptRegistry`], a thread-safe memo of parsed
//! templates keyed by name.

use crate::{PromptError, PromptTemplate, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A thread-safe cache of parsed prompt templates
///
/// Templates enter the registry through [`PromptRegistry::get_or_try_insert`]
/// and stay until [`PromptRegistry::clear`].
///
/// # Examples
///
/// ```
/// use finai_prompt::{JinjaTemplate, PromptRegistry, PromptTemplate};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// let registry = PromptRegistry::new();
/// let template = registry
///     .get_or_try_insert("greeting", || {
///         Ok(Arc::new(JinjaTemplate::new("greeting", "Hello, {{ name }}!")?))
///     })
///     .unwrap();
///
/// assert_eq!(template.render(&json!({ "name": "World" })).unwrap(), "Hello, World!");
/// assert!(registry.get("greeting").is_some());
/// ```
pub struct PromptRegistry {
    templates: RwLock<HashMap<String, Arc<dyn PromptTemplate>>>,
}

impl PromptRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            templates: RwLock::new(HashMap::new()),
        }
    }

    /// Get a template by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn PromptTemplate>> {
        self.templates.read().ok()?.get(name).cloned()
    }

    /// Get a template, registering the result of `load` on a miss
    pub fn get_or_try_insert<F>(&self, name: &str, load: F) -> Result<Arc<dyn PromptTemplate>>
    where
        F: FnOnce() -> Result<Arc<dyn PromptTemplate>>,
    {
        if let Some(template) = self.get(name) {
            return Ok(template);
        }

        let template = load()?;
        let mut templates = self
            .templates
            .write()
            .map_err(|e| PromptError::LockError(e.to_string()))?;

        Ok(Arc::clone(
            templates.entry(name.to_string()).or_insert(template),
        ))
    }

    /// Drop every cached template
    pub fn clear(&self) {
        if let Ok(mut templates) = self.templates.write() {
            templates.clear();
        }
    }
}

impl Default for PromptRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PromptRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.templates.read().map(|t| t.len()).unwrap_or(0);
        f.debug_struct("PromptRegistry")
            .field("template_count", &count)
            .finish()
    }
}
