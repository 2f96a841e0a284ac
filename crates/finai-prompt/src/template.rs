//! Core prompt template trait
//!
//! This module defines the [`PromptTemplate`] trait that all template implementations must follow.

use crate::Result;

/// Core trait for prompt templates
///
/// This trait is dyn-compatible, using `serde_json::Value` for variables instead of generics,
/// so templates of different kinds can live side by side in a [`crate::PromptRegistry`].
///
/// # Examples
///
/// ```ignore
/// use finai_prompt::{JinjaTemplate, PromptTemplate};
/// use serde_json::json;
///
/// let template = JinjaTemplate::new("greeting", "Hello, {{ name }}!")?;
/// let result = template.render(&json!({ "name": "World" }))?;
/// assert_eq!(result, "Hello, World!");
/// ```
pub trait PromptTemplate: Send + Sync {
    /// Get the template name/identifier
    fn name(&self) -> &str;

    /// Render the template with variables
    ///
    /// Returns an error if rendering fails or the template references a
    /// variable that `vars` does not define.
    fn render(&self, vars: &serde_json::Value) -> Result<String>;

    /// Get raw template string (for debugging/inspection)
    fn raw_template(&self) -> &str;
}
