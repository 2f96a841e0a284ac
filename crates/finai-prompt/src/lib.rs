//! Prompt template management for finai
//!
//! This crate loads Jinja2 templates from a template directory and renders them
//! against a serializable context. Rendering is strict: a placeholder without a
//! value in the context is an error.
//!
//! # Quick Start
//!
//! ```
//! use finai_prompt::{JinjaTemplate, PromptTemplate};
//! use serde_json::json;
//!
//! let template = JinjaTemplate::new("greeting", "Hello, {{ name }}!").unwrap();
//! let text = template.render(&json!({ "name": "World" })).unwrap();
//! assert_eq!(text, "Hello, World!");
//! ```
//!
//! # Rendering from a directory
//!
//! ```ignore
//! use finai_prompt::PromptRenderer;
//!
//! let renderer = PromptRenderer::new("prompts");
//! let prompt = renderer.render_instruction_prompt(&context)?;
//! ```

mod error;
mod jinja;
mod loader;
mod registry;
mod renderer;
mod template;

// Re-export core types
pub use error::{PromptError, Result};
pub use jinja::JinjaTemplate;
pub use loader::FileLoader;
pub use registry::PromptRegistry;
pub use renderer::{DEFAULT_INSTRUCTION_TEMPLATE, PromptRenderer};
pub use template::PromptTemplate;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{PromptError, Result};
    pub use crate::jinja::JinjaTemplate;
    pub use crate::loader::FileLoader;
    pub use crate::registry::PromptRegistry;
    pub use crate::renderer::PromptRenderer;
    pub use crate::template::PromptTemplate;
}
