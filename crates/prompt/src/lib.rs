//! Prompt system for Groundwork.
//!
//! This crate renders the grounding prompt handed to the language model:
//! - A built-in prompt carrying the answering instructions
//! - Optional YAML prompt overrides
//! - Handlebars rendering of the query and ordered context items

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{build_prompt, CONTEXT_SEPARATOR};
pub use loader::{default_prompt, load_prompt, resolve_prompt, DEFAULT_PROMPT_ID};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
