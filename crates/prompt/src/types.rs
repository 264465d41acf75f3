//! Prompt types for grounded answering.

use serde::{Deserialize, Serialize};

/// A grounding prompt definition, either built in or loaded from YAML.
///
/// Both templates are rendered with Handlebars. They see two variables:
/// - `query`: the user's question
/// - `context`: the ordered context items, each with `source`, `title` and
///   `content`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// System message template (instructions + grounding context)
    pub system: String,

    /// User message template
    #[serde(default = "default_user_template")]
    pub user: String,
}

fn default_user_template() -> String {
    "{{query}}".to_string()
}

/// A fully built prompt ready for LLM execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// System message
    pub system: String,

    /// User message
    pub user: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    /// Number of context items rendered into the prompt
    #[serde(rename = "contextItems")]
    pub context_items: usize,
}
