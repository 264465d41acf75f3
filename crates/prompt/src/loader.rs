//! Prompt loader: the built-in grounding prompt and YAML overrides.

use crate::types::PromptDefinition;
use groundwork_core::{AppError, AppResult};
use std::path::Path;

/// Identifier of the built-in grounding prompt.
pub const DEFAULT_PROMPT_ID: &str = "chat.grounded.default";

const DEFAULT_SYSTEM_TEMPLATE: &str = "\
You are a helpful AI assistant that answers questions based on the provided context from the user's work documents.

Instructions:
1. Answer the user's question using ONLY the information provided in the context
2. If the context doesn't contain relevant information, say so clearly
3. Be concise but thorough in your response
4. Reference which sources you're drawing from when relevant
5. If you're unsure about something, acknowledge the uncertainty

Context from user's documents:
{{#each context}}{{#unless @first}}{{@root.separator}}{{/unless}}From {{title}} ({{source}}): {{content}}{{/each}}";

/// The built-in grounding prompt.
pub fn default_prompt() -> PromptDefinition {
    PromptDefinition {
        id: DEFAULT_PROMPT_ID.to_string(),
        title: "Grounded answer".to_string(),
        api_version: "1.0".to_string(),
        system: DEFAULT_SYSTEM_TEMPLATE.to_string(),
        user: "{{query}}".to_string(),
    }
}

/// Load a prompt definition from a YAML file.
///
/// # Example
/// ```no_run
/// use groundwork_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("prompts/grounded.yml"))?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(prompt_file: &Path) -> AppResult<PromptDefinition> {
    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    let contents = std::fs::read_to_string(prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// Use the file at `prompt_file` when configured, the built-in prompt otherwise.
pub fn resolve_prompt(prompt_file: Option<&Path>) -> AppResult<PromptDefinition> {
    match prompt_file {
        Some(path) => load_prompt(path),
        None => Ok(default_prompt()),
    }
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.api_version.is_empty() || !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: '{}'. Expected format: 'x.y'",
            def.api_version
        )));
    }

    if def.system.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt system template cannot be empty".to_string(),
        ));
    }

    if !def.system.contains("context") {
        return Err(AppError::Prompt(format!(
            "Prompt '{}' never references the context variable",
            def.id
        )));
    }

    Ok(())
}
