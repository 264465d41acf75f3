//! Prompt builder for rendering grounding templates.

use crate::types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
use groundwork_core::{AppError, AppResult};
use handlebars::Handlebars;
use serde::Serialize;

#[derive(Serialize)]
struct PromptVariables<'a, T: Serialize> {
    query: &'a str,
    context: &'a [T],
    separator: &'static str,
}

/// Text placed between rendered context items (`{{@root.separator}}`).
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Build a prompt from a definition, the user's query and ordered context.
///
/// `context` items are rendered in the order given; each must serialize to
/// an object with the fields the template references (the built-in template
/// uses `source`, `title` and `content`). Templates can join items with
/// `{{@root.separator}}`, a blank line.
///
/// # Example
/// ```
/// use groundwork_prompt::{build_prompt, default_prompt};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Item { source: &'static str, title: &'static str, content: &'static str }
///
/// let items = [Item { source: "confluence", title: "Deploys", content: "Run the pipeline." }];
/// let built = build_prompt(&default_prompt(), "How do I deploy?", &items).unwrap();
/// assert!(built.system.contains("From Deploys (confluence): Run the pipeline."));
/// assert_eq!(built.user, "How do I deploy?");
/// ```
pub fn build_prompt<T: Serialize>(
    definition: &PromptDefinition,
    query: &str,
    context: &[T],
) -> AppResult<BuiltPrompt> {
    tracing::debug!(
        "Building prompt {} with {} context items",
        definition.id,
        context.len()
    );

    let mut handlebars = Handlebars::new();

    // Plain text, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("system", &definition.system)
        .map_err(|e| AppError::Prompt(format!("Failed to register system template: {}", e)))?;
    handlebars
        .register_template_string("user", &definition.user)
        .map_err(|e| AppError::Prompt(format!("Failed to register user template: {}", e)))?;

    let variables = PromptVariables {
        query,
        context,
        separator: CONTEXT_SEPARATOR,
    };

    let system = handlebars
        .render("system", &variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render system template: {}", e)))?;
    let user = handlebars
        .render("user", &variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render user template: {}", e)))?;

    Ok(BuiltPrompt {
        system,
        user,
        metadata: BuiltPromptMetadata {
            source_prompt_id: definition.id.clone(),
            context_items: context.len(),
        },
    })
}
