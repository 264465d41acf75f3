//! Chat response and stream event types.

use crate::types::Reference;
use serde::{Deserialize, Serialize};

/// Answer given when no source produced any context.
pub const NO_RESULTS_MESSAGE: &str = "I couldn't find any relevant information in your connected sources. Please make sure you've connected your data sources and try a different query.";

/// Answer given when the model returned nothing.
pub const NO_RESPONSE_MESSAGE: &str = "No response generated from AI service.";

/// Streamed when generation fails.
pub const GENERATION_FAILED_MESSAGE: &str = "Failed to generate response. Please try again.";

/// Streamed when the search stage itself breaks down.
pub const SEARCH_FAILED_MESSAGE: &str = "Failed to search your sources. Please try again.";

pub const SEARCHING_STATUS: &str = "Searching your sources...";
pub const GENERATING_STATUS: &str = "Generating response...";

/// Answer given when generation fails but context was found.
pub fn degraded_message(candidate_count: usize) -> String {
    format!(
        "Found {} relevant results from your sources, but couldn't generate a detailed response. Please try again.",
        candidate_count
    )
}

/// Non-streaming chat result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub references: Vec<Reference>,
}

/// One frame of a streamed chat answer.
///
/// Serialized with a `type` tag, e.g. `{"type":"content","content":"Hel"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Status { message: String },
    References { references: Vec<Reference> },
    Content { content: String },
    Error { message: String },
    Done,
}

impl StreamEvent {
    pub fn status(message: impl Into<String>) -> Self {
        StreamEvent::Status {
            message: message.into(),
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        StreamEvent::Content {
            content: content.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        StreamEvent::Error {
            message: message.into(),
        }
    }

    /// `done` and `error` end a stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::Error { .. })
    }
}
