//! Retrieval and grounding for Groundwork.
//!
//! Searches a user's connected sources (wiki, mailbox, chat) with their own
//! access tokens, keeps the most relevant hits per source, and grounds a
//! language-model answer in them.
//!
//! # Pipeline
//!
//! 1. [`adapters`] query each connected source and normalize hits into
//!    [`Candidate`]s trimmed to a per-source budget ([`text`]).
//! 2. [`rank`] keeps the best three candidates per source.
//! 3. [`rag::Aggregator`] merges them, in source order, into references and
//!    context blocks.
//! 4. [`rag::GenerationBridge`] produces the answer, which
//!    [`rag::ChatService`] returns whole or streams as [`rag::StreamEvent`]s.

pub mod adapters;
pub mod rag;
pub mod rank;
pub mod text;
pub mod types;

#[cfg(test)]
mod tests;

pub use adapters::{AdapterError, SourceAdapter};
pub use rag::{ChatResponse, ChatService, StreamEvent};
pub use types::{Candidate, ContextBlock, Reference, Source, SourceTokens};
