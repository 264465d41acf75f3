//! In-memory adapter for tests and offline demos.

use super::{AdapterError, SourceAdapter};
use crate::types::{Candidate, Source};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Behaviour {
    Results(Vec<Candidate>),
    Fail(String),
    Panic,
}

/// Adapter that answers every search with a fixed result.
///
/// Counts its calls so callers can assert a source was or was not searched.
#[derive(Debug, Clone)]
pub struct StaticAdapter {
    source: Source,
    behaviour: Behaviour,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl StaticAdapter {
    /// Return `candidates` (truncated to the requested limit).
    pub fn with_results(source: Source, candidates: Vec<Candidate>) -> Self {
        Self::build(source, Behaviour::Results(candidates))
    }

    /// Fail every search with a network error.
    pub fn failing(source: Source, message: impl Into<String>) -> Self {
        Self::build(source, Behaviour::Fail(message.into()))
    }

    /// Panic inside every search.
    pub fn panicking(source: Source) -> Self {
        Self::build(source, Behaviour::Panic)
    }

    fn build(source: Source, behaviour: Behaviour) -> Self {
        Self {
            source,
            behaviour,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Shared call counter; clones of this adapter share it.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl SourceAdapter for StaticAdapter {
    fn source(&self) -> Source {
        self.source
    }

    async fn search(
        &self,
        _access_token: &str,
        _query: &str,
        limit: usize,
    ) -> Result<Vec<Candidate>, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.behaviour {
            Behaviour::Results(candidates) => Ok(candidates.iter().take(limit).cloned().collect()),
            Behaviour::Fail(message) => Err(AdapterError::Network(message.clone())),
            Behaviour::Panic => panic!("{} adapter exploded", self.source),
        }
    }
}
