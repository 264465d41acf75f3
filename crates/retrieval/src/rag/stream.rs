//! Stream multiplexer: sequences search progress, references and generated
//! text into one ordered event stream.
//!
//! Each stage is its own type and only exposes the events legal in that
//! stage, so a stream cannot send content before references or anything
//! after `done`:
//!
//! ```text
//! Idle -> Searching -> ReferencesSent -> Generating -> Done
//!            |                               |
//!            +-----------> Error <-----------+
//! ```

use crate::rag::aggregate::Aggregator;
use crate::rag::generate::GenerationBridge;
use crate::rag::types::{
    StreamEvent, GENERATING_STATUS, GENERATION_FAILED_MESSAGE, NO_RESULTS_MESSAGE,
    SEARCHING_STATUS, SEARCH_FAILED_MESSAGE,
};
use crate::types::{Reference, SourceTokens};
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// The receiving side went away.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("event sink closed")]
pub struct SinkClosed;

/// Destination for stream events.
#[async_trait]
pub trait EventSink: Send {
    /// Deliver one event. Returns [`SinkClosed`] once the consumer is gone.
    async fn emit(&mut self, event: StreamEvent) -> Result<(), SinkClosed>;
}

#[async_trait]
impl EventSink for mpsc::Sender<StreamEvent> {
    async fn emit(&mut self, event: StreamEvent) -> Result<(), SinkClosed> {
        self.send(event).await.map_err(|_| SinkClosed)
    }
}

/// How a stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// `done` was sent
    Done,
    /// `error` was sent
    Failed,
    /// The consumer disconnected first
    Disconnected,
}

/// Nothing sent yet.
pub struct Idle<S> {
    sink: S,
}

/// Search announced; waiting for results.
pub struct Searching<S> {
    sink: S,
}

/// References (if any) delivered.
pub struct ReferencesSent<S> {
    sink: S,
}

/// Generation announced; content may flow.
pub struct Generating<S> {
    sink: S,
}

impl<S: EventSink> Idle<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub async fn start(mut self) -> Result<Searching<S>, SinkClosed> {
        self.sink.emit(StreamEvent::status(SEARCHING_STATUS)).await?;
        Ok(Searching { sink: self.sink })
    }
}

impl<S: EventSink> Searching<S> {
    /// Send the references; an empty list sends nothing.
    pub async fn references(
        mut self,
        references: &[Reference],
    ) -> Result<ReferencesSent<S>, SinkClosed> {
        if !references.is_empty() {
            self.sink
                .emit(StreamEvent::References {
                    references: references.to_vec(),
                })
                .await?;
        }
        Ok(ReferencesSent { sink: self.sink })
    }

    pub async fn fail(mut self, message: &str) -> Result<Outcome, SinkClosed> {
        self.sink.emit(StreamEvent::error(message)).await?;
        Ok(Outcome::Failed)
    }
}

impl<S: EventSink> ReferencesSent<S> {
    pub async fn generating(mut self) -> Result<Generating<S>, SinkClosed> {
        self.sink.emit(StreamEvent::status(GENERATING_STATUS)).await?;
        Ok(Generating { sink: self.sink })
    }
}

impl<S: EventSink> Generating<S> {
    pub async fn content(&mut self, delta: impl Into<String>) -> Result<(), SinkClosed> {
        self.sink.emit(StreamEvent::content(delta)).await
    }

    pub async fn finish(mut self) -> Result<Outcome, SinkClosed> {
        self.sink.emit(StreamEvent::Done).await?;
        Ok(Outcome::Done)
    }

    pub async fn fail(mut self, message: &str) -> Result<Outcome, SinkClosed> {
        self.sink.emit(StreamEvent::error(message)).await?;
        Ok(Outcome::Failed)
    }
}

/// Run one streamed chat turn into `sink`.
///
/// The search runs on its own task so a panicking adapter surfaces as an
/// `error` event instead of tearing down the stream. Dropping the returned
/// future aborts that task and the generation stream.
pub async fn multiplex<S: EventSink>(
    aggregator: Arc<Aggregator>,
    generator: Arc<dyn GenerationBridge>,
    query: String,
    tokens: SourceTokens,
    sink: S,
) -> Outcome {
    match drive(aggregator, generator, query, tokens, sink).await {
        Ok(outcome) => outcome,
        Err(SinkClosed) => {
            tracing::info!("Client disconnected, stream abandoned");
            Outcome::Disconnected
        }
    }
}

async fn drive<S: EventSink>(
    aggregator: Arc<Aggregator>,
    generator: Arc<dyn GenerationBridge>,
    query: String,
    tokens: SourceTokens,
    sink: S,
) -> Result<Outcome, SinkClosed> {
    let searching = Idle::new(sink).start().await?;

    let mut search = JoinSet::new();
    let search_query = query.clone();
    search.spawn(async move { aggregator.aggregate(&search_query, &tokens).await });

    let aggregation = match search.join_next().await {
        Some(Ok(aggregation)) => aggregation,
        Some(Err(e)) => {
            tracing::error!("Search task failed: {}", e);
            return searching.fail(SEARCH_FAILED_MESSAGE).await;
        }
        None => return searching.fail(SEARCH_FAILED_MESSAGE).await,
    };

    let mut generating = searching
        .references(&aggregation.references)
        .await?
        .generating()
        .await?;

    if aggregation.is_empty() {
        generating.content(NO_RESULTS_MESSAGE).await?;
        return generating.finish().await;
    }

    let mut deltas = match generator.generate_stream(&query, &aggregation.context).await {
        Ok(deltas) => deltas,
        Err(e) => {
            tracing::warn!("Generation failed to start: {}", e);
            return generating.fail(GENERATION_FAILED_MESSAGE).await;
        }
    };

    while let Some(delta) = deltas.next().await {
        match delta {
            Ok(text) => generating.content(text).await?,
            Err(e) => {
                tracing::warn!("Generation failed mid-stream: {}", e);
                return generating.fail(GENERATION_FAILED_MESSAGE).await;
            }
        }
    }

    generating.finish().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::StaticAdapter;
    use crate::rag::generate::StaticGenerator;
    use crate::types::{Candidate, Source};
    use std::sync::atomic::Ordering;

    async fn run(
        adapters: Vec<StaticAdapter>,
        generator: StaticGenerator,
        tokens: SourceTokens,
    ) -> (Outcome, Vec<StreamEvent>) {
        let adapters = adapters
            .into_iter()
            .map(|a| Arc::new(a) as Arc<dyn crate::adapters::SourceAdapter>)
            .collect();
        let aggregator = Arc::new(Aggregator::new(adapters));
        let (tx, mut rx) = mpsc::channel(64);

        let outcome = multiplex(
            aggregator,
            Arc::new(generator),
            "deployment process".to_string(),
            tokens,
            tx,
        )
        .await;

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (outcome, events)
    }

    fn slack_hit() -> StaticAdapter {
        StaticAdapter::with_results(
            Source::Slack,
            vec![Candidate::new(
                Source::Slack,
                "Message in #ops",
                "The deployment process runs nightly.",
                "https://slack/p1",
            )],
        )
    }

    #[tokio::test]
    async fn test_happy_path_event_order() {
        let tokens = SourceTokens::new().with(Source::Slack, "xoxp");
        let (outcome, events) = run(
            vec![slack_hit()],
            StaticGenerator::answering(["Hel", "lo"]),
            tokens,
        )
        .await;

        assert_eq!(outcome, Outcome::Done);
        assert_eq!(events.len(), 6);
        assert_eq!(events[0], StreamEvent::status(SEARCHING_STATUS));
        assert!(matches!(events[1], StreamEvent::References { ref references } if references.len() == 1));
        assert_eq!(events[2], StreamEvent::status(GENERATING_STATUS));
        assert_eq!(events[3], StreamEvent::content("Hel"));
        assert_eq!(events[4], StreamEvent::content("lo"));
        assert_eq!(events[5], StreamEvent::Done);
    }

    #[tokio::test]
    async fn test_no_context_skips_generation() {
        let generator = StaticGenerator::answering(["unused"]);
        let calls = generator.calls();

        let (outcome, events) = run(vec![slack_hit()], generator, SourceTokens::new()).await;

        assert_eq!(outcome, Outcome::Done);
        assert_eq!(
            events,
            vec![
                StreamEvent::status(SEARCHING_STATUS),
                StreamEvent::status(GENERATING_STATUS),
                StreamEvent::content(NO_RESULTS_MESSAGE),
                StreamEvent::Done,
            ]
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_generation_failure_mid_stream() {
        let tokens = SourceTokens::new().with(Source::Slack, "xoxp");
        let (outcome, events) = run(
            vec![slack_hit()],
            StaticGenerator::answering(["partial"]).then_fail("reset"),
            tokens,
        )
        .await;

        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(events[3], StreamEvent::content("partial"));
        assert_eq!(
            events.last(),
            Some(&StreamEvent::error(GENERATION_FAILED_MESSAGE))
        );
        assert!(!events.contains(&StreamEvent::Done));
    }

    #[tokio::test]
    async fn test_panicking_search_reports_error() {
        let tokens = SourceTokens::new().with(Source::Gmail, "ya29");
        let (outcome, events) = run(
            vec![StaticAdapter::panicking(Source::Gmail)],
            StaticGenerator::answering(["x"]),
            tokens,
        )
        .await;

        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(
            events,
            vec![
                StreamEvent::status(SEARCHING_STATUS),
                StreamEvent::error(SEARCH_FAILED_MESSAGE),
            ]
        );
    }

    #[tokio::test]
    async fn test_disconnect_stops_stream() {
        let aggregator = Arc::new(Aggregator::new(vec![Arc::new(slack_hit())]));
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let outcome = multiplex(
            aggregator,
            Arc::new(StaticGenerator::answering(["never"])),
            "deployment".to_string(),
            SourceTokens::new().with(Source::Slack, "xoxp"),
            tx,
        )
        .await;

        assert_eq!(outcome, Outcome::Disconnected);
    }
}
