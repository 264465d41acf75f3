//! Chat service: one shared entry point for answering queries, whole or
//! streamed.

use crate::adapters::build_adapters;
use crate::rag::aggregate::Aggregator;
use crate::rag::generate::{GenerationBridge, LlmGenerator, UnavailableGenerator};
use crate::rag::stream::{multiplex, EventSink, Outcome};
use crate::rag::types::{degraded_message, ChatResponse, NO_RESPONSE_MESSAGE, NO_RESULTS_MESSAGE};
use crate::types::SourceTokens;
use groundwork_core::{AppConfig, AppResult};
use groundwork_llm::create_client;
use groundwork_prompt::resolve_prompt;
use std::sync::Arc;

/// Answers chat queries against the user's connected sources.
///
/// Holds no per-request state; share it behind an `Arc`.
#[derive(Clone)]
pub struct ChatService {
    aggregator: Arc<Aggregator>,
    generator: Arc<dyn GenerationBridge>,
}

impl ChatService {
    pub fn new(aggregator: Aggregator, generator: Arc<dyn GenerationBridge>) -> Self {
        Self {
            aggregator: Arc::new(aggregator),
            generator,
        }
    }

    /// Wire live adapters, the configured prompt and the model provider.
    ///
    /// A provider that cannot be set up (missing API key, unknown name) is
    /// logged and replaced by one that always fails, so searches still work
    /// and answers degrade to the canned messages.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let prompt = resolve_prompt(config.prompt_file.as_deref())?;

        let generator: Arc<dyn GenerationBridge> = match create_client(&config.llm) {
            Ok(client) => Arc::new(LlmGenerator::new(client, prompt, &config.llm)),
            Err(e) => {
                tracing::warn!("Language model unavailable: {}", e);
                Arc::new(UnavailableGenerator::new(e.to_string()))
            }
        };

        let aggregator =
            Aggregator::new(build_adapters(&config.sources)).with_settings(&config.retrieval);

        Ok(Self::new(aggregator, generator))
    }

    /// Produce a complete answer with its references.
    pub async fn answer(&self, query: &str, tokens: &SourceTokens) -> ChatResponse {
        tracing::info!("Answering query across {:?}", tokens.connected());

        let aggregation = self.aggregator.aggregate(query, tokens).await;

        if aggregation.is_empty() {
            return ChatResponse {
                response: NO_RESULTS_MESSAGE.to_string(),
                references: Vec::new(),
            };
        }

        let response = match self.generator.generate(query, &aggregation.context).await {
            Ok(answer) if answer.text.trim().is_empty() => NO_RESPONSE_MESSAGE.to_string(),
            Ok(answer) => answer.text,
            Err(e) => {
                tracing::warn!("Generation failed: {}", e);
                degraded_message(aggregation.candidate_count())
            }
        };

        ChatResponse {
            response,
            references: aggregation.references,
        }
    }

    /// Stream an answer into `sink` as status, references, content and a
    /// terminal event.
    pub async fn answer_stream<S: EventSink>(
        &self,
        query: String,
        tokens: SourceTokens,
        sink: S,
    ) -> Outcome {
        tracing::info!("Streaming answer across {:?}", tokens.connected());
        multiplex(
            Arc::clone(&self.aggregator),
            Arc::clone(&self.generator),
            query,
            tokens,
            sink,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{SourceAdapter, StaticAdapter};
    use crate::rag::generate::StaticGenerator;
    use crate::types::{Candidate, Source};
    use std::sync::atomic::Ordering;

    fn service(adapters: Vec<Arc<dyn SourceAdapter>>, generator: StaticGenerator) -> ChatService {
        ChatService::new(Aggregator::new(adapters), Arc::new(generator))
    }

    fn wiki_hit() -> Arc<dyn SourceAdapter> {
        Arc::new(StaticAdapter::with_results(
            Source::Confluence,
            vec![Candidate::new(
                Source::Confluence,
                "Release checklist",
                "Tag, build, deploy.",
                "https://wiki/rc",
            )],
        ))
    }

    fn wiki_token() -> SourceTokens {
        SourceTokens::new().with(Source::Confluence, "atl")
    }

    #[tokio::test]
    async fn test_answer_with_context() {
        let chat = service(vec![wiki_hit()], StaticGenerator::answering(["Tag ", "then deploy."]));
        let response = chat.answer("release steps", &wiki_token()).await;

        assert_eq!(response.response, "Tag then deploy.");
        assert_eq!(response.references.len(), 1);
        assert_eq!(response.references[0].url, "https://wiki/rc");
    }

    #[tokio::test]
    async fn test_no_sources_gives_canned_answer() {
        let generator = StaticGenerator::answering(["unused"]);
        let calls = generator.calls();
        let chat = service(vec![wiki_hit()], generator);

        let response = chat.answer("What is the deployment process?", &SourceTokens::new()).await;

        assert_eq!(response.response, NO_RESULTS_MESSAGE);
        assert!(response.references.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_generation_failure_degrades() {
        let chat = service(vec![wiki_hit()], StaticGenerator::failing("503"));
        let response = chat.answer("release", &wiki_token()).await;

        assert_eq!(response.response, degraded_message(1));
        assert_eq!(response.references.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_generation() {
        let chat = service(vec![wiki_hit()], StaticGenerator::answering(["  "]));
        let response = chat.answer("release", &wiki_token()).await;
        assert_eq!(response.response, NO_RESPONSE_MESSAGE);
    }

    #[test]
    fn test_from_config_without_api_key() {
        // Missing key must not prevent startup
        let config = AppConfig::default();
        assert!(config.llm.api_key.is_none());
        assert!(ChatService::from_config(&config).is_ok());
    }
}
