//! Generation bridge: turns a query plus grounding context into an answer,
//! whole or as a stream of text deltas.

use crate::types::ContextBlock;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use groundwork_core::config::LlmSettings;
use groundwork_core::{AppError, AppResult};
use groundwork_llm::{LlmClient, LlmRequest, LlmStream};
use groundwork_prompt::{build_prompt, PromptDefinition};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Ordered text deltas. The stream ends after the final delta; an error
/// item ends it early.
pub type DeltaStream = Pin<Box<dyn Stream<Item = AppResult<String>> + Send>>;

/// A complete generated answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
}

/// Produces answers grounded in context.
#[async_trait]
pub trait GenerationBridge: Send + Sync {
    async fn generate(&self, query: &str, context: &[ContextBlock]) -> AppResult<Answer>;

    async fn generate_stream(&self, query: &str, context: &[ContextBlock])
        -> AppResult<DeltaStream>;
}

/// Generation backed by a language-model provider.
pub struct LlmGenerator {
    client: Arc<dyn LlmClient>,
    prompt: PromptDefinition,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl LlmGenerator {
    pub fn new(client: Arc<dyn LlmClient>, prompt: PromptDefinition, settings: &LlmSettings) -> Self {
        Self {
            client,
            prompt,
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }

    fn request(&self, query: &str, context: &[ContextBlock]) -> AppResult<LlmRequest> {
        let built = build_prompt(&self.prompt, query, context)?;
        Ok(LlmRequest::new(built.user, &self.model)
            .with_system(built.system)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens))
    }
}

/// Map provider chunks to text deltas, ending at the provider's `done`
/// marker.
fn into_deltas(chunks: LlmStream) -> DeltaStream {
    let stream = futures::stream::unfold(Some(chunks), |state| async move {
        let mut chunks = state?;
        loop {
            match chunks.next().await {
                None => return None,
                Some(Err(e)) => return Some((Err(AppError::Generation(e.to_string())), None)),
                Some(Ok(chunk)) if chunk.done => {
                    if chunk.content.is_empty() {
                        return None;
                    }
                    return Some((Ok(chunk.content), None));
                }
                Some(Ok(chunk)) if chunk.content.is_empty() => continue,
                Some(Ok(chunk)) => return Some((Ok(chunk.content), Some(chunks))),
            }
        }
    });
    Box::pin(stream)
}

#[async_trait]
impl GenerationBridge for LlmGenerator {
    async fn generate(&self, query: &str, context: &[ContextBlock]) -> AppResult<Answer> {
        let request = self.request(query, context)?;
        tracing::info!(
            "Generating answer with {} ({} context blocks)",
            self.client.provider_name(),
            context.len()
        );

        let response = self
            .client
            .complete(&request)
            .await
            .map_err(|e| AppError::Generation(e.to_string()))?;

        tracing::debug!("Generation used {} tokens", response.usage.total_tokens);

        Ok(Answer {
            text: response.content,
        })
    }

    async fn generate_stream(
        &self,
        query: &str,
        context: &[ContextBlock],
    ) -> AppResult<DeltaStream> {
        let request = self.request(query, context)?.with_streaming();
        tracing::info!(
            "Streaming answer from {} ({} context blocks)",
            self.client.provider_name(),
            context.len()
        );

        let chunks = self
            .client
            .stream(&request)
            .await
            .map_err(|e| AppError::Generation(e.to_string()))?;

        Ok(into_deltas(chunks))
    }
}

/// Stand-in used when no provider could be configured; every call fails.
pub struct UnavailableGenerator {
    reason: String,
}

impl UnavailableGenerator {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl GenerationBridge for UnavailableGenerator {
    async fn generate(&self, _query: &str, _context: &[ContextBlock]) -> AppResult<Answer> {
        Err(AppError::Generation(self.reason.clone()))
    }

    async fn generate_stream(
        &self,
        _query: &str,
        _context: &[ContextBlock],
    ) -> AppResult<DeltaStream> {
        Err(AppError::Generation(self.reason.clone()))
    }
}

/// Scripted generator for tests and demos.
///
/// Streams its deltas in order, optionally failing after them, and answers
/// non-streaming calls with their concatenation.
#[derive(Debug, Clone)]
pub struct StaticGenerator {
    deltas: Vec<String>,
    error: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl StaticGenerator {
    pub fn answering<I, S>(deltas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            deltas: deltas.into_iter().map(Into::into).collect(),
            error: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fail before producing anything.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::answering(Vec::<String>::new()).then_fail(message)
    }

    /// Fail after the scripted deltas.
    pub fn then_fail(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    /// Number of generate calls made, streaming or not.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl GenerationBridge for StaticGenerator {
    async fn generate(&self, _query: &str, _context: &[ContextBlock]) -> AppResult<Answer> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.error {
            Some(ref message) => Err(AppError::Generation(message.clone())),
            None => Ok(Answer {
                text: self.deltas.concat(),
            }),
        }
    }

    async fn generate_stream(
        &self,
        _query: &str,
        _context: &[ContextBlock],
    ) -> AppResult<DeltaStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.deltas.is_empty() {
            if let Some(ref message) = self.error {
                return Err(AppError::Generation(message.clone()));
            }
        }

        let mut items: Vec<AppResult<String>> = self.deltas.iter().cloned().map(Ok).collect();
        if let Some(ref message) = self.error {
            items.push(Err(AppError::Generation(message.clone())));
        }
        Ok(Box::pin(futures::stream::iter(items)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Source;
    use groundwork_llm::{LlmResponse, LlmStreamChunk, LlmUsage};
    use groundwork_prompt::default_prompt;
    use std::sync::Mutex;

    /// Records the last request and replays canned output.
    struct RecordingClient {
        chunks: Vec<AppResult<LlmStreamChunk>>,
        last_request: Mutex<Option<LlmRequest>>,
    }

    impl RecordingClient {
        fn new(chunks: Vec<AppResult<LlmStreamChunk>>) -> Self {
            Self {
                chunks,
                last_request: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl LlmClient for RecordingClient {
        fn provider_name(&self) -> &str {
            "recording"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            *self.last_request.lock().unwrap() = Some(request.clone());
            Ok(LlmResponse {
                content: "The pipeline deploys on merge.".to_string(),
                model: request.model.clone(),
                usage: LlmUsage::new(10, 6),
            })
        }

        async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
            *self.last_request.lock().unwrap() = Some(request.clone());
            let chunks: Vec<AppResult<LlmStreamChunk>> = self
                .chunks
                .iter()
                .map(|c| match c {
                    Ok(chunk) => Ok(chunk.clone()),
                    Err(e) => Err(AppError::Llm(e.to_string())),
                })
                .collect();
            Ok(Box::pin(futures::stream::iter(chunks)))
        }
    }

    fn context() -> Vec<ContextBlock> {
        vec![ContextBlock {
            source: Source::Confluence,
            title: "Deploys".to_string(),
            content: "Merges to main deploy automatically.".to_string(),
        }]
    }

    fn generator(client: Arc<RecordingClient>) -> LlmGenerator {
        LlmGenerator::new(client, default_prompt(), &LlmSettings::default())
    }

    #[tokio::test]
    async fn test_generate_renders_prompt() {
        let client = Arc::new(RecordingClient::new(Vec::new()));
        let answer = generator(Arc::clone(&client))
            .generate("How do deploys work?", &context())
            .await
            .unwrap();

        assert_eq!(answer.text, "The pipeline deploys on merge.");

        let request = client.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.prompt, "How do deploys work?");
        assert!(request
            .system
            .unwrap()
            .contains("From Deploys (confluence): Merges to main deploy automatically."));
        assert_eq!(request.model, "gpt-4");
        assert_eq!(request.max_tokens, Some(1000));
        assert!(!request.stream);
    }

    #[tokio::test]
    async fn test_stream_stops_at_done() {
        let client = Arc::new(RecordingClient::new(vec![
            Ok(LlmStreamChunk::delta("")),
            Ok(LlmStreamChunk::delta("Hel")),
            Ok(LlmStreamChunk::delta("lo")),
            Ok(LlmStreamChunk::finished(None)),
            Ok(LlmStreamChunk::delta("ignored")),
        ]));

        let deltas: Vec<_> = generator(Arc::clone(&client))
            .generate_stream("q", &context())
            .await
            .unwrap()
            .collect()
            .await;

        let texts: Vec<_> = deltas.into_iter().map(|d| d.unwrap()).collect();
        assert_eq!(texts, vec!["Hel", "lo"]);
        assert!(client.last_request.lock().unwrap().as_ref().unwrap().stream);
    }

    #[tokio::test]
    async fn test_stream_error_ends_stream() {
        let client = Arc::new(RecordingClient::new(vec![
            Ok(LlmStreamChunk::delta("partial")),
            Err(AppError::Llm("connection reset".to_string())),
            Ok(LlmStreamChunk::delta("never")),
        ]));

        let items: Vec<_> = generator(client)
            .generate_stream("q", &context())
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "partial");
        assert!(matches!(items[1], Err(AppError::Generation(_))));
    }

    #[tokio::test]
    async fn test_unavailable_generator_fails() {
        let generator = UnavailableGenerator::new("OPENAI_API_KEY not set");
        assert!(generator.generate("q", &context()).await.is_err());
        assert!(generator.generate_stream("q", &context()).await.is_err());
    }

    #[tokio::test]
    async fn test_static_generator_script() {
        let generator = StaticGenerator::answering(["a", "b"]).then_fail("cut off");
        let items: Vec<_> = generator
            .generate_stream("q", &[])
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(items.len(), 3);
        assert!(items[2].is_err());
        assert_eq!(generator.calls().load(Ordering::SeqCst), 1);
    }
}
