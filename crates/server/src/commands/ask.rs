//! Ask command handler.
//!
//! Runs the same pipeline as the HTTP routes and prints the answer.

use async_trait::async_trait;
use clap::Args;
use groundwork_core::{config::AppConfig, AppError, AppResult};
use groundwork_retrieval::rag::{EventSink, Outcome, SinkClosed};
use groundwork_retrieval::{ChatService, Reference, Source, SourceTokens, StreamEvent};
use std::io::Write;

/// Answer one question from the terminal
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub query: String,

    /// Confluence OAuth access token
    #[arg(long, env = "GROUNDWORK_CONFLUENCE_TOKEN", hide_env_values = true)]
    pub confluence_token: Option<String>,

    /// Gmail OAuth access token
    #[arg(long, env = "GROUNDWORK_GMAIL_TOKEN", hide_env_values = true)]
    pub gmail_token: Option<String>,

    /// Slack user token
    #[arg(long, env = "GROUNDWORK_SLACK_TOKEN", hide_env_values = true)]
    pub slack_token: Option<String>,

    /// Only search these sources (confluence, gmail, slack)
    #[arg(short, long, value_delimiter = ',')]
    pub sources: Vec<String>,

    /// Disable streaming
    #[arg(long)]
    pub no_stream: bool,

    /// Output as JSON (implies --no-stream)
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::debug!("Ask command options: {:?}", self);

        let tokens = self.tokens()?;
        if tokens.is_empty() {
            tracing::warn!("No source tokens given; pass --confluence-token, --gmail-token or --slack-token");
        }

        let chat = ChatService::from_config(config)?;

        if self.json || self.no_stream {
            let response = chat.answer(&self.query, &tokens).await;

            if self.json {
                let json = serde_json::to_string_pretty(&response)
                    .map_err(|e| AppError::Serialization(e.to_string()))?;
                println!("{}", json);
            } else {
                println!("{}", response.response);
                print_references(&response.references);
            }
            return Ok(());
        }

        match chat
            .answer_stream(self.query.clone(), tokens, TerminalSink::default())
            .await
        {
            Outcome::Done => Ok(()),
            Outcome::Failed => Err(AppError::Generation("answer did not complete".to_string())),
            Outcome::Disconnected => Err(AppError::Other("output closed".to_string())),
        }
    }

    fn tokens(&self) -> AppResult<SourceTokens> {
        let mut tokens = SourceTokens::new();
        for (source, token) in [
            (Source::Confluence, &self.confluence_token),
            (Source::Gmail, &self.gmail_token),
            (Source::Slack, &self.slack_token),
        ] {
            if let Some(token) = token {
                tokens = tokens.with(source, token.clone());
            }
        }

        if self.sources.is_empty() {
            return Ok(tokens);
        }

        let selected = self
            .sources
            .iter()
            .map(|name| {
                Source::parse(name)
                    .ok_or_else(|| AppError::Config(format!("Unknown source: {}", name)))
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(tokens.restrict_to(&selected))
    }
}

/// Prints streamed content to stdout and progress to the log.
#[derive(Default)]
struct TerminalSink {
    references: Vec<Reference>,
}

#[async_trait]
impl EventSink for TerminalSink {
    async fn emit(&mut self, event: StreamEvent) -> Result<(), SinkClosed> {
        match event {
            StreamEvent::Status { message } => tracing::info!("{}", message),
            StreamEvent::References { references } => self.references = references,
            StreamEvent::Content { content } => {
                let mut stdout = std::io::stdout();
                write!(stdout, "{}", content).map_err(|_| SinkClosed)?;
                stdout.flush().map_err(|_| SinkClosed)?;
            }
            StreamEvent::Error { message } => {
                println!();
                tracing::error!("{}", message);
            }
            StreamEvent::Done => {
                println!();
                print_references(&self.references);
            }
        }
        Ok(())
    }
}

fn print_references(references: &[Reference]) {
    if references.is_empty() {
        return;
    }

    println!("\nSources:");
    for (i, reference) in references.iter().enumerate() {
        println!(
            "  [{}] {} ({}) {}",
            i + 1,
            reference.title,
            reference.source,
            reference.url
        );
    }
}
