//! Serve command handler.

use crate::http;
use clap::Args;
use groundwork_core::{config::AppConfig, AppResult};
use groundwork_retrieval::ChatService;
use tokio::net::TcpListener;

/// Run the chat HTTP service
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Address to listen on, e.g. 127.0.0.1:8085
    #[arg(short, long)]
    pub bind: Option<String>,
}

impl ServeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        // A missing model key still lets the service search; answers degrade.
        if let Err(e) = config.validate() {
            if config.llm.api_key.is_some() || config.retrieval.top_k == 0 {
                return Err(e);
            }
            tracing::warn!("{}", e);
        }

        let chat = ChatService::from_config(config)?;

        let listener = TcpListener::bind(&config.bind).await?;
        tracing::info!("Listening on http://{}", listener.local_addr()?);

        http::serve(listener, chat).await
    }
}
