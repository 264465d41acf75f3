//! Slack adapter, backed by `search.messages` with a user token.

use super::{fetch_json, trim_base_url, AdapterError, SourceAdapter};
use crate::text::{clean_chat_markup, extract_relevant, normalize};
use crate::types::{Candidate, Source};
use async_trait::async_trait;
use serde::Deserialize;

/// Slack Web API host.
pub const DEFAULT_SLACK_ENDPOINT: &str = "https://slack.com";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    messages: Option<Matches>,
}

#[derive(Debug, Deserialize)]
struct Matches {
    #[serde(default)]
    matches: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct SlackMessage {
    #[serde(default)]
    text: String,
    #[serde(default)]
    user: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    channel: Channel,
    #[serde(default)]
    permalink: String,
}

#[derive(Debug, Default, Deserialize)]
struct Channel {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
}

pub struct SlackAdapter {
    base_url: String,
    client: reqwest::Client,
}

impl SlackAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, DEFAULT_SLACK_ENDPOINT)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            base_url: trim_base_url(base_url),
            client,
        }
    }
}

/// Slack reports failures as `200 {"ok": false, "error": "..."}`.
fn api_error(code: &str) -> AdapterError {
    match code {
        "not_authed" | "invalid_auth" | "token_expired" | "token_revoked" | "account_inactive"
        | "missing_scope" => AdapterError::Unauthorized(code.to_string()),
        "ratelimited" => AdapterError::RateLimited(code.to_string()),
        _ => AdapterError::Api {
            status: 200,
            message: code.to_string(),
        },
    }
}

fn to_candidate(message: SlackMessage, query: &str) -> Candidate {
    let text = normalize(&clean_chat_markup(&message.text));
    let excerpt = extract_relevant(&text, query, Source::Slack.char_budget());

    let (title, channel_line) = if message.channel.name.is_empty() {
        (
            "Direct Message".to_string(),
            "Direct Message".to_string(),
        )
    } else {
        (
            format!("Message in #{}", message.channel.name),
            format!("#{}", message.channel.name),
        )
    };

    let user = if message.username.is_empty() {
        message.user
    } else {
        message.username
    };

    let url = if message.permalink.is_empty() {
        format!(
            "https://slack.com/app_redirect?channel={}",
            message.channel.id
        )
    } else {
        message.permalink
    };

    let content = format!("Channel: {}\nUser: {}\n\n{}", channel_line, user, excerpt);

    Candidate::new(Source::Slack, title, content, url)
}

#[async_trait]
impl SourceAdapter for SlackAdapter {
    fn source(&self) -> Source {
        Source::Slack
    }

    async fn search(
        &self,
        access_token: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Candidate>, AdapterError> {
        let url = format!("{}/api/search.messages", self.base_url);
        let request = self.client.get(&url).query(&[
            ("query", query.to_string()),
            ("count", limit.to_string()),
            ("sort", "timestamp".to_string()),
            ("sort_dir", "desc".to_string()),
        ]);
        let response: SearchResponse = fetch_json(request, access_token).await?;

        if !response.ok {
            return Err(api_error(response.error.as_deref().unwrap_or("unknown_error")));
        }

        let matches = response.messages.map(|m| m.matches).unwrap_or_default();
        let mut candidates = Vec::with_capacity(matches.len());
        for value in matches.into_iter().take(limit) {
            match serde_json::from_value::<SlackMessage>(value) {
                Ok(message) => candidates.push(to_candidate(message, query)),
                Err(e) => tracing::debug!("Skipping malformed Slack match: {}", e),
            }
        }

        Ok(candidates)
    }
}
