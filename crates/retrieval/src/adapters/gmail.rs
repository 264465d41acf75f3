//! Gmail adapter.
//!
//! Lists matching message ids, then fetches each message in full. Messages
//! that fail to load are skipped; the search as a whole only fails when the
//! listing does.

use super::{fetch_json, trim_base_url, AdapterError, SourceAdapter};
use crate::text::{extract_relevant, normalize};
use crate::types::{Candidate, Source};
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use futures::future::join_all;
use serde::Deserialize;

/// Google APIs host.
pub const DEFAULT_GMAIL_ENDPOINT: &str = "https://gmail.googleapis.com";

const MESSAGE_LINK_BASE: &str = "https://mail.google.com/mail/u/0/#inbox/";

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    messages: Vec<MessageId>,
}

#[derive(Debug, Deserialize)]
struct MessageId {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct Message {
    #[serde(default)]
    id: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    payload: MessagePart,
}

#[derive(Debug, Default, Deserialize)]
struct MessagePart {
    #[serde(default, rename = "mimeType")]
    mime_type: String,
    #[serde(default)]
    headers: Vec<Header>,
    #[serde(default)]
    body: PartBody,
    #[serde(default)]
    parts: Vec<MessagePart>,
}

#[derive(Debug, Deserialize)]
struct Header {
    name: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Default, Deserialize)]
struct PartBody {
    #[serde(default)]
    data: String,
}

/// Header and body fields pulled out of a message.
#[derive(Debug, Default, PartialEq)]
struct EmailInfo {
    subject: String,
    sender: String,
    date: String,
    body: String,
    /// Body came from an HTML part
    html: bool,
}

pub struct GmailAdapter {
    base_url: String,
    client: reqwest::Client,
}

impl GmailAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, DEFAULT_GMAIL_ENDPOINT)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            base_url: trim_base_url(base_url),
            client,
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/gmail/v1/users/me/messages", self.base_url)
    }

    async fn fetch_message(&self, access_token: &str, id: &str) -> Result<Message, AdapterError> {
        let url = format!("{}/{}", self.messages_url(), id);
        let request = self.client.get(&url).query(&[("format", "full")]);
        fetch_json(request, access_token).await
    }
}

fn decode_base64_url(data: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(data.trim_end_matches('=')).ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// First decodable body, depth first through text and multipart parts.
/// Returns the text and whether it is HTML.
fn extract_body(part: &MessagePart) -> Option<(String, bool)> {
    if !part.body.data.is_empty() {
        if let Some(decoded) = decode_base64_url(&part.body.data) {
            return Some((decoded, part.mime_type == "text/html"));
        }
    }

    part.parts
        .iter()
        .filter(|p| {
            p.mime_type == "text/plain"
                || p.mime_type == "text/html"
                || p.mime_type.starts_with("multipart/")
        })
        .find_map(|p| extract_body(p).filter(|(body, _)| !body.is_empty()))
}

fn format_date(value: &str) -> String {
    chrono::DateTime::parse_from_rfc2822(value)
        .map(|date| date.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| value.to_string())
}

fn email_info(message: &Message) -> EmailInfo {
    let mut info = EmailInfo::default();

    for header in &message.payload.headers {
        match header.name.as_str() {
            "Subject" => info.subject = header.value.clone(),
            "From" => info.sender = header.value.clone(),
            "Date" => info.date = format_date(&header.value),
            _ => {}
        }
    }

    match extract_body(&message.payload).filter(|(body, _)| !body.trim().is_empty()) {
        Some((body, html)) => {
            info.body = body;
            info.html = html;
        }
        None => info.body = message.snippet.clone(),
    }

    info
}

fn to_candidate(message: &Message, query: &str) -> Candidate {
    let info = email_info(message);
    let body = if info.html {
        normalize(&info.body)
    } else {
        info.body.clone()
    };
    let excerpt = extract_relevant(&body, query, Source::Gmail.char_budget());
    let content = format!(
        "Subject: {}\nFrom: {}\nDate: {}\n\n{}",
        info.subject, info.sender, info.date, excerpt
    );
    let title = if info.subject.trim().is_empty() {
        "(no subject)".to_string()
    } else {
        info.subject
    };

    Candidate::new(
        Source::Gmail,
        title,
        content,
        format!("{}{}", MESSAGE_LINK_BASE, message.id),
    )
}

#[async_trait]
impl SourceAdapter for GmailAdapter {
    fn source(&self) -> Source {
        Source::Gmail
    }

    async fn search(
        &self,
        access_token: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Candidate>, AdapterError> {
        let request = self
            .client
            .get(self.messages_url())
            .query(&[("q", query.to_string()), ("maxResults", limit.to_string())]);
        let listing: ListResponse = fetch_json(request, access_token).await?;

        tracing::debug!("Gmail listed {} messages", listing.messages.len());

        let ids: Vec<&str> = listing
            .messages
            .iter()
            .take(limit)
            .map(|m| m.id.as_str())
            .collect();
        let fetches = ids.iter().map(|id| self.fetch_message(access_token, id));
        let results = join_all(fetches).await;

        let mut candidates = Vec::with_capacity(results.len());
        for (id, result) in ids.iter().zip(results) {
            match result {
                Ok(mut message) => {
                    if message.id.is_empty() {
                        message.id = id.to_string();
                    }
                    candidates.push(to_candidate(&message, query));
                }
                Err(e) => tracing::warn!("Skipping Gmail message {}: {}", id, e),
            }
        }

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(text: &str) -> String {
        URL_SAFE_NO_PAD.encode(text)
    }

    fn message(value: serde_json::Value) -> Message {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_headers_and_plain_body() {
        let msg = message(serde_json::json!({
            "id": "18c2",
            "snippet": "ignored",
            "payload": {
                "mimeType": "text/plain",
                "headers": [
                    { "name": "Subject", "value": "Q3 budget" },
                    { "name": "From", "value": "Dana <dana@example.com>" },
                    { "name": "Date", "value": "Tue, 1 Oct 2024 09:30:00 +0000" }
                ],
                "body": { "data": encode("Budget approved for Q3.") }
            }
        }));

        let info = email_info(&msg);
        assert_eq!(info.subject, "Q3 budget");
        assert_eq!(info.sender, "Dana <dana@example.com>");
        assert_eq!(info.date, "2024-10-01 09:30");
        assert_eq!(info.body, "Budget approved for Q3.");
    }

    #[test]
    fn test_multipart_body() {
        let msg = message(serde_json::json!({
            "id": "a1",
            "payload": {
                "mimeType": "multipart/mixed",
                "parts": [
                    { "mimeType": "image/png", "body": { "data": encode("binary") } },
                    {
                        "mimeType": "multipart/alternative",
                        "parts": [
                            { "mimeType": "text/plain", "body": { "data": encode("Hello <there> team") } }
                        ]
                    }
                ]
            }
        }));
        assert_eq!(email_info(&msg).body, "Hello <there> team");
    }

    #[test]
    fn test_snippet_fallback() {
        let msg = message(serde_json::json!({
            "id": "b2",
            "snippet": "Short preview",
            "payload": { "mimeType": "multipart/mixed", "parts": [] }
        }));
        assert_eq!(email_info(&msg).body, "Short preview");
    }

    #[test]
    fn test_unparseable_date_kept_verbatim() {
        assert_eq!(format_date("yesterday"), "yesterday");
    }

    #[test]
    fn test_candidate_layout() {
        let msg = message(serde_json::json!({
            "id": "c3",
            "payload": {
                "headers": [
                    { "name": "Subject", "value": "Launch" },
                    { "name": "From", "value": "ops@example.com" }
                ],
                "mimeType": "text/html",
                "body": { "data": encode("<p>We launch&nbsp;Monday.</p>") }
            }
        }));

        let candidate = to_candidate(&msg, "launch");
        assert_eq!(candidate.title, "Launch");
        assert_eq!(
            candidate.content,
            "Subject: Launch\nFrom: ops@example.com\nDate: \n\nWe launch Monday."
        );
        assert_eq!(candidate.url, "https://mail.google.com/mail/u/0/#inbox/c3");
        assert_eq!(candidate.source, Source::Gmail);
    }

    #[test]
    fn test_plain_text_body_keeps_angle_brackets() {
        let msg = message(serde_json::json!({
            "id": "d4",
            "payload": {
                "mimeType": "text/plain",
                "headers": [{ "name": "Subject", "value": "Contact" }],
                "body": { "data": encode("Write to <ops@example.com> about the launch.") }
            }
        }));

        let info = email_info(&msg);
        assert!(!info.html);

        let candidate = to_candidate(&msg, "launch");
        assert!(candidate
            .content
            .ends_with("Write to <ops@example.com> about the launch."));
    }

    #[test]
    fn test_padded_base64_accepted() {
        assert_eq!(decode_base64_url("aGk="), Some("hi".to_string()));
    }
}
