//! Confluence Cloud adapter.
//!
//! Resolves the user's first accessible Atlassian site, then runs a CQL
//! full-text search against it.

use super::{fetch_json, trim_base_url, AdapterError, SourceAdapter};
use crate::text::{extract_relevant, normalize};
use crate::types::{Candidate, Source};
use async_trait::async_trait;
use serde::Deserialize;

/// Atlassian API gateway.
pub const DEFAULT_CONFLUENCE_ENDPOINT: &str = "https://api.atlassian.com";

#[derive(Debug, Deserialize)]
struct AccessibleResource {
    id: String,
    #[serde(default)]
    url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: Option<PageBody>,
    #[serde(default, rename = "_links")]
    links: Option<PageLinks>,
}

#[derive(Debug, Deserialize)]
struct PageBody {
    #[serde(default)]
    view: Option<BodyValue>,
}

#[derive(Debug, Deserialize)]
struct BodyValue {
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct PageLinks {
    #[serde(default)]
    webui: String,
}

pub struct ConfluenceAdapter {
    base_url: String,
    client: reqwest::Client,
}

impl ConfluenceAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, DEFAULT_CONFLUENCE_ENDPOINT)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            base_url: trim_base_url(base_url),
            client,
        }
    }

    async fn first_site(&self, access_token: &str) -> Result<AccessibleResource, AdapterError> {
        let url = format!("{}/oauth/token/accessible-resources", self.base_url);
        let sites: Vec<AccessibleResource> =
            fetch_json(self.client.get(&url), access_token).await?;

        sites
            .into_iter()
            .next()
            .ok_or_else(|| AdapterError::Api {
                status: 404,
                message: "no accessible Confluence sites".to_string(),
            })
    }
}

/// Full-text CQL query for `query`.
fn cql_for(query: &str) -> String {
    let escaped = query.replace('\\', "\\\\").replace('"', "\\\"");
    format!("text ~ \"{}\"", escaped)
}

fn to_candidate(page: Page, site_url: &str, query: &str) -> Candidate {
    let html = page
        .body
        .and_then(|b| b.view)
        .map(|v| v.value)
        .unwrap_or_default();
    let url = match page.links {
        Some(links) if !links.webui.is_empty() => {
            format!("{}{}", site_url.trim_end_matches('/'), links.webui)
        }
        _ => site_url.to_string(),
    };

    let title = if page.title.trim().is_empty() {
        "Untitled page".to_string()
    } else {
        page.title
    };

    // Pages without a rendered body are represented by their title
    let text = normalize(&html);
    let content = if text.is_empty() {
        title.clone()
    } else {
        extract_relevant(&text, query, Source::Confluence.char_budget())
    };

    Candidate::new(Source::Confluence, title, content, url)
}

#[async_trait]
impl SourceAdapter for ConfluenceAdapter {
    fn source(&self) -> Source {
        Source::Confluence
    }

    async fn search(
        &self,
        access_token: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Candidate>, AdapterError> {
        let site = self.first_site(access_token).await?;
        tracing::debug!("Searching Confluence site {}", site.url);

        let url = format!(
            "{}/ex/confluence/{}/rest/api/content/search",
            self.base_url, site.id
        );
        let request = self.client.get(&url).query(&[
            ("cql", cql_for(query)),
            ("limit", limit.to_string()),
            ("expand", "space,body.view".to_string()),
        ]);
        let response: SearchResponse = fetch_json(request, access_token).await?;

        let mut candidates = Vec::with_capacity(response.results.len());
        for result in response.results.into_iter().take(limit) {
            match serde_json::from_value::<Page>(result) {
                Ok(page) => candidates.push(to_candidate(page, &site.url, query)),
                Err(e) => tracing::debug!("Skipping malformed Confluence result: {}", e),
            }
        }

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cql_escapes_quotes() {
        assert_eq!(cql_for("deploy"), "text ~ \"deploy\"");
        assert_eq!(cql_for("say \"hi\""), "text ~ \"say \\\"hi\\\"\"");
    }

    #[test]
    fn test_page_to_candidate() {
        let page: Page = serde_json::from_value(serde_json::json!({
            "id": "123",
            "title": "Release process",
            "body": { "view": { "value": "<p>Tag the <b>release</b> &amp; deploy.</p>" } },
            "_links": { "webui": "/spaces/ENG/pages/123" }
        }))
        .unwrap();

        let candidate = to_candidate(page, "https://acme.atlassian.net/wiki/", "release");
        assert_eq!(candidate.title, "Release process");
        assert_eq!(candidate.content, "Tag the release & deploy.");
        assert_eq!(
            candidate.url,
            "https://acme.atlassian.net/wiki/spaces/ENG/pages/123"
        );
        assert_eq!(candidate.source, Source::Confluence);
    }

    #[test]
    fn test_page_without_links_or_body() {
        let page: Page = serde_json::from_value(serde_json::json!({ "title": "" })).unwrap();
        let candidate = to_candidate(page, "https://acme.atlassian.net/wiki", "x");
        assert_eq!(candidate.title, "Untitled page");
        assert_eq!(candidate.content, "Untitled page");
        assert_eq!(candidate.url, "https://acme.atlassian.net/wiki");
    }

    #[test]
    fn test_long_page_is_trimmed_to_budget() {
        let body = format!("<p>{}</p>", "Background paragraph without the term. ".repeat(80));
        let page: Page = serde_json::from_value(serde_json::json!({
            "title": "Handbook",
            "body": { "view": { "value": body } }
        }))
        .unwrap();
        let candidate = to_candidate(page, "https://w", "handbook");
        assert!(candidate.content.len() <= Source::Confluence.char_budget());
    }
}
