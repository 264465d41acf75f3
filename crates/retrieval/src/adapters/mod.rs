//! Source adapters: search one external service with a user's access token
//! and turn its hits into [`Candidate`]s.
//!
//! Adapters are selected by [`Source`] and shared across requests; they hold
//! no per-user state.

pub mod confluence;
pub mod gmail;
pub mod mock;
pub mod slack;

pub use confluence::ConfluenceAdapter;
pub use gmail::GmailAdapter;
pub use mock::StaticAdapter;
pub use slack::SlackAdapter;

use crate::types::{Candidate, Source};
use async_trait::async_trait;
use groundwork_core::config::SourceEndpoints;
use groundwork_core::AppError;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Why a source search failed.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The token was rejected
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The service asked us to slow down
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The request never got a response
    #[error("network error: {0}")]
    Network(String),

    /// The service answered with an error
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The response did not have the expected shape
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The request exceeded its deadline
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl AdapterError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let message = body.into();
        match status {
            401 | 403 => AdapterError::Unauthorized(message),
            429 => AdapterError::RateLimited(message),
            _ => AdapterError::Api { status, message },
        }
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            AdapterError::Decode(e.to_string())
        } else {
            AdapterError::Network(e.to_string())
        }
    }
}

impl From<AdapterError> for AppError {
    fn from(e: AdapterError) -> Self {
        AppError::Adapter(e.to_string())
    }
}

/// Searches one source on behalf of a user.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// The source this adapter searches.
    fn source(&self) -> Source;

    /// Run a search, returning at most `limit` candidates.
    ///
    /// Candidate content is already normalized and trimmed to the source's
    /// character budget.
    async fn search(
        &self,
        access_token: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Candidate>, AdapterError>;
}

/// Build the live adapters for every source, honouring base URL overrides.
pub fn build_adapters(endpoints: &SourceEndpoints) -> Vec<Arc<dyn SourceAdapter>> {
    let client = reqwest::Client::new();

    let confluence = match endpoints.confluence {
        Some(ref base) => ConfluenceAdapter::with_base_url(client.clone(), base),
        None => ConfluenceAdapter::new(client.clone()),
    };
    let gmail = match endpoints.gmail {
        Some(ref base) => GmailAdapter::with_base_url(client.clone(), base),
        None => GmailAdapter::new(client.clone()),
    };
    let slack = match endpoints.slack {
        Some(ref base) => SlackAdapter::with_base_url(client, base),
        None => SlackAdapter::new(client),
    };

    vec![Arc::new(confluence), Arc::new(gmail), Arc::new(slack)]
}

/// Send an authenticated request and decode its JSON body.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    access_token: &str,
) -> Result<T, AdapterError> {
    let response = request.bearer_auth(access_token).send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(AdapterError::from_status(status.as_u16(), body));
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| AdapterError::Decode(e.to_string()))
}

pub(crate) fn trim_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}
