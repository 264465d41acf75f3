//! HTTP API.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/chat` | Answer a query, returning `{response, references}` |
//! | `POST` | `/chat/stream` | Answer a query as server-sent events |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! Every route is also served under `/api`. Errors use the body
//! `{"error": {"code": "bad_request", "message": "..."}}`. All origins are
//! allowed.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::Stream;
use groundwork_core::AppResult;
use groundwork_retrieval::{ChatResponse, ChatService, Source, SourceTokens, StreamEvent};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tower_http::cors::{Any, CorsLayer};
use tracing::Instrument;

/// Events buffered between the pipeline and a slow client.
const EVENT_BUFFER: usize = 32;

#[derive(Clone)]
struct AppState {
    chat: Arc<ChatService>,
}

/// Body of `POST /chat` and `POST /chat/stream`.
#[derive(Debug, Deserialize)]
struct ChatRequest {
    query: String,
    #[serde(default)]
    confluence_token: Option<String>,
    #[serde(default)]
    gmail_token: Option<String>,
    #[serde(default)]
    slack_token: Option<String>,
    /// Restrict the search to these sources
    #[serde(default)]
    sources: Option<SourceSelection>,
}

/// Either a list of source names or the web client's toggle map
/// (`{"confluence": "enabled", "slack": "disabled"}`).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SourceSelection {
    Names(Vec<String>),
    Toggles(HashMap<String, String>),
}

impl SourceSelection {
    fn into_sources(self) -> Result<Vec<Source>, ApiError> {
        let names: Vec<String> = match self {
            SourceSelection::Names(names) => names,
            SourceSelection::Toggles(toggles) => toggles
                .into_iter()
                .filter(|(_, state)| state == "enabled")
                .map(|(name, _)| name)
                .collect(),
        };

        names
            .into_iter()
            .map(|name| {
                Source::parse(&name).ok_or_else(|| bad_request(format!("unknown source: {}", name)))
            })
            .collect()
    }
}

impl ChatRequest {
    fn into_parts(self) -> Result<(String, SourceTokens), ApiError> {
        let query = self.query.trim().to_string();
        if query.is_empty() {
            return Err(bad_request("query must not be empty"));
        }

        let mut tokens = SourceTokens::new();
        for (source, token) in [
            (Source::Confluence, self.confluence_token),
            (Source::Gmail, self.gmail_token),
            (Source::Slack, self.slack_token),
        ] {
            if let Some(token) = token {
                tokens = tokens.with(source, token);
            }
        }

        if let Some(selection) = self.sources {
            tokens = tokens.restrict_to(&selection.into_sources()?);
        }

        Ok((query, tokens))
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct ApiError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> ApiError {
    ApiError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

/// Build the router with every route mounted at the root and under `/api`.
fn router(chat: Arc<ChatService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let routes = Router::new()
        .route("/chat", post(handle_chat))
        .route("/chat/stream", post(handle_chat_stream))
        .route("/health", get(handle_health));

    Router::new()
        .merge(routes.clone())
        .nest("/api", routes)
        .layer(cors)
        .with_state(AppState { chat })
}

/// Serve the API on `listener` until Ctrl-C.
pub async fn serve(listener: TcpListener, chat: ChatService) -> AppResult<()> {
    let app = router(Arc::new(chat));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn handle_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload?;
    let (query, tokens) = request.into_parts()?;

    let span = tracing::info_span!("chat", streaming = false);
    let response = state.chat.answer(&query, &tokens).instrument(span).await;
    Ok(Json(response))
}

/// Stream the answer as `data: {json}` frames.
///
/// The pipeline runs on its own task and feeds a bounded channel. The task
/// is owned by the response stream, so a client that disconnects aborts it
/// along with any in-flight search or generation.
async fn handle_chat_stream(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let Json(request) = payload?;
    let (query, tokens) = request.into_parts()?;

    let (tx, rx) = mpsc::channel::<StreamEvent>(EVENT_BUFFER);
    let chat = Arc::clone(&state.chat);
    let mut pipeline = JoinSet::new();
    let span = tracing::info_span!("chat", streaming = true);
    pipeline.spawn(
        async move {
            let outcome = chat.answer_stream(query, tokens, tx).await;
            tracing::debug!("Stream ended: {:?}", outcome);
            outcome
        }
        .instrument(span),
    );

    let events = futures::stream::unfold((rx, pipeline), |(mut rx, pipeline)| async move {
        let event = rx.recv().await?;
        Some((Ok::<_, Infallible>(to_sse_event(&event)), (rx, pipeline)))
    });

    Ok(Sse::new(events))
}

fn to_sse_event(event: &StreamEvent) -> Event {
    Event::default().json_data(event).unwrap_or_else(|e| {
        tracing::error!("Failed to encode stream event: {}", e);
        Event::default().data(r#"{"type":"error","message":"Failed to encode event"}"#)
    })
}
