//! HTTP gateway server.
//!
//! Exposes the query endpoint plus `GET /health` behind an axum
//! router. The query text arrives in the `q` parameter (query string
//! on `GET /query`, form field on `POST /query`) with literal `\n`
//! escapes; an optional `callback` parameter requests JSONP wrapping.
//!
//! The HTTP status is always `200 OK`; success and failure are encoded
//! in the envelope, matching what envelope-aware clients expect.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Form, Query as HttpQuery, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

use crate::gateway::envelope::{self, Envelope};
use crate::livestatus::LivestatusClient;
use crate::query::QueryValidator;
use crate::{AppError, Result};

/// Shared application state for the gateway handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Client holding the backend target and timeouts.
    pub client: LivestatusClient,
    /// Compiled inbound query allow-list.
    pub validator: QueryValidator,
}

/// Request parameters accepted by the query endpoint.
#[derive(Debug, Deserialize)]
struct QueryParams {
    /// Query text with literal `\n` escape sequences.
    q: Option<String>,
    /// Optional JSONP callback name.
    callback: Option<String>,
}

/// Handler for `GET /health` — returns 200 OK with a plain-text body.
///
/// Useful for probing liveness without touching the backend socket.
async fn health() -> &'static str {
    "ok"
}

/// Handler for `GET /query`.
async fn query_get(
    State(state): State<Arc<AppState>>,
    HttpQuery(params): HttpQuery<QueryParams>,
) -> Response {
    respond(&state, params).await
}

/// Handler for `POST /query` with a form body.
async fn query_post(
    State(state): State<Arc<AppState>>,
    Form(params): Form<QueryParams>,
) -> Response {
    respond(&state, params).await
}

/// Validate, execute, and render one query request.
async fn respond(state: &AppState, params: QueryParams) -> Response {
    let span = info_span!("query_request");
    async move {
        let outcome = run_query(state, params.q.as_deref()).await;
        if let Err(ref err) = outcome {
            warn!(%err, "query failed");
        }

        let envelope = Envelope::from_outcome(outcome);
        render_response(&envelope, params.callback.as_deref())
    }
    .instrument(span)
    .await
}

/// Reject, then execute: no socket I/O happens for an invalid query.
async fn run_query(state: &AppState, raw: Option<&str>) -> Result<Value> {
    let raw = raw
        .filter(|text| !text.is_empty())
        .ok_or_else(|| AppError::Validation("no query given in \"q\" parameter".into()))?;

    let query = state.validator.validate(raw)?;
    state.client.execute(&query).await
}

/// Render the envelope as JSON, or JSONP when a valid callback name
/// was supplied. Invalid callback names fall back to plain JSON.
fn render_response(envelope: &Envelope, callback: Option<&str>) -> Response {
    let rendered = envelope.to_json();

    if let Some(name) = callback.filter(|name| !name.is_empty()) {
        if let Some(wrapped) = envelope::wrap_jsonp(name, &rendered) {
            return ([(CONTENT_TYPE, "application/javascript")], wrapped).into_response();
        }
        warn!(callback = name, "ignoring invalid jsonp callback name");
    }

    ([(CONTENT_TYPE, "application/json")], rendered).into_response()
}

/// Start the HTTP gateway on `port`, serving until `ct` is cancelled.
///
/// Binds the loopback interface; external exposure is expected to go
/// through a fronting proxy, as with the original deployment.
///
/// # Errors
///
/// Returns `AppError::Config` if the listener cannot be bound and
/// `AppError::Io` if the server fails while running.
pub async fn serve(state: Arc<AppState>, port: u16, ct: CancellationToken) -> Result<()> {
    let bind = SocketAddr::from(([127, 0, 0, 1], port));

    let router = Router::new()
        .route("/query", get(query_get).post(query_post))
        .route("/health", get(health))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|err| AppError::Config(format!("failed to bind {bind}: {err}")))?;

    info!(%bind, "gateway listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await
        .map_err(|err| AppError::Io(format!("http server failed: {err}")))
}
