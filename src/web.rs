//! HTTP transport for operation calls. Requests arriving here are on the
//! `rest` channel; the `x-e2e-encrypted` header marks end-to-end encrypted
//! payloads.
use crate::authz::protocol::CHANNEL_REST;
use crate::authz::{AuthzFailure, Payload, RequestContext, RulesMiddleware};
use crate::errors::GateError;
use crate::settings::Settings;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use miette::IntoDiagnostic;
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;

pub const ENCRYPTED_HEADER: &str = "x-e2e-encrypted";

#[derive(Clone)]
pub struct AppState {
    pub rules: Arc<RulesMiddleware<DatabaseConnection>>,
}

#[derive(Debug, Deserialize)]
pub struct CallRequest {
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub process: Option<String>,
    #[serde(default)]
    pub body: Value,
}

async fn security_headers(request: Request<Body>, next: Next) -> impl IntoResponse {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        HeaderName::from_static("cache-control"),
        HeaderValue::from_static("no-store"),
    );

    response
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/call", post(call_operation))
        .route("/healthz", get(health))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

pub async fn serve(settings: Settings, rules: RulesMiddleware<DatabaseConnection>) -> miette::Result<()> {
    let state = AppState {
        rules: Arc::new(rules),
    };

    let addr: SocketAddr = settings
        .bind_address()
        .parse()
        .map_err(|e| miette::miette!("bad listen addr: {e}"))?;

    let listener = tokio::net::TcpListener::bind(addr).await.into_diagnostic()?;
    tracing::info!(%addr, operations = state.rules.operations().len(), "Listening for operation calls");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .into_diagnostic()?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}

pub fn is_encrypted(headers: &HeaderMap) -> bool {
    headers
        .get(ENCRYPTED_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().eq_ignore_ascii_case("true") || v.trim() == "1")
        .unwrap_or(false)
}

pub fn failure_status(failure: AuthzFailure) -> StatusCode {
    if failure.is_malformed() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::FORBIDDEN
    }
}

pub fn error_status(error: &GateError) -> StatusCode {
    match error {
        GateError::NotFound(_) => StatusCode::NOT_FOUND,
        GateError::BadRequest(_) | GateError::Serde(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn call_operation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CallRequest>,
) -> Response {
    let ctx = RequestContext {
        channel: CHANNEL_REST.to_string(),
        encrypted: is_encrypted(&headers),
        payload: Some(Payload {
            sender: req.sender,
            process: req.process,
            body: req.body,
            error: None,
        }),
    };

    let ctx = state.rules.authorize(ctx).await;
    if let Some(failure) = ctx.failure() {
        return (failure_status(failure), Json(json!({ "error": failure }))).into_response();
    }

    let Some((operation, body)) = ctx
        .payload
        .and_then(|p| p.process.map(|process| (process, p.body)))
    else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": AuthzFailure::MissingOperation })),
        )
            .into_response();
    };

    let Some(handler) = state.rules.operations().get(&operation) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("unknown operation `{operation}`") })),
        )
            .into_response();
    };

    match handler.call(body).await {
        Ok(result) => Json(json!({ "result": result })).into_response(),
        Err(e) => {
            let status = error_status(&e);
            if status.is_server_error() {
                tracing::error!(%operation, error = %e, "Operation failed");
            }
            (status, Json(json!({ "error": e.to_string() }))).into_response()
        }
    }
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
