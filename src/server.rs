use crate::config::ProxyConfig;
use crate::context::RequestContext;
use crate::error::ProxyError;
use crate::logging::{LogLevel, SharedLogger};
use crate::media::MediaResolver;
use crate::models::{model_catalog, ModelList};
use crate::proxy;
use crate::translate::openai_types::ChatCompletionRequest;
use crate::upload::{upload_from_url, UploadRequest};

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use futures::stream::StreamExt;
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Fixed body of every failed upload response.
pub const UPLOAD_FAILED_MESSAGE: &str = "URL is not valid";

#[derive(Clone)]
pub struct AppState {
    pub config: ProxyConfig,
    pub client: reqwest::Client,
    pub resolver: MediaResolver,
    pub logger: SharedLogger,
}

impl AppState {
    pub fn new(config: ProxyConfig, client: reqwest::Client, logger: SharedLogger) -> Self {
        let resolver = MediaResolver::new(&config, client.clone());
        Self {
            config,
            client,
            resolver,
            logger,
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = state.config.body_limit_bytes();

    Router::new()
        .route("/v1/chat/completions", post(handle_chat_completions))
        .route("/v1/models", get(handle_models))
        .route("/v1/filemanager/upload", post(handle_upload))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_chat_completions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let ctx = match RequestContext::from_headers(&headers) {
        Ok(ctx) => ctx,
        Err(e) => return error_response(&state, "chat", None, &e),
    };

    let req: ChatCompletionRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            let err = ProxyError::bad_request(format!("Invalid request body: {e}"));
            return error_response(&state, "chat", Some(&ctx), &err);
        }
    };

    state.logger.request(
        LogLevel::Info,
        "chat",
        &ctx.request_id,
        format!(
            "Request: model={} streaming={} messages={}",
            req.model,
            req.is_streaming(),
            req.messages.len()
        ),
    );

    if req.is_streaming() {
        handle_streaming(&state, &req, &ctx).await
    } else {
        handle_non_streaming(&state, &req, &ctx).await
    }
}

async fn handle_non_streaming(
    state: &AppState,
    req: &ChatCompletionRequest,
    ctx: &RequestContext,
) -> Response {
    // Cancels polling for staged media if the client goes away mid-request.
    let _guard = ctx.cancel_on_drop();

    match proxy::proxy_non_streaming(req, ctx, state).await {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => error_response(state, "chat", Some(ctx), &e),
    }
}

async fn handle_streaming(
    state: &AppState,
    req: &ChatCompletionRequest,
    ctx: &RequestContext,
) -> Response {
    // Owned by the response stream once it exists.
    let guard = ctx.cancel_on_drop();

    let frames = match proxy::proxy_streaming(req, ctx, state, guard).await {
        Ok(s) => s,
        Err(e) => return error_response(state, "chat", Some(ctx), &e),
    };

    let events = frames.map(|data| -> Result<Event, Infallible> { Ok(Event::default().data(data)) });

    Sse::new(events).into_response()
}

async fn handle_upload(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let ctx = match RequestContext::from_headers(&headers) {
        Ok(ctx) => ctx,
        Err(e) => return upload_failed(&state, None, &e),
    };
    let _guard = ctx.cancel_on_drop();

    let result = async {
        let req: UploadRequest = serde_json::from_slice(&body)
            .map_err(|e| ProxyError::bad_request(format!("Invalid upload body: {e}")))?;
        upload_from_url(&state.resolver, &ctx, &req.url).await
    }
    .await;

    match result {
        Ok(uri) => {
            state.logger.request(
                LogLevel::Info,
                "upload",
                &ctx.request_id,
                format!("Uploaded {uri}"),
            );
            uri.into_response()
        }
        Err(e) => upload_failed(&state, Some(&ctx), &e),
    }
}

async fn handle_models() -> Json<ModelList> {
    Json(model_catalog())
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Upload failures are logged in full but answered with a fixed message.
fn upload_failed(state: &AppState, ctx: Option<&RequestContext>, err: &ProxyError) -> Response {
    let request_id = ctx.map_or("-", |c| c.request_id.as_str());
    tracing::error!(request_id, error = %err, "Upload failed");
    state.logger.request(
        LogLevel::Error,
        "upload",
        request_id,
        format!("Upload failed: {err}"),
    );
    (StatusCode::INTERNAL_SERVER_ERROR, UPLOAD_FAILED_MESSAGE).into_response()
}

/// Log a failed request and turn the error into a plain-text response.
fn error_response(
    state: &AppState,
    component: &str,
    ctx: Option<&RequestContext>,
    err: &ProxyError,
) -> Response {
    let request_id = ctx.map_or("-", |c| c.request_id.as_str());
    tracing::error!(request_id, error = %err, "Request failed");
    state.logger.request(
        LogLevel::Error,
        component,
        request_id,
        format!("Request failed: {err}"),
    );
    (err.status_code(), err.to_string()).into_response()
}
