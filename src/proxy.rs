use crate::context::RequestContext;
use crate::error::{ProxyError, Result};
use crate::logging::LogLevel;
use crate::models::resolve_model;
use crate::server::AppState;
use crate::translate::gemini_types::{
    GeminiErrorResponse, GenerateContentRequest, GenerateContentResponse,
};
use crate::translate::openai_types::{ChatCompletionRequest, ChatCompletionResponse};
use crate::translate::request::openai_to_gemini;
use crate::translate::response::gemini_to_openai;
use crate::translate::streaming::StreamTranslator;

use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};
use std::pin::Pin;
use tokio_util::sync::DropGuard;

/// Outcome of proxying a streaming request: the `data:` payload of each SSE frame.
pub type SseStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// Translate, call `generateContent`, and wrap the result in a chat completion envelope.
pub async fn proxy_non_streaming(
    req: &ChatCompletionRequest,
    ctx: &RequestContext,
    state: &AppState,
) -> Result<ChatCompletionResponse> {
    let body = openai_to_gemini(req, ctx, &state.resolver, state.config.safety.block_none).await?;
    let model = resolve_model(&req.model, &state.config.models);

    state.logger.request(
        LogLevel::Info,
        "proxy",
        &ctx.request_id,
        format!("generateContent model={} turns={}", model, body.contents.len()),
    );

    let response = generate_content(&state.client, state.config.base_url(), ctx, &model, &body).await?;

    if let Some(reason) = response.block_reason() {
        return Err(ProxyError::other(format!(
            "Prompt was blocked by the provider: {reason}"
        )));
    }

    Ok(gemini_to_openai(&response, &req.model))
}

/// Translate and open `streamGenerateContent`, returning the outbound SSE payloads.
/// Errors before the provider stream opens are returned; later ones end the stream early.
/// `guard` is held while media is resolved and then handed to the returned stream.
pub async fn proxy_streaming(
    req: &ChatCompletionRequest,
    ctx: &RequestContext,
    state: &AppState,
    guard: DropGuard,
) -> Result<SseStream> {
    let body = openai_to_gemini(req, ctx, &state.resolver, state.config.safety.block_none).await?;
    let model = resolve_model(&req.model, &state.config.models);

    state.logger.request(
        LogLevel::Info,
        "proxy",
        &ctx.request_id,
        format!("streamGenerateContent model={} turns={}", model, body.contents.len()),
    );

    let chunks =
        stream_generate_content(&state.client, state.config.base_url(), ctx, &model, &body).await?;

    Ok(Box::pin(sse_translate_stream(
        chunks,
        req.model.clone(),
        ctx.request_id.clone(),
        guard,
    )))
}

/// `POST models/{model}:generateContent`
pub async fn generate_content(
    client: &reqwest::Client,
    base_url: &str,
    ctx: &RequestContext,
    model: &str,
    body: &GenerateContentRequest,
) -> Result<GenerateContentResponse> {
    let url = format!("{base_url}/models/{model}:generateContent");
    let response = client
        .post(&url)
        .header("x-goog-api-key", ctx.api_key())
        .json(body)
        .send()
        .await?;
    let response = ensure_success(response).await?;
    Ok(response.json().await?)
}

/// `POST models/{model}:streamGenerateContent?alt=sse`, parsed into provider chunks.
pub async fn stream_generate_content(
    client: &reqwest::Client,
    base_url: &str,
    ctx: &RequestContext,
    model: &str,
    body: &GenerateContentRequest,
) -> Result<impl Stream<Item = Result<GenerateContentResponse>> + Send + 'static> {
    let url = format!("{base_url}/models/{model}:streamGenerateContent?alt=sse");
    let response = client
        .post(&url)
        .header("x-goog-api-key", ctx.api_key())
        .json(body)
        .send()
        .await?;
    let response = ensure_success(response).await?;

    Ok(response
        .bytes_stream()
        .eventsource()
        .filter_map(|event| async move {
            match event {
                Ok(event) if event.data.trim().is_empty() => None,
                Ok(event) => Some(parse_stream_event(&event.data)),
                Err(e) => Some(Err(ProxyError::other(format!("Provider stream error: {e}")))),
            }
        }))
}

/// One `data:` payload of the provider stream. An `{"error": ...}` payload sent after the
/// 200 status becomes a [`ProxyError::Provider`].
fn parse_stream_event(data: &str) -> Result<GenerateContentResponse> {
    if let Ok(err) = serde_json::from_str::<GeminiErrorResponse>(data) {
        return Err(ProxyError::provider(err.error.code, err.error.message));
    }
    Ok(serde_json::from_str(data)?)
}

/// Map provider chunks to chunk envelopes, then exactly one `[DONE]`.
///
/// The stream is pull-driven: a provider chunk is only read once the previous frame has been
/// taken by the HTTP body. Dropping the stream drops the provider response and, through
/// `guard`, cancels the request context.
pub fn sse_translate_stream(
    chunks: impl Stream<Item = Result<GenerateContentResponse>> + Send + 'static,
    model: String,
    request_id: String,
    guard: DropGuard,
) -> impl Stream<Item = String> + Send + 'static {
    async_stream::stream! {
        let _guard = guard;
        let mut translator = StreamTranslator::new(&model);
        let mut frames: usize = 0;

        tokio::pin!(chunks);

        while let Some(chunk) = chunks.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    tracing::error!(request_id = %request_id, error = %e, "Provider stream failed");
                    break;
                }
            };

            if let Some(frame) = translator.process_chunk(&chunk) {
                match serde_json::to_string(&frame) {
                    Ok(json) => {
                        frames += 1;
                        yield json;
                    }
                    Err(e) => tracing::warn!(request_id = %request_id, error = %e, "Dropping unserialisable chunk"),
                }
            }
        }

        if let Some(done) = translator.finish() {
            yield done.to_string();
        }

        tracing::info!(request_id = %request_id, frames, "Stream completed");
    }
}

/// Pass through 2xx responses; turn anything else into [`ProxyError::Provider`].
pub async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<GeminiErrorResponse>(&body) {
        Ok(err) => err.error.message,
        Err(_) => truncate(&body, 500).to_string(),
    };
    Err(ProxyError::provider(status.as_u16(), message))
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
