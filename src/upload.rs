//! Staging of a remote asset into the provider's file store, for `POST /v1/filemanager/upload`.

use crate::context::RequestContext;
use crate::error::{ProxyError, Result};
use crate::media::{MediaKind, MediaResolver};

use reqwest::header::CONTENT_TYPE;
use tracing::info;

/// Body of `POST /v1/filemanager/upload`.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct UploadRequest {
    pub url: String,
}

/// Fetch `url`, upload it to the provider and wait until it is ACTIVE.
/// Returns the durable file URI.
pub async fn upload_from_url(
    resolver: &MediaResolver,
    ctx: &RequestContext,
    url: &str,
) -> Result<String> {
    let response = resolver.fetch(url).await?;

    let mime_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ProxyError::media(format!("{url} did not report a content type")))?
        .to_string();
    let kind = MediaKind::from_content_type(&mime_type);

    info!(
        request_id = %ctx.request_id,
        kind = kind.as_str(),
        mime_type = %mime_type,
        "Uploading remote asset"
    );

    let file = resolver
        .files()
        .stage_and_upload(ctx, response, &mime_type, kind)
        .await?;
    Ok(file.uri)
}
