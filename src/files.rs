//! Client for the Gemini Files API.
//!
//! Large media (video, and anything sent to the upload endpoint) is staged to a scratch file,
//! pushed through the resumable upload protocol, then polled until the provider finishes
//! processing it. Each staging operation gets its own uniquely named scratch file, removed
//! when its [`TempPath`] is dropped, so concurrent uploads never share a path.

use crate::config::ProxyConfig;
use crate::context::RequestContext;
use crate::error::{ProxyError, Result};
use crate::media::MediaKind;
use crate::proxy::ensure_success;
use crate::translate::gemini_types::{
    GeminiFile, UploadFileResponse, UploadStartFile, UploadStartRequest,
};

use futures::StreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

/// Lifecycle of one asset upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Uploading,
    Processing,
    Active,
    Failed,
}

impl UploadState {
    /// Map the provider's `File.state` onto the upload lifecycle.
    #[must_use]
    pub fn from_provider(state: &str) -> Self {
        match state {
            "PROCESSING" => Self::Processing,
            "ACTIVE" => Self::Active,
            _ => Self::Failed,
        }
    }
}

/// How often and for how long to wait for an asset to leave `PROCESSING`.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct FileManager {
    client: reqwest::Client,
    base_url: String,
    upload_url: String,
    scratch_dir: PathBuf,
    poll: PollPolicy,
}

impl FileManager {
    pub fn new(config: &ProxyConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: config.base_url().to_string(),
            upload_url: config.provider.upload_url.clone(),
            scratch_dir: config.media.scratch_dir.clone(),
            poll: PollPolicy {
                interval: config.poll_interval(),
                timeout: config.poll_timeout(),
            },
        }
    }

    /// Stage a fetched asset on disk, upload it and wait until the provider reports it ACTIVE.
    /// The scratch file is gone by the time this returns, whatever the outcome.
    pub async fn stage_and_upload(
        &self,
        ctx: &RequestContext,
        response: reqwest::Response,
        mime_type: &str,
        kind: MediaKind,
    ) -> Result<GeminiFile> {
        let scratch = self.stage(response, kind).await?;
        let display_name = scratch
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(kind.as_str())
            .to_string();

        let uploaded = self.upload(ctx, &scratch, mime_type, &display_name).await?;
        let file = self.wait_until_active(ctx, uploaded).await?;

        if let Err(e) = scratch.close() {
            warn!(request_id = %ctx.request_id, error = %e, "Failed to remove scratch file");
        }
        Ok(file)
    }

    /// Stream a response body into a fresh scratch file under the scratch directory.
    pub async fn stage(&self, response: reqwest::Response, kind: MediaKind) -> Result<TempPath> {
        tokio::fs::create_dir_all(&self.scratch_dir).await?;

        let (std_file, path) = tempfile::Builder::new()
            .prefix(&format!("{}-", kind.as_str()))
            .suffix(kind.extension())
            .tempfile_in(&self.scratch_dir)?
            .into_parts();

        let mut file = tokio::fs::File::from_std(std_file);
        let mut body = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            written += chunk.len() as u64;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        debug!(path = %path.display(), bytes = written, "Staged asset");
        Ok(path)
    }

    /// Upload a file with the resumable protocol: one `start` call, one `upload, finalize` call.
    pub async fn upload(
        &self,
        ctx: &RequestContext,
        path: &Path,
        mime_type: &str,
        display_name: &str,
    ) -> Result<GeminiFile> {
        let size = tokio::fs::metadata(path).await?.len();
        debug!(
            request_id = %ctx.request_id,
            state = ?UploadState::Uploading,
            size,
            mime_type,
            "Starting upload"
        );

        let start = self
            .client
            .post(&self.upload_url)
            .header("x-goog-api-key", ctx.api_key())
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", size)
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&UploadStartRequest {
                file: UploadStartFile {
                    display_name: display_name.to_string(),
                },
            })
            .send()
            .await?;
        let start = ensure_success(start).await?;

        let session_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ProxyError::upload("provider did not return an upload session URL"))?
            .to_string();

        let file = tokio::fs::File::open(path).await?;
        let response = self
            .client
            .post(&session_url)
            .header("x-goog-api-key", ctx.api_key())
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header("X-Goog-Upload-Offset", "0")
            .header(CONTENT_LENGTH, size)
            .header(CONTENT_TYPE, mime_type)
            .body(reqwest::Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let uploaded: UploadFileResponse = response.json().await?;
        info!(
            request_id = %ctx.request_id,
            name = %uploaded.file.name,
            state = %uploaded.file.state,
            "Upload finished"
        );
        Ok(uploaded.file)
    }

    /// `files.get` for a resource name such as `files/abc-123`.
    pub async fn get(&self, ctx: &RequestContext, name: &str) -> Result<GeminiFile> {
        let url = format!("{}/{}", self.base_url, name);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", ctx.api_key())
            .send()
            .await?;
        let response = ensure_success(response).await?;
        Ok(response.json().await?)
    }

    /// Poll until the file leaves PROCESSING, the deadline passes, or the request is cancelled.
    pub async fn wait_until_active(
        &self,
        ctx: &RequestContext,
        mut file: GeminiFile,
    ) -> Result<GeminiFile> {
        let deadline = Instant::now() + self.poll.timeout;

        loop {
            match UploadState::from_provider(&file.state) {
                UploadState::Active => return Ok(file),
                UploadState::Failed => {
                    return Err(ProxyError::upload(format!(
                        "file {} ended in state {}",
                        file.name,
                        if file.state.is_empty() { "<none>" } else { &file.state }
                    )));
                }
                UploadState::Processing | UploadState::Uploading => {}
            }

            if Instant::now() >= deadline {
                return Err(ProxyError::Timeout { name: file.name });
            }

            tokio::select! {
                () = ctx.cancel.cancelled() => return Err(ProxyError::Cancelled),
                () = tokio::time::sleep(self.poll.interval) => {}
            }

            file = self.get(ctx, &file.name).await?;
            debug!(request_id = %ctx.request_id, name = %file.name, state = %file.state, "Polled file");
        }
    }
}
