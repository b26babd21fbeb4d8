//! Resolution of image/audio/video references into provider content parts.
//!
//! A reference is one of: a `data:` URI (decoded locally, never fetched), a URI already
//! inside the provider's hosted-file namespace (passed through as a file reference), or any
//! other URL (fetched). Fetched images and audio are inlined as base64; fetched video goes
//! through the Files API and comes back as a file reference.

use crate::config::ProxyConfig;
use crate::context::RequestContext;
use crate::error::{ProxyError, Result};
use crate::files::FileManager;
use crate::translate::gemini_types::{Blob, FileData, Part};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::future::Future;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Audio,
    Video,
}

impl MediaKind {
    /// MIME type attached to parts of this kind.
    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Image => "image/png",
            Self::Audio => "audio/mp3",
            Self::Video => "video/mp4",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }

    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Image => ".png",
            Self::Audio => ".mp3",
            Self::Video => ".mp4",
        }
    }

    /// Classify by the major type of a `Content-Type`; anything not image or video is audio.
    #[must_use]
    pub fn from_content_type(content_type: &str) -> Self {
        match content_type.split('/').next().map(str::trim) {
            Some(major) if major.eq_ignore_ascii_case("image") => Self::Image,
            Some(major) if major.eq_ignore_ascii_case("video") => Self::Video,
            _ => Self::Audio,
        }
    }
}

/// A media reference after resolution, ready to be sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedPart {
    Inline { data: String, mime_type: String },
    FileRef { uri: String, mime_type: String },
}

impl From<ResolvedPart> for Part {
    fn from(resolved: ResolvedPart) -> Self {
        match resolved {
            ResolvedPart::Inline { data, mime_type } => Part::InlineData {
                inline_data: Blob { mime_type, data },
            },
            ResolvedPart::FileRef { uri, mime_type } => Part::FileData {
                file_data: FileData {
                    mime_type,
                    file_uri: uri,
                },
            },
        }
    }
}

/// Turns a media reference into a [`ResolvedPart`].
pub trait ResolveMedia {
    fn resolve(
        &self,
        ctx: &RequestContext,
        reference: &str,
        kind: MediaKind,
    ) -> impl Future<Output = Result<ResolvedPart>> + Send;
}

#[derive(Debug, Clone)]
pub struct MediaResolver {
    client: reqwest::Client,
    files: FileManager,
    hosted_prefix: String,
}

impl MediaResolver {
    pub fn new(config: &ProxyConfig, client: reqwest::Client) -> Self {
        Self {
            files: FileManager::new(config, client.clone()),
            client,
            hosted_prefix: config.hosted_files_prefix(),
        }
    }

    pub fn files(&self) -> &FileManager {
        &self.files
    }

    /// Whether `reference` already names a file hosted by the provider.
    pub fn is_hosted(&self, reference: &str) -> bool {
        reference.starts_with(&self.hosted_prefix)
    }

    /// GET a remote asset, failing on non-success statuses.
    pub async fn fetch(&self, url: &str) -> Result<reqwest::Response> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProxyError::media(format!(
                "fetching {url} returned status {status}"
            )));
        }
        Ok(response)
    }
}

impl ResolveMedia for MediaResolver {
    async fn resolve(
        &self,
        ctx: &RequestContext,
        reference: &str,
        kind: MediaKind,
    ) -> Result<ResolvedPart> {
        let mime_type = kind.mime_type().to_string();

        if reference.starts_with("data:") {
            let data = data_uri_payload(reference)?;
            return Ok(ResolvedPart::Inline {
                data: data.to_string(),
                mime_type,
            });
        }

        if self.is_hosted(reference) {
            return Ok(ResolvedPart::FileRef {
                uri: reference.to_string(),
                mime_type,
            });
        }

        match kind {
            MediaKind::Image | MediaKind::Audio => {
                let bytes = self.fetch(reference).await?.bytes().await?;
                debug!(
                    request_id = %ctx.request_id,
                    kind = kind.as_str(),
                    bytes = bytes.len(),
                    "Inlining remote media"
                );
                Ok(ResolvedPart::Inline {
                    data: STANDARD.encode(&bytes),
                    mime_type,
                })
            }
            MediaKind::Video => {
                let response = self.fetch(reference).await?;
                let file = self
                    .files
                    .stage_and_upload(ctx, response, &mime_type, kind)
                    .await?;
                Ok(ResolvedPart::FileRef {
                    uri: file.uri,
                    mime_type,
                })
            }
        }
    }
}

/// The base64 payload of a `data:<mime>;base64,<payload>` URI.
pub fn data_uri_payload(reference: &str) -> Result<&str> {
    reference
        .split_once("base64,")
        .map(|(_, payload)| payload)
        .ok_or_else(|| ProxyError::media("data URI is not base64-encoded"))
}
