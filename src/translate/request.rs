//! Translate OpenAI Chat Completions requests into Gemini `generateContent` requests.
//!
//! Messages keep their order. Each content part is translated in place; media parts are
//! resolved through a [`ResolveMedia`] implementation before the request is built, so the
//! provider never sees an unresolved reference. Role `assistant` becomes `model` and role
//! `system` becomes an ordinary `user` turn.

use super::gemini_types::{Content, GenerateContentRequest, Part, SafetySetting};
use super::openai_types::{ChatCompletionRequest, ChatContent, ChatMessage, ContentPart};
use crate::context::RequestContext;
use crate::error::{ProxyError, Result};
use crate::media::{MediaKind, ResolveMedia};

use tracing::warn;

/// Build the provider request body for a chat completion request.
pub async fn openai_to_gemini<R: ResolveMedia + Sync>(
    req: &ChatCompletionRequest,
    ctx: &RequestContext,
    resolver: &R,
    block_none: bool,
) -> Result<GenerateContentRequest> {
    let contents = translate_messages(&req.messages, ctx, resolver).await?;

    let safety_settings = if block_none {
        SafetySetting::block_none()
    } else {
        Vec::new()
    };

    Ok(GenerateContentRequest {
        contents,
        safety_settings,
    })
}

/// Translate the conversation, one provider turn per message, in order.
pub async fn translate_messages<R: ResolveMedia + Sync>(
    messages: &[ChatMessage],
    ctx: &RequestContext,
    resolver: &R,
) -> Result<Vec<Content>> {
    let mut contents = Vec::with_capacity(messages.len());

    for (index, msg) in messages.iter().enumerate() {
        let parts = translate_content(msg.content.as_ref(), ctx, resolver).await?;

        // The provider rejects turns without parts.
        if parts.is_empty() {
            return Err(ProxyError::bad_request(format!(
                "messages[{index}] has no content the provider can accept"
            )));
        }

        contents.push(Content {
            role: map_role(&msg.role).to_string(),
            parts,
        });
    }

    Ok(contents)
}

async fn translate_content<R: ResolveMedia + Sync>(
    content: Option<&ChatContent>,
    ctx: &RequestContext,
    resolver: &R,
) -> Result<Vec<Part>> {
    let items = match content {
        None => return Ok(Vec::new()),
        Some(ChatContent::Text(text)) => return Ok(vec![Part::Text { text: text.clone() }]),
        Some(ChatContent::Parts(items)) => items,
    };

    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        let (url, kind) = match item {
            ContentPart::Text { text } => {
                parts.push(Part::Text { text: text.clone() });
                continue;
            }
            ContentPart::ImageUrl { image_url } => (&image_url.url, MediaKind::Image),
            ContentPart::AudioUrl { audio_url } => (&audio_url.url, MediaKind::Audio),
            ContentPart::VideoUrl { video_url } => (&video_url.url, MediaKind::Video),
            ContentPart::Unsupported => {
                warn!(request_id = %ctx.request_id, "Skipping unsupported content part");
                continue;
            }
        };

        let resolved = resolver.resolve(ctx, url, kind).await?;
        parts.push(resolved.into());
    }

    Ok(parts)
}

/// Map an OpenAI role onto a Gemini role.
#[must_use]
pub fn map_role(role: &str) -> &str {
    match role {
        "assistant" => "model",
        "system" => "user",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::ResolvedPart;
    use crate::translate::openai_types::MediaUrl;
    use std::sync::Mutex;

    /// Records every reference it is asked to resolve; never touches the network.
    #[derive(Default)]
    struct RecordingResolver {
        calls: Mutex<Vec<(String, MediaKind)>>,
    }

    impl ResolveMedia for RecordingResolver {
        async fn resolve(
            &self,
            _ctx: &RequestContext,
            reference: &str,
            kind: MediaKind,
        ) -> Result<ResolvedPart> {
            self.calls
                .lock()
                .unwrap()
                .push((reference.to_string(), kind));
            Ok(ResolvedPart::FileRef {
                uri: format!("resolved:{reference}"),
                mime_type: kind.mime_type().to_string(),
            })
        }
    }

    struct FailingResolver;

    impl ResolveMedia for FailingResolver {
        async fn resolve(
            &self,
            _ctx: &RequestContext,
            _reference: &str,
            _kind: MediaKind,
        ) -> Result<ResolvedPart> {
            Err(ProxyError::media("unreachable host"))
        }
    }

    fn text_message(role: &str, text: &str) -> ChatMessage {
        ChatMessage {
            role: role.to_string(),
            content: Some(ChatContent::Text(text.to_string())),
        }
    }

    fn request(messages: Vec<ChatMessage>) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: "gpt-4o".to_string(),
            messages,
            stream: None,
        }
    }

    #[tokio::test]
    async fn test_simple_text_request() {
        let ctx = RequestContext::new("key");
        let resolver = RecordingResolver::default();
        let req = request(vec![text_message("user", "hi")]);

        let out = openai_to_gemini(&req, &ctx, &resolver, true).await.unwrap();

        assert_eq!(
            out.contents,
            vec![Content {
                role: "user".to_string(),
                parts: vec![Part::Text {
                    text: "hi".to_string()
                }],
            }]
        );
        assert_eq!(out.safety_settings.len(), 4);
        assert!(resolver.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_system_collapses_into_user_turn_in_order() {
        let ctx = RequestContext::new("key");
        let req = request(vec![
            text_message("system", "be terse"),
            text_message("user", "hi"),
            text_message("assistant", "hello"),
        ]);

        let out = openai_to_gemini(&req, &ctx, &RecordingResolver::default(), false)
            .await
            .unwrap();

        let roles: Vec<_> = out.contents.iter().map(|c| c.role.as_str()).collect();
        assert_eq!(roles, ["user", "user", "model"]);
        assert_eq!(
            out.contents[0].parts,
            vec![Part::Text {
                text: "be terse".to_string()
            }]
        );
        assert!(out.safety_settings.is_empty());
    }

    #[tokio::test]
    async fn test_parts_resolved_in_declaration_order() {
        let ctx = RequestContext::new("key");
        let resolver = RecordingResolver::default();
        let media = |url: &str| MediaUrl {
            url: url.to_string(),
            detail: None,
        };
        let req = request(vec![ChatMessage {
            role: "user".to_string(),
            content: Some(ChatContent::Parts(vec![
                ContentPart::Text {
                    text: "describe".to_string(),
                },
                ContentPart::VideoUrl {
                    video_url: media("https://example.com/v.mp4"),
                },
                ContentPart::Unsupported,
                ContentPart::ImageUrl {
                    image_url: media("https://example.com/i.png"),
                },
                ContentPart::AudioUrl {
                    audio_url: media("https://example.com/a.mp3"),
                },
            ])),
        }]);

        let out = openai_to_gemini(&req, &ctx, &resolver, true).await.unwrap();

        let calls = resolver.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                ("https://example.com/v.mp4".to_string(), MediaKind::Video),
                ("https://example.com/i.png".to_string(), MediaKind::Image),
                ("https://example.com/a.mp3".to_string(), MediaKind::Audio),
            ]
        );
        let parts = &out.contents[0].parts;
        assert_eq!(parts.len(), 4);
        assert!(matches!(parts[0], Part::Text { .. }));
        assert!(
            matches!(&parts[1], Part::FileData { file_data } if file_data.mime_type == "video/mp4")
        );
        assert!(
            matches!(&parts[2], Part::FileData { file_data } if file_data.mime_type == "image/png")
        );
    }

    #[tokio::test]
    async fn test_message_with_only_unsupported_parts_is_rejected() {
        let ctx = RequestContext::new("key");
        let req = request(vec![ChatMessage {
            role: "user".to_string(),
            content: Some(ChatContent::Parts(vec![ContentPart::Unsupported])),
        }]);

        let err = openai_to_gemini(&req, &ctx, &RecordingResolver::default(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::BadRequest { .. }));
    }

    #[tokio::test]
    async fn test_resolution_failure_aborts_translation() {
        let ctx = RequestContext::new("key");
        let req = request(vec![ChatMessage {
            role: "user".to_string(),
            content: Some(ChatContent::Parts(vec![ContentPart::ImageUrl {
                image_url: MediaUrl {
                    url: "https://nowhere.invalid/x.png".to_string(),
                    detail: None,
                },
            }])),
        }]);

        let err = openai_to_gemini(&req, &ctx, &FailingResolver, true)
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::Media { .. }));
    }

    #[test]
    fn test_role_mapping() {
        assert_eq!(map_role("assistant"), "model");
        assert_eq!(map_role("system"), "user");
        assert_eq!(map_role("user"), "user");
        assert_eq!(map_role("tool"), "tool");
    }
}
