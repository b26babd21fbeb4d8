//! Type definitions for the [OpenAI Chat Completions API](https://platform.openai.com/docs/api-reference/chat).
//!
//! These types represent what clients send us and the envelopes we send back,
//! including streaming chunks. Only the fields the proxy acts on are modelled;
//! anything else a client sends is ignored.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Request types (what clients send TO the proxy)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

impl ChatCompletionRequest {
    pub fn is_streaming(&self) -> bool {
        self.stream.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ChatContent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: MediaUrl },
    #[serde(rename = "audio_url")]
    AudioUrl { audio_url: MediaUrl },
    #[serde(rename = "video_url")]
    VideoUrl { video_url: MediaUrl },
    /// Any part type the proxy does not know how to translate.
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaUrl {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

// ---------------------------------------------------------------------------
// Response types (what the proxy sends back)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<Choice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<ChatUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub index: u64,
    pub message: ChoiceMessage,
    pub finish_reason: String,
    /// Always serialised, always `null`.
    pub logprobs: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

// ---------------------------------------------------------------------------
// Streaming chunk types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkChoice {
    pub index: u64,
    pub delta: ChunkDelta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_and_part_content_both_parse() {
        let req: ChatCompletionRequest = serde_json::from_value(serde_json::json!({
            "model": "gpt-4o",
            "messages": [
                {"role": "system", "content": "be terse"},
                {"role": "user", "content": [
                    {"type": "text", "text": "what is this"},
                    {"type": "image_url", "image_url": {"url": "https://example.com/cat.png", "detail": "high"}},
                    {"type": "video_url", "video_url": {"url": "https://example.com/clip.mp4"}}
                ]}
            ],
            "temperature": 0.2
        }))
        .unwrap();

        assert!(!req.is_streaming());
        assert!(matches!(req.messages[0].content, Some(ChatContent::Text(_))));
        let Some(ChatContent::Parts(parts)) = &req.messages[1].content else {
            panic!("expected parts");
        };
        assert_eq!(parts.len(), 3);
        assert!(matches!(parts[2], ContentPart::VideoUrl { .. }));
    }

    #[test]
    fn test_unknown_part_type_parses_as_unsupported() {
        let parts: Vec<ContentPart> = serde_json::from_value(serde_json::json!([
            {"type": "input_audio", "input_audio": {"data": "AAA", "format": "wav"}},
            {"type": "text", "text": "hi"}
        ]))
        .unwrap();
        assert!(matches!(parts[0], ContentPart::Unsupported));
        assert!(matches!(parts[1], ContentPart::Text { .. }));
    }

    #[test]
    fn test_choice_serialises_null_logprobs() {
        let choice = Choice {
            index: 0,
            message: ChoiceMessage {
                role: "model".to_string(),
                content: "hi".to_string(),
            },
            finish_reason: "stop".to_string(),
            logprobs: None,
        };
        let json = serde_json::to_value(&choice).unwrap();
        assert!(json.get("logprobs").unwrap().is_null());
    }
}
