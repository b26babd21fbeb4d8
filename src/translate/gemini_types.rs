//! Type definitions for the [Gemini API](https://ai.google.dev/api) (`v1beta`).
//!
//! Covers `generateContent` / `streamGenerateContent` payloads and the `files` resource
//! used for asynchronous media upload.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Request types (what we send TO the provider)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

/// Variant order matters for `#[serde(untagged)]` decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
    FileData {
        #[serde(rename = "fileData")]
        file_data: FileData,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    pub mime_type: String,
    pub file_uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

const HARM_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
    "HARM_CATEGORY_HARASSMENT",
];

impl SafetySetting {
    /// Disable blocking for every harm category the API filters on.
    #[must_use]
    pub fn block_none() -> Vec<SafetySetting> {
        HARM_CATEGORIES
            .iter()
            .map(|category| SafetySetting {
                category: (*category).to_string(),
                threshold: "BLOCK_NONE".to_string(),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Response types (what we receive FROM the provider)
// ---------------------------------------------------------------------------

/// Body of `generateContent`, and of every SSE event of `streamGenerateContent`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<PromptFeedback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<CandidateContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

/// Response parts can be text, thoughts, function calls and more; only text is read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponsePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u64,
    #[serde(default)]
    pub candidates_token_count: u64,
    #[serde(default)]
    pub total_token_count: u64,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, skipping thought parts.
    #[must_use]
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter(|p| p.thought != Some(true))
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    /// The reason the prompt was blocked, if the provider refused it outright.
    pub fn block_reason(&self) -> Option<&str> {
        if !self.candidates.is_empty() {
            return None;
        }
        self.prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Files API
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadStartRequest {
    pub file: UploadStartFile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadStartFile {
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadFileResponse {
    pub file: GeminiFile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiFile {
    /// Resource name, e.g. `files/abc-123`.
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    pub uri: String,
    /// `PROCESSING`, `ACTIVE`, `FAILED` or `STATE_UNSPECIFIED`.
    #[serde(default)]
    pub state: String,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiErrorResponse {
    pub error: GeminiError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiError {
    #[serde(default)]
    pub code: u16,
    pub message: String,
    #[serde(default)]
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parts_serialise_in_provider_shape() {
        let parts = vec![
            Part::Text {
                text: "hi".to_string(),
            },
            Part::InlineData {
                inline_data: Blob {
                    mime_type: "image/png".to_string(),
                    data: "AAAA".to_string(),
                },
            },
            Part::FileData {
                file_data: FileData {
                    mime_type: "video/mp4".to_string(),
                    file_uri: "https://generativelanguage.googleapis.com/v1beta/files/x".to_string(),
                },
            },
        ];
        let json = serde_json::to_value(&parts).unwrap();
        assert_eq!(json[0], serde_json::json!({"text": "hi"}));
        assert_eq!(
            json[1],
            serde_json::json!({"inlineData": {"mimeType": "image/png", "data": "AAAA"}})
        );
        assert_eq!(json[2]["fileData"]["fileUri"], "https://generativelanguage.googleapis.com/v1beta/files/x");
    }

    #[test]
    fn test_request_uses_camel_case_safety_settings() {
        let req = GenerateContentRequest {
            contents: vec![],
            safety_settings: SafetySetting::block_none(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["safetySettings"].as_array().unwrap().len(), 4);
        assert_eq!(json["safetySettings"][0]["threshold"], "BLOCK_NONE");
    }

    #[test]
    fn test_response_text_skips_thoughts_and_non_text_parts() {
        let resp: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "thinking...", "thought": true},
                    {"text": "Hello, "},
                    {"functionCall": {"name": "f", "args": {}}},
                    {"text": "world"}
                ]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 3, "candidatesTokenCount": 2, "totalTokenCount": 5}
        }))
        .unwrap();
        assert_eq!(resp.text(), "Hello, world");
        assert_eq!(resp.usage_metadata.unwrap().total_token_count, 5);
    }

    #[test]
    fn test_block_reason_only_without_candidates() {
        let resp: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();
        assert_eq!(resp.block_reason(), Some("SAFETY"));
        assert_eq!(resp.text(), "");
    }

    #[test]
    fn test_file_object_parses() {
        let resp: UploadFileResponse = serde_json::from_value(serde_json::json!({
            "file": {
                "name": "files/abc",
                "displayName": "clip",
                "mimeType": "video/mp4",
                "sizeBytes": "1024",
                "uri": "https://generativelanguage.googleapis.com/v1beta/files/abc",
                "state": "PROCESSING"
            }
        }))
        .unwrap();
        assert_eq!(resp.file.name, "files/abc");
        assert_eq!(resp.file.state, "PROCESSING");
    }
}
