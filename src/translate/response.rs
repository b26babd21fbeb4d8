use super::gemini_types::GenerateContentResponse;
use super::openai_types::{ChatCompletionResponse, ChatUsage, Choice, ChoiceMessage};

/// Wrap a Gemini `generateContent` result in an OpenAI chat completion envelope.
/// `original_model` is the model name the client asked for, not the provider model.
pub fn gemini_to_openai(resp: &GenerateContentResponse, original_model: &str) -> ChatCompletionResponse {
    let usage = resp.usage_metadata.as_ref().map(|u| ChatUsage {
        prompt_tokens: u.prompt_token_count,
        completion_tokens: u.candidates_token_count,
        total_tokens: u.total_token_count,
    });

    ChatCompletionResponse {
        id: completion_id(),
        object: "chat.completion".to_string(),
        created: unix_now(),
        model: original_model.to_string(),
        choices: vec![Choice {
            index: 0,
            message: ChoiceMessage {
                role: "model".to_string(),
                content: resp.text(),
            },
            finish_reason: "stop".to_string(),
            logprobs: None,
        }],
        usage,
    }
}

pub fn completion_id() -> String {
    format!("chatcmpl-{}", uuid::Uuid::new_v4().simple())
}

pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
