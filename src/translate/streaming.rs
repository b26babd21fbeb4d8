//! Translation of Gemini streaming chunks into OpenAI `chat.completion.chunk` frames.
//!
//! The [`StreamTranslator`] turns each provider chunk carrying text into one chunk envelope and, once,
//! the terminating `[DONE]` sentinel. Nothing is emitted after the sentinel.

use super::gemini_types::GenerateContentResponse;
use super::openai_types::{ChatCompletionChunk, ChunkChoice, ChunkDelta};
use super::response::{completion_id, unix_now};

/// Payload of the final SSE frame.
pub const DONE: &str = "[DONE]";

/// Usage:
///   let mut translator = StreamTranslator::new("gpt-4o");
///   for chunk in gemini_chunks {
///       if let Some(frame) = translator.process_chunk(&chunk) {
///           // send frame as `data: <json>`
///       }
///   }
///   let done = translator.finish(); // Some("[DONE]") exactly once
#[derive(Debug)]
pub struct StreamTranslator {
    model: String,
    id: String,
    finished: bool,
}

impl StreamTranslator {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            id: completion_id(),
            finished: false,
        }
    }

    /// One chunk envelope per provider chunk that carries text. Chunks without text (a
    /// trailing usage-only chunk, for one) and anything after [`finish`](Self::finish) yield
    /// `None`.
    pub fn process_chunk(&mut self, chunk: &GenerateContentResponse) -> Option<ChatCompletionChunk> {
        if self.finished {
            return None;
        }

        let text = chunk.text();
        if text.is_empty() {
            return None;
        }

        Some(ChatCompletionChunk {
            id: self.id.clone(),
            object: "chat.completion.chunk".to_string(),
            created: unix_now(),
            model: self.model.clone(),
            choices: vec![ChunkChoice {
                index: 0,
                delta: ChunkDelta {
                    role: Some("assistant".to_string()),
                    content: Some(text),
                },
                finish_reason: None,
            }],
        })
    }

    /// The sentinel payload the first time it is called, `None` afterwards.
    pub fn finish(&mut self) -> Option<&'static str> {
        if self.finished {
            return None;
        }
        self.finished = true;
        Some(DONE)
    }
}
