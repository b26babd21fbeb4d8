//! API translation between `OpenAI` Chat Completions and Gemini formats.
//!
//! The core of the proxy: converts requests, responses, and streaming chunks
//! between the two API formats. Only request translation performs I/O, through
//! the media resolver it is handed.

pub mod gemini_types;
pub mod openai_types;
pub mod request;
pub mod response;
pub mod streaming;
