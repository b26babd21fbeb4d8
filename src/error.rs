//! Error types for the proxy.

use axum::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ProxyError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Credential error: {message}")]
    Credential { message: String },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Media error: {message}")]
    Media { message: String },

    #[error("Provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    #[error("Upload error: {message}")]
    Upload { message: String },

    #[error("Timed out waiting for file {name} to become active")]
    Timeout { name: String },

    #[error("Request cancelled")]
    Cancelled,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

impl ProxyError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn credential(msg: impl Into<String>) -> Self {
        Self::Credential {
            message: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest {
            message: msg.into(),
        }
    }

    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media {
            message: msg.into(),
        }
    }

    pub fn provider(status: u16, msg: impl Into<String>) -> Self {
        Self::Provider {
            status,
            message: msg.into(),
        }
    }

    pub fn upload(msg: impl Into<String>) -> Self {
        Self::Upload {
            message: msg.into(),
        }
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Status returned to the client when this error ends a request.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Credential { .. } => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;
