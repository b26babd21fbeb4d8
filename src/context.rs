//! Per-request context threaded through every provider-facing call.
//!
//! Each inbound request carries its own provider credential; nothing about it is kept in
//! process-wide state. The cancellation token is tripped when the owning request goes away
//! (see [`RequestContext::cancel_on_drop`]), which stops readiness polling early.

use crate::error::{ProxyError, Result};
use axum::http::{header, HeaderMap};
use std::fmt;
use tokio_util::sync::{CancellationToken, DropGuard};

#[derive(Clone)]
pub struct RequestContext {
    api_key: String,
    pub request_id: String,
    pub cancel: CancellationToken,
}

impl RequestContext {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            request_id: uuid::Uuid::new_v4().simple().to_string(),
            cancel: CancellationToken::new(),
        }
    }

    /// Build a context from `Authorization: Bearer <key>`.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self> {
        let value = headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| ProxyError::credential("Missing Authorization header"))?
            .to_str()
            .map_err(|_| ProxyError::credential("Authorization header is not valid ASCII"))?;

        let key = value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                ProxyError::credential("Authorization header must be 'Bearer <api key>'")
            })?;

        Ok(Self::new(key))
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Returns a guard that cancels this context when dropped. Handlers hold it for as long
    /// as the client is still waiting on them.
    #[must_use]
    pub fn cancel_on_drop(&self) -> DropGuard {
        self.cancel.clone().drop_guard()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("api_key", &"<redacted>")
            .finish()
    }
}
