pub mod config;
pub mod context;
pub mod error;
pub mod files;
pub mod logging;
pub mod media;
pub mod models;
pub mod proxy;
pub mod server;
pub mod translate;
pub mod upload;

pub use config::ProxyConfig;
pub use context::RequestContext;
pub use error::{ProxyError, Result};
pub use logging::SharedLogger;
pub use server::{build_router, AppState};
