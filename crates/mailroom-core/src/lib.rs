//! Core utilities and types shared across all Mailroom crates

pub mod auth;
pub mod clock;
pub mod jobs;
pub mod plugin;
pub mod problem;
pub mod types;

mod request_metadata;

// Re-export commonly used types
pub use auth::{AdminAuth, AdminToken, RequireAdmin};
pub use clock::{Clock, ManualClock, SystemClock};
pub use jobs::*;
pub use problem::Problem;
pub use request_metadata::{request_metadata_middleware, RequestMetadata};
pub use types::*;

// Re-export external dependencies
pub use anyhow;
pub use async_trait;
pub use chrono;
pub use serde;
pub use serde_json;
pub use thiserror;
pub use tokio;
pub use tracing;
