//! Database entities for Mailroom

pub mod blocked_ips;
pub mod contact_submissions;
pub mod email_logs;
pub mod email_queue;
pub mod email_recipients;
pub mod spam_patterns;
pub mod types;

pub use types::*;
