//! Contact-submission intake for Mailroom
//!
//! Owns the public contact form pipeline and the moderation surface:
//! - rate/block gate (per-IP window counter plus a durable block list)
//! - weighted spam scoring against configured patterns
//! - transactional persistence with branch effects (block-list
//!   bookkeeping for spam, notification fan-out for legitimate mail)
//! - staff listing, search, status transitions and statistics

pub mod block;
pub mod errors;
pub mod handlers;
pub mod notifier;
pub mod plugin;
pub mod rate_limit;
pub mod service;
pub mod spam;

pub use block::BlockedIpService;
pub use errors::ContactError;
pub use notifier::NotificationDispatcher;
pub use plugin::{ContactConfig, ContactPlugin};
pub use rate_limit::{CounterStore, MemoryCounterStore, RateLimitService, RedisCounterStore};
pub use service::{ContactService, SubmissionFilters, SubmitContactRequest};
pub use spam::{SpamScorer, SubmissionInput};
