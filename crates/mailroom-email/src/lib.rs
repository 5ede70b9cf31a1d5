//! Transactional email delivery for Mailroom
//!
//! This crate owns the durable email queue and the async worker that
//! drains it:
//! - mail transport abstraction (SMTP via lettre, capture mode for
//!   environments without an SMTP relay)
//! - queue row lifecycle with an atomic claim so concurrent workers
//!   never double-send
//! - bounded retries on a fixed backoff schedule
//! - append-only delivery log and an ops surface for inspection and
//!   manual resend

pub mod errors;
pub mod handlers;
pub mod plugin;
pub mod services;
pub mod transport;

// Re-export main types
pub use errors::EmailError;
pub use plugin::{EmailConfig, EmailPlugin};
pub use services::{
    BackoffSchedule, DeliveryOutcome, DeliveryService, EmailQueueService, EmailWorker,
    NewQueuedEmail, RecipientService,
};
pub use transport::{MailTransport, MockMailTransport, OutgoingEmail, SmtpConfig, SmtpMailer};
