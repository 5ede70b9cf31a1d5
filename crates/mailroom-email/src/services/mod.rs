//! Services for the email delivery subsystem

mod delivery;
mod queue_service;
mod recipient_service;
mod worker;

pub use delivery::{BackoffSchedule, DeliveryOutcome, DeliveryService, DEFAULT_MAX_ATTEMPTS};
pub use queue_service::{
    EmailQueueService, EmailQueueStats, ListQueueOptions, NewQueuedEmail,
};
pub use recipient_service::{NewRecipient, RecipientService, UpdateRecipient};
pub use worker::EmailWorker;
