//! Mail transport abstraction

mod mock;
mod smtp;
mod traits;

pub use mock::MockMailTransport;
pub use smtp::{SmtpConfig, SmtpMailer, TlsMode};
pub use traits::{MailTransport, OutgoingEmail};
