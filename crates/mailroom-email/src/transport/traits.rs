//! Mail transport trait definitions

use async_trait::async_trait;

use crate::errors::EmailError;

/// One outbound message, fully rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to_email: String,
    pub to_name: Option<String>,
    pub from_email: String,
    pub from_name: Option<String>,
    pub subject: String,
    pub body_html: String,
    pub body_text: Option<String>,
}

/// Transport capable of sending a single message.
///
/// Implementations may fail for any reason (connection refused, relay
/// rejection, timeout at the socket level); the delivery worker treats
/// every failure as retryable up to the row's attempt budget.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError>;
}
