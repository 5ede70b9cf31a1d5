//! Mock mail transport for testing and capture mode

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::info;

use crate::errors::EmailError;
use crate::transport::{MailTransport, OutgoingEmail};

/// Mail transport that records messages instead of sending them.
///
/// Doubles as the capture-mode transport when no SMTP relay is
/// configured, and as the failure-injection harness for delivery tests.
#[derive(Debug, Clone, Default)]
pub struct MockMailTransport {
    /// Counter for tracking send calls
    send_count: Arc<AtomicUsize>,
    /// Messages accepted by the transport
    sent: Arc<Mutex<Vec<OutgoingEmail>>>,
    /// Fail every send unconditionally
    always_fail: bool,
    /// Fail the first N sends, then succeed
    fail_first: Arc<AtomicUsize>,
}

impl MockMailTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send fails with a transport error
    pub fn with_send_failure(mut self) -> Self {
        self.always_fail = true;
        self
    }

    /// The first `n` sends fail, subsequent sends succeed
    pub fn failing_first(self, n: usize) -> Self {
        self.fail_first.store(n, Ordering::SeqCst);
        self
    }

    pub fn send_call_count(&self) -> usize {
        self.send_count.load(Ordering::SeqCst)
    }

    pub fn sent_emails(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for MockMailTransport {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        self.send_count.fetch_add(1, Ordering::SeqCst);

        if self.always_fail {
            return Err(EmailError::Transport(
                "Mock transport failure".to_string(),
            ));
        }

        let remaining = self.fail_first.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_first.store(remaining - 1, Ordering::SeqCst);
            return Err(EmailError::Transport(format!(
                "Mock transport failure ({} more to go)",
                remaining - 1
            )));
        }

        info!(
            "Captured email to {} (subject: {})",
            email.to_email, email.subject
        );
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            to_email: "staff@example.com".to_string(),
            to_name: None,
            from_email: "noreply@example.com".to_string(),
            from_name: None,
            subject: "hello".to_string(),
            body_html: "<p>hello</p>".to_string(),
            body_text: Some("hello".to_string()),
        }
    }

    #[tokio::test]
    async fn test_successful_send_is_recorded() {
        let transport = MockMailTransport::new();
        transport.send(&email()).await.unwrap();

        assert_eq!(transport.send_call_count(), 1);
        assert_eq!(transport.sent_emails().len(), 1);
        assert_eq!(transport.sent_emails()[0].subject, "hello");
    }

    #[tokio::test]
    async fn test_always_fail() {
        let transport = MockMailTransport::new().with_send_failure();
        assert!(transport.send(&email()).await.is_err());
        assert!(transport.send(&email()).await.is_err());
        assert_eq!(transport.send_call_count(), 2);
        assert!(transport.sent_emails().is_empty());
    }

    #[tokio::test]
    async fn test_failing_first_n_then_succeeding() {
        let transport = MockMailTransport::new().failing_first(2);

        assert!(transport.send(&email()).await.is_err());
        assert!(transport.send(&email()).await.is_err());
        assert!(transport.send(&email()).await.is_ok());
        assert_eq!(transport.send_call_count(), 3);
        assert_eq!(transport.sent_emails().len(), 1);
    }
}
