//! Single-attempt delivery processing with bounded retry scheduling

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::errors::EmailError;
use crate::services::queue_service::EmailQueueService;
use crate::transport::{MailTransport, OutgoingEmail};

/// Attempt budget for general queued mail
pub const DEFAULT_MAX_ATTEMPTS: i32 = 5;

/// Sender used when a queue row carries no explicit from address
const FALLBACK_FROM_EMAIL: &str = "mailroom@localhost";

// Ascending delay schedules indexed by the number of attempts already
// made. Rows with a 3-attempt budget use the short schedule
// (1min, 5min, 15min); everything else uses the general one
// (1min, 5min, 15min, 1hr, 6hr).
const SHORT_BACKOFF_SECONDS: [u64; 3] = [60, 300, 900];
const GENERAL_BACKOFF_SECONDS: [u64; 5] = [60, 300, 900, 3600, 21600];

/// Fixed retry delay schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffSchedule {
    delays: &'static [u64],
}

impl BackoffSchedule {
    pub fn general() -> Self {
        Self {
            delays: &GENERAL_BACKOFF_SECONDS,
        }
    }

    pub fn short() -> Self {
        Self {
            delays: &SHORT_BACKOFF_SECONDS,
        }
    }

    /// Pick the schedule matching a row's attempt budget
    pub fn for_max_attempts(max_attempts: i32) -> Self {
        if max_attempts <= SHORT_BACKOFF_SECONDS.len() as i32 {
            Self::short()
        } else {
            Self::general()
        }
    }

    /// Delay before the next attempt, given the number of attempts
    /// already made (1-based). Clamps to the last entry so a row with a
    /// larger budget than the schedule still backs off.
    pub fn delay_after_attempt(&self, attempts_made: i32) -> Duration {
        let index = (attempts_made.max(1) as usize - 1).min(self.delays.len() - 1);
        Duration::from_secs(self.delays[index])
    }
}

/// Outcome of processing one queue row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Message accepted by the transport; row is terminally sent
    Sent,
    /// Row was not eligible (already claimed, terminal, or not yet due)
    Skipped,
    /// Attempt failed; another attempt should be scheduled after `delay`
    Retry { attempts_made: i32, delay: Duration },
    /// Attempt failed and the attempt budget is exhausted
    PermanentlyFailed { attempts_made: i32 },
}

/// Processes one email queue row to completion or failure
pub struct DeliveryService {
    queue_service: Arc<EmailQueueService>,
    transport: Arc<dyn MailTransport>,
    send_timeout_secs: u64,
}

impl DeliveryService {
    pub fn new(
        queue_service: Arc<EmailQueueService>,
        transport: Arc<dyn MailTransport>,
        send_timeout_secs: u64,
    ) -> Self {
        Self {
            queue_service,
            transport,
            send_timeout_secs,
        }
    }

    /// Run one delivery attempt for the given queue row.
    ///
    /// Claims the row first; a row another worker already owns is
    /// skipped, which is what makes concurrent workers safe.
    pub async fn process(&self, email_queue_id: i32) -> Result<DeliveryOutcome, EmailError> {
        let row = match self.queue_service.claim(email_queue_id).await? {
            Some(row) => row,
            None => {
                debug!(
                    "Email {} not eligible for delivery, skipping",
                    email_queue_id
                );
                return Ok(DeliveryOutcome::Skipped);
            }
        };

        let email = OutgoingEmail {
            to_email: row.to_email.clone(),
            to_name: row.to_name.clone(),
            from_email: row
                .from_email
                .clone()
                .unwrap_or_else(|| FALLBACK_FROM_EMAIL.to_string()),
            from_name: row.from_name.clone(),
            subject: row.subject.clone(),
            body_html: row.body_html.clone(),
            body_text: row.body_text.clone(),
        };

        let send_result = match tokio::time::timeout(
            Duration::from_secs(self.send_timeout_secs),
            self.transport.send(&email),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(EmailError::Timeout(self.send_timeout_secs)),
        };

        match send_result {
            Ok(()) => {
                let sent = self.queue_service.mark_sent(row).await?;
                info!(
                    "Email sent successfully, queue_id: {}, to: {}",
                    sent.id, sent.to_email
                );
                Ok(DeliveryOutcome::Sent)
            }
            Err(e) => {
                let failed = self.queue_service.mark_failed(row, &e.to_string()).await?;
                error!(
                    "Email failed to send, queue_id: {}, to: {}, attempt: {}, error: {}",
                    failed.id, failed.to_email, failed.attempts, e
                );

                if failed.can_retry() {
                    let delay = BackoffSchedule::for_max_attempts(failed.max_attempts)
                        .delay_after_attempt(failed.attempts);
                    Ok(DeliveryOutcome::Retry {
                        attempts_made: failed.attempts,
                        delay,
                    })
                } else {
                    error!(
                        permanent = true,
                        "Email permanently failed after all retries, queue_id: {}, to: {}, attempts: {}",
                        failed.id,
                        failed.to_email,
                        failed.attempts
                    );
                    Ok(DeliveryOutcome::PermanentlyFailed {
                        attempts_made: failed.attempts,
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::queue_service::NewQueuedEmail;
    use crate::transport::MockMailTransport;
    use mailroom_core::SystemClock;
    use mailroom_database::test_utils::TestDatabase;

    fn request(max_attempts: i32) -> NewQueuedEmail {
        NewQueuedEmail {
            to_email: "staff@example.com".to_string(),
            to_name: None,
            from_email: Some("noreply@example.com".to_string()),
            from_name: None,
            subject: "New contact submission".to_string(),
            body_html: "<p>body</p>".to_string(),
            body_text: Some("body".to_string()),
            contact_submission_id: None,
            max_attempts: Some(max_attempts),
            scheduled_at: None,
        }
    }

    async fn setup(
        transport: MockMailTransport,
    ) -> (TestDatabase, Arc<EmailQueueService>, DeliveryService) {
        let db = TestDatabase::with_migrations().await.unwrap();
        let queue_service = Arc::new(EmailQueueService::new(db.db.clone(), Arc::new(SystemClock)));
        let delivery = DeliveryService::new(queue_service.clone(), Arc::new(transport), 30);
        (db, queue_service, delivery)
    }

    #[test]
    fn test_general_backoff_schedule_values() {
        let schedule = BackoffSchedule::general();
        assert_eq!(schedule.delay_after_attempt(1), Duration::from_secs(60));
        assert_eq!(schedule.delay_after_attempt(2), Duration::from_secs(300));
        assert_eq!(schedule.delay_after_attempt(3), Duration::from_secs(900));
        assert_eq!(schedule.delay_after_attempt(4), Duration::from_secs(3600));
        assert_eq!(schedule.delay_after_attempt(5), Duration::from_secs(21600));
    }

    #[test]
    fn test_short_backoff_schedule_values() {
        let schedule = BackoffSchedule::short();
        assert_eq!(schedule.delay_after_attempt(1), Duration::from_secs(60));
        assert_eq!(schedule.delay_after_attempt(2), Duration::from_secs(300));
        assert_eq!(schedule.delay_after_attempt(3), Duration::from_secs(900));
    }

    #[test]
    fn test_schedule_selection_by_attempt_budget() {
        assert_eq!(BackoffSchedule::for_max_attempts(3), BackoffSchedule::short());
        assert_eq!(
            BackoffSchedule::for_max_attempts(5),
            BackoffSchedule::general()
        );
    }

    #[test]
    fn test_backoff_clamps_beyond_schedule() {
        let schedule = BackoffSchedule::short();
        assert_eq!(schedule.delay_after_attempt(9), Duration::from_secs(900));
    }

    #[tokio::test]
    async fn test_successful_delivery_marks_sent() {
        let (_db, queue_service, delivery) = setup(MockMailTransport::new()).await;
        let row = queue_service.enqueue(request(3)).await.unwrap();

        let outcome = delivery.process(row.id).await.unwrap();
        assert_eq!(outcome, DeliveryOutcome::Sent);

        let row = queue_service.get(row.id).await.unwrap();
        assert_eq!(row.status, "sent");
        assert!(row.sent_at.is_some());
    }

    #[tokio::test]
    async fn test_failed_delivery_schedules_retry_with_backoff() {
        let (_db, queue_service, delivery) =
            setup(MockMailTransport::new().with_send_failure()).await;
        let row = queue_service.enqueue(request(3)).await.unwrap();

        let outcome = delivery.process(row.id).await.unwrap();
        assert_eq!(
            outcome,
            DeliveryOutcome::Retry {
                attempts_made: 1,
                delay: Duration::from_secs(60),
            }
        );

        let outcome = delivery.process(row.id).await.unwrap();
        assert_eq!(
            outcome,
            DeliveryOutcome::Retry {
                attempts_made: 2,
                delay: Duration::from_secs(300),
            }
        );
    }

    #[tokio::test]
    async fn test_three_failures_exhaust_a_three_attempt_row() {
        let transport = MockMailTransport::new().with_send_failure();
        let counter = transport.clone();
        let (_db, queue_service, delivery) = setup(transport).await;
        let row = queue_service.enqueue(request(3)).await.unwrap();

        let first = delivery.process(row.id).await.unwrap();
        let second = delivery.process(row.id).await.unwrap();
        let third = delivery.process(row.id).await.unwrap();

        assert!(matches!(first, DeliveryOutcome::Retry { .. }));
        assert!(matches!(second, DeliveryOutcome::Retry { .. }));
        assert_eq!(
            third,
            DeliveryOutcome::PermanentlyFailed { attempts_made: 3 }
        );

        // No fourth attempt: the claim refuses the exhausted row
        let fourth = delivery.process(row.id).await.unwrap();
        assert_eq!(fourth, DeliveryOutcome::Skipped);
        assert_eq!(counter.send_call_count(), 3);

        let row = queue_service.get(row.id).await.unwrap();
        assert_eq!(row.status, "failed");
        assert_eq!(row.attempts, 3);

        // One log row per attempt, all failed
        let logs = queue_service.logs(row.id).await.unwrap();
        assert_eq!(logs.len(), 3);
        assert!(logs.iter().all(|l| l.status == "failed"));
    }

    #[tokio::test]
    async fn test_transient_failure_then_success() {
        let transport = MockMailTransport::new().failing_first(2);
        let counter = transport.clone();
        let (_db, queue_service, delivery) = setup(transport).await;
        let row = queue_service.enqueue(request(5)).await.unwrap();

        assert!(matches!(
            delivery.process(row.id).await.unwrap(),
            DeliveryOutcome::Retry { .. }
        ));
        assert!(matches!(
            delivery.process(row.id).await.unwrap(),
            DeliveryOutcome::Retry { .. }
        ));
        assert_eq!(delivery.process(row.id).await.unwrap(), DeliveryOutcome::Sent);

        assert_eq!(counter.send_call_count(), 3);
        assert_eq!(counter.sent_emails().len(), 1);

        let row = queue_service.get(row.id).await.unwrap();
        assert_eq!(row.status, "sent");
        assert_eq!(row.attempts, 2);

        let logs = queue_service.logs(row.id).await.unwrap();
        assert_eq!(logs.len(), 3);
        assert_eq!(logs.iter().filter(|l| l.status == "failed").count(), 2);
        assert_eq!(logs.iter().filter(|l| l.status == "sent").count(), 1);
    }
}
