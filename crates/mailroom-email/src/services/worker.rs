//! Background email worker: queue subscriber plus a periodic sweep

use std::sync::Arc;

use mailroom_core::{Job, JobQueue, SendQueuedEmailJob};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::services::delivery::{DeliveryOutcome, DeliveryService};
use crate::services::queue_service::EmailQueueService;

/// How many ready rows one sweep pass republishes
const SWEEP_BATCH_SIZE: u64 = 100;

/// Email worker driving delivery attempts.
///
/// Two tasks: a subscriber draining delivery jobs from the queue, and a
/// sweep that periodically republishes ready-to-send rows so deferred
/// sends and rows whose wakeup was lost are picked up.
pub struct EmailWorker {
    queue: Arc<dyn JobQueue>,
    delivery: Arc<DeliveryService>,
    queue_service: Arc<EmailQueueService>,
    sweep_interval_secs: u64,
    running: Arc<RwLock<bool>>,
    task_handles: RwLock<Vec<JoinHandle<()>>>,
}

impl EmailWorker {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        delivery: Arc<DeliveryService>,
        queue_service: Arc<EmailQueueService>,
        sweep_interval_secs: u64,
    ) -> Self {
        Self {
            queue,
            delivery,
            queue_service,
            sweep_interval_secs,
            running: Arc::new(RwLock::new(false)),
            task_handles: RwLock::new(Vec::new()),
        }
    }

    /// Start the subscriber and sweep tasks
    pub async fn start(&self) {
        let mut running = self.running.write().await;
        if *running {
            info!("Email worker already running");
            return;
        }
        *running = true;
        drop(running);

        info!("Starting email worker");

        let mut receiver = self.queue.subscribe();
        let delivery = self.delivery.clone();
        let queue = self.queue.clone();
        let running = self.running.clone();

        let listener = tokio::spawn(async move {
            while *running.read().await {
                match receiver.recv().await {
                    Ok(Job::SendQueuedEmail(job)) => {
                        Self::handle_job(&delivery, queue.as_ref(), job).await;
                    }
                    Err(e) => {
                        error!("Failed to receive job from queue: {}", e);
                        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
                    }
                }
            }
            info!("Email worker listener stopped");
        });

        let queue_service = self.queue_service.clone();
        let queue = self.queue.clone();
        let running = self.running.clone();
        let interval = self.sweep_interval_secs;

        let sweeper = tokio::spawn(async move {
            loop {
                tokio::time::sleep(tokio::time::Duration::from_secs(interval)).await;
                if !*running.read().await {
                    break;
                }

                match queue_service.ready_to_send(SWEEP_BATCH_SIZE).await {
                    Ok(rows) => {
                        if !rows.is_empty() {
                            debug!("Sweep found {} ready email(s)", rows.len());
                        }
                        for row in rows {
                            if let Err(e) = queue
                                .send(Job::SendQueuedEmail(SendQueuedEmailJob {
                                    email_queue_id: row.id,
                                }))
                                .await
                            {
                                error!("Failed to republish ready email {}: {}", row.id, e);
                            }
                        }
                    }
                    Err(e) => error!("Sweep failed to query ready emails: {}", e),
                }
            }
            info!("Email worker sweeper stopped");
        });

        let mut handles = self.task_handles.write().await;
        handles.push(listener);
        handles.push(sweeper);

        info!("Email worker started");
    }

    /// Stop both tasks
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
        drop(running);

        for handle in self.task_handles.write().await.drain(..) {
            handle.abort();
        }

        info!("Stopped email worker");
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Process one delivery job; on a retryable failure republish the job
    /// after the backoff delay
    async fn handle_job(
        delivery: &DeliveryService,
        queue: &dyn JobQueue,
        job: SendQueuedEmailJob,
    ) {
        match delivery.process(job.email_queue_id).await {
            Ok(DeliveryOutcome::Retry {
                attempts_made,
                delay,
            }) => {
                debug!(
                    "Scheduling retry for email {} (attempt {} done) in {:?}",
                    job.email_queue_id, attempts_made, delay
                );
                if let Err(e) = queue
                    .send_delayed(Job::SendQueuedEmail(job.clone()), delay)
                    .await
                {
                    error!(
                        "Failed to schedule retry for email {}: {}",
                        job.email_queue_id, e
                    );
                }
            }
            Ok(DeliveryOutcome::Sent)
            | Ok(DeliveryOutcome::Skipped)
            | Ok(DeliveryOutcome::PermanentlyFailed { .. }) => {}
            Err(e) => {
                error!(
                    "Delivery processing error for email {}: {}",
                    job.email_queue_id, e
                );
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
    use mailroom_queue::BroadcastQueue;

    async fn setup(
        transport: MockMailTransport,
    ) -> (
        TestDatabase,
        Arc<dyn JobQueue>,
        Arc<EmailQueueService>,
        Arc<EmailWorker>,
    ) {
        let db = TestDatabase::with_migrations().await.unwrap();
        let queue_service = Arc::new(EmailQueueService::new(db.db.clone(), Arc::new(SystemClock)));
        let delivery = Arc::new(DeliveryService::new(
            queue_service.clone(),
            Arc::new(transport),
            30,
        ));
        let queue: Arc<dyn JobQueue> = Arc::new(BroadcastQueue::new(64));
        let worker = Arc::new(EmailWorker::new(
            queue.clone(),
            delivery,
            queue_service.clone(),
            3600,
        ));
        worker.start().await;
        (db, queue, queue_service, worker)
    }

    fn request() -> NewQueuedEmail {
        NewQueuedEmail {
            to_email: "staff@example.com".to_string(),
            to_name: None,
            from_email: Some("noreply@example.com".to_string()),
            from_name: None,
            subject: "New contact submission".to_string(),
            body_html: "<p>body</p>".to_string(),
            body_text: None,
            contact_submission_id: None,
            max_attempts: Some(3),
            scheduled_at: None,
        }
    }

    async fn wait_for_status(
        queue_service: &EmailQueueService,
        id: i32,
        status: &str,
    ) -> bool {
        for _ in 0..100 {
            let row = queue_service.get(id).await.unwrap();
            if row.status == status {
                return true;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_worker_processes_published_job() {
        let transport = MockMailTransport::new();
        let recorder = transport.clone();
        let (_db, queue, queue_service, worker) = setup(transport).await;

        let row = queue_service.enqueue(request()).await.unwrap();
        queue
            .send(Job::SendQueuedEmail(SendQueuedEmailJob {
                email_queue_id: row.id,
            }))
            .await
            .unwrap();

        assert!(wait_for_status(&queue_service, row.id, "sent").await);
        assert_eq!(recorder.sent_emails().len(), 1);

        worker.stop().await;
    }

    #[tokio::test]
    async fn test_worker_records_failure_and_schedules_retry() {
        let transport = MockMailTransport::new().with_send_failure();
        let (_db, queue, queue_service, worker) = setup(transport).await;

        let row = queue_service.enqueue(request()).await.unwrap();
        queue
            .send(Job::SendQueuedEmail(SendQueuedEmailJob {
                email_queue_id: row.id,
            }))
            .await
            .unwrap();

        assert!(wait_for_status(&queue_service, row.id, "failed").await);
        let row = queue_service.get(row.id).await.unwrap();
        assert_eq!(row.attempts, 1);
        // Retryable: the next attempt rides a delayed job, the row stays
        // failed until it fires
        assert!(row.can_retry());

        worker.stop().await;
    }

    #[tokio::test]
    async fn test_worker_start_is_idempotent() {
        let (_db, _queue, _queue_service, worker) = setup(MockMailTransport::new()).await;
        assert!(worker.is_running().await);
        worker.start().await;
        assert!(worker.is_running().await);
        worker.stop().await;
        assert!(!worker.is_running().await);
    }
}
