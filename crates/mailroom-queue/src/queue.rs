use std::time::Duration;

use mailroom_core::async_trait::async_trait;
use mailroom_core::{Job, JobQueue, JobReceiver, QueueError};
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

/// Fan-out job queue over a tokio broadcast channel.
///
/// Every subscriber sees every job. The queue keeps one receiver of its
/// own so the channel survives windows with no subscribed worker; jobs
/// published in such a window reach nobody, which the delivery sweep
/// tolerates by republishing ready rows.
pub struct BroadcastQueue {
    sender: broadcast::Sender<Job>,
    _anchor: broadcast::Receiver<Job>,
}

impl BroadcastQueue {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = broadcast::channel(capacity);
        Self {
            sender,
            _anchor: receiver,
        }
    }
}

struct Subscription {
    inner: broadcast::Receiver<Job>,
}

#[async_trait]
impl JobReceiver for Subscription {
    async fn recv(&mut self) -> Result<Job, QueueError> {
        match self.inner.recv().await {
            Ok(job) => {
                debug!("Job received: {}", job);
                Ok(job)
            }
            Err(broadcast::error::RecvError::Closed) => Err(QueueError::Closed),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Subscriber lagged, {} job(s) skipped", skipped);
                Err(QueueError::Receive(format!(
                    "lagged behind by {} jobs",
                    skipped
                )))
            }
        }
    }
}

#[async_trait]
impl JobQueue for BroadcastQueue {
    async fn send(&self, job: Job) -> Result<(), QueueError> {
        debug!(
            "Publishing {} to {} subscriber(s)",
            job,
            // The anchor receiver never consumes anything
            self.sender.receiver_count().saturating_sub(1)
        );
        self.sender
            .send(job)
            .map_err(|e| QueueError::Send(e.to_string()))?;
        Ok(())
    }

    async fn send_delayed(&self, job: Job, delay: Duration) -> Result<(), QueueError> {
        debug!("Scheduling {} in {:?}", job, delay);
        let sender = self.sender.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if sender.send(job).is_err() {
                error!("Delayed job dropped, queue channel closed");
            }
        });
        Ok(())
    }

    fn subscribe(&self) -> Box<dyn JobReceiver> {
        Box::new(Subscription {
            inner: self.sender.subscribe(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailroom_core::SendQueuedEmailJob;
    use tokio::time::timeout;

    fn job(id: i32) -> Job {
        Job::SendQueuedEmail(SendQueuedEmailJob { email_queue_id: id })
    }

    fn queue_id(job: Job) -> i32 {
        match job {
            Job::SendQueuedEmail(data) => data.email_queue_id,
        }
    }

    #[tokio::test]
    async fn test_subscriber_receives_published_job() {
        let queue = BroadcastQueue::new(8);
        let mut receiver = queue.subscribe();

        queue.send(job(42)).await.unwrap();

        let received = timeout(Duration::from_secs(1), receiver.recv())
            .await
            .expect("timed out")
            .unwrap();
        assert_eq!(queue_id(received), 42);
    }

    #[tokio::test]
    async fn test_every_subscriber_sees_every_job() {
        let queue = BroadcastQueue::new(8);
        let mut first = queue.subscribe();
        let mut second = queue.subscribe();

        queue.send(job(7)).await.unwrap();

        for receiver in [&mut first, &mut second] {
            let received = timeout(Duration::from_secs(1), receiver.recv())
                .await
                .expect("timed out")
                .unwrap();
            assert_eq!(queue_id(received), 7);
        }
    }

    #[tokio::test]
    async fn test_jobs_arrive_in_publish_order() {
        let queue = BroadcastQueue::new(8);
        let mut receiver = queue.subscribe();

        for id in [1, 2, 3] {
            queue.send(job(id)).await.unwrap();
        }

        for expected in [1, 2, 3] {
            assert_eq!(queue_id(receiver.recv().await.unwrap()), expected);
        }
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_jobs() {
        let queue = BroadcastQueue::new(8);

        // Published with no worker attached: kept alive by the anchor,
        // visible to nobody
        queue.send(job(1)).await.unwrap();

        let mut late = queue.subscribe();
        queue.send(job(2)).await.unwrap();

        let received = timeout(Duration::from_secs(1), late.recv())
            .await
            .expect("timed out")
            .unwrap();
        assert_eq!(queue_id(received), 2);

        let nothing = timeout(Duration::from_millis(100), late.recv()).await;
        assert!(nothing.is_err(), "no further jobs expected");
    }

    #[tokio::test]
    async fn test_send_delayed_holds_back_delivery() {
        let queue = BroadcastQueue::new(8);
        let mut receiver = queue.subscribe();

        queue
            .send_delayed(job(9), Duration::from_millis(50))
            .await
            .unwrap();

        let immediate = timeout(Duration::from_millis(10), receiver.recv()).await;
        assert!(immediate.is_err(), "delivered too early");

        let received = timeout(Duration::from_secs(1), receiver.recv())
            .await
            .expect("timed out")
            .unwrap();
        assert_eq!(queue_id(received), 9);
    }
}
