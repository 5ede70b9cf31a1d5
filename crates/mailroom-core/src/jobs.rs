use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Job asking the delivery worker to process one email queue row
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SendQueuedEmailJob {
    pub email_queue_id: i32,
}

/// Every kind of background work the queue can carry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Job {
    SendQueuedEmail(SendQueuedEmailJob),
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Job::SendQueuedEmail(data) => {
                write!(f, "SendQueuedEmail({})", data.email_queue_id)
            }
        }
    }
}

/// Errors surfaced by queue implementations
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("queue send failed: {0}")]
    Send(String),

    #[error("queue receive failed: {0}")]
    Receive(String),

    #[error("queue channel closed")]
    Closed,
}

/// Receiving half of a job queue subscription
#[async_trait]
pub trait JobReceiver: Send {
    async fn recv(&mut self) -> Result<Job, QueueError>;
}

/// Job dispatch decoupling enqueueing from execution.
///
/// `send_delayed` is the retry/backoff primitive: the caller supplies the
/// delay (taken from its backoff schedule) and the implementation delivers
/// the job to subscribers no earlier than that.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn send(&self, job: Job) -> Result<(), QueueError>;

    async fn send_delayed(&self, job: Job, delay: Duration) -> Result<(), QueueError>;

    fn subscribe(&self) -> Box<dyn JobReceiver>;
}
