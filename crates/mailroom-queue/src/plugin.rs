//! Queue plugin: provides the shared job queue other plugins publish to

use std::sync::Arc;

use mailroom_core::async_trait::async_trait;
use mailroom_core::plugin::{MailroomPlugin, PluginError, ServiceRegistry};
use mailroom_core::JobQueue;

use crate::queue::BroadcastQueue;

const DEFAULT_CAPACITY: usize = 1000;

pub struct QueuePlugin {
    capacity: usize,
}

impl QueuePlugin {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }
}

impl Default for QueuePlugin {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl MailroomPlugin for QueuePlugin {
    fn name(&self) -> &'static str {
        "queue"
    }

    async fn register(&self, services: &ServiceRegistry) -> Result<(), PluginError> {
        services.insert::<dyn JobQueue>(Arc::new(BroadcastQueue::new(self.capacity)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_plugin_registers_a_job_queue() {
        let services = ServiceRegistry::new();
        QueuePlugin::new(16).register(&services).await.unwrap();

        let queue = services.get::<dyn JobQueue>().expect("queue registered");

        // The registered queue is live
        let mut receiver = queue.subscribe();
        queue
            .send(mailroom_core::Job::SendQueuedEmail(
                mailroom_core::SendQueuedEmailJob { email_queue_id: 1 },
            ))
            .await
            .unwrap();
        assert!(receiver.recv().await.is_ok());
    }
}
