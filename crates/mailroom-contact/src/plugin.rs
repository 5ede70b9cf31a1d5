//! Contact plugin for Mailroom

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use mailroom_core::async_trait::async_trait;
use mailroom_core::plugin::{MailroomPlugin, PluginError, ServiceRegistry};
use mailroom_core::{Clock, JobQueue};
use mailroom_email::{EmailQueueService, RecipientService};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::openapi::OpenApi;
use utoipa::OpenApi as OpenApiTrait;

use crate::block::BlockedIpService;
use crate::handlers::{self, AppState, ContactApiDoc};
use crate::notifier::NotificationDispatcher;
use crate::rate_limit::{CounterStore, MemoryCounterStore, RateLimitService, RedisCounterStore};
use crate::service::ContactService;
use crate::spam::SpamScorer;

fn default_rate_limit() -> u64 {
    5
}

fn default_rate_limit_window_secs() -> u64 {
    60
}

fn default_from_email() -> String {
    "noreply@localhost".to_string()
}

/// Contact subsystem configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactConfig {
    /// Submissions allowed per IP per window
    #[serde(default = "default_rate_limit")]
    pub rate_limit: u64,
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,
    /// Shared counter store; in-process when absent
    pub redis_url: Option<String>,
    /// Sender identity on notification emails
    #[serde(default = "default_from_email")]
    pub from_email: String,
    pub from_name: Option<String>,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            rate_limit: default_rate_limit(),
            rate_limit_window_secs: default_rate_limit_window_secs(),
            redis_url: None,
            from_email: default_from_email(),
            from_name: None,
        }
    }
}

/// Contact Plugin wiring the intake pipeline and moderation surface
pub struct ContactPlugin {
    config: ContactConfig,
}

impl ContactPlugin {
    pub fn new(config: ContactConfig) -> Self {
        Self { config }
    }
}

impl Default for ContactPlugin {
    fn default() -> Self {
        Self::new(ContactConfig::default())
    }
}

#[async_trait]
impl MailroomPlugin for ContactPlugin {
    fn name(&self) -> &'static str {
        "contact"
    }

    async fn register(&self, services: &ServiceRegistry) -> Result<(), PluginError> {
        let db = services.expect::<sea_orm::DatabaseConnection>();
        let clock = services.expect::<dyn Clock>();
        let queue = services.expect::<dyn JobQueue>();
        let queue_service = services.expect::<EmailQueueService>();
        let recipient_service = services.expect::<RecipientService>();

        let store: Arc<dyn CounterStore> = match &self.config.redis_url {
            Some(url) => {
                info!("Rate-limit counters: redis");
                Arc::new(RedisCounterStore::connect(url).await.map_err(|e| {
                    PluginError::Startup {
                        plugin: self.name(),
                        message: format!("rate-limit store: {}", e),
                    }
                })?)
            }
            None => {
                info!("Rate-limit counters: in-process");
                Arc::new(MemoryCounterStore::new(clock.clone()))
            }
        };

        let rate_limiter = RateLimitService::new(
            store,
            self.config.rate_limit,
            Duration::from_secs(self.config.rate_limit_window_secs),
        );

        let blocked_ips = Arc::new(BlockedIpService::new(db.clone(), clock.clone()));
        services.insert(blocked_ips.clone());

        let dispatcher = Arc::new(NotificationDispatcher::new(
            recipient_service,
            queue_service,
            self.config.from_email.clone(),
            self.config.from_name.clone(),
        ));

        let contact_service = Arc::new(ContactService::new(
            db.clone(),
            clock.clone(),
            SpamScorer::new(db.clone()),
            rate_limiter,
            blocked_ips,
            dispatcher,
            queue,
        ));
        services.insert(contact_service.clone());

        services.insert(Arc::new(AppState { contact_service }));

        Ok(())
    }

    fn routes(&self, services: &ServiceRegistry) -> Option<Router> {
        let state = services.expect::<AppState>();
        Some(handlers::configure_routes().with_state(state))
    }

    fn api_doc(&self) -> Option<OpenApi> {
        Some(<ContactApiDoc as OpenApiTrait>::openapi())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_name() {
        assert_eq!(ContactPlugin::default().name(), "contact");
    }

    #[test]
    fn test_default_config_values() {
        let config = ContactConfig::default();
        assert_eq!(config.rate_limit, 5);
        assert_eq!(config.rate_limit_window_secs, 60);
        assert!(config.redis_url.is_none());
    }
}
