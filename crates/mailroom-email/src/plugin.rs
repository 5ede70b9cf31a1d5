//! Email plugin for Mailroom

use std::sync::Arc;

use axum::Router;
use mailroom_core::async_trait::async_trait;
use mailroom_core::plugin::{MailroomPlugin, PluginError, ServiceRegistry};
use mailroom_core::{Clock, JobQueue};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::openapi::OpenApi;
use utoipa::OpenApi as OpenApiTrait;

use crate::handlers::{self, AppState, EmailApiDoc};
use crate::services::{DeliveryService, EmailQueueService, EmailWorker, RecipientService};
use crate::transport::{MailTransport, MockMailTransport, SmtpConfig, SmtpMailer};

fn default_send_timeout_secs() -> u64 {
    30
}

fn default_sweep_interval_secs() -> u64 {
    60
}

/// Email subsystem configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// SMTP relay; when absent the transport runs in capture mode
    pub smtp: Option<SmtpConfig>,
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp: None,
            send_timeout_secs: default_send_timeout_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Email Plugin wiring the queue, delivery worker and ops handlers
pub struct EmailPlugin {
    config: EmailConfig,
}

impl EmailPlugin {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }
}

impl Default for EmailPlugin {
    fn default() -> Self {
        Self::new(EmailConfig::default())
    }
}

#[async_trait]
impl MailroomPlugin for EmailPlugin {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn register(&self, services: &ServiceRegistry) -> Result<(), PluginError> {
        let db = services.expect::<sea_orm::DatabaseConnection>();
        let clock = services.expect::<dyn Clock>();
        let queue = services.expect::<dyn JobQueue>();

        let transport: Arc<dyn MailTransport> = match &self.config.smtp {
            Some(smtp) => {
                info!("Email transport: SMTP relay via {}", smtp.host);
                Arc::new(SmtpMailer::new(smtp).map_err(|e| PluginError::Startup {
                    plugin: self.name(),
                    message: format!("SMTP transport: {}", e),
                })?)
            }
            None => {
                info!("Email transport: capture mode (no SMTP relay configured)");
                Arc::new(MockMailTransport::new())
            }
        };

        let queue_service = Arc::new(EmailQueueService::new(db.clone(), clock.clone()));
        services.insert(queue_service.clone());

        let recipient_service = Arc::new(RecipientService::new(db.clone()));
        services.insert(recipient_service.clone());

        let delivery = Arc::new(DeliveryService::new(
            queue_service.clone(),
            transport,
            self.config.send_timeout_secs,
        ));
        services.insert(delivery.clone());

        let worker = Arc::new(EmailWorker::new(
            queue.clone(),
            delivery,
            queue_service.clone(),
            self.config.sweep_interval_secs,
        ));
        worker.start().await;
        services.insert(worker);

        services.insert(Arc::new(AppState {
            queue_service,
            recipient_service,
            queue,
        }));

        Ok(())
    }

    fn routes(&self, services: &ServiceRegistry) -> Option<Router> {
        let state = services.expect::<AppState>();
        Some(handlers::configure_routes().with_state(state))
    }

    fn api_doc(&self) -> Option<OpenApi> {
        Some(<EmailApiDoc as OpenApiTrait>::openapi())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_name() {
        assert_eq!(EmailPlugin::default().name(), "email");
    }

    #[test]
    fn test_default_config_runs_in_capture_mode() {
        let config = EmailConfig::default();
        assert!(config.smtp.is_none());
        assert_eq!(config.send_timeout_secs, 30);
        assert_eq!(config.sweep_interval_secs, 60);
    }
}
