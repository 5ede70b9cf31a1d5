//! Serve command: assemble plugins and run the HTTP server

use std::sync::Arc;

use axum::{middleware, Extension, Json, Router};
use clap::Args;
use mailroom_contact::{ContactConfig, ContactPlugin};
use mailroom_core::plugin::PluginManager;
use mailroom_core::{request_metadata_middleware, AdminToken, Clock, SystemClock};
use mailroom_database::establish_connection;
use mailroom_email::transport::{SmtpConfig, TlsMode};
use mailroom_email::{EmailConfig, EmailPlugin};
use mailroom_queue::QueuePlugin;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Args)]
pub struct ServeCommand {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0", env = "MAILROOM_HOST")]
    host: String,

    /// Port to bind
    #[arg(long, default_value_t = 3000, env = "MAILROOM_PORT")]
    port: u16,

    /// Database connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Bearer token for the moderation surface
    #[arg(long, env = "MAILROOM_ADMIN_TOKEN")]
    admin_token: String,

    /// Redis URL for shared rate-limit counters (in-process when unset)
    #[arg(long, env = "MAILROOM_REDIS_URL")]
    redis_url: Option<String>,

    /// SMTP relay host (capture mode when unset)
    #[arg(long, env = "MAILROOM_SMTP_HOST")]
    smtp_host: Option<String>,

    #[arg(long, env = "MAILROOM_SMTP_PORT")]
    smtp_port: Option<u16>,

    #[arg(long, env = "MAILROOM_SMTP_USERNAME")]
    smtp_username: Option<String>,

    #[arg(long, env = "MAILROOM_SMTP_PASSWORD")]
    smtp_password: Option<String>,

    /// Sender address on notification emails
    #[arg(long, default_value = "noreply@localhost", env = "MAILROOM_FROM_EMAIL")]
    from_email: String,

    #[arg(long, env = "MAILROOM_FROM_NAME")]
    from_name: Option<String>,

    /// Submissions allowed per IP per minute
    #[arg(long, default_value_t = 5, env = "MAILROOM_RATE_LIMIT")]
    rate_limit: u64,
}

impl ServeCommand {
    pub async fn execute(self) -> anyhow::Result<()> {
        info!("Connecting to database");
        let db = establish_connection(&self.database_url).await?;

        let mut plugin_manager = PluginManager::new();

        // Core services plugins depend on
        plugin_manager.services().insert(db.clone());
        plugin_manager
            .services()
            .insert::<dyn Clock>(Arc::new(SystemClock));

        let smtp = self.smtp_host.as_ref().map(|host| SmtpConfig {
            host: host.clone(),
            port: self.smtp_port,
            username: self.smtp_username.clone(),
            password: self.smtp_password.clone(),
            tls_mode: TlsMode::Starttls,
        });

        // Registration order matters: queue first, then email (worker),
        // then contact (depends on both)
        plugin_manager.add_plugin(Box::new(QueuePlugin::default()));
        plugin_manager.add_plugin(Box::new(EmailPlugin::new(EmailConfig {
            smtp,
            send_timeout_secs: 30,
            sweep_interval_secs: 60,
        })));
        plugin_manager.add_plugin(Box::new(ContactPlugin::new(ContactConfig {
            rate_limit: self.rate_limit,
            rate_limit_window_secs: 60,
            redis_url: self.redis_url.clone(),
            from_email: self.from_email.clone(),
            from_name: self.from_name.clone(),
        })));

        plugin_manager.initialize().await?;

        let api = plugin_manager.router();
        let openapi = plugin_manager.openapi();

        let admin_token = Arc::new(AdminToken::new(self.admin_token.clone()));

        let app = Router::new()
            .merge(api)
            .route(
                "/api-docs/openapi.json",
                axum::routing::get({
                    let doc = serde_json::to_value(&openapi)?;
                    move || {
                        let doc = doc.clone();
                        async move { Json(doc) }
                    }
                }),
            )
            .layer(middleware::from_fn(request_metadata_middleware))
            .layer(Extension(admin_token))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive());

        let addr = format!("{}:{}", self.host, self.port);
        info!("Listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("Shutdown signal received");
            })
            .await?;

        Ok(())
    }
}
