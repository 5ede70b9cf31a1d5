//! SMTP mail transport backed by lettre

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::EmailError;
use crate::transport::{MailTransport, OutgoingEmail};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TlsMode {
    /// No encryption (local relays and test fixtures only)
    None,
    /// STARTTLS (opportunistic TLS)
    Starttls,
    /// Direct TLS connection
    Tls,
}

fn default_tls_mode() -> TlsMode {
    TlsMode::Starttls
}

/// SMTP relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: Option<u16>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_tls_mode")]
    pub tls_mode: TlsMode,
}

/// Mail transport that relays through a configured SMTP server
pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, EmailError> {
        let mut builder = match config.tls_mode {
            TlsMode::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| EmailError::Transport(e.to_string()))?,
            TlsMode::Starttls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| EmailError::Transport(e.to_string()))?,
            TlsMode::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            }
        };

        if let Some(port) = config.port {
            builder = builder.port(port);
        }

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            mailer: builder.build(),
        })
    }

    fn mailbox(email: &str, name: Option<&str>) -> Result<Mailbox, EmailError> {
        let address: Address = email
            .parse()
            .map_err(|_| EmailError::Validation(format!("Invalid email address: {}", email)))?;
        Ok(Mailbox::new(name.map(|n| n.to_string()), address))
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        let from = Self::mailbox(&email.from_email, email.from_name.as_deref())?;
        let to = Self::mailbox(&email.to_email, email.to_name.as_deref())?;

        let text = email
            .body_text
            .clone()
            .unwrap_or_else(|| email.body_html.clone());

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(&email.subject)
            .multipart(MultiPart::alternative_plain_html(
                text,
                email.body_html.clone(),
            ))
            .map_err(|e| EmailError::Transport(e.to_string()))?;

        debug!("Sending email to {} via SMTP", email.to_email);

        self.mailer
            .send(message)
            .await
            .map_err(|e| EmailError::Transport(e.to_string()))?;

        Ok(())
    }
}
