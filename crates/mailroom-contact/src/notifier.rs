//! Notification fan-out: one queued email per configured recipient

use std::sync::Arc;

use mailroom_email::{EmailQueueService, NewQueuedEmail, RecipientService};
use mailroom_entities::{contact_submissions, email_queue, Language};
use sea_orm::ConnectionTrait;
use tracing::debug;

use crate::errors::ContactError;

/// Translates one accepted submission into queued emails for every
/// active recipient with immediate preference
pub struct NotificationDispatcher {
    recipient_service: Arc<RecipientService>,
    queue_service: Arc<EmailQueueService>,
    from_email: String,
    from_name: Option<String>,
}

impl NotificationDispatcher {
    pub fn new(
        recipient_service: Arc<RecipientService>,
        queue_service: Arc<EmailQueueService>,
        from_email: String,
        from_name: Option<String>,
    ) -> Self {
        Self {
            recipient_service,
            queue_service,
            from_email,
            from_name,
        }
    }

    /// Create the queue rows on the given connection (the intake
    /// transaction). No recipients configured means no rows and no error.
    pub async fn dispatch_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        submission: &contact_submissions::Model,
    ) -> Result<Vec<email_queue::Model>, ContactError> {
        let recipients = self.recipient_service.active_immediate_on(conn).await?;

        if recipients.is_empty() {
            debug!(
                "No active immediate recipients, submission {} not fanned out",
                submission.id
            );
            return Ok(Vec::new());
        }

        let subject = render_subject(submission);
        let body_html = render_html(submission);
        let body_text = render_text(submission);

        let mut rows = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            let row = self
                .queue_service
                .enqueue_on(
                    conn,
                    NewQueuedEmail {
                        to_email: recipient.email.clone(),
                        to_name: recipient.name.clone(),
                        from_email: Some(self.from_email.clone()),
                        from_name: self.from_name.clone(),
                        subject: subject.clone(),
                        body_html: body_html.clone(),
                        body_text: Some(body_text.clone()),
                        contact_submission_id: Some(submission.id),
                        max_attempts: None,
                        scheduled_at: None,
                    },
                )
                .await?;
            rows.push(row);
        }

        debug!(
            "Fanned submission {} out to {} recipient(s)",
            submission.id,
            rows.len()
        );
        Ok(rows)
    }
}

fn language(submission: &contact_submissions::Model) -> Language {
    Language::parse(&submission.language).unwrap_or(Language::En)
}

fn render_subject(submission: &contact_submissions::Model) -> String {
    let topic = submission
        .subject
        .as_deref()
        .unwrap_or("General inquiry")
        .to_string();

    match language(submission) {
        Language::En => format!("[Contact Form] {} - from {}", topic, submission.name),
        Language::Ar => format!("[نموذج التواصل] {} - من {}", topic, submission.name),
    }
}

fn render_html(submission: &contact_submissions::Model) -> String {
    let (heading, labels) = match language(submission) {
        Language::En => (
            "New contact form submission",
            ["Name", "Email", "Phone", "Subject", "Message", "Submitted", "IP address"],
        ),
        Language::Ar => (
            "رسالة جديدة من نموذج التواصل",
            [
                "الاسم",
                "البريد الإلكتروني",
                "الهاتف",
                "الموضوع",
                "الرسالة",
                "تاريخ الإرسال",
                "عنوان IP",
            ],
        ),
    };

    format!(
        "<h2>{heading}</h2>\
         <p><strong>{}:</strong> {}</p>\
         <p><strong>{}:</strong> {}</p>\
         <p><strong>{}:</strong> {}</p>\
         <p><strong>{}:</strong> {}</p>\
         <p><strong>{}:</strong></p><p>{}</p>\
         <hr>\
         <p><small>{}: {} | {}: {}</small></p>",
        labels[0],
        submission.name,
        labels[1],
        submission.email,
        labels[2],
        submission.phone.as_deref().unwrap_or("-"),
        labels[3],
        submission.subject.as_deref().unwrap_or("-"),
        labels[4],
        submission.message,
        labels[5],
        submission.submitted_at.to_rfc3339(),
        labels[6],
        submission.ip_address.as_deref().unwrap_or("unknown"),
    )
}

fn render_text(submission: &contact_submissions::Model) -> String {
    format!(
        "{}\n{}\n\nName: {}\nEmail: {}\nPhone: {}\nSubject: {}\n\n{}\n\nSubmitted: {}\nIP: {}\n",
        render_subject(submission),
        "=".repeat(40),
        submission.name,
        submission.email,
        submission.phone.as_deref().unwrap_or("-"),
        submission.subject.as_deref().unwrap_or("-"),
        submission.message,
        submission.submitted_at.to_rfc3339(),
        submission.ip_address.as_deref().unwrap_or("unknown"),
    )
}
