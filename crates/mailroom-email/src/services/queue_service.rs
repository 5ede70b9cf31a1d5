//! Durable email queue row lifecycle

use std::sync::Arc;

use mailroom_core::{Clock, DBDateTime};
use mailroom_entities::{email_logs, email_queue, EmailStatus};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};
use tracing::{debug, info};

use crate::errors::EmailError;
use crate::services::delivery::DEFAULT_MAX_ATTEMPTS;

/// Request to enqueue one outbound email
#[derive(Debug, Clone)]
pub struct NewQueuedEmail {
    pub to_email: String,
    pub to_name: Option<String>,
    pub from_email: Option<String>,
    pub from_name: Option<String>,
    pub subject: String,
    pub body_html: String,
    pub body_text: Option<String>,
    pub contact_submission_id: Option<i32>,
    pub max_attempts: Option<i32>,
    /// Defer the first delivery attempt until this instant
    pub scheduled_at: Option<DBDateTime>,
}

/// Query options for listing queue rows
#[derive(Debug, Clone, Default)]
pub struct ListQueueOptions {
    pub status: Option<EmailStatus>,
    pub contact_submission_id: Option<i32>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

/// Queue row counts by status
#[derive(Debug, Clone)]
pub struct EmailQueueStats {
    pub total: u64,
    pub pending: u64,
    pub processing: u64,
    pub sent: u64,
    pub failed: u64,
}

/// Service owning the email_queue and email_logs tables
pub struct EmailQueueService {
    db: Arc<DatabaseConnection>,
    clock: Arc<dyn Clock>,
}

impl EmailQueueService {
    pub fn new(db: Arc<DatabaseConnection>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Enqueue a row on the service's own connection
    pub async fn enqueue(&self, request: NewQueuedEmail) -> Result<email_queue::Model, EmailError> {
        self.enqueue_on(self.db.as_ref(), request).await
    }

    /// Enqueue a row on the given connection (used inside the intake
    /// transaction so the submission and its notification rows commit
    /// together)
    pub async fn enqueue_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        request: NewQueuedEmail,
    ) -> Result<email_queue::Model, EmailError> {
        let row = email_queue::ActiveModel {
            to_email: Set(request.to_email),
            to_name: Set(request.to_name),
            from_email: Set(request.from_email),
            from_name: Set(request.from_name),
            subject: Set(request.subject),
            body_html: Set(request.body_html),
            body_text: Set(request.body_text),
            status: Set(EmailStatus::Pending.as_str().to_string()),
            attempts: Set(0),
            max_attempts: Set(request.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS)),
            scheduled_at: Set(request.scheduled_at),
            contact_submission_id: Set(request.contact_submission_id),
            ..Default::default()
        };

        let model = row.insert(conn).await?;
        debug!(
            "Enqueued email {} to {} (max_attempts: {})",
            model.id, model.to_email, model.max_attempts
        );
        Ok(model)
    }

    pub async fn get(&self, id: i32) -> Result<email_queue::Model, EmailError> {
        email_queue::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or(EmailError::QueueRowNotFound(id))
    }

    /// List queue rows with optional filtering
    pub async fn list(
        &self,
        options: ListQueueOptions,
    ) -> Result<(Vec<email_queue::Model>, u64), EmailError> {
        let page = options.page.unwrap_or(1).max(1);
        let page_size = options.page_size.unwrap_or(20).clamp(1, 100);

        let mut query =
            email_queue::Entity::find().order_by_desc(email_queue::Column::CreatedAt);

        if let Some(status) = options.status {
            query = query.filter(email_queue::Column::Status.eq(status.as_str()));
        }

        if let Some(submission_id) = options.contact_submission_id {
            query = query.filter(email_queue::Column::ContactSubmissionId.eq(submission_id));
        }

        let paginator = query.paginate(self.db.as_ref(), page_size);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;

        Ok((items, total))
    }

    /// Rows eligible for a delivery attempt right now
    pub async fn ready_to_send(&self, limit: u64) -> Result<Vec<email_queue::Model>, EmailError> {
        let now = self.clock.now();

        let rows = email_queue::Entity::find()
            .filter(email_queue::Column::Status.eq(EmailStatus::Pending.as_str()))
            .filter(
                Condition::any()
                    .add(email_queue::Column::ScheduledAt.is_null())
                    .add(email_queue::Column::ScheduledAt.lte(now)),
            )
            .filter(
                Expr::col(email_queue::Column::Attempts)
                    .lt(Expr::col(email_queue::Column::MaxAttempts)),
            )
            .order_by_asc(email_queue::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await?;

        Ok(rows)
    }

    /// Atomically claim a row for delivery.
    ///
    /// The guarded UPDATE is the concurrency contract: when several
    /// workers race on the same row, exactly one sees rows_affected == 1
    /// and proceeds; the rest skip. Returns None when the row is already
    /// claimed, terminal, or not yet due.
    pub async fn claim(&self, id: i32) -> Result<Option<email_queue::Model>, EmailError> {
        let now = self.clock.now();

        let result = email_queue::Entity::update_many()
            .col_expr(
                email_queue::Column::Status,
                Expr::value(EmailStatus::Processing.as_str()),
            )
            .filter(email_queue::Column::Id.eq(id))
            .filter(email_queue::Column::Status.is_in([
                EmailStatus::Pending.as_str(),
                EmailStatus::Failed.as_str(),
            ]))
            .filter(
                Condition::any()
                    .add(email_queue::Column::ScheduledAt.is_null())
                    .add(email_queue::Column::ScheduledAt.lte(now)),
            )
            .filter(
                Expr::col(email_queue::Column::Attempts)
                    .lt(Expr::col(email_queue::Column::MaxAttempts)),
            )
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Ok(None);
        }

        let row = email_queue::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or(EmailError::QueueRowNotFound(id))?;

        Ok(Some(row))
    }

    /// Record a successful delivery: terminal `sent` plus a log row
    pub async fn mark_sent(
        &self,
        row: email_queue::Model,
    ) -> Result<email_queue::Model, EmailError> {
        let now = self.clock.now();
        let txn = self.db.begin().await?;

        let mut active: email_queue::ActiveModel = row.clone().into();
        active.status = Set(EmailStatus::Sent.as_str().to_string());
        active.sent_at = Set(Some(now));
        active.error_message = Set(None);
        let updated = active.update(&txn).await?;

        let log = email_logs::ActiveModel {
            email_queue_id: Set(row.id),
            to_email: Set(row.to_email.clone()),
            subject: Set(Some(row.subject.clone())),
            status: Set("sent".to_string()),
            sent_at: Set(Some(now)),
            ..Default::default()
        };
        log.insert(&txn).await?;

        txn.commit().await?;

        info!("Email {} sent to {}", updated.id, updated.to_email);
        Ok(updated)
    }

    /// Record a failed delivery attempt: increment attempts, mark the row
    /// `failed` and append a log row
    pub async fn mark_failed(
        &self,
        row: email_queue::Model,
        error_message: &str,
    ) -> Result<email_queue::Model, EmailError> {
        let now = self.clock.now();
        let txn = self.db.begin().await?;

        let mut active: email_queue::ActiveModel = row.clone().into();
        active.status = Set(EmailStatus::Failed.as_str().to_string());
        active.attempts = Set(row.attempts + 1);
        active.failed_at = Set(Some(now));
        active.error_message = Set(Some(error_message.to_string()));
        let updated = active.update(&txn).await?;

        let log = email_logs::ActiveModel {
            email_queue_id: Set(row.id),
            to_email: Set(row.to_email.clone()),
            subject: Set(Some(row.subject.clone())),
            status: Set("failed".to_string()),
            error_message: Set(Some(error_message.to_string())),
            failed_at: Set(Some(now)),
            ..Default::default()
        };
        log.insert(&txn).await?;

        txn.commit().await?;
        Ok(updated)
    }

    /// Manual resend of a terminally failed row: reset to a fresh pending
    /// cycle. The delivery log keeps the history of the exhausted one.
    pub async fn retry(&self, id: i32) -> Result<email_queue::Model, EmailError> {
        let row = self.get(id).await?;

        if row.status != EmailStatus::Failed.as_str() {
            return Err(EmailError::NotEligible {
                id,
                reason: format!("status is '{}', expected 'failed'", row.status),
            });
        }

        let mut active: email_queue::ActiveModel = row.into();
        active.status = Set(EmailStatus::Pending.as_str().to_string());
        active.attempts = Set(0);
        active.scheduled_at = Set(None);
        active.failed_at = Set(None);
        active.error_message = Set(None);
        let updated = active.update(self.db.as_ref()).await?;

        info!("Email {} reset for manual resend", updated.id);
        Ok(updated)
    }

    /// Delivery log rows for one queue row, newest first
    pub async fn logs(&self, email_queue_id: i32) -> Result<Vec<email_logs::Model>, EmailError> {
        let logs = email_logs::Entity::find()
            .filter(email_logs::Column::EmailQueueId.eq(email_queue_id))
            .order_by_desc(email_logs::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;
        Ok(logs)
    }

    /// Queue row counts by status
    pub async fn stats(&self) -> Result<EmailQueueStats, EmailError> {
        let base = email_queue::Entity::find();

        let total = base.clone().count(self.db.as_ref()).await?;

        let mut by_status = [0u64; 4];
        for (i, status) in [
            EmailStatus::Pending,
            EmailStatus::Processing,
            EmailStatus::Sent,
            EmailStatus::Failed,
        ]
        .iter()
        .enumerate()
        {
            by_status[i] = base
                .clone()
                .filter(email_queue::Column::Status.eq(status.as_str()))
                .count(self.db.as_ref())
                .await?;
        }

        Ok(EmailQueueStats {
            total,
            pending: by_status[0],
            processing: by_status[1],
            sent: by_status[2],
            failed: by_status[3],
        })
    }
}
