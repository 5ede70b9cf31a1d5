//! Email queue entity - one durable, retryable unit of outbound email work

use async_trait::async_trait;
use mailroom_core::DBDateTime;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, ConnectionTrait, DbErr};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "email_queue")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub to_email: String,
    pub to_name: Option<String>,
    pub from_email: Option<String>,
    pub from_name: Option<String>,
    pub subject: String,
    #[sea_orm(column_type = "Text")]
    pub body_html: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub body_text: Option<String>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub attachments: Option<Json>,
    /// One of: pending, processing, sent, failed
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    /// Null means send as soon as a worker is free
    pub scheduled_at: Option<DBDateTime>,
    pub sent_at: Option<DBDateTime>,
    pub failed_at: Option<DBDateTime>,
    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,
    pub contact_submission_id: Option<i32>,
    pub created_at: DBDateTime,
    pub updated_at: DBDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::contact_submissions::Entity",
        from = "Column::ContactSubmissionId",
        to = "super::contact_submissions::Column::Id"
    )]
    ContactSubmission,
    #[sea_orm(has_many = "super::email_logs::Entity")]
    EmailLogs,
}

impl Related<super::contact_submissions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ContactSubmission.def()
    }
}

impl Related<super::email_logs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EmailLogs.def()
    }
}

impl Model {
    /// A row is eligible for a delivery attempt iff it is pending, its
    /// scheduled time (if any) has passed, and attempts remain.
    pub fn is_ready_to_send(&self, now: DBDateTime) -> bool {
        self.status == "pending"
            && self.scheduled_at.map(|at| at <= now).unwrap_or(true)
            && self.attempts < self.max_attempts
    }

    pub fn can_retry(&self) -> bool {
        self.attempts < self.max_attempts
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = chrono::Utc::now();

        if insert {
            if self.created_at.is_not_set() {
                self.created_at = Set(now);
            }
            if self.updated_at.is_not_set() {
                self.updated_at = Set(now);
            }
        } else {
            self.updated_at = Set(now);
        }

        Ok(self)
    }
}
