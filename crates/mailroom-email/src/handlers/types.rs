//! Handler types for the email ops surface

use std::sync::Arc;

use mailroom_core::JobQueue;
use mailroom_entities::{email_logs, email_queue, email_recipients};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::services::{EmailQueueService, RecipientService};

/// Application state for email handlers
pub struct AppState {
    pub queue_service: Arc<EmailQueueService>,
    pub recipient_service: Arc<RecipientService>,
    pub queue: Arc<dyn JobQueue>,
}

// ========================================
// Queue types
// ========================================

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListQueueQuery {
    /// Filter by status: pending, processing, sent, failed
    pub status: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EmailQueueRowResponse {
    pub id: i32,
    #[schema(example = "staff@example.com")]
    pub to_email: String,
    pub to_name: Option<String>,
    pub subject: String,
    #[schema(example = "pending")]
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub scheduled_at: Option<mailroom_core::DBDateTime>,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub sent_at: Option<mailroom_core::DBDateTime>,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub failed_at: Option<mailroom_core::DBDateTime>,
    pub error_message: Option<String>,
    pub contact_submission_id: Option<i32>,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: mailroom_core::DBDateTime,
}

impl From<email_queue::Model> for EmailQueueRowResponse {
    fn from(model: email_queue::Model) -> Self {
        Self {
            id: model.id,
            to_email: model.to_email,
            to_name: model.to_name,
            subject: model.subject,
            status: model.status,
            attempts: model.attempts,
            max_attempts: model.max_attempts,
            scheduled_at: model.scheduled_at,
            sent_at: model.sent_at,
            failed_at: model.failed_at,
            error_message: model.error_message,
            contact_submission_id: model.contact_submission_id,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EmailLogResponse {
    pub id: i32,
    #[schema(example = "failed")]
    pub status: String,
    pub error_message: Option<String>,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub sent_at: Option<mailroom_core::DBDateTime>,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub failed_at: Option<mailroom_core::DBDateTime>,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: mailroom_core::DBDateTime,
}

impl From<email_logs::Model> for EmailLogResponse {
    fn from(model: email_logs::Model) -> Self {
        Self {
            id: model.id,
            status: model.status,
            error_message: model.error_message,
            sent_at: model.sent_at,
            failed_at: model.failed_at,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EmailQueueRowDetailResponse {
    #[serde(flatten)]
    pub row: EmailQueueRowResponse,
    /// Delivery attempt history, newest first
    pub logs: Vec<EmailLogResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedQueueResponse {
    pub items: Vec<EmailQueueRowResponse>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EmailStatsResponse {
    pub total: u64,
    pub pending: u64,
    pub processing: u64,
    pub sent: u64,
    pub failed: u64,
}

// ========================================
// Recipient types
// ========================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRecipientRequest {
    #[schema(example = "staff@example.com")]
    pub email: String,
    pub name: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// "immediate" or "digest"
    #[serde(default)]
    pub notification_preference: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRecipientRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub is_primary: Option<bool>,
    pub is_active: Option<bool>,
    pub notification_preference: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecipientResponse {
    pub id: i32,
    pub email: String,
    pub name: Option<String>,
    pub is_primary: bool,
    pub is_active: bool,
    #[schema(example = "immediate")]
    pub notification_preference: String,
}

impl From<email_recipients::Model> for RecipientResponse {
    fn from(model: email_recipients::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            name: model.name,
            is_primary: model.is_primary,
            is_active: model.is_active,
            notification_preference: model.notification_preference,
        }
    }
}
