//! Handler types for the contact surface

use std::sync::Arc;

use mailroom_core::DBDateTime;
use mailroom_entities::contact_submissions;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::service::ContactService;

/// Application state for contact handlers
pub struct AppState {
    pub contact_service: Arc<ContactService>,
}

// ========================================
// Public submission types
// ========================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitContactBody {
    #[schema(example = "John Doe")]
    pub name: String,
    #[schema(example = "john@x.com")]
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    #[schema(example = "Hi, interested in your services")]
    pub message: String,
    /// "ar" or "en"
    #[schema(example = "en")]
    pub language: String,
    pub privacy_accepted: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmittedData {
    pub id: i32,
    #[schema(value_type = String, format = DateTime)]
    pub submitted_at: DBDateTime,
}

/// Uniform acknowledgment: identical for accepted and spam-classified
/// submissions
#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitContactResponse {
    pub success: bool,
    pub message: String,
    pub data: SubmittedData,
}

// ========================================
// Moderation types
// ========================================

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListSubmissionsQuery {
    /// Filter by status: new, read, replied, archived, spam
    pub status: Option<String>,
    /// Include spam rows in an unfiltered listing
    pub include_spam: Option<bool>,
    /// Free-text search across name, email, subject and message
    pub search: Option<String>,
    /// ISO 8601 lower bound on submitted_at
    #[param(value_type = Option<String>, format = DateTime)]
    pub date_from: Option<DBDateTime>,
    /// ISO 8601 upper bound on submitted_at
    #[param(value_type = Option<String>, format = DateTime)]
    pub date_to: Option<DBDateTime>,
    /// Filter by language: ar or en
    pub language: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmissionResponse {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
    #[schema(example = "new")]
    pub status: String,
    #[schema(example = "en")]
    pub language: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    #[schema(value_type = String, format = DateTime)]
    pub submitted_at: DBDateTime,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub read_at: Option<DBDateTime>,
    pub admin_notes: Option<String>,
}

impl From<contact_submissions::Model> for SubmissionResponse {
    fn from(model: contact_submissions::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            phone: model.phone,
            subject: model.subject,
            message: model.message,
            status: model.status,
            language: model.language,
            ip_address: model.ip_address,
            user_agent: model.user_agent,
            submitted_at: model.submitted_at,
            read_at: model.read_at,
            admin_notes: model.admin_notes,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PageMeta {
    pub current_page: u64,
    pub per_page: u64,
    pub total: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedSubmissionsResponse {
    pub success: bool,
    pub data: Vec<SubmissionResponse>,
    pub meta: PageMeta,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmissionEnvelope {
    pub success: bool,
    pub data: SubmissionResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CountEnvelope {
    pub success: bool,
    pub data: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageEnvelope {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    /// Target status: new, read, replied, archived, spam
    #[schema(example = "replied")]
    pub status: String,
    pub admin_notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkStatusRequest {
    pub ids: Vec<i32>,
    #[schema(example = "archived")]
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkIdsRequest {
    pub ids: Vec<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatisticsData {
    pub total: u64,
    pub new: u64,
    pub read: u64,
    pub replied: u64,
    pub archived: u64,
    pub spam: u64,
    pub today: u64,
    pub this_week: u64,
    pub this_month: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatisticsResponse {
    pub success: bool,
    pub data: StatisticsData,
}
