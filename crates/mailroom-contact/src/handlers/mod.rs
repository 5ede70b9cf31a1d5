//! HTTP handlers for the contact surface

mod admin;
mod public;
mod types;

pub use types::AppState;

use axum::Router;
use std::sync::Arc;
use utoipa::OpenApi;

/// Configure contact routes
pub fn configure_routes() -> Router<Arc<AppState>> {
    Router::new().merge(public::routes()).merge(admin::routes())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        // Public
        public::submit_contact,
        // Moderation
        admin::list_submissions,
        admin::get_submission,
        admin::update_status,
        admin::mark_spam,
        admin::delete_submission,
        admin::bulk_update_status,
        admin::bulk_delete,
        admin::submission_statistics,
    ),
    components(
        schemas(
            types::SubmitContactBody,
            types::SubmitContactResponse,
            types::SubmittedData,
            types::SubmissionResponse,
            types::SubmissionEnvelope,
            types::PaginatedSubmissionsResponse,
            types::PageMeta,
            types::UpdateStatusRequest,
            types::BulkStatusRequest,
            types::BulkIdsRequest,
            types::CountEnvelope,
            types::MessageEnvelope,
            types::StatisticsData,
            types::StatisticsResponse,
        )
    ),
    tags(
        (name = "Contact", description = "Public contact form submission"),
        (name = "Contact Moderation", description = "Staff submission listing, status management and statistics")
    )
)]
pub struct ContactApiDoc;
