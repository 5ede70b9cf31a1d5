//! HTTP handlers for the email ops surface

mod queue;
mod recipients;
mod types;

pub use types::AppState;

use axum::Router;
use std::sync::Arc;
use utoipa::OpenApi;

/// Configure email routes
pub fn configure_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(queue::routes())
        .merge(recipients::routes())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        // Queue
        queue::list_queue,
        queue::get_queue_row,
        queue::retry_queue_row,
        queue::email_stats,
        // Recipients
        recipients::list_recipients,
        recipients::create_recipient,
        recipients::update_recipient,
        recipients::delete_recipient,
    ),
    components(
        schemas(
            types::EmailQueueRowResponse,
            types::EmailQueueRowDetailResponse,
            types::EmailLogResponse,
            types::PaginatedQueueResponse,
            types::EmailStatsResponse,
            types::CreateRecipientRequest,
            types::UpdateRecipientRequest,
            types::RecipientResponse,
        )
    ),
    tags(
        (name = "Email Queue", description = "Email delivery queue inspection and manual resend"),
        (name = "Email Recipients", description = "Notification recipient management")
    )
)]
pub struct EmailApiDoc;
