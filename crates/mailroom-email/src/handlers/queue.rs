//! Email queue ops handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use mailroom_core::{Job, Problem, RequireAdmin, SendQueuedEmailJob};
use mailroom_entities::EmailStatus;
use tracing::error;

use super::types::{
    AppState, EmailLogResponse, EmailQueueRowDetailResponse, EmailQueueRowResponse,
    EmailStatsResponse, ListQueueQuery, PaginatedQueueResponse,
};
use crate::errors::EmailError;
use crate::services::ListQueueOptions;

/// Configure email queue routes
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/emails/queue", get(list_queue))
        .route("/admin/emails/queue/{id}", get(get_queue_row))
        .route("/admin/emails/queue/{id}/retry", post(retry_queue_row))
        .route("/admin/emails/stats", get(email_stats))
}

pub(super) fn email_error_to_problem(e: EmailError) -> Problem {
    match &e {
        EmailError::QueueRowNotFound(id) => {
            Problem::not_found().detail(format!("Email queue row {} not found", id))
        }
        EmailError::RecipientNotFound(id) => {
            Problem::not_found().detail(format!("Recipient {} not found", id))
        }
        EmailError::NotEligible { .. } | EmailError::Validation(_) => {
            Problem::bad_request().detail(e.to_string())
        }
        _ => {
            error!("Email ops request failed: {}", e);
            Problem::internal_error()
        }
    }
}

/// List email queue rows
#[utoipa::path(
    tag = "Email Queue",
    get,
    path = "/admin/emails/queue",
    params(ListQueueQuery),
    responses(
        (status = 200, description = "Paginated queue rows", body = PaginatedQueueResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_queue(
    RequireAdmin(_auth): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQueueQuery>,
) -> Result<impl IntoResponse, Problem> {
    let status = match query.status.as_deref() {
        Some(raw) => Some(EmailStatus::parse(raw).ok_or_else(|| {
            Problem::bad_request().detail(format!("Unknown email status: {}", raw))
        })?),
        None => None,
    };

    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(20).clamp(1, 100);

    let (items, total) = state
        .queue_service
        .list(ListQueueOptions {
            status,
            contact_submission_id: None,
            page: Some(page),
            page_size: Some(page_size),
        })
        .await
        .map_err(email_error_to_problem)?;

    Ok(Json(PaginatedQueueResponse {
        items: items.into_iter().map(EmailQueueRowResponse::from).collect(),
        total,
        page,
        page_size,
    }))
}

/// Fetch one queue row with its delivery log
#[utoipa::path(
    tag = "Email Queue",
    get,
    path = "/admin/emails/queue/{id}",
    params(("id" = i32, Path, description = "Queue row id")),
    responses(
        (status = 200, description = "Queue row with delivery history", body = EmailQueueRowDetailResponse),
        (status = 404, description = "Queue row not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_queue_row(
    RequireAdmin(_auth): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, Problem> {
    let row = state
        .queue_service
        .get(id)
        .await
        .map_err(email_error_to_problem)?;
    let logs = state
        .queue_service
        .logs(id)
        .await
        .map_err(email_error_to_problem)?;

    Ok(Json(EmailQueueRowDetailResponse {
        row: EmailQueueRowResponse::from(row),
        logs: logs.into_iter().map(EmailLogResponse::from).collect(),
    }))
}

/// Manually resend a terminally failed queue row
#[utoipa::path(
    tag = "Email Queue",
    post,
    path = "/admin/emails/queue/{id}/retry",
    params(("id" = i32, Path, description = "Queue row id")),
    responses(
        (status = 200, description = "Row reset and requeued", body = EmailQueueRowResponse),
        (status = 400, description = "Row is not in a failed state"),
        (status = 404, description = "Queue row not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn retry_queue_row(
    RequireAdmin(_auth): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, Problem> {
    let row = state
        .queue_service
        .retry(id)
        .await
        .map_err(email_error_to_problem)?;

    if let Err(e) = state
        .queue
        .send(Job::SendQueuedEmail(SendQueuedEmailJob {
            email_queue_id: row.id,
        }))
        .await
    {
        // The sweep will pick the row up; surface nothing to the operator
        error!("Failed to publish retry job for email {}: {}", row.id, e);
    }

    Ok(Json(EmailQueueRowResponse::from(row)))
}

/// Queue counts by status
#[utoipa::path(
    tag = "Email Queue",
    get,
    path = "/admin/emails/stats",
    responses(
        (status = 200, description = "Queue statistics", body = EmailStatsResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn email_stats(
    RequireAdmin(_auth): RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, Problem> {
    let stats = state
        .queue_service
        .stats()
        .await
        .map_err(email_error_to_problem)?;

    Ok((
        StatusCode::OK,
        Json(EmailStatsResponse {
            total: stats.total,
            pending: stats.pending,
            processing: stats.processing,
            sent: stats.sent,
            failed: stats.failed,
        }),
    ))
}
