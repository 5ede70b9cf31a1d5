//! Moderation handlers for contact submissions

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use mailroom_core::{Problem, RequireAdmin};
use mailroom_entities::SubmissionStatus;
use tracing::error;

use super::types::{
    AppState, BulkIdsRequest, BulkStatusRequest, CountEnvelope, ListSubmissionsQuery,
    MessageEnvelope, PageMeta, PaginatedSubmissionsResponse, StatisticsData, StatisticsResponse,
    SubmissionEnvelope, SubmissionResponse, UpdateStatusRequest,
};
use crate::errors::ContactError;
use crate::service::SubmissionFilters;

/// Configure moderation routes
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/contact/submissions", get(list_submissions))
        .route(
            "/admin/contact/submissions/statistics",
            get(submission_statistics),
        )
        .route(
            "/admin/contact/submissions/bulk-status",
            post(bulk_update_status),
        )
        .route("/admin/contact/submissions/bulk-delete", post(bulk_delete))
        .route(
            "/admin/contact/submissions/{id}",
            get(get_submission).delete(delete_submission),
        )
        .route(
            "/admin/contact/submissions/{id}/status",
            patch(update_status),
        )
        .route("/admin/contact/submissions/{id}/spam", post(mark_spam))
}

fn contact_error_to_problem(e: ContactError) -> Problem {
    match &e {
        ContactError::SubmissionNotFound(id) => {
            Problem::not_found().detail(format!("Submission {} not found", id))
        }
        ContactError::UnknownStatus(_) | ContactError::InvalidTransition { .. } => {
            Problem::bad_request().detail(e.to_string())
        }
        _ => {
            error!("Moderation request failed: {}", e);
            Problem::internal_error()
        }
    }
}

fn parse_status(raw: &str) -> Result<SubmissionStatus, Problem> {
    SubmissionStatus::parse(raw)
        .ok_or_else(|| Problem::bad_request().detail(format!("Unknown status: {}", raw)))
}

/// List submissions with filters; spam excluded unless requested
#[utoipa::path(
    tag = "Contact Moderation",
    get,
    path = "/admin/contact/submissions",
    params(ListSubmissionsQuery),
    responses(
        (status = 200, description = "Paginated submissions", body = PaginatedSubmissionsResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_submissions(
    RequireAdmin(_auth): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListSubmissionsQuery>,
) -> Result<impl IntoResponse, Problem> {
    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(25).clamp(1, 100);

    let (items, total) = state
        .contact_service
        .get_submissions(SubmissionFilters {
            status: query.status,
            include_spam: query.include_spam.unwrap_or(false),
            search: query.search,
            date_from: query.date_from,
            date_to: query.date_to,
            language: query.language,
            page: Some(page),
            page_size: Some(page_size),
        })
        .await
        .map_err(contact_error_to_problem)?;

    Ok(Json(PaginatedSubmissionsResponse {
        success: true,
        data: items.into_iter().map(SubmissionResponse::from).collect(),
        meta: PageMeta {
            current_page: page,
            per_page: page_size,
            total,
        },
    }))
}

/// Fetch one submission; fetching a `new` submission marks it read
#[utoipa::path(
    tag = "Contact Moderation",
    get,
    path = "/admin/contact/submissions/{id}",
    params(("id" = i32, Path, description = "Submission id")),
    responses(
        (status = 200, description = "The submission", body = SubmissionEnvelope),
        (status = 404, description = "Submission not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_submission(
    RequireAdmin(_auth): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, Problem> {
    let submission = state
        .contact_service
        .get_submission(id, true)
        .await
        .map_err(contact_error_to_problem)?;

    Ok(Json(SubmissionEnvelope {
        success: true,
        data: SubmissionResponse::from(submission),
        message: None,
    }))
}

/// Update a submission's status
#[utoipa::path(
    tag = "Contact Moderation",
    patch,
    path = "/admin/contact/submissions/{id}/status",
    params(("id" = i32, Path, description = "Submission id")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Updated submission", body = SubmissionEnvelope),
        (status = 400, description = "Unknown status or invalid transition"),
        (status = 404, description = "Submission not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_status(
    RequireAdmin(_auth): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, Problem> {
    let status = parse_status(&request.status)?;

    let submission = state
        .contact_service
        .update_status(id, status, request.admin_notes)
        .await
        .map_err(contact_error_to_problem)?;

    Ok(Json(SubmissionEnvelope {
        success: true,
        data: SubmissionResponse::from(submission),
        message: Some("Status updated".to_string()),
    }))
}

/// Mark a submission as spam (runs the block-list side effect)
#[utoipa::path(
    tag = "Contact Moderation",
    post,
    path = "/admin/contact/submissions/{id}/spam",
    params(("id" = i32, Path, description = "Submission id")),
    responses(
        (status = 200, description = "Submission marked as spam", body = MessageEnvelope),
        (status = 404, description = "Submission not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn mark_spam(
    RequireAdmin(_auth): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, Problem> {
    state
        .contact_service
        .mark_as_spam(id)
        .await
        .map_err(contact_error_to_problem)?;

    Ok(Json(MessageEnvelope {
        success: true,
        message: "Submission marked as spam".to_string(),
    }))
}

/// Delete one submission
#[utoipa::path(
    tag = "Contact Moderation",
    delete,
    path = "/admin/contact/submissions/{id}",
    params(("id" = i32, Path, description = "Submission id")),
    responses(
        (status = 200, description = "Submission deleted", body = MessageEnvelope),
        (status = 404, description = "Submission not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_submission(
    RequireAdmin(_auth): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, Problem> {
    state
        .contact_service
        .delete_submission(id)
        .await
        .map_err(contact_error_to_problem)?;

    Ok(Json(MessageEnvelope {
        success: true,
        message: "Submission deleted".to_string(),
    }))
}

/// Bulk status update
#[utoipa::path(
    tag = "Contact Moderation",
    post,
    path = "/admin/contact/submissions/bulk-status",
    request_body = BulkStatusRequest,
    responses(
        (status = 200, description = "Number of updated rows", body = CountEnvelope),
        (status = 400, description = "Unknown status")
    ),
    security(("bearer_auth" = []))
)]
pub async fn bulk_update_status(
    RequireAdmin(_auth): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(request): Json<BulkStatusRequest>,
) -> Result<impl IntoResponse, Problem> {
    let status = parse_status(&request.status)?;

    let count = state
        .contact_service
        .bulk_update_status(&request.ids, status)
        .await
        .map_err(contact_error_to_problem)?;

    Ok(Json(CountEnvelope {
        success: true,
        data: count,
        message: Some("Status updated".to_string()),
    }))
}

/// Bulk delete
#[utoipa::path(
    tag = "Contact Moderation",
    post,
    path = "/admin/contact/submissions/bulk-delete",
    request_body = BulkIdsRequest,
    responses(
        (status = 200, description = "Number of deleted rows", body = CountEnvelope)
    ),
    security(("bearer_auth" = []))
)]
pub async fn bulk_delete(
    RequireAdmin(_auth): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(request): Json<BulkIdsRequest>,
) -> Result<impl IntoResponse, Problem> {
    let count = state
        .contact_service
        .bulk_delete(&request.ids)
        .await
        .map_err(contact_error_to_problem)?;

    Ok(Json(CountEnvelope {
        success: true,
        data: count,
        message: Some("Submissions deleted".to_string()),
    }))
}

/// Counts by status plus today/week/month buckets
#[utoipa::path(
    tag = "Contact Moderation",
    get,
    path = "/admin/contact/submissions/statistics",
    responses(
        (status = 200, description = "Submission statistics", body = StatisticsResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn submission_statistics(
    RequireAdmin(_auth): RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, Problem> {
    let stats = state
        .contact_service
        .get_statistics()
        .await
        .map_err(contact_error_to_problem)?;

    Ok(Json(StatisticsResponse {
        success: true,
        data: StatisticsData {
            total: stats.total,
            new: stats.new,
            read: stats.read,
            replied: stats.replied,
            archived: stats.archived,
            spam: stats.spam,
            today: stats.today,
            this_week: stats.this_week,
            this_month: stats.this_month,
        },
    }))
}
