//! Recipient management handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use mailroom_core::{Problem, RequireAdmin};
use mailroom_entities::NotificationPreference;

use super::queue::email_error_to_problem;
use super::types::{AppState, CreateRecipientRequest, RecipientResponse, UpdateRecipientRequest};
use crate::services::{NewRecipient, UpdateRecipient};

/// Configure recipient routes
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/admin/emails/recipients",
            get(list_recipients).post(create_recipient),
        )
        .route(
            "/admin/emails/recipients/{id}",
            patch(update_recipient).delete(delete_recipient),
        )
}

fn parse_preference(raw: &str) -> Result<NotificationPreference, Problem> {
    match raw {
        "immediate" => Ok(NotificationPreference::Immediate),
        "digest" => Ok(NotificationPreference::Digest),
        other => Err(Problem::bad_request()
            .detail(format!("Unknown notification preference: {}", other))),
    }
}

/// List configured recipients
#[utoipa::path(
    tag = "Email Recipients",
    get,
    path = "/admin/emails/recipients",
    responses(
        (status = 200, description = "All configured recipients", body = [RecipientResponse])
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_recipients(
    RequireAdmin(_auth): RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, Problem> {
    let recipients = state
        .recipient_service
        .list()
        .await
        .map_err(email_error_to_problem)?;

    Ok(Json(
        recipients
            .into_iter()
            .map(RecipientResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// Add a recipient
#[utoipa::path(
    tag = "Email Recipients",
    post,
    path = "/admin/emails/recipients",
    request_body = CreateRecipientRequest,
    responses(
        (status = 201, description = "Recipient created", body = RecipientResponse),
        (status = 400, description = "Invalid request")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_recipient(
    RequireAdmin(_auth): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateRecipientRequest>,
) -> Result<impl IntoResponse, Problem> {
    let preference = match request.notification_preference.as_deref() {
        Some(raw) => parse_preference(raw)?,
        None => NotificationPreference::Immediate,
    };

    let recipient = state
        .recipient_service
        .create(NewRecipient {
            email: request.email,
            name: request.name,
            is_primary: request.is_primary,
            is_active: request.is_active,
            notification_preference: preference,
        })
        .await
        .map_err(email_error_to_problem)?;

    Ok((
        StatusCode::CREATED,
        Json(RecipientResponse::from(recipient)),
    ))
}

/// Update a recipient
#[utoipa::path(
    tag = "Email Recipients",
    patch,
    path = "/admin/emails/recipients/{id}",
    params(("id" = i32, Path, description = "Recipient id")),
    request_body = UpdateRecipientRequest,
    responses(
        (status = 200, description = "Recipient updated", body = RecipientResponse),
        (status = 404, description = "Recipient not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_recipient(
    RequireAdmin(_auth): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateRecipientRequest>,
) -> Result<impl IntoResponse, Problem> {
    let preference = match request.notification_preference.as_deref() {
        Some(raw) => Some(parse_preference(raw)?),
        None => None,
    };

    let recipient = state
        .recipient_service
        .update(
            id,
            UpdateRecipient {
                email: request.email,
                name: request.name.map(Some),
                is_primary: request.is_primary,
                is_active: request.is_active,
                notification_preference: preference,
            },
        )
        .await
        .map_err(email_error_to_problem)?;

    Ok(Json(RecipientResponse::from(recipient)))
}

/// Remove a recipient
#[utoipa::path(
    tag = "Email Recipients",
    delete,
    path = "/admin/emails/recipients/{id}",
    params(("id" = i32, Path, description = "Recipient id")),
    responses(
        (status = 204, description = "Recipient deleted"),
        (status = 404, description = "Recipient not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_recipient(
    RequireAdmin(_auth): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, Problem> {
    state
        .recipient_service
        .delete(id)
        .await
        .map_err(email_error_to_problem)?;

    Ok(StatusCode::NO_CONTENT)
}
