//! Public contact form handler

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use mailroom_core::{Problem, RequestMetadata};
use tracing::error;

use super::types::{AppState, SubmitContactBody, SubmitContactResponse, SubmittedData};
use crate::errors::ContactError;
use crate::service::SubmitContactRequest;

/// Configure public routes
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/contact", post(submit_contact))
}

/// Submit the public contact form.
///
/// The response is a uniform acknowledgment: spam classification and
/// score are never disclosed to the caller.
#[utoipa::path(
    tag = "Contact",
    post,
    path = "/contact",
    request_body = SubmitContactBody,
    responses(
        (status = 201, description = "Submission accepted", body = SubmitContactResponse),
        (status = 403, description = "Submissions from this address are blocked"),
        (status = 422, description = "Validation failure"),
        (status = 429, description = "Too many submissions from this address")
    )
)]
pub async fn submit_contact(
    State(state): State<Arc<AppState>>,
    axum::Extension(metadata): axum::Extension<RequestMetadata>,
    Json(body): Json<SubmitContactBody>,
) -> Result<impl IntoResponse, Problem> {
    let request = SubmitContactRequest {
        name: body.name,
        email: body.email,
        phone: body.phone,
        subject: body.subject,
        message: body.message,
        language: body.language,
        privacy_accepted: body.privacy_accepted,
    };

    let submission = state
        .contact_service
        .submit(request, &metadata)
        .await
        .map_err(|e| match &e {
            ContactError::Validation(message) => {
                Problem::validation_failed().detail(message.clone())
            }
            ContactError::RateLimited => Problem::rate_limited().detail(e.to_string()),
            ContactError::IpBlocked => Problem::forbidden().detail(e.to_string()),
            _ => {
                error!("Contact submission failed: {}", e);
                Problem::internal_error()
                    .detail("Failed to submit contact form. Please try again later.")
            }
        })?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitContactResponse {
            success: true,
            message: "Thank you for contacting us. We will get back to you soon.".to_string(),
            data: SubmittedData {
                id: submission.id,
                submitted_at: submission.submitted_at,
            },
        }),
    ))
}
