//! RFC 7807 error responses for the HTTP surface
//!
//! Handlers return `Result<_, Problem>`. Services never build one of
//! these; the handler layer maps its typed errors onto a preset and
//! attaches the occurrence-specific detail.

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{Map, Value};

/// One `application/problem+json` error response.
#[derive(Debug, Clone)]
pub struct Problem {
    status: StatusCode,
    type_url: &'static str,
    title: &'static str,
    detail: Option<String>,
    extensions: Map<String, Value>,
}

impl Problem {
    fn preset(status: StatusCode, type_url: &'static str, title: &'static str) -> Self {
        Self {
            status,
            type_url,
            title,
            detail: None,
            extensions: Map::new(),
        }
    }

    pub fn internal_error() -> Self {
        Self::preset(
            StatusCode::INTERNAL_SERVER_ERROR,
            "https://mailroom.dev/problems/internal",
            "Internal Server Error",
        )
        .detail("An unexpected error occurred while processing the request")
    }

    pub fn bad_request() -> Self {
        Self::preset(
            StatusCode::BAD_REQUEST,
            "https://mailroom.dev/problems/bad-request",
            "Bad Request",
        )
    }

    pub fn unauthorized() -> Self {
        Self::preset(
            StatusCode::UNAUTHORIZED,
            "https://mailroom.dev/problems/unauthorized",
            "Unauthorized",
        )
    }

    pub fn forbidden() -> Self {
        Self::preset(
            StatusCode::FORBIDDEN,
            "https://mailroom.dev/problems/forbidden",
            "Forbidden",
        )
    }

    pub fn not_found() -> Self {
        Self::preset(
            StatusCode::NOT_FOUND,
            "https://mailroom.dev/problems/not-found",
            "Resource Not Found",
        )
    }

    pub fn validation_failed() -> Self {
        Self::preset(
            StatusCode::UNPROCESSABLE_ENTITY,
            "https://mailroom.dev/problems/validation-failed",
            "Validation Failed",
        )
    }

    pub fn rate_limited() -> Self {
        Self::preset(
            StatusCode::TOO_MANY_REQUESTS,
            "https://mailroom.dev/problems/rate-limited",
            "Too Many Requests",
        )
    }

    /// Occurrence-specific explanation shown to the caller.
    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Attach an arbitrary extension member to the response body.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extensions.insert(key.to_owned(), value.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    fn body(&self) -> Map<String, Value> {
        let mut body = Map::new();
        body.insert("type".to_owned(), self.type_url.into());
        body.insert("title".to_owned(), self.title.into());
        if let Some(detail) = &self.detail {
            body.insert("detail".to_owned(), detail.as_str().into());
        }
        body.insert("success".to_owned(), false.into());
        body.insert(
            "timestamp".to_owned(),
            chrono::Utc::now().to_rfc3339().into(),
        );
        for (key, value) in &self.extensions {
            body.insert(key.clone(), value.clone());
        }
        body
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(Value::Object(self.body()))).into_response();
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        response
    }
}
