//! Error types for the contact intake pipeline

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContactError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Submission {0} not found")]
    SubmissionNotFound(i32),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Too many contact form submissions. Please wait a few minutes and try again.")]
    RateLimited,

    #[error("Submissions from this address are not accepted")]
    IpBlocked,

    #[error("Invalid status transition from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },

    #[error("Unknown status: {0}")]
    UnknownStatus(String),

    #[error("Counter store error: {0}")]
    CounterStore(String),

    #[error("Email error: {0}")]
    Email(String),
}

impl From<mailroom_email::EmailError> for ContactError {
    fn from(err: mailroom_email::EmailError) -> Self {
        ContactError::Email(err.to_string())
    }
}
