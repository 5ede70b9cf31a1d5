//! Error types for the email delivery subsystem

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmailError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Email queue row {0} not found")]
    QueueRowNotFound(i32),

    #[error("Recipient {0} not found")]
    RecipientNotFound(i32),

    #[error("Queue row {id} is not eligible for delivery: {reason}")]
    NotEligible { id: i32, reason: String },

    #[error("Mail transport error: {0}")]
    Transport(String),

    #[error("Mail transport timed out after {0} seconds")]
    Timeout(u64),

    #[error("Validation error: {0}")]
    Validation(String),
}
