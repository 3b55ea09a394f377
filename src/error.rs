//! Application error kinds and their HTTP rendering.
//!
//! Every failure a handler can report is a distinct [`AppError`] variant so
//! callers never have to guess what went wrong from a message string.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chrono::NaiveDate;
use serde_json::json;
use strum_macros::Display;
use thiserror::Error;
use tracing::error;

pub type AppResult<T> = Result<T, AppError>;

/// Which unique identity attribute collided during provisioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum IdentityField {
    #[strum(serialize = "Username")]
    Username,
    #[strum(serialize = "Email")]
    Email,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User does not exist")]
    IdentityNotFound,

    #[error("No employee profile for this card")]
    ProfileNotFound,

    #[error("{0} already exists.")]
    DuplicateUsernameOrEmail(IdentityField),

    #[error("ID card number already exists.")]
    DuplicateCardNumber,

    #[error("Logs for past dates are read-only")]
    PastDateReadOnly,

    #[error("Storage unavailable")]
    StorageUnavailable(#[from] sqlx::Error),

    #[error("{slot:?} is not a time slot on {date}")]
    InvalidSlot { slot: String, date: NaiveDate },

    #[error("{0}")]
    Validation(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Admin only")]
    Forbidden,

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::IdentityNotFound => "identity_not_found",
            AppError::ProfileNotFound => "profile_not_found",
            AppError::DuplicateUsernameOrEmail(_) => "duplicate_username_or_email",
            AppError::DuplicateCardNumber => "duplicate_card_number",
            AppError::PastDateReadOnly => "past_date_read_only",
            AppError::StorageUnavailable(_) => "storage_unavailable",
            AppError::InvalidSlot { .. } => "invalid_slot",
            AppError::Validation(_) => "validation_error",
            AppError::Unauthorized => "unauthorized",
            AppError::Forbidden => "forbidden",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors.field_errors().keys().map(|k| k.to_string()).collect();
        fields.sort_unstable();
        AppError::Validation(format!("Invalid field(s): {}", fields.join(", ")))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::IdentityNotFound | AppError::ProfileNotFound => StatusCode::NOT_FOUND,
            AppError::DuplicateUsernameOrEmail(_) | AppError::DuplicateCardNumber => {
                StatusCode::CONFLICT
            }
            AppError::PastDateReadOnly | AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::InvalidSlot { .. } | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // details stay in the log, clients get the flash message only
        match self {
            AppError::StorageUnavailable(e) => error!(error = %e, "Storage failure"),
            AppError::Internal(detail) => error!(detail = %detail, "Internal failure"),
            _ => {}
        }

        HttpResponse::build(self.status_code()).json(json!({
            "error": self.code(),
            "message": self.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn storage_errors_hide_their_source() {
        let err = AppError::from(sqlx::Error::PoolTimedOut);
        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = to_bytes(response.into_body()).await.unwrap();
        let payload: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload["error"], "storage_unavailable");
        assert_eq!(payload["message"], "Storage unavailable");
    }

    #[test]
    fn duplicate_message_names_the_field() {
        let err = AppError::DuplicateUsernameOrEmail(IdentityField::Email);
        assert_eq!(err.to_string(), "Email already exists.");
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn identity_failures_stay_distinct() {
        let kinds = [
            AppError::InvalidCredentials.code(),
            AppError::IdentityNotFound.code(),
            AppError::ProfileNotFound.code(),
        ];
        assert_eq!(kinds, ["invalid_credentials", "identity_not_found", "profile_not_found"]);
    }
}
