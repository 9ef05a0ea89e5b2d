//! Unified error handling for admin.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::db::RepositoryError;
use crate::services::{AccountError, CatalogError, FulfillmentError};

/// Application-level error type for the admin panel.
#[derive(Debug, Error)]
pub enum AppError {
    /// Order operation failed.
    #[error(transparent)]
    Fulfillment(#[from] FulfillmentError),

    /// Catalog operation failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Account operation failed.
    #[error(transparent)]
    Account(#[from] AccountError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Fulfillment(e) => match e {
                FulfillmentError::NotFound { .. } => StatusCode::NOT_FOUND,
                FulfillmentError::InvalidTransition(_)
                | FulfillmentError::AwaitingCompletion { .. } => StatusCode::CONFLICT,
                FulfillmentError::InsufficientStock(_) => StatusCode::UNPROCESSABLE_ENTITY,
                FulfillmentError::Storage(_) | FulfillmentError::PartialFailure { .. } => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Catalog(e) => match e {
                CatalogError::Validation(_) => StatusCode::BAD_REQUEST,
                CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
                CatalogError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Account(e) => match e {
                AccountError::Validation(_) => StatusCode::BAD_REQUEST,
                AccountError::NotFound(_) => StatusCode::NOT_FOUND,
                AccountError::Conflict(_) => StatusCode::CONFLICT,
                AccountError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    const fn reconciliation_id(&self) -> Option<Uuid> {
        match self {
            Self::Fulfillment(
                FulfillmentError::PartialFailure {
                    reconciliation_id, ..
                }
                | FulfillmentError::AwaitingCompletion {
                    reconciliation_id, ..
                },
            ) => Some(*reconciliation_id),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Fulfillment(FulfillmentError::PartialFailure { .. }) => {
                "Operation partially applied, needs reconciliation".to_string()
            }
            _ if status.is_server_error() => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        let body = match self.reconciliation_id() {
            Some(id) => json!({
                "status": status.as_u16(),
                "error": message,
                "reconciliationId": id,
            }),
            None => json!({ "status": status.as_u16(), "error": message }),
        };

        (status, Json(body)).into_response()
    }
}

/// Set the Sentry user context from the logged-in admin.
pub fn set_sentry_user(user_id: i64, name: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: Some(name.to_string()),
            ..Default::default()
        }));
    });
}
