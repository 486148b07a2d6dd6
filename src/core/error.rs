use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};

/// Application-wide Result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Main application error type
///
/// Propagation policy: `Validation` and `Configuration` surface as 4xx,
/// `GatewayUnavailable` as 502 after the retry budget is spent. The
/// reconciliation-side variants (`UnknownReference`, `StateConflict`) are
/// logged anomalies that the webhook path answers with 200; they only turn
/// into HTTP errors when they escape through a non-webhook surface.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// Bad input. Never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Provider network failure or 5xx. Transient, bounded retry only.
    #[error("Gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// Gateway known but disabled, or invalid configuration. Surfaced at
    /// selection time, not at call time.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Webhook signature rejected. State is never applied.
    #[error("Signature verification failed: {0}")]
    SignatureVerification(String),

    /// Webhook references a payment this ledger never created.
    #[error("Unknown payment reference: {0}")]
    UnknownReference(String),

    /// Terminal-state replay or a created-but-unpersisted gap.
    #[error("State conflict: {0}")]
    StateConflict(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Database operation errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let error_message = self.to_string();

        HttpResponse::build(status_code).json(serde_json::json!({
            "error": {
                "message": error_message,
                "code": status_code.as_u16(),
            }
        }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::GatewayUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::Configuration(_) => StatusCode::BAD_REQUEST,
            AppError::SignatureVerification(_) => StatusCode::BAD_REQUEST,
            AppError::UnknownReference(_) => StatusCode::NOT_FOUND,
            AppError::StateConflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Json(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Helper functions for common error scenarios
impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        AppError::NotFound(resource.into())
    }

    pub fn gateway_unavailable(msg: impl Into<String>) -> Self {
        AppError::GatewayUnavailable(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        AppError::Configuration(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    /// Transient errors may be retried against the provider; everything
    /// else fails the call immediately.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::GatewayUnavailable(_))
    }
}
