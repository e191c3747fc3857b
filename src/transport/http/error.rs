//! API error type and its JSON rendering.

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

use crate::app::ServiceError;
use crate::domain::DomainError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Body could not be parsed.
    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Validation failed")]
    ValidationError(ValidationErrorDetails),

    #[error("CSRF validation failed")]
    CsrfValidationFailed,

    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after_secs: u64 },

    /// The blockchain rejected or did not confirm a transaction.
    #[error("Chain error: {0}")]
    Chain(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error")]
    Database(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ValidationErrorDetails {
    pub message: String,
    pub fields: HashMap<String, Vec<FieldError>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    /// e.g. "length", "range", "url".
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub params: Option<serde_json::Value>,
}

impl ValidationErrorDetails {
    pub fn field(field: &str, code: &str, message: &str) -> Self {
        let mut fields = HashMap::new();
        fields.insert(
            field.to_string(),
            vec![FieldError {
                code: code.to_string(),
                message: message.to_string(),
                params: None,
            }],
        );
        Self {
            message: format!("Validation failed for field '{}'", field),
            fields,
        }
    }

    pub fn from_fields(fields: HashMap<String, Vec<FieldError>>) -> Self {
        let message = match fields.keys().next() {
            Some(field) if fields.len() == 1 => format!("Validation failed for field '{}'", field),
            _ => format!("Validation failed for {} fields", fields.len()),
        };
        Self { message, fields }
    }
}

/// Error body. Shares `success`/`error` with the success envelope.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub code: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::CsrfValidationFailed => StatusCode::FORBIDDEN,
            ApiError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Chain(_) => StatusCode::BAD_GATEWAY,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::UnprocessableEntity(_) => "UNPROCESSABLE_ENTITY",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::CsrfValidationFailed => "CSRF_VALIDATION_FAILED",
            ApiError::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            ApiError::Chain(_) => "CHAIN_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            ApiError::Internal(_) => "INTERNAL_ERROR",
            ApiError::Database(_) => "DATABASE_ERROR",
        }
    }

    pub fn validation_field(field: &str, code: &str, message: &str) -> Self {
        ApiError::ValidationError(ValidationErrorDetails::field(field, code, message))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (message, details) = match &self {
            ApiError::ValidationError(details) => (
                details.message.clone(),
                serde_json::to_value(&details.fields).ok(),
            ),
            _ => (self.to_string(), None),
        };

        let body = ErrorResponse {
            success: false,
            code: self.error_code().to_string(),
            error: message,
            details,
        };

        let mut response = (status, Json(body)).into_response();
        if let ApiError::RateLimitExceeded { retry_after_secs } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::AssetNotFound(_) | DomainError::ProposalNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            DomainError::TokenNotInitialized => ApiError::NotFound(err.to_string()),
            DomainError::InvalidParameters(msg) => ApiError::BadRequest(msg),
            DomainError::MathOverflow | DomainError::InvalidVotingPeriod => {
                ApiError::BadRequest(err.to_string())
            }
            DomainError::Unauthorized(msg) => ApiError::Forbidden(msg),
            DomainError::InvalidTransition { .. }
            | DomainError::AssetNotVerified
            | DomainError::AssetAlreadyTokenized
            | DomainError::AssetNotTokenized
            | DomainError::AssetBurned
            | DomainError::TokenAlreadyInitialized
            | DomainError::TransfersPaused
            | DomainError::GovernanceInactive
            | DomainError::ProposalInactive
            | DomainError::VotingPeriodEnded
            | DomainError::VotingPeriodNotEnded
            | DomainError::ProposalAlreadyExecuted
            | DomainError::AlreadyVoted(_)
            | DomainError::QuorumNotReached { .. } => ApiError::Conflict(err.to_string()),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Domain(e) => e.into(),
            ServiceError::Ledger(e) => ApiError::Chain(e.to_string()),
            ServiceError::Store(e) => {
                // Details stay in the log.
                error!(error = ?e, "storage failure");
                ApiError::Database(e.to_string())
            }
        }
    }
}

/// Malformed or mistyped JSON body. `expected` names the request schema.
pub fn json_422(err: JsonRejection, expected: &str) -> ApiError {
    ApiError::UnprocessableEntity(format!(
        "Invalid JSON body: {} (expected: {})",
        err.body_text(),
        expected
    ))
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut fields: HashMap<String, Vec<FieldError>> = HashMap::new();

        for (field_name, field_errors) in err.field_errors() {
            let errors: Vec<FieldError> = field_errors
                .iter()
                .map(|e| {
                    let code = e.code.to_string();
                    let message = e.message.clone().map(|m| m.to_string()).unwrap_or_else(|| {
                        format!("Field '{}' failed validation: {}", field_name, code)
                    });
                    let params = if e.params.is_empty() {
                        None
                    } else {
                        serde_json::to_value(&e.params).ok()
                    };
                    FieldError {
                        code,
                        message,
                        params,
                    }
                })
                .collect();
            fields.insert(field_name.to_string(), errors);
        }

        ApiError::ValidationError(ValidationErrorDetails::from_fields(fields))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AssetStatus;
    use crate::infra::solana::LedgerError;

    #[test]
    fn domain_errors_map_to_expected_statuses() {
        let cases = [
            (DomainError::AssetNotFound(uuid::Uuid::nil()), StatusCode::NOT_FOUND),
            (DomainError::InvalidParameters("x".into()), StatusCode::BAD_REQUEST),
            (DomainError::Unauthorized("x".into()), StatusCode::FORBIDDEN),
            (
                DomainError::InvalidTransition {
                    from: AssetStatus::Pending,
                    to: AssetStatus::Tokenized,
                },
                StatusCode::CONFLICT,
            ),
            (DomainError::AlreadyVoted("a".into()), StatusCode::CONFLICT),
            (DomainError::MathOverflow, StatusCode::BAD_REQUEST),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn ledger_failures_are_bad_gateway() {
        let err: ApiError = ServiceError::Ledger(LedgerError::Rpc {
            operation: "verify_asset",
            message: "timeout".into(),
        })
        .into();
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.error_code(), "CHAIN_ERROR");
    }

    #[test]
    fn rate_limit_sets_retry_after() {
        let response = ApiError::RateLimitExceeded { retry_after_secs: 7 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "7");
    }
}
