//! Platform Error Types
//!
//! Every failure the request pipeline can emit carries a stable machine
//! kind (`MISSING_CREDENTIALS`, `OWNERSHIP_VIOLATION`, ...) and a terse
//! human message. Internal detail is logged, never returned.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Failures while reading or verifying the caller's credential.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("authorization header is not provided")]
    Missing,

    #[error("invalid authorization header format")]
    Malformed,

    #[error("unsupported authorization type: {scheme}")]
    UnsupportedScheme { scheme: String },

    #[error("token has expired")]
    ExpiredToken,

    #[error("token is invalid")]
    InvalidSignature,
}

/// The token verified but its subject cannot be resolved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrincipalError {
    #[error("user not found")]
    UnknownPrincipal,
}

/// Failures while checking access to a resource-scoped route.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OwnershipError {
    #[error("invalid resource id")]
    InvalidIdentifier,

    #[error("resource not found")]
    ResourceNotFound,

    #[error("you are not authorized to access this resource")]
    Violation,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BudgetError {
    #[error("you already have a budget for {month}/{year}")]
    DuplicatePeriod { month: u32, year: i32 },
}

/// System-caused failures, kept apart from client-caused ones.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InfrastructureError {
    #[error("storage lookup failed: {message}")]
    LookupFailed { message: String },
}

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Principal(#[from] PrincipalError),

    #[error(transparent)]
    Ownership(#[from] OwnershipError),

    #[error(transparent)]
    Budget(#[from] BudgetError),

    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),

    #[error("Failed to sign token: {message}")]
    Signing { message: String },

    #[error("Entity not found: {entity_type}")]
    NotFound { entity_type: String },

    #[error("Duplicate entity: {entity_type} with the same {field}")]
    Duplicate { entity_type: String, field: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PlatformError {
    pub fn not_found(entity_type: impl Into<String>) -> Self {
        Self::NotFound { entity_type: entity_type.into() }
    }

    pub fn duplicate(entity_type: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Duplicate {
            entity_type: entity_type.into(),
            field: field.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    pub fn lookup_failed(message: impl Into<String>) -> Self {
        InfrastructureError::LookupFailed { message: message.into() }.into()
    }

    /// Stable machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            PlatformError::Credential(e) => match e {
                CredentialError::Missing => "MISSING_CREDENTIALS",
                CredentialError::Malformed => "MALFORMED_HEADER",
                CredentialError::UnsupportedScheme { .. } => "UNSUPPORTED_SCHEME",
                CredentialError::ExpiredToken => "EXPIRED_TOKEN",
                CredentialError::InvalidSignature => "INVALID_SIGNATURE",
            },
            PlatformError::Principal(PrincipalError::UnknownPrincipal) => "UNKNOWN_PRINCIPAL",
            PlatformError::Ownership(e) => match e {
                OwnershipError::InvalidIdentifier => "INVALID_IDENTIFIER",
                OwnershipError::ResourceNotFound => "RESOURCE_NOT_FOUND",
                OwnershipError::Violation => "OWNERSHIP_VIOLATION",
            },
            PlatformError::Budget(BudgetError::DuplicatePeriod { .. }) => "DUPLICATE_BUDGET",
            PlatformError::Infrastructure(InfrastructureError::LookupFailed { .. }) => "LOOKUP_FAILED",
            PlatformError::Signing { .. } => "SIGNING_ERROR",
            PlatformError::NotFound { .. } => "NOT_FOUND",
            PlatformError::Duplicate { .. } => "DUPLICATE",
            PlatformError::Validation { .. } => "VALIDATION_ERROR",
            PlatformError::InvalidCredentials => "INVALID_CREDENTIALS",
            PlatformError::Configuration { .. } => "CONFIGURATION_ERROR",
            PlatformError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            PlatformError::Credential(_) => StatusCode::UNAUTHORIZED,
            PlatformError::Principal(_) => StatusCode::FORBIDDEN,
            PlatformError::Ownership(OwnershipError::InvalidIdentifier) => StatusCode::BAD_REQUEST,
            PlatformError::Ownership(OwnershipError::ResourceNotFound) => StatusCode::NOT_FOUND,
            PlatformError::Ownership(OwnershipError::Violation) => StatusCode::FORBIDDEN,
            PlatformError::Budget(_) => StatusCode::BAD_REQUEST,
            PlatformError::NotFound { .. } => StatusCode::NOT_FOUND,
            PlatformError::Duplicate { .. } => StatusCode::CONFLICT,
            PlatformError::Validation { .. } => StatusCode::BAD_REQUEST,
            PlatformError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            PlatformError::Infrastructure(_)
            | PlatformError::Signing { .. }
            | PlatformError::Configuration { .. }
            | PlatformError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-caused failures are safe to describe; system failures are not.
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }

    fn public_message(&self) -> String {
        if self.is_client_error() {
            self.to_string()
        } else {
            "internal server error".to_string()
        }
    }
}

pub type Result<T> = std::result::Result<T, PlatformError>;

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for PlatformError {
    fn into_response(self) -> Response {
        if !self.is_client_error() {
            error!(kind = self.kind(), error = %self, "Request failed");
        }

        let body = ErrorResponse {
            error: self.kind().to_string(),
            message: self.public_message(),
        };

        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_errors_are_unauthorized() {
        let errors: Vec<PlatformError> = vec![
            CredentialError::Missing.into(),
            CredentialError::Malformed.into(),
            CredentialError::UnsupportedScheme { scheme: "Basic".into() }.into(),
            CredentialError::ExpiredToken.into(),
            CredentialError::InvalidSignature.into(),
        ];
        for e in errors {
            assert_eq!(e.status(), StatusCode::UNAUTHORIZED, "{}", e.kind());
        }
    }

    #[test]
    fn test_reference_status_mapping() {
        let forbidden: PlatformError = PrincipalError::UnknownPrincipal.into();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

        let missing: PlatformError = OwnershipError::ResourceNotFound.into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let violation: PlatformError = OwnershipError::Violation.into();
        assert_eq!(violation.status(), StatusCode::FORBIDDEN);

        let dup: PlatformError = BudgetError::DuplicatePeriod { month: 3, year: 2026 }.into();
        assert_eq!(dup.status(), StatusCode::BAD_REQUEST);
        assert_eq!(dup.kind(), "DUPLICATE_BUDGET");
    }

    #[test]
    fn test_infrastructure_detail_is_hidden() {
        let e = PlatformError::lookup_failed("connection refused to 10.0.0.5");
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.kind(), "LOOKUP_FAILED");
        assert!(!e.public_message().contains("10.0.0.5"));
    }

    #[test]
    fn test_unsupported_scheme_names_scheme() {
        let e: PlatformError = CredentialError::UnsupportedScheme { scheme: "Bearer".into() }.into();
        assert_eq!(e.to_string(), "unsupported authorization type: Bearer");
    }
}
