//! Request-level errors raised outside the domain services.
//!
//! Domain failures (ledger, checkout, reconciliation) carry their own codes.
//! This covers who may call what, and lookups by id.

use thiserror::Error;

use crate::jwt::JwtError;

/// Access and lookup errors.
#[derive(Debug, Error)]
pub enum AppError {
    /// No bearer token on a protected route.
    #[error("Authorization header with Bearer token is required")]
    MissingToken,

    /// Bearer token past its expiry.
    #[error("Token has expired")]
    TokenExpired,

    /// Bearer token with a bad signature or shape.
    #[error("Invalid or malformed token")]
    InvalidToken,

    /// Handler reached without authenticated claims.
    #[error("Authentication required")]
    Unauthenticated,

    /// Authenticated, but the role does not allow this.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// No record with this id.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::MissingToken | Self::TokenExpired | Self::InvalidToken | Self::Unauthenticated => {
                401
            }
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::MissingToken => "MISSING_TOKEN",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::Unauthenticated => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
        }
    }
}

impl From<JwtError> for AppError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => Self::TokenExpired,
            JwtError::EncodingError(_) | JwtError::DecodingError(_) => Self::InvalidToken,
        }
    }
}
