//! Authentication middleware for protected routes.
//!
//! Tokens are issued by the external auth service. This layer only checks
//! the signature and expiry, then exposes the account and role to handlers.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use storeledger_shared::types::AccountId;
use storeledger_shared::{AppError, Claims, Role};

use crate::AppState;
use crate::error::ApiError;

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
}

/// Validates the bearer token and stores its claims in request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(token) = auth_header.and_then(extract_bearer_token) else {
        return ApiError::from(AppError::MissingToken).into_response();
    };

    match state.jwt_service.validate_token(token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => ApiError::from(AppError::from(e)).into_response(),
    }
}

/// Extractor for the authenticated account.
///
/// Only available on routes behind [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    /// Returns the account ID from the claims.
    #[must_use]
    pub fn account_id(&self) -> AccountId {
        AccountId::from_uuid(self.0.account_id())
    }

    /// Returns the account's role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.0.role
    }

    /// Rejects callers that may not operate the till.
    pub fn require_till_operator(&self) -> Result<(), ApiError> {
        if self.role().can_operate_till() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "staff or admin role required for point-of-sale operations".to_string(),
            )
            .into())
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| AppError::Unauthenticated.into())
    }
}
