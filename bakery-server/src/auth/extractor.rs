//! JWT extractors
//!
//! [`AuthUser`] authenticates any caller; [`AdminUser`] additionally
//! requires the `admin` role. Handlers take whichever they need.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::auth::{AuthUser, JwtService};
use crate::core::ServerState;
use crate::utils::AppError;

impl FromRequestParts<ServerState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        // Reuse a previous extraction on the same request
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let auth_header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let token = match auth_header {
            Some(header) => {
                JwtService::extract_from_header(header).ok_or(AppError::InvalidToken)?
            }
            None => {
                tracing::warn!(uri = %parts.uri, "Request without authorization header");
                return Err(AppError::Unauthorized);
            }
        };

        match state.jwt_service().validate_token(token) {
            Ok(claims) => {
                let user = AuthUser::try_from(claims).map_err(|_| AppError::InvalidToken)?;
                parts.extensions.insert(user.clone());
                Ok(user)
            }
            Err(e) => {
                tracing::warn!(uri = %parts.uri, error = %e, "Token validation failed");
                Err(AppError::InvalidToken)
            }
        }
    }
}

/// Authenticated caller with the `admin` role
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl FromRequestParts<ServerState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            tracing::warn!(user_id = user.id, uri = %parts.uri, "Admin access denied");
            return Err(AppError::forbidden("Admin role required"));
        }
        Ok(AdminUser(user))
    }
}
