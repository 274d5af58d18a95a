//! Request authentication.
//!
//! Every request passes through [`auth_middleware`], which resolves the
//! Authorization header into an explicit [`AuthState`]: no header means
//! `Anonymous`, a valid bearer token means `Authenticated`, and a present
//! but invalid token fails the request with 401 right here. Handlers that
//! need a tenant extract [`TenantContext`], which rejects `Anonymous`.

use crate::services::AccessTokenClaims;
use crate::startup::AppState;
use anyhow::anyhow;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;
use uuid::Uuid;

/// The resolved authentication state of a request.
#[derive(Debug, Clone)]
pub enum AuthState {
    Anonymous,
    Authenticated(TenantContext),
}

/// The tenant and user a request acts for.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub user_id: Uuid,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<String>,
    pub company_id: Uuid,
    pub company_name: Option<String>,
}

impl TenantContext {
    /// Display name used for protocol entries and audit fields.
    pub fn actor(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            _ => self.username.clone(),
        }
    }
}

impl From<AccessTokenClaims> for TenantContext {
    fn from(claims: AccessTokenClaims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username,
            first_name: claims.first_name,
            last_name: claims.last_name,
            role: claims.role,
            company_id: claims.company_id,
            company_name: claims.company_name,
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Resolve the Authorization header into an [`AuthState`] extension.
///
/// An invalid or expired token is a hard 401; it is never downgraded to an
/// anonymous request.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_state = match bearer_token(request.headers()) {
        None => AuthState::Anonymous,
        Some(token) => {
            let claims = state.jwt.validate_access_token(token)?;
            AuthState::Authenticated(TenantContext::from(claims))
        }
    };

    request.extensions_mut().insert(auth_state);
    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<AuthState>() {
            Some(AuthState::Authenticated(ctx)) => Ok(ctx.clone()),
            _ => Err(AppError::Unauthorized(anyhow!(
                "Authentication credentials were not provided."
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(first: Option<&str>, last: Option<&str>) -> TenantContext {
        TenantContext {
            user_id: Uuid::new_v4(),
            username: "emustermann".to_string(),
            first_name: first.map(String::from),
            last_name: last.map(String::from),
            role: None,
            company_id: Uuid::new_v4(),
            company_name: None,
        }
    }

    #[test]
    fn actor_prefers_full_name() {
        let ctx = context(Some("Erika"), Some("Mustermann"));
        assert_eq!(ctx.actor(), "Erika Mustermann");
    }

    #[test]
    fn actor_falls_back_to_username() {
        assert_eq!(context(Some("Erika"), None).actor(), "emustermann");
        assert_eq!(context(None, None).actor(), "emustermann");
    }

    #[test]
    fn bearer_token_requires_the_scheme() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, "Token abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc"));
    }
}
