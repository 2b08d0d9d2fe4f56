use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Query},
    http::{header::AUTHORIZATION, request::Parts},
};
use serde::Deserialize;

use crate::auth::{extract_bearer_token, AuthError, JwtService, UserSession};

#[derive(Debug, Deserialize)]
struct TokenQuery {
    access_token: Option<String>,
}

/// Resolves the caller from `Authorization: Bearer <jwt>`.
///
/// Browsers cannot attach headers to an `EventSource`, so the
/// `access_token` query parameter is accepted when the header is absent.
#[async_trait]
impl<S> FromRequestParts<S> for UserSession
where
    JwtService: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jwt_service = JwtService::from_ref(state);

        if let Some(header) = parts.headers.get(AUTHORIZATION) {
            let header = header
                .to_str()
                .map_err(|_| AuthError::InvalidAuthHeaderFormat)?;
            let token = extract_bearer_token(header)?;
            return jwt_service.extract_user_session(token);
        }

        let token = Query::<TokenQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(query)| query.access_token)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingAuthHeader)?;

        jwt_service.extract_user_session(&token)
    }
}
