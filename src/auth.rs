//! Token authentication for protected routes.
//!
//! Handlers that need a signed-in caller take [`AuthUser`] as an argument.
//! The extractor accepts `Authorization: Token <key>` and `Authorization:
//! Bearer <key>` and rejects everything else with 401.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
};
use model::entities::user;
use tracing::{debug, warn};

use crate::schemas::{api_error, database_error, ApiError, AppState};

const TOKEN_SCHEMES: [&str; 2] = ["Token", "Bearer"];

/// The active user owning the token presented with the request.
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

/// Pull the token key out of the `Authorization` header.
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, key) = value.trim().split_once(' ')?;
    let key = key.trim();

    if key.is_empty() || key.contains(' ') {
        return None;
    }
    TOKEN_SCHEMES
        .iter()
        .any(|s| s.eq_ignore_ascii_case(scheme))
        .then_some(key)
}

fn unauthorized(message: &str) -> ApiError {
    api_error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(key) = extract_token(&parts.headers) else {
            debug!("Request carries no usable authorization token");
            return Err(unauthorized("Authentication credentials were not provided"));
        };

        match state.users.user_for_token(key).await {
            Ok(Some(user)) => {
                debug!("Authenticated user {}", user.id);
                Ok(AuthUser(user))
            }
            Ok(None) => {
                warn!("Rejected unknown or inactive token");
                Err(unauthorized("Invalid token"))
            }
            Err(e) => Err(database_error("Failed to resolve token", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_extract_token_schemes() {
        assert_eq!(extract_token(&headers_with("Token abc123")), Some("abc123"));
        assert_eq!(extract_token(&headers_with("Bearer abc123")), Some("abc123"));
        assert_eq!(extract_token(&headers_with("token abc123")), Some("abc123"));
    }

    #[test]
    fn test_extract_token_rejects_malformed_headers() {
        assert_eq!(extract_token(&HeaderMap::new()), None);
        assert_eq!(extract_token(&headers_with("Token")), None);
        assert_eq!(extract_token(&headers_with("Token ")), None);
        assert_eq!(extract_token(&headers_with("Basic dXNlcjpwYXNz")), None);
        assert_eq!(extract_token(&headers_with("Token abc def")), None);
    }
}
