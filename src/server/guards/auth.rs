use crate::error::{ApiError, ProviderError};
use crate::server::router::AppState;
use crate::supabase::{AuthUser, SupabaseClient};
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

/// Caller resolved from `Authorization: Bearer <access token>`.
#[derive(Debug, Clone)]
pub struct Authenticated(pub AuthUser);

impl Authenticated {
    pub fn id(&self) -> &str {
        &self.0.id
    }
}

fn extract_bearer(headers: &HeaderMap) -> Result<String, ApiError> {
    if let Some(auth) = headers.typed_get::<Authorization<Bearer>>() {
        return Ok(auth.token().to_string());
    }
    match headers.get(AUTHORIZATION) {
        None => Err(ApiError::MissingAuthorization),
        Some(_) => Err(ApiError::Unauthorized(
            "Authorization header must be a Bearer token".to_string(),
        )),
    }
}

/// Validates `token` with the auth server. Rejections become 401; transport and
/// server failures stay 500.
pub async fn resolve_user(client: &SupabaseClient, token: &str) -> Result<AuthUser, ApiError> {
    client.auth().get_user(token).await.map_err(|err| match err {
        ProviderError::Auth { status, message } if status.is_client_error() => {
            ApiError::Unauthorized(message)
        }
        ProviderError::UpstreamStatus { status, .. } if status.is_client_error() => {
            ApiError::Unauthorized("Invalid token".to_string())
        }
        other => ApiError::Provider(other),
    })
}

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer(&parts.headers)?;
        let user = resolve_user(&state.supabase, &token).await?;
        Ok(Authenticated(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_is_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_bearer(&headers).unwrap(), "abc.def");
    }

    #[test]
    fn missing_and_malformed_headers_are_distinguished() {
        let headers = HeaderMap::new();
        assert!(matches!(
            extract_bearer(&headers),
            Err(ApiError::MissingAuthorization)
        ));

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic Zm9vOmJhcg=="));
        assert!(matches!(extract_bearer(&headers), Err(ApiError::Unauthorized(_))));
    }
}
