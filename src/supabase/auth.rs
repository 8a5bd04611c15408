use reqwest::{Method, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{SupabaseClient, http};
use crate::error::ProviderError;

/// Identity resolved from an access token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: AuthUser,
}

/// Sign-up answers with a session when e-mail confirmation is off, otherwise
/// with the bare user.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(Session),
    User(AuthUser),
}

#[derive(Debug, Clone)]
pub struct SignUpOutcome {
    pub user: AuthUser,
    pub session: Option<Session>,
}

/// GoTrue endpoints under `auth/v1/`.
pub struct AuthApi<'a> {
    client: &'a SupabaseClient,
}

impl<'a> AuthApi<'a> {
    pub(super) fn new(client: &'a SupabaseClient) -> Self {
        Self { client }
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<SignUpOutcome, ProviderError> {
        let body = json!({
            "email": email,
            "password": password,
            "data": { "display_name": display_name },
        });
        let resp = self.post("signup", &body).await?;

        Ok(match resp.json::<SignUpResponse>().await? {
            SignUpResponse::Session(session) => SignUpOutcome {
                user: session.user.clone(),
                session: Some(session),
            },
            SignUpResponse::User(user) => SignUpOutcome {
                user,
                session: None,
            },
        })
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ProviderError> {
        let body = json!({ "email": email, "password": password });
        let resp = self.post("token?grant_type=password", &body).await?;
        Ok(resp.json().await?)
    }

    /// Resolves the owner of `access_token`. Successful lookups are cached for
    /// `supabase.auth_cache_ttl_secs`; failures never are.
    pub async fn get_user(&self, access_token: &str) -> Result<AuthUser, ProviderError> {
        if let Some(user) = self
            .client
            .auth_cache
            .as_ref()
            .and_then(|cache| cache.get(access_token))
        {
            return Ok(user);
        }

        let url = self.client.auth_url.join("user")?;
        let resp = self
            .client
            .http
            .request(Method::GET, url)
            .bearer_auth(access_token)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(http::auth_error(resp).await);
        }

        let user: AuthUser = resp.json().await?;
        if let Some(cache) = &self.client.auth_cache {
            cache.insert(access_token.to_string(), user.clone());
        }
        Ok(user)
    }

    async fn post(&self, path: &str, body: &serde_json::Value) -> Result<Response, ProviderError> {
        let url = self.client.auth_url.join(path)?;
        let resp = self
            .client
            .http
            .request(Method::POST, url)
            .json(body)
            .send()
            .await?;
        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(http::auth_error(resp).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_up_response_distinguishes_session_from_user() {
        let with_session: SignUpResponse = serde_json::from_str(
            r#"{"access_token":"t","token_type":"bearer","expires_in":3600,
                "refresh_token":"r","user":{"id":"u1","email":"a@b.c"}}"#,
        )
        .unwrap();
        assert!(matches!(with_session, SignUpResponse::Session(s) if s.access_token == "t"));

        let bare: SignUpResponse =
            serde_json::from_str(r#"{"id":"u2","email":"x@y.z","role":"authenticated"}"#).unwrap();
        assert!(matches!(bare, SignUpResponse::User(u) if u.id == "u2"));
    }
}
