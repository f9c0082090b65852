//! General backend client - sign-in and account endpoints
//!
//! Every request carries `Authorization: Bearer <token>` when the passed-in
//! session holds one. A 401 on an authenticated call clears the session and
//! surfaces as [`GatewayError::Unauthorized`]; the caller sends the user back
//! to sign-in. The caller decides whether to persist the change.

use crate::config::ApiSettings;
use crate::error::{upstream_reason, GatewayError, Result};
use crate::session::{validate_credentials, Credentials, SessionContext, UserContext, DEFAULT_ROLE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

const LOGIN_PATH: &str = "/auth/login";
const ME_PATH: &str = "/auth/me";

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    user: Option<LoginUser>,
}

#[derive(Debug, Deserialize)]
struct LoginUser {
    #[serde(default)]
    role: Option<String>,
}

/// Account details from `/auth/me`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountProfile {
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    DEFAULT_ROLE.to_string()
}

pub struct ApiClient {
    base_url: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(settings: &ApiSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| GatewayError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            timeout_secs: settings.timeout_secs,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(
        &self,
        request: reqwest::RequestBuilder,
        session: &SessionContext,
    ) -> reqwest::RequestBuilder {
        match session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Sign in. On success the session holds the token and user context.
    pub async fn login(
        &self,
        session: &mut SessionContext,
        credentials: &Credentials,
    ) -> Result<UserContext> {
        let errors = validate_credentials(credentials);
        if !errors.is_empty() {
            let joined: Vec<String> = errors.into_values().collect();
            return Err(GatewayError::InvalidInput(joined.join("; ")));
        }

        let email = credentials.email.trim().to_string();
        debug!(%email, "signing in");

        let response = self
            .client
            .post(self.url(LOGIN_PATH))
            .json(&serde_json::json!({
                "email": email,
                "password": credentials.password,
            }))
            .send()
            .await
            .map_err(|e| GatewayError::from_transport(e, self.timeout_secs))?;

        // A 401 here means bad credentials, not an expired session
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::UpstreamStatus {
                status: status.as_u16(),
                message: upstream_reason(&body),
            });
        }

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::from_transport(e, self.timeout_secs))?;

        let token = body
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| GatewayError::Format("Missing token in response".into()))?;

        let role = body
            .role
            .or(body.user.and_then(|u| u.role))
            .unwrap_or_else(default_role);

        let user = UserContext { email, role };
        *session = SessionContext::signed_in(token, user.clone());
        info!(email = %user.email, role = %user.role, "signed in");

        Ok(user)
    }

    /// Account details for the signed-in user
    pub async fn current_user(&self, session: &mut SessionContext) -> Result<AccountProfile> {
        self.get_json(session, ME_PATH).await
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        session: &mut SessionContext,
        path: &str,
    ) -> Result<T> {
        let request = self.authorized(self.client.get(self.url(path)), session);
        self.execute(session, request).await
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        session: &mut SessionContext,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let request = self.authorized(self.client.post(self.url(path)).json(body), session);
        self.execute(session, request).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        session: &mut SessionContext,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::from_transport(e, self.timeout_secs))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!("backend rejected session token, clearing session");
            session.clear();
            return Err(GatewayError::Unauthorized);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::UpstreamStatus {
                status: status.as_u16(),
                message: upstream_reason(&body),
            });
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError::from_transport(e, self.timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_login_validates_before_sending() {
        // Unroutable base URL: a request would fail with Network, not InvalidInput
        let client = ApiClient::new(&ApiSettings {
            base_url: "http://127.0.0.1:9/api".into(),
            timeout_secs: 1,
        })
        .unwrap();
        let mut session = SessionContext::new();

        let err = client
            .login(
                &mut session,
                &Credentials {
                    email: "bad".into(),
                    password: "123".into(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::InvalidInput(_)));
        assert!(!session.is_signed_in());
    }

    #[test]
    fn test_profile_role_defaults() {
        let profile: AccountProfile =
            serde_json::from_str(r#"{"email": "dr@clinic.org"}"#).unwrap();
        assert_eq!(profile.role, "clinician");
        assert!(profile.full_name.is_none());
    }
}
