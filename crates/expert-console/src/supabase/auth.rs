use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{SupabaseClient, UpstreamError};
use crate::review::domain::OperatorIdentity;
use crate::review::identity::{IdentityError, IdentityProvider};

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    user: Option<OperatorIdentity>,
}

#[derive(Deserialize)]
struct UserList {
    #[serde(default)]
    users: Vec<OperatorIdentity>,
}

/// GoTrue auth server: password grant and admin user directory.
#[derive(Debug, Clone)]
pub struct GoTrueIdentityProvider {
    client: SupabaseClient,
}

impl GoTrueIdentityProvider {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IdentityProvider for GoTrueIdentityProvider {
    async fn password_grant(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<OperatorIdentity>, IdentityError> {
        let response = self
            .client
            .request(Method::POST, "/auth/v1/token")
            .query(&[("grant_type", "password")])
            .json(&PasswordGrant { email, password })
            .send()
            .await
            .map_err(|err| IdentityError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            debug!(status = %response.status(), "password grant rejected");
            return Ok(None);
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|err| IdentityError::Protocol(err.to_string()))?;
        Ok(body.user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<OperatorIdentity>, IdentityError> {
        let response = self
            .client
            .request(Method::GET, "/auth/v1/admin/users")
            .query(&[("filter", email)])
            .send()
            .await
            .map_err(|err| IdentityError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            let (status, body, raw) = UpstreamError::read(response).await;
            return Err(IdentityError::Protocol(body.describe(status, &raw)));
        }

        let list: UserList = response
            .json()
            .await
            .map_err(|err| IdentityError::Protocol(err.to_string()))?;

        // The filter is a substring search; only an exact email match counts.
        Ok(list
            .users
            .into_iter()
            .find(|user| user.email.as_deref() == Some(email)))
    }
}
