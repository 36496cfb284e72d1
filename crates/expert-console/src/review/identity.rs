use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::domain::{DevCredential, OperatorIdentity};

/// Identity provider reachable with the service-level key.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// One password-grant round trip. A rejected credential is `Ok(None)`; only transport
    /// and protocol faults are errors.
    async fn password_grant(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<OperatorIdentity>, IdentityError>;

    /// Directory lookup by exact email.
    async fn find_by_email(&self, email: &str) -> Result<Option<OperatorIdentity>, IdentityError>;
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("identity provider unreachable: {0}")]
    Transport(String),
    #[error("identity provider returned an unexpected response: {0}")]
    Protocol(String),
}

/// An individual proven by password, with the name the change will be attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedIdentity {
    pub email: String,
    pub display_name: String,
}

/// Checks the individual credential presented while acting as the shared account.
///
/// Exactly one attempt per call. Callers must not loop on `Ok(None)`.
pub struct CredentialVerifier<P> {
    provider: Arc<P>,
}

impl<P> CredentialVerifier<P>
where
    P: IdentityProvider + 'static,
{
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    pub async fn verify(
        &self,
        credential: &DevCredential,
    ) -> Result<Option<VerifiedIdentity>, IdentityError> {
        if !credential.is_complete() {
            return Ok(None);
        }

        let identity = self
            .provider
            .password_grant(credential.email(), credential.password())
            .await?;

        Ok(identity.map(|identity| {
            let email = identity
                .email
                .clone()
                .unwrap_or_else(|| credential.email().to_string());
            VerifiedIdentity {
                display_name: identity.display_name(credential.email()),
                email,
            }
        }))
    }
}

impl<P> Clone for CredentialVerifier<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
        }
    }
}
