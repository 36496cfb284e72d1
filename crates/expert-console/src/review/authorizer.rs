use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::allowlist::AllowlistGate;
use super::domain::{filled, AttributedApproval, CommonAccount, DevCredential, RequestId};
use super::identity::{CredentialVerifier, IdentityError, IdentityProvider};
use super::repository::{DevAccountStore, RepositoryError};

/// A status change as requested by an operator, before any checks.
#[derive(Debug, Clone, Default)]
pub struct AuthorizeRequest {
    pub request_id: Option<RequestId>,
    pub new_status: Option<String>,
    pub operator_email: Option<String>,
    pub dev_credential: Option<DevCredential>,
}

/// Outcome of a policy check that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationDecision {
    Authorized(AttributedApproval),
    /// The shared account acted without an individual credential. Nothing is kept
    /// server-side; the caller resubmits the whole request with the credential.
    NeedsEscalation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForbiddenReason {
    OperatorNotAllowed,
    InvalidDevCredentials,
}

impl fmt::Display for ForbiddenReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForbiddenReason::OperatorNotAllowed => f.write_str("operator not allowed"),
            ForbiddenReason::InvalidDevCredentials => f.write_str("developer credentials invalid"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthorizationError {
    #[error("missing required field(s): {}", .fields.join(", "))]
    MissingField { fields: Vec<&'static str> },
    #[error("server misconfigured: {0}")]
    ServerMisconfigured(String),
    #[error("{0}")]
    Forbidden(ForbiddenReason),
    #[error(transparent)]
    Allowlist(#[from] RepositoryError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// Decides whether an operator may commit a status change and who gets credited.
///
/// Individually named operators must be on the allowlist. The shared account is never
/// allowlisted on its own merit: every action taken with it has to carry an individual
/// credential, and the verified individual is the one credited.
pub struct OperatorAuthorizer<D, P> {
    allowlist: AllowlistGate<D>,
    verifier: CredentialVerifier<P>,
    directory: Arc<P>,
    common_account: Option<CommonAccount>,
}

impl<D, P> OperatorAuthorizer<D, P>
where
    D: DevAccountStore + 'static,
    P: IdentityProvider + 'static,
{
    pub fn new(
        allowlist: AllowlistGate<D>,
        directory: Arc<P>,
        common_account: Option<CommonAccount>,
    ) -> Self {
        Self {
            allowlist,
            verifier: CredentialVerifier::new(Arc::clone(&directory)),
            directory,
            common_account,
        }
    }

    pub async fn authorize(
        &self,
        request: AuthorizeRequest,
    ) -> Result<AuthorizationDecision, AuthorizationError> {
        let AuthorizeRequest {
            request_id,
            new_status,
            operator_email,
            dev_credential,
        } = request;

        let request_id = request_id.filter(|id| !id.is_blank());
        let new_status = filled(new_status);
        let operator_email = filled(operator_email);
        let (Some(request_id), Some(new_status), Some(operator_email)) =
            (request_id.clone(), new_status.clone(), operator_email.clone())
        else {
            let fields = [
                ("id", request_id.is_none()),
                ("status", new_status.is_none()),
                ("operatorEmail", operator_email.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, absent)| absent.then_some(name))
            .collect();
            return Err(AuthorizationError::MissingField { fields });
        };

        let common_account = self.common_account.as_ref().ok_or_else(|| {
            warn!("authorized update refused: common account is not configured");
            AuthorizationError::ServerMisconfigured(
                "common account address is not configured".to_string(),
            )
        })?;

        let attributed_name = if common_account.matches(&operator_email) {
            let Some(credential) = dev_credential.filter(DevCredential::is_complete) else {
                debug!(%request_id, "common account requires developer credentials");
                return Ok(AuthorizationDecision::NeedsEscalation);
            };

            match self.verifier.verify(&credential).await? {
                Some(identity) => {
                    info!(
                        %request_id,
                        status = %new_status,
                        attributed = %identity.display_name,
                        "escalated change authorized"
                    );
                    identity.display_name
                }
                None => {
                    warn!(%request_id, dev_email = %credential.email(), "developer credentials rejected");
                    return Err(AuthorizationError::Forbidden(
                        ForbiddenReason::InvalidDevCredentials,
                    ));
                }
            }
        } else {
            if !self.allowlist.is_allowed(&operator_email).await? {
                warn!(%request_id, operator = %operator_email, "operator not on allowlist");
                return Err(AuthorizationError::Forbidden(
                    ForbiddenReason::OperatorNotAllowed,
                ));
            }

            let name = self.resolve_attribution(&operator_email).await;
            info!(
                %request_id,
                status = %new_status,
                attributed = %name,
                "operator change authorized"
            );
            name
        };

        Ok(AuthorizationDecision::Authorized(AttributedApproval {
            request_id,
            new_status,
            attributed_name,
        }))
    }

    /// Optional enrichment of an allowlisted operator's attribution.
    ///
    /// Looks the email up in the identity directory and uses the display name found there.
    /// The raw email is the defined fallback when the lookup errors or finds nobody; this
    /// step never fails the authorization.
    async fn resolve_attribution(&self, email: &str) -> String {
        match self.directory.find_by_email(email).await {
            Ok(Some(identity)) => identity.display_name(email),
            Ok(None) => email.to_string(),
            Err(err) => {
                debug!(operator = %email, error = %err, "display name lookup failed, using email");
                email.to_string()
            }
        }
    }
}
