use std::fmt;
use std::sync::Arc;

use super::allowlist::AllowlistGate;
use super::authorizer::{
    AuthorizationDecision, AuthorizationError, AuthorizeRequest, OperatorAuthorizer,
};
use super::domain::{filled, CommonAccount, ExpertRequest, RequestId};
use super::identity::IdentityProvider;
use super::repository::{DevAccountStore, RepositoryError, RequestRepository};
use super::transition::StatusTransitionService;
use crate::config::ReviewConfig;

/// Which of the two status-update capabilities the deployer turned on.
///
/// Both default to off; a disabled path refuses every call before looking at it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdatePaths {
    pub direct: bool,
    pub authorized: bool,
}

impl UpdatePaths {
    pub fn all() -> Self {
        Self {
            direct: true,
            authorized: true,
        }
    }
}

impl From<&ReviewConfig> for UpdatePaths {
    fn from(config: &ReviewConfig) -> Self {
        Self {
            direct: config.direct_update_enabled,
            authorized: config.authorized_update_enabled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePath {
    Direct,
    Authorized,
}

impl fmt::Display for UpdatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdatePath::Direct => f.write_str("direct update"),
            UpdatePath::Authorized => f.write_str("authorized update"),
        }
    }
}

/// Result of an authorized update that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthorizedUpdateOutcome {
    Updated(ExpertRequest),
    NeedsDevCredentials,
}

/// Service composing the allowlist gate, operator authorizer, and transition service
/// behind the console's four operations.
pub struct ExpertReviewService<R, D, P> {
    repository: Arc<R>,
    allowlist: AllowlistGate<D>,
    authorizer: OperatorAuthorizer<D, P>,
    transitions: StatusTransitionService<R>,
    paths: UpdatePaths,
}

impl<R, D, P> ExpertReviewService<R, D, P>
where
    R: RequestRepository + 'static,
    D: DevAccountStore + 'static,
    P: IdentityProvider + 'static,
{
    pub fn new(
        repository: Arc<R>,
        dev_accounts: Arc<D>,
        identity: Arc<P>,
        common_account: Option<CommonAccount>,
        paths: UpdatePaths,
    ) -> Self {
        let allowlist = AllowlistGate::new(dev_accounts);
        let authorizer = OperatorAuthorizer::new(allowlist.clone(), identity, common_account);
        let transitions = StatusTransitionService::new(Arc::clone(&repository));

        Self {
            repository,
            allowlist,
            authorizer,
            transitions,
            paths,
        }
    }

    pub fn paths(&self) -> UpdatePaths {
        self.paths
    }

    /// Allowlist membership, as used by the login screen.
    pub async fn check_allowed(&self, email: Option<String>) -> Result<bool, ReviewServiceError> {
        let email = filled(email).ok_or(ReviewServiceError::MissingField {
            fields: vec!["email"],
        })?;
        Ok(self.allowlist.is_allowed(&email).await?)
    }

    /// Every request, newest first.
    pub async fn list_requests(&self) -> Result<Vec<ExpertRequest>, ReviewServiceError> {
        Ok(self.repository.list_all().await?)
    }

    /// Unauthenticated status change. Writes only `status`; `pic` is left as it was.
    pub async fn direct_update(
        &self,
        id: Option<RequestId>,
        status: Option<String>,
    ) -> Result<ExpertRequest, ReviewServiceError> {
        if !self.paths.direct {
            return Err(ReviewServiceError::PathDisabled(UpdatePath::Direct));
        }

        let id = id.filter(|id| !id.is_blank());
        let status = filled(status);
        let (Some(id), Some(status)) = (id.clone(), status.clone()) else {
            let fields = [("id", id.is_none()), ("status", status.is_none())]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
            return Err(ReviewServiceError::MissingField { fields });
        };

        Ok(self.transitions.apply_unattributed(&id, status).await?)
    }

    /// Authorize the operator, then commit status and attribution together.
    pub async fn authorized_update(
        &self,
        request: AuthorizeRequest,
    ) -> Result<AuthorizedUpdateOutcome, ReviewServiceError> {
        if !self.paths.authorized {
            return Err(ReviewServiceError::PathDisabled(UpdatePath::Authorized));
        }

        match self.authorizer.authorize(request).await? {
            AuthorizationDecision::NeedsEscalation => {
                Ok(AuthorizedUpdateOutcome::NeedsDevCredentials)
            }
            AuthorizationDecision::Authorized(approval) => {
                let record = self.transitions.apply(approval).await?;
                Ok(AuthorizedUpdateOutcome::Updated(record))
            }
        }
    }
}

/// Failure categories exposed at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingField,
    ServerMisconfigured,
    Forbidden,
    PathDisabled,
    NotFound,
    DataConsistency,
    InfrastructureFailure,
}

/// Error raised by the review service.
#[derive(Debug, thiserror::Error)]
pub enum ReviewServiceError {
    #[error("missing required field(s): {}", .fields.join(", "))]
    MissingField { fields: Vec<&'static str> },
    #[error("{0} is disabled")]
    PathDisabled(UpdatePath),
    #[error("server misconfigured: {0}")]
    ServerMisconfigured(String),
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ReviewServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReviewServiceError::MissingField { .. } => ErrorKind::MissingField,
            ReviewServiceError::PathDisabled(_) => ErrorKind::PathDisabled,
            ReviewServiceError::ServerMisconfigured(_) => ErrorKind::ServerMisconfigured,
            ReviewServiceError::Authorization(err) => match err {
                AuthorizationError::MissingField { .. } => ErrorKind::MissingField,
                AuthorizationError::ServerMisconfigured(_) => ErrorKind::ServerMisconfigured,
                AuthorizationError::Forbidden(_) => ErrorKind::Forbidden,
                AuthorizationError::Allowlist(err) => repository_kind(err),
                AuthorizationError::Identity(_) => ErrorKind::InfrastructureFailure,
            },
            ReviewServiceError::Repository(err) => repository_kind(err),
        }
    }
}

fn repository_kind(err: &RepositoryError) -> ErrorKind {
    match err {
        RepositoryError::NotFound(_) => ErrorKind::NotFound,
        RepositoryError::AmbiguousMatch { .. } => ErrorKind::DataConsistency,
        RepositoryError::Unavailable(_) => ErrorKind::InfrastructureFailure,
    }
}
