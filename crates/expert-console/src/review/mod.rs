//! Expert application review: operator authorization and status transitions.
//!
//! Control flow for an authorized change is `OperatorAuthorizer::authorize` followed by
//! `StatusTransitionService::apply`, which issues one update against the request store.
//! `ExpertReviewService` wires the pieces together for the HTTP router.

pub mod allowlist;
pub mod authorizer;
pub mod domain;
pub mod identity;
pub mod repository;
pub mod router;
pub mod service;
pub mod transition;

#[cfg(test)]
mod tests;

pub use allowlist::AllowlistGate;
pub use authorizer::{
    AuthorizationDecision, AuthorizationError, AuthorizeRequest, ForbiddenReason,
    OperatorAuthorizer,
};
pub use domain::{
    status, AttributedApproval, CommonAccount, DevAccount, DevCredential, ExpertRequest,
    OperatorIdentity, RequestId, RequestUpdate,
};
pub use identity::{CredentialVerifier, IdentityError, IdentityProvider, VerifiedIdentity};
pub use repository::{DevAccountStore, RepositoryError, RequestRepository};
pub use router::{misconfigured_router, review_router};
pub use service::{
    AuthorizedUpdateOutcome, ErrorKind, ExpertReviewService, ReviewServiceError, UpdatePath,
    UpdatePaths,
};
pub use transition::StatusTransitionService;
