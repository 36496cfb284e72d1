use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::authorizer::AuthorizeRequest;
use super::domain::{DevCredential, RequestId};
use super::identity::IdentityProvider;
use super::repository::{DevAccountStore, RequestRepository};
use super::service::{AuthorizedUpdateOutcome, ErrorKind, ExpertReviewService, ReviewServiceError};

pub const CHECK_ALLOWED_PATH: &str = "/api/auth/check-allowed";
pub const EXPERT_REQUESTS_PATH: &str = "/api/expert-requests";
pub const VERIFY_AND_UPDATE_PATH: &str = "/api/expert-requests/verify-and-update";

#[derive(Debug, Default, Deserialize)]
pub struct CheckAllowedBody {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DirectUpdateBody {
    #[serde(default)]
    pub id: Option<RequestId>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizedUpdateBody {
    #[serde(default)]
    pub id: Option<RequestId>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub operator_email: Option<String>,
    #[serde(default)]
    pub dev_email: Option<String>,
    #[serde(default)]
    pub dev_password: Option<String>,
}

impl From<AuthorizedUpdateBody> for AuthorizeRequest {
    fn from(body: AuthorizedUpdateBody) -> Self {
        let dev_credential = match (body.dev_email, body.dev_password) {
            (Some(email), Some(password)) => Some(DevCredential::new(email, password)),
            _ => None,
        };

        AuthorizeRequest {
            request_id: body.id,
            new_status: body.status,
            operator_email: body.operator_email,
            dev_credential,
        }
    }
}

/// Router exposing the console's review operations.
pub fn review_router<R, D, P>(service: Arc<ExpertReviewService<R, D, P>>) -> Router
where
    R: RequestRepository + 'static,
    D: DevAccountStore + 'static,
    P: IdentityProvider + 'static,
{
    Router::new()
        .route(CHECK_ALLOWED_PATH, post(check_allowed_handler::<R, D, P>))
        .route(
            EXPERT_REQUESTS_PATH,
            get(list_handler::<R, D, P>).patch(direct_update_handler::<R, D, P>),
        )
        .route(
            VERIFY_AND_UPDATE_PATH,
            post(authorized_update_handler::<R, D, P>),
        )
        .with_state(service)
}

/// Same routes as [`review_router`], each answering that the server is misconfigured.
///
/// Mounted when the store or identity provider settings are absent so that no review
/// operation can run without them.
pub fn misconfigured_router(reason: impl Into<String>) -> Router {
    let reason: Arc<str> = Arc::from(reason.into());
    Router::new()
        .route(CHECK_ALLOWED_PATH, post(misconfigured_handler))
        .route(
            EXPERT_REQUESTS_PATH,
            get(misconfigured_handler).patch(misconfigured_handler),
        )
        .route(VERIFY_AND_UPDATE_PATH, post(misconfigured_handler))
        .with_state(reason)
}

pub(crate) async fn check_allowed_handler<R, D, P>(
    State(service): State<Arc<ExpertReviewService<R, D, P>>>,
    body: Result<Json<CheckAllowedBody>, JsonRejection>,
) -> Response
where
    R: RequestRepository + 'static,
    D: DevAccountStore + 'static,
    P: IdentityProvider + 'static,
{
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };

    match service.check_allowed(body.email).await {
        Ok(allowed) => (StatusCode::OK, Json(json!({ "allowed": allowed }))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_handler<R, D, P>(
    State(service): State<Arc<ExpertReviewService<R, D, P>>>,
) -> Response
where
    R: RequestRepository + 'static,
    D: DevAccountStore + 'static,
    P: IdentityProvider + 'static,
{
    match service.list_requests().await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn direct_update_handler<R, D, P>(
    State(service): State<Arc<ExpertReviewService<R, D, P>>>,
    body: Result<Json<DirectUpdateBody>, JsonRejection>,
) -> Response
where
    R: RequestRepository + 'static,
    D: DevAccountStore + 'static,
    P: IdentityProvider + 'static,
{
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };

    match service.direct_update(body.id, body.status).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn authorized_update_handler<R, D, P>(
    State(service): State<Arc<ExpertReviewService<R, D, P>>>,
    body: Result<Json<AuthorizedUpdateBody>, JsonRejection>,
) -> Response
where
    R: RequestRepository + 'static,
    D: DevAccountStore + 'static,
    P: IdentityProvider + 'static,
{
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };

    match service.authorized_update(body.into()).await {
        Ok(AuthorizedUpdateOutcome::Updated(record)) => {
            (StatusCode::OK, Json(record)).into_response()
        }
        Ok(AuthorizedUpdateOutcome::NeedsDevCredentials) => (
            StatusCode::OK,
            Json(json!({ "needsDevCredentials": true })),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

async fn misconfigured_handler(State(reason): State<Arc<str>>) -> Response {
    error_response(ReviewServiceError::ServerMisconfigured(reason.to_string()))
}

pub(crate) fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::MissingField => StatusCode::BAD_REQUEST,
        ErrorKind::Forbidden | ErrorKind::PathDisabled => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::DataConsistency => StatusCode::CONFLICT,
        ErrorKind::ServerMisconfigured | ErrorKind::InfrastructureFailure => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(err: ReviewServiceError) -> Response {
    let status = status_for(err.kind());
    if status.is_server_error() {
        error!(error = %err, "review operation failed");
    }

    let payload = json!({ "error": err.to_string() });
    (status, Json(payload)).into_response()
}

fn rejection_response(rejection: JsonRejection) -> Response {
    let payload = json!({ "error": rejection.body_text() });
    (rejection.status(), Json(payload)).into_response()
}
