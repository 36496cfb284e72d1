use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

use crate::review::domain::{ExpertRequest, OperatorIdentity, RequestId, RequestUpdate};
use crate::review::identity::{IdentityError, IdentityProvider};
use crate::review::repository::{DevAccountStore, RepositoryError, RequestRepository};
use crate::review::{review_router, CommonAccount, ExpertReviewService, UpdatePaths};

pub(super) const OPERATOR: &str = "a@x.com";
pub(super) const COMMON: &str = "shared@x.com";
pub(super) const DEV: &str = "dev1@x.com";
pub(super) const DEV_PASSWORD: &str = "correct horse";

pub(super) fn request_row(id: i64, status: &str) -> ExpertRequest {
    let mut fields = BTreeMap::new();
    fields.insert("name".to_string(), json!(format!("Applicant {id}")));
    fields.insert("email".to_string(), json!(format!("applicant{id}@example.com")));
    fields.insert("bio".to_string(), json!("Ten years of field work"));

    ExpertRequest {
        id: RequestId::Number(id),
        status: status.to_string(),
        pic: None,
        created_at: Some(
            Utc.with_ymd_and_hms(2025, 10, 1, 9, 0, 0).unwrap() + chrono::Duration::hours(id),
        ),
        updated_at: None,
        fields,
    }
}

pub(super) fn identity(email: &str, full_name: Option<&str>, name: Option<&str>) -> OperatorIdentity {
    let mut user_metadata = BTreeMap::new();
    if let Some(full_name) = full_name {
        user_metadata.insert("full_name".to_string(), json!(full_name));
    }
    if let Some(name) = name {
        user_metadata.insert("name".to_string(), json!(name));
    }

    OperatorIdentity {
        id: Some(format!("uid-{email}")),
        email: Some(email.to_string()),
        user_metadata,
    }
}

#[derive(Default)]
pub(super) struct MemoryRequests {
    rows: Mutex<Vec<ExpertRequest>>,
    updates: AtomicUsize,
}

impl MemoryRequests {
    pub(super) fn with_rows(rows: Vec<ExpertRequest>) -> Self {
        Self {
            rows: Mutex::new(rows),
            updates: AtomicUsize::new(0),
        }
    }

    pub(super) fn row(&self, id: &RequestId) -> Option<ExpertRequest> {
        self.rows
            .lock()
            .expect("repository mutex poisoned")
            .iter()
            .find(|row| &row.id == id)
            .cloned()
    }

    pub(super) fn snapshot(&self) -> Vec<ExpertRequest> {
        self.rows.lock().expect("repository mutex poisoned").clone()
    }

    pub(super) fn update_calls(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RequestRepository for MemoryRequests {
    async fn list_all(&self) -> Result<Vec<ExpertRequest>, RepositoryError> {
        let mut rows = self.snapshot();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn update(
        &self,
        id: &RequestId,
        update: RequestUpdate,
    ) -> Result<ExpertRequest, RepositoryError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.rows.lock().expect("repository mutex poisoned");
        let matched = guard.iter().filter(|row| &row.id == id).count();
        match matched {
            0 => Err(RepositoryError::NotFound(id.clone())),
            1 => {
                let row = guard
                    .iter_mut()
                    .find(|row| &row.id == id)
                    .expect("matched row present");
                row.status = update.status;
                if let Some(pic) = update.pic {
                    row.pic = Some(pic);
                }
                row.updated_at = Some(Utc::now());
                Ok(row.clone())
            }
            matched => Err(RepositoryError::AmbiguousMatch {
                id: id.clone(),
                matched,
            }),
        }
    }
}

#[derive(Default)]
pub(super) struct MemoryDevAccounts {
    mails: HashSet<String>,
    lookups: AtomicUsize,
}

impl MemoryDevAccounts {
    pub(super) fn with_mails(mails: &[&str]) -> Self {
        Self {
            mails: mails.iter().map(|mail| mail.to_string()).collect(),
            lookups: AtomicUsize::new(0),
        }
    }

    pub(super) fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DevAccountStore for MemoryDevAccounts {
    async fn contains(&self, email: &str) -> Result<bool, RepositoryError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.mails.contains(email))
    }
}

pub(super) struct UnavailableStore;

#[async_trait]
impl RequestRepository for UnavailableStore {
    async fn list_all(&self) -> Result<Vec<ExpertRequest>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    async fn update(
        &self,
        _id: &RequestId,
        _update: RequestUpdate,
    ) -> Result<ExpertRequest, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[async_trait]
impl DevAccountStore for UnavailableStore {
    async fn contains(&self, _email: &str) -> Result<bool, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct StubIdentity {
    accounts: HashMap<String, (String, OperatorIdentity)>,
    directory: HashMap<String, OperatorIdentity>,
    directory_down: bool,
    grant_unreachable: bool,
    grants: AtomicUsize,
    lookups: AtomicUsize,
}

impl StubIdentity {
    pub(super) fn with_account(mut self, email: &str, password: &str, full_name: Option<&str>) -> Self {
        self.accounts.insert(
            email.to_string(),
            (password.to_string(), identity(email, full_name, None)),
        );
        self
    }

    pub(super) fn with_directory_entry(mut self, identity: OperatorIdentity) -> Self {
        let email = identity.email.clone().unwrap_or_default();
        self.directory.insert(email, identity);
        self
    }

    pub(super) fn directory_down(mut self) -> Self {
        self.directory_down = true;
        self
    }

    pub(super) fn grant_unreachable(mut self) -> Self {
        self.grant_unreachable = true;
        self
    }

    pub(super) fn grants(&self) -> usize {
        self.grants.load(Ordering::SeqCst)
    }

    pub(super) fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for StubIdentity {
    async fn password_grant(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<OperatorIdentity>, IdentityError> {
        self.grants.fetch_add(1, Ordering::SeqCst);
        if self.grant_unreachable {
            return Err(IdentityError::Transport("connection refused".to_string()));
        }

        Ok(self
            .accounts
            .get(email)
            .filter(|(expected, _)| expected == password)
            .map(|(_, identity)| identity.clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<OperatorIdentity>, IdentityError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.directory_down {
            return Err(IdentityError::Protocol("500 Internal Server Error".to_string()));
        }
        Ok(self.directory.get(email).cloned())
    }
}

pub(super) type TestService = ExpertReviewService<MemoryRequests, MemoryDevAccounts, StubIdentity>;

pub(super) struct Harness {
    pub(super) service: Arc<TestService>,
    pub(super) requests: Arc<MemoryRequests>,
    pub(super) dev_accounts: Arc<MemoryDevAccounts>,
    pub(super) identity: Arc<StubIdentity>,
}

pub(super) fn harness(identity: StubIdentity) -> Harness {
    harness_with(identity, Some(COMMON), UpdatePaths::all())
}

pub(super) fn harness_with(
    identity: StubIdentity,
    common_account: Option<&str>,
    paths: UpdatePaths,
) -> Harness {
    let requests = Arc::new(MemoryRequests::with_rows(vec![
        request_row(1, crate::review::status::UNREVIEWED),
        request_row(2, crate::review::status::UNREVIEWED),
    ]));
    let dev_accounts = Arc::new(MemoryDevAccounts::with_mails(&[OPERATOR, DEV]));
    let identity = Arc::new(identity);
    let service = Arc::new(ExpertReviewService::new(
        requests.clone(),
        dev_accounts.clone(),
        identity.clone(),
        common_account.map(CommonAccount::new),
        paths,
    ));

    Harness {
        service,
        requests,
        dev_accounts,
        identity,
    }
}

pub(super) fn dev_identity() -> StubIdentity {
    StubIdentity::default().with_account(DEV, DEV_PASSWORD, Some("Dev One"))
}

pub(super) fn router_for(harness: &Harness) -> axum::Router {
    review_router(harness.service.clone())
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
