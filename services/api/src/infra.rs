use async_trait::async_trait;
use chrono::Utc;
use expert_console::review::{
    DevAccountStore, ExpertRequest, IdentityError, IdentityProvider, OperatorIdentity,
    RepositoryError, RequestId, RequestRepository, RequestUpdate,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryRequestRepository {
    rows: Arc<Mutex<Vec<ExpertRequest>>>,
}

impl InMemoryRequestRepository {
    pub(crate) fn with_rows(rows: Vec<ExpertRequest>) -> Self {
        Self {
            rows: Arc::new(Mutex::new(rows)),
        }
    }
}

fn poisoned<T>(_: T) -> RepositoryError {
    RepositoryError::Unavailable("in-memory store poisoned".to_string())
}

#[async_trait]
impl RequestRepository for InMemoryRequestRepository {
    async fn list_all(&self) -> Result<Vec<ExpertRequest>, RepositoryError> {
        let mut rows = self.rows.lock().map_err(poisoned)?.clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn update(
        &self,
        id: &RequestId,
        update: RequestUpdate,
    ) -> Result<ExpertRequest, RepositoryError> {
        let mut guard = self.rows.lock().map_err(poisoned)?;
        let matched = guard.iter().filter(|row| &row.id == id).count();
        if matched > 1 {
            return Err(RepositoryError::AmbiguousMatch {
                id: id.clone(),
                matched,
            });
        }

        let row = guard
            .iter_mut()
            .find(|row| &row.id == id)
            .ok_or_else(|| RepositoryError::NotFound(id.clone()))?;
        row.status = update.status;
        if let Some(pic) = update.pic {
            row.pic = Some(pic);
        }
        row.updated_at = Some(Utc::now());
        Ok(row.clone())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryDevAccounts {
    mails: Arc<HashSet<String>>,
}

impl InMemoryDevAccounts {
    pub(crate) fn with_mails<I, S>(mails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mails: Arc::new(mails.into_iter().map(Into::into).collect()),
        }
    }
}

#[async_trait]
impl DevAccountStore for InMemoryDevAccounts {
    async fn contains(&self, email: &str) -> Result<bool, RepositoryError> {
        Ok(self.mails.contains(email))
    }
}

/// Identity provider backed by a fixed table of accounts.
#[derive(Default, Clone)]
pub(crate) struct InMemoryIdentityProvider {
    accounts: HashMap<String, (String, OperatorIdentity)>,
}

impl InMemoryIdentityProvider {
    pub(crate) fn with_account(mut self, password: &str, identity: OperatorIdentity) -> Self {
        if let Some(email) = identity.email.clone() {
            self.accounts.insert(email, (password.to_string(), identity));
        }
        self
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn password_grant(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<OperatorIdentity>, IdentityError> {
        Ok(self
            .accounts
            .get(email)
            .filter(|(expected, _)| expected == password)
            .map(|(_, identity)| identity.clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<OperatorIdentity>, IdentityError> {
        Ok(self.accounts.get(email).map(|(_, identity)| identity.clone()))
    }
}
