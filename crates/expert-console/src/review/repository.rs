use async_trait::async_trait;

use super::domain::{ExpertRequest, RequestId, RequestUpdate};

/// Persisted store of applicant records.
///
/// Rows are created by the intake process; this crate only reads them and applies
/// targeted updates. Updates are last-writer-wins: there is no row versioning, so two
/// operators changing the same request concurrently race at the store.
#[async_trait]
pub trait RequestRepository: Send + Sync {
    /// All rows, newest `created_at` first.
    async fn list_all(&self) -> Result<Vec<ExpertRequest>, RepositoryError>;

    /// Writes every column of `update` in one call against the single row keyed by `id`
    /// and returns the row as stored afterwards.
    async fn update(
        &self,
        id: &RequestId,
        update: RequestUpdate,
    ) -> Result<ExpertRequest, RepositoryError>;
}

/// Allowlist table lookup.
#[async_trait]
pub trait DevAccountStore: Send + Sync {
    /// Exact string match, no case folding.
    async fn contains(&self, email: &str) -> Result<bool, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("expert request {0} not found")]
    NotFound(RequestId),
    #[error("expert request {id} matched {matched} rows")]
    AmbiguousMatch { id: RequestId, matched: usize },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
