use std::sync::Arc;

use tracing::{info, warn};

use super::domain::{AttributedApproval, ExpertRequest, RequestId, RequestUpdate};
use super::repository::{RepositoryError, RequestRepository};

/// Commits status changes to the request store.
///
/// Status and attribution are written together in a single update call, so a reader
/// never sees one without the other. Applying the same approval twice leaves the same
/// `{status, pic}` as applying it once.
pub struct StatusTransitionService<R> {
    repository: Arc<R>,
}

impl<R> StatusTransitionService<R>
where
    R: RequestRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub async fn apply(
        &self,
        approval: AttributedApproval,
    ) -> Result<ExpertRequest, RepositoryError> {
        let (id, update) = approval.into_update();
        let record = self.commit(&id, update).await?;
        info!(
            request_id = %record.id,
            status = %record.status,
            pic = record.pic.as_deref().unwrap_or_default(),
            "status change committed"
        );
        Ok(record)
    }

    /// Status-only write used by the unauthenticated update path; attribution is untouched.
    pub async fn apply_unattributed(
        &self,
        id: &RequestId,
        status: String,
    ) -> Result<ExpertRequest, RepositoryError> {
        let record = self.commit(id, RequestUpdate::status_only(status)).await?;
        info!(request_id = %record.id, status = %record.status, "direct status update committed");
        Ok(record)
    }

    async fn commit(
        &self,
        id: &RequestId,
        update: RequestUpdate,
    ) -> Result<ExpertRequest, RepositoryError> {
        match self.repository.update(id, update).await {
            Err(RepositoryError::AmbiguousMatch { id, matched }) => {
                warn!(request_id = %id, matched, "update matched more than one row");
                Err(RepositoryError::AmbiguousMatch { id, matched })
            }
            other => other,
        }
    }
}

impl<R> Clone for StatusTransitionService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}
