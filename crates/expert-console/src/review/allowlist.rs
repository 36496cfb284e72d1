use std::sync::Arc;

use super::repository::{DevAccountStore, RepositoryError};

/// Membership check of an operator email against the allowlist.
///
/// Shared by the login screen and by authorization of individually named operators.
pub struct AllowlistGate<D> {
    store: Arc<D>,
}

impl<D> AllowlistGate<D>
where
    D: DevAccountStore + 'static,
{
    pub fn new(store: Arc<D>) -> Self {
        Self { store }
    }

    pub async fn is_allowed(&self, email: &str) -> Result<bool, RepositoryError> {
        self.store.contains(email).await
    }
}

impl<D> Clone for AllowlistGate<D> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}
