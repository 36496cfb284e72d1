use async_trait::async_trait;
use reqwest::{header, Method, StatusCode};

use super::{SupabaseClient, UpstreamError};
use crate::review::domain::{DevAccount, ExpertRequest, RequestId, RequestUpdate};
use crate::review::repository::{DevAccountStore, RepositoryError, RequestRepository};

/// PostgREST's code for "singular response requested, row count was not exactly one".
const SINGULAR_VIOLATION: &str = "PGRST116";
const SINGULAR_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Request and allowlist tables served by PostgREST.
#[derive(Debug, Clone)]
pub struct PostgrestStore {
    client: SupabaseClient,
    requests_table: String,
    dev_accounts_table: String,
}

impl PostgrestStore {
    pub fn new(client: SupabaseClient, requests_table: String, dev_accounts_table: String) -> Self {
        Self {
            client,
            requests_table,
            dev_accounts_table,
        }
    }

    fn table_path(table: &str) -> String {
        format!("/rest/v1/{table}")
    }
}

#[async_trait]
impl RequestRepository for PostgrestStore {
    async fn list_all(&self) -> Result<Vec<ExpertRequest>, RepositoryError> {
        let response = self
            .client
            .request(Method::GET, &Self::table_path(&self.requests_table))
            .query(&[("select", "*"), ("order", "created_at.desc")])
            .send()
            .await
            .map_err(unavailable)?;

        if !response.status().is_success() {
            let (status, body, raw) = UpstreamError::read(response).await;
            return Err(RepositoryError::Unavailable(body.describe(status, &raw)));
        }

        response.json().await.map_err(unavailable)
    }

    async fn update(
        &self,
        id: &RequestId,
        update: RequestUpdate,
    ) -> Result<ExpertRequest, RepositoryError> {
        // The singular Accept header makes PostgREST roll the write back unless exactly
        // one row matched.
        let response = self
            .client
            .request(Method::PATCH, &Self::table_path(&self.requests_table))
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .header(header::ACCEPT, SINGULAR_OBJECT)
            .json(&update)
            .send()
            .await
            .map_err(unavailable)?;

        if response.status().is_success() {
            return response.json().await.map_err(unavailable);
        }

        let (status, body, raw) = UpstreamError::read(response).await;
        if status == StatusCode::NOT_ACCEPTABLE && body.code.as_deref() == Some(SINGULAR_VIOLATION)
        {
            let matched = body
                .details
                .as_deref()
                .or(body.message.as_deref())
                .and_then(reported_row_count);
            match matched {
                Some(0) => return Err(RepositoryError::NotFound(id.clone())),
                Some(matched) => {
                    return Err(RepositoryError::AmbiguousMatch {
                        id: id.clone(),
                        matched,
                    })
                }
                None => {}
            }
        }

        Err(RepositoryError::Unavailable(body.describe(status, &raw)))
    }
}

#[async_trait]
impl DevAccountStore for PostgrestStore {
    async fn contains(&self, email: &str) -> Result<bool, RepositoryError> {
        let response = self
            .client
            .request(Method::GET, &Self::table_path(&self.dev_accounts_table))
            .query(&[
                ("select", "mail".to_string()),
                ("mail", format!("eq.{email}")),
                ("limit", "1".to_string()),
            ])
            .send()
            .await
            .map_err(unavailable)?;

        if !response.status().is_success() {
            let (status, body, raw) = UpstreamError::read(response).await;
            return Err(RepositoryError::Unavailable(body.describe(status, &raw)));
        }

        let rows: Vec<DevAccount> = response.json().await.map_err(unavailable)?;
        Ok(rows.iter().any(|row| row.mail == email))
    }
}

fn unavailable(err: reqwest::Error) -> RepositoryError {
    RepositoryError::Unavailable(err.to_string())
}

/// Row count from a PGRST116 detail such as "The result contains 0 rows" or
/// "Results contain 2 rows, application/vnd.pgrst.object+json requires 1 row".
fn reported_row_count(detail: &str) -> Option<usize> {
    detail
        .split(|c: char| !c.is_ascii_digit())
        .find(|token| !token.is_empty())
        .and_then(|token| token.parse().ok())
}
