use super::common::*;
use crate::review::domain::{AttributedApproval, RequestId};
use crate::review::repository::RepositoryError;
use crate::review::{status, StatusTransitionService};
use std::sync::Arc;

fn approval(id: i64, new_status: &str, attributed_name: &str) -> AttributedApproval {
    AttributedApproval {
        request_id: RequestId::Number(id),
        new_status: new_status.to_string(),
        attributed_name: attributed_name.to_string(),
    }
}

#[tokio::test]
async fn apply_writes_status_and_attribution_together() {
    let requests = Arc::new(MemoryRequests::with_rows(vec![request_row(1, status::UNREVIEWED)]));
    let service = StatusTransitionService::new(requests.clone());

    let record = service
        .apply(approval(1, status::APPROVED, OPERATOR))
        .await
        .expect("update succeeds");

    assert_eq!(record.status, status::APPROVED);
    assert_eq!(record.pic.as_deref(), Some(OPERATOR));
    assert_eq!(record.fields, request_row(1, status::UNREVIEWED).fields);
    assert_eq!(requests.update_calls(), 1);

    let stored = requests.row(&RequestId::Number(1)).expect("row present");
    assert_eq!(stored.status, status::APPROVED);
    assert_eq!(stored.pic.as_deref(), Some(OPERATOR));
}

#[tokio::test]
async fn apply_on_missing_id_is_not_found_and_leaves_store_untouched() {
    let requests = Arc::new(MemoryRequests::with_rows(vec![request_row(1, status::UNREVIEWED)]));
    let before = requests.snapshot();
    let service = StatusTransitionService::new(requests.clone());

    match service.apply(approval(99, status::APPROVED, OPERATOR)).await {
        Err(RepositoryError::NotFound(id)) => assert_eq!(id, RequestId::Number(99)),
        other => panic!("expected not found, got {other:?}"),
    }
    assert_eq!(requests.snapshot(), before);
}

#[tokio::test]
async fn apply_refuses_ambiguous_matches() {
    let requests = Arc::new(MemoryRequests::with_rows(vec![
        request_row(5, status::UNREVIEWED),
        request_row(5, status::UNREVIEWED),
    ]));
    let before = requests.snapshot();
    let service = StatusTransitionService::new(requests.clone());

    match service.apply(approval(5, status::REJECTED, OPERATOR)).await {
        Err(RepositoryError::AmbiguousMatch { matched, .. }) => assert_eq!(matched, 2),
        other => panic!("expected ambiguous match, got {other:?}"),
    }
    assert_eq!(requests.snapshot(), before);
}

#[tokio::test]
async fn applying_the_same_approval_twice_is_idempotent() {
    let requests = Arc::new(MemoryRequests::with_rows(vec![request_row(1, status::UNREVIEWED)]));
    let service = StatusTransitionService::new(requests.clone());

    let first = service
        .apply(approval(1, status::ALLOWED, "Dev One"))
        .await
        .expect("first update");
    let second = service
        .apply(approval(1, status::ALLOWED, "Dev One"))
        .await
        .expect("second update");

    assert_eq!(
        (first.status.as_str(), first.pic.as_deref()),
        (second.status.as_str(), second.pic.as_deref())
    );
}

#[tokio::test]
async fn unattributed_update_keeps_previous_pic() {
    let mut row = request_row(1, status::APPROVED);
    row.pic = Some("Dev One".to_string());
    let requests = Arc::new(MemoryRequests::with_rows(vec![row]));
    let service = StatusTransitionService::new(requests.clone());

    let record = service
        .apply_unattributed(&RequestId::Number(1), status::REJECTED.to_string())
        .await
        .expect("update succeeds");

    assert_eq!(record.status, status::REJECTED);
    assert_eq!(record.pic.as_deref(), Some("Dev One"));
}

#[tokio::test]
async fn store_outage_propagates() {
    let service = StatusTransitionService::new(Arc::new(UnavailableStore));

    assert!(matches!(
        service.apply(approval(1, status::APPROVED, OPERATOR)).await,
        Err(RepositoryError::Unavailable(_))
    ));
}
