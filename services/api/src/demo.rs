use crate::infra::{InMemoryDevAccounts, InMemoryIdentityProvider, InMemoryRequestRepository};
use chrono::{Duration, TimeZone, Utc};
use clap::Args;
use expert_console::error::AppError;
use expert_console::review::{
    status, AuthorizeRequest, AuthorizedUpdateOutcome, CommonAccount, DevCredential,
    ExpertRequest, ExpertReviewService, OperatorIdentity, RequestId, UpdatePaths,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

const OPERATOR: &str = "a@example.com";
const SHARED: &str = "shared@example.com";
const DEVELOPER: &str = "dev1@example.com";
const DEVELOPER_PASSWORD: &str = "demo-password";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Status label the demo operators apply
    #[arg(long, default_value = status::APPROVED)]
    pub(crate) status: String,
    /// Skip the shared-account escalation scenario
    #[arg(long)]
    pub(crate) skip_escalation: bool,
}

type DemoService =
    ExpertReviewService<InMemoryRequestRepository, InMemoryDevAccounts, InMemoryIdentityProvider>;

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        status,
        skip_escalation,
    } = args;
    let service = demo_service();

    println!("Expert review console demo");
    println!("Allowlist: {OPERATOR}, {DEVELOPER}");
    println!("Shared account: {SHARED}");

    println!("\nAllowlisted operator {OPERATOR} sets request 1 to {status}");
    let outcome = service
        .authorized_update(change(1, &status, OPERATOR, None))
        .await;
    render_outcome(outcome);

    if skip_escalation {
        println!("\nShared-account escalation skipped");
    } else {
        println!("\nShared account {SHARED} sets request 2 to {status}");
        let first = service
            .authorized_update(change(2, &status, SHARED, None))
            .await;
        render_outcome(first);

        println!("  Resubmitting with {DEVELOPER}'s credentials");
        let credential = DevCredential::new(DEVELOPER, DEVELOPER_PASSWORD);
        let second = service
            .authorized_update(change(2, &status, SHARED, Some(credential)))
            .await;
        render_outcome(second);
    }

    println!("\nUnlisted operator stranger@example.com sets request 3 to {status}");
    let outcome = service
        .authorized_update(change(3, &status, "stranger@example.com", None))
        .await;
    render_outcome(outcome);

    println!("\nRequests, newest first");
    for row in service.list_requests().await? {
        println!(
            "  #{} {:<12} status={} pic={}",
            row.id,
            row.fields
                .get("name")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("-"),
            row.status,
            row.pic.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}

fn demo_service() -> DemoService {
    let requests = InMemoryRequestRepository::with_rows((1..=3).map(demo_request).collect());
    let dev_accounts = InMemoryDevAccounts::with_mails([OPERATOR, DEVELOPER]);

    let mut metadata = BTreeMap::new();
    metadata.insert("full_name".to_string(), json!("Dev One"));
    let identity = InMemoryIdentityProvider::default().with_account(
        DEVELOPER_PASSWORD,
        OperatorIdentity {
            id: Some("demo-dev-1".to_string()),
            email: Some(DEVELOPER.to_string()),
            user_metadata: metadata,
        },
    );

    ExpertReviewService::new(
        Arc::new(requests),
        Arc::new(dev_accounts),
        Arc::new(identity),
        Some(CommonAccount::new(SHARED)),
        UpdatePaths::all(),
    )
}

fn demo_request(id: i64) -> ExpertRequest {
    let mut fields = BTreeMap::new();
    fields.insert("name".to_string(), json!(format!("Applicant {id}")));

    ExpertRequest {
        id: RequestId::Number(id),
        status: status::UNREVIEWED.to_string(),
        pic: None,
        created_at: Utc
            .with_ymd_and_hms(2025, 10, 1, 9, 0, 0)
            .single()
            .map(|start| start + Duration::days(id)),
        updated_at: None,
        fields,
    }
}

fn change(
    id: i64,
    status: &str,
    operator: &str,
    credential: Option<DevCredential>,
) -> AuthorizeRequest {
    AuthorizeRequest {
        request_id: Some(RequestId::Number(id)),
        new_status: Some(status.to_string()),
        operator_email: Some(operator.to_string()),
        dev_credential: credential,
    }
}

fn render_outcome(
    outcome: Result<AuthorizedUpdateOutcome, expert_console::review::ReviewServiceError>,
) {
    match outcome {
        Ok(AuthorizedUpdateOutcome::Updated(row)) => println!(
            "  Updated #{}: status={} pic={}",
            row.id,
            row.status,
            row.pic.as_deref().unwrap_or("-")
        ),
        Ok(AuthorizedUpdateOutcome::NeedsDevCredentials) => {
            println!("  Developer credentials required before the change can be attributed")
        }
        Err(err) => println!("  Refused ({:?}): {}", err.kind(), err),
    }
}
