use crate::demo::{run_demo, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use expert_console::config::AppConfig;
use expert_console::error::AppError;
use expert_console::review::{CommonAccount, ExpertReviewService, UpdatePaths};
use expert_console::supabase::SupabaseBackend;

#[derive(Parser, Debug)]
#[command(
    name = "Expert Console",
    about = "Serve and exercise the expert application review console",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Check whether an email is on the operator allowlist
    CheckAllowed(CheckAllowedArgs),
    /// Walk through the review scenarios against in-memory stores
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct CheckAllowedArgs {
    /// Operator email to look up
    #[arg(long)]
    pub(crate) email: String,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::CheckAllowed(args) => check_allowed(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}

async fn check_allowed(args: CheckAllowedArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let credentials = config.backend.credentials()?;
    let backend = SupabaseBackend::connect(credentials, &config.backend)?;

    let service = ExpertReviewService::new(
        backend.store.clone(),
        backend.store,
        backend.identity,
        config.review.common_account.map(CommonAccount::new),
        UpdatePaths::default(),
    );

    let allowed = service.check_allowed(Some(args.email.clone())).await?;
    if allowed {
        println!("{}: allowed", args.email);
    } else {
        println!("{}: not allowed", args.email);
    }
    Ok(())
}
