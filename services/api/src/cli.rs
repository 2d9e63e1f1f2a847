use crate::offline::{run_distribute, DistributeArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use scholarship_quota::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Scholarship Quota Distribution",
    about = "Serve or run matrix quota distribution for scholarship rankings",
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
    /// Distribute a ranking CSV against a quota matrix without any storage
    Distribute(DistributeArgs),
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

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Distribute(args) => run_distribute(args),
    }
}
