use crate::demo::{run_demo, DemoArgs};
use crate::export::{run_export, ExportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use lead_funnel::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Lead Funnel",
    about = "Run the masterclass registration funnel service and its reporting tools",
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
    /// Walk a scripted masterclass registration against an in-memory store
    Demo(DemoArgs),
    /// Export a funnel table from the configured store as CSV
    Export(ExportArgs),
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
        Command::Demo(args) => run_demo(args).await,
        Command::Export(args) => run_export(args).await,
    }
}
