use std::path::PathBuf;

use crate::demo::{run_chat, run_demo, run_recommend, ChatArgs, DemoArgs, RecommendArgs};
use crate::server;
use card_advisor::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "Card Advisor",
    about = "Recommend credit cards from a spending profile, over HTTP or the command line",
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
    /// Rank cards for a profile given as flags
    Recommend(RecommendArgs),
    /// Answer the guided questionnaire on stdin
    Chat(ChatArgs),
    /// Run a scripted questionnaire, ranking and comparison end to end
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
    /// Catalog file (.json or .csv) to serve instead of the configured one
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Recommend(args) => run_recommend(args),
        Command::Chat(args) => run_chat(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}
