mod cmd;
mod config;
mod context;
mod controller;
mod domain;
mod error;
mod infra;
mod logging;
mod services;
mod workflow;

#[cfg(test)]
mod test_utils;

use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing::debug;

use crate::cmd::config::{self as config_cmd, ConfigArgs};
use crate::cmd::ticket::{self, ClassifyArgs, CreateArgs, ListArgs, UpdateArgs};
use crate::config::{AppConfig, ConfigOverrides};
use crate::context::AppContext;
use crate::error::AppResult;
use crate::infra::http::HttpTicketClient;

#[derive(Parser)]
#[command(name = "ticketdesk", author, version, about = "Support ticket desk client")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Backend base URL, e.g. http://127.0.0.1:8000/api/
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Request timeout in seconds.
    #[arg(long, global = true)]
    timeout: Option<u64>,
    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// File a new ticket, using the backend's category/priority suggestion.
    Create(CreateArgs),
    /// Ask the backend to suggest a category and priority for a description.
    Classify(ClassifyArgs),
    /// List tickets.
    List(ListArgs),
    /// Change a ticket's status and/or priority.
    Update(UpdateArgs),
    /// Manage CLI configuration.
    Config(ConfigArgs),
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> AppResult<()> {
    let cli = Cli::parse();
    logging::init(cli.global.verbose);

    match cli.command {
        Commands::Config(args) => config_cmd::run(args.command),
        Commands::Create(args) => ticket::create(&build_context(&cli.global)?, args).await,
        Commands::Classify(args) => ticket::classify(&build_context(&cli.global)?, args).await,
        Commands::List(args) => ticket::list(&build_context(&cli.global)?, args).await,
        Commands::Update(args) => ticket::update(&build_context(&cli.global)?, args).await,
    }
}

fn build_context(global: &GlobalArgs) -> AppResult<AppContext> {
    let config = AppConfig::load(&ConfigOverrides {
        base_url: global.base_url.clone(),
        timeout_secs: global.timeout,
    })?;
    debug!(base_url = %config.base_url, timeout = ?config.request_timeout, "configuration loaded");

    let client = HttpTicketClient::new(&config.base_url, config.request_timeout)?;
    Ok(AppContext::new(config, Arc::new(client)))
}
