//! HN Aggregator - caching edge aggregator for Hacker News

use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use hn_aggregator::cli::Cli;
use hn_aggregator::config::Config;
use hn_aggregator::gateway::Server;
use hn_aggregator::setup_tracing;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    let config = Config::from(&cli);
    let server = match Server::new(config).await {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "startup failed");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = server.run().await {
        error!(error = %e, "server failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
