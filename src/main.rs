use std::path::PathBuf;
use std::sync::Arc;

use eyre::Result;
use log::{debug, info};
use rmcp::ServiceExt;

mod cli;

use cli::Cli;
use ytmcp::server::TranscriptServer;
use ytmcp::session::Session;

fn setup_logging() -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("ytmcp.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytmcp")
        .join("logs")
}

fn build_after_help() -> String {
    format!(
        "\nSpeaks MCP over stdin/stdout and exposes the get_transcript tool.\n\
         Settings are also read from: {}\n\nLogs are written to: {}",
        ytmcp::config::config_path().display(),
        log_dir().join("ytmcp.log").display()
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    let cmd = <Cli as clap::CommandFactory>::command().after_help(build_after_help());
    let matches = cmd.get_matches();
    let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches)?;

    // Load config file (non-fatal if missing/invalid)
    let config = ytmcp::config::Config::load().unwrap_or_else(|e| {
        debug!("Ignoring config file: {e}");
        Default::default()
    });

    // CLI flags and env vars take priority over the config file
    let proxy = cli.settings().or(config).proxy();

    let session = Arc::new(Session::new(proxy)?);
    let server = TranscriptServer::new(session);

    info!("starting Youtube Transcript MCP server");
    let service = server.serve(rmcp::transport::stdio()).await?;
    let reason = service.waiting().await?;
    info!("closed Youtube Transcript MCP server: {reason:?}");

    Ok(())
}
