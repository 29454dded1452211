//! # parley
//!
//! Chat binary: wires settings, logging and metrics to the server, or runs
//! the terminal client.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use parley_client::client::CONNECTED_BANNER;
use parley_client::{ClientError, run_chat, spawn_stdin_reader};
use parley_core::logging::init_subscriber;
use parley_server::{ChatServer, ServerConfig};
use parley_settings::{ParleySettings, load_settings_from_path, settings_path};
use tracing::{debug, info};

/// Log level for the client when `RUST_LOG` is unset; the console is shared
/// with the chat, so only problems are logged.
const CLIENT_LOG_LEVEL: &str = "warn";

/// Minimal real-time WebSocket text chat.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about = "Minimal real-time WebSocket text chat")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the chat server.
    Serve(ServeArgs),
    /// Join a chat server from the terminal.
    Connect(ConnectArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Settings file (default `~/.parley/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,
}

#[derive(Args, Debug)]
struct ConnectArgs {
    /// Server URL, e.g. `ws://localhost:8765`.
    url: String,

    /// Settings file (default `~/.parley/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,
}

fn load_settings(path: Option<&Path>) -> Result<ParleySettings> {
    let path = path.map_or_else(settings_path, Path::to_path_buf);
    load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))
}

/// Settings first, then CLI flags on top.
fn server_config(settings: &ParleySettings, args: &ServeArgs) -> ServerConfig {
    let mut config = ServerConfig::from(&settings.server);
    if let Some(host) = &args.host {
        config.host.clone_from(host);
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    config
}

async fn serve(args: ServeArgs) -> Result<ExitCode> {
    let settings = load_settings(args.config.as_deref())?;
    init_subscriber(&settings.logging.level, args.log_json);

    let metrics = parley_server::metrics::install_recorder()
        .context("Failed to install metrics recorder")?;
    let server = ChatServer::new(server_config(&settings, &args)).with_metrics(metrics);
    let (addr, handle) = server.listen().await.context("Failed to start server")?;
    info!("websocket server started on ws://{addr}");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;
    info!("shutting down");
    server.shutdown().graceful_shutdown(vec![handle], None).await;
    info!("server shut down");
    Ok(ExitCode::SUCCESS)
}

async fn connect(args: ConnectArgs) -> Result<ExitCode> {
    let settings = load_settings(args.config.as_deref())?;
    init_subscriber(CLIENT_LOG_LEVEL, false);

    let conn = match parley_client::connect(&args.url).await {
        Ok(conn) => conn,
        Err(e) => {
            println!("{}", diagnostic(&e));
            return Ok(ExitCode::FAILURE);
        }
    };
    println!("{CONNECTED_BANNER}");

    let prompt = settings.client.prompt;
    let input = spawn_stdin_reader(prompt.clone());
    match run_chat(conn.with_prompt(prompt), input, tokio::io::stdout()).await {
        Ok(exit) => {
            debug!(?exit, "client exiting");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", diagnostic(&e));
            Ok(ExitCode::FAILURE)
        }
    }
}

/// One-line operator diagnostic for a client failure.
fn diagnostic(err: &ClientError) -> String {
    format!("Error: {err}")
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Connect(args) => connect(args).await,
    }
}
