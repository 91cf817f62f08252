use agency_session::config::SessionConfig;
use agency_session::ui::UI;
use agency_session::version::CURRENT_VERSION;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod cli;

use cli::CliHandler;

#[derive(Parser)]
#[command(
    name = "agency",
    about = "Session tool for the agency back-office API",
    long_about = "Agency session tool - sign in, keep the session alive and call the back-office API

WORKFLOW:
  1. Sign in with your back-office account
  2. Call API endpoints with the stored session
  3. Keep a session alive with `watch` while you work

QUICK START:
  agency login -u maria                 # Sign in (password prompted)
  agency call GET /api/tours            # Authenticated call, prints JSON
  agency call POST /api/sales -d '{...}'
  agency watch                          # Refresh in the background until Ctrl-C
  agency status                         # Show the local session
  agency logout                         # Clear the local session",
    version = CURRENT_VERSION,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (default: <config dir>/agency/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and store the session
    Login(LoginArgs),

    /// Clear the local session
    Logout,

    /// Show the local session
    #[command(aliases = &["st"])]
    Status,

    /// Call an API endpoint with the stored session
    Call(CallArgs),

    /// Keep the session alive until Ctrl-C or expiry
    Watch,
}

#[derive(Args)]
pub struct LoginArgs {
    #[arg(short, long)]
    pub username: Option<String>,

    #[arg(long, env = "AGENCY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Args)]
pub struct CallArgs {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE)
    pub method: String,

    /// Path such as /api/tours/12, or an absolute URL
    pub path: String,

    /// JSON request body
    #[arg(short, long)]
    pub data: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // `verbose = true` in the config file has the same effect as the flag.
    let verbose = cli.verbose
        || SessionConfig::load(cli.config.as_deref()).is_ok_and(|config| config.verbose);
    let log_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("agency_session={}", log_level))
        .with_writer(std::io::stderr)
        .init();

    let mut handler = CliHandler::with_config_path(cli.config);

    if let Err(e) = handler.execute(cli.command).await {
        UI::new().error(&format!("Error: {}", e));
        std::process::exit(1);
    }
}
