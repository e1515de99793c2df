//! HTTP service binary
//!
//! # Usage
//!
//! ```bash
//! xhs-server --port 6868 --host 0.0.0.0
//! ```
//!
//! # API Endpoints
//!
//! All routes are `GET` with query parameters:
//!
//! - `/send_phone_code`, `/phone_login`
//! - `/get_user_notes`, `/get_note_by_id`
//! - `/get_comment_list`, `/get_sub_comment_list`
//! - `/ping`: health check

use clap::Parser;
use std::path::PathBuf;
use xhs_signed_client::cli::server::{ServerArgs, run_server_mode};

/// HTTP service for the platform API
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Port to listen on [default: 6868]
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to [default: 0.0.0.0]
    #[arg(long)]
    host: Option<String>,

    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    run_server_mode(ServerArgs {
        config: cli.config,
        host: cli.host,
        port: cli.port,
        verbose: cli.verbose,
    })
    .await
}
