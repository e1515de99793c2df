//! `xhs`: command line client of the platform API
//!
//! # Usage
//!
//! ```bash
//! xhs send-code 13800000000
//! xhs login 13800000000 123456
//! xhs user-notes <user_id> --xsec-token <token> --all --max-pages 5
//! xhs batch-notes urls.txt --delay-ms 2000
//! ```
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use xhs_signed_client::{
    XhsApi,
    cli::{
        commands::{self, Command, Overrides},
        init_logging,
    },
    config::ConfigLoader,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "xhs")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = cli
        .config
        .clone()
        .or_else(|| ConfigLoader::default_config_path().filter(|path| path.exists()));
    let mut settings = ConfigLoader::new().load(config.as_deref())?;
    cli.overrides.apply(&mut settings);
    settings.validate()?;

    init_logging(&settings.logging, cli.verbose);
    tracing::debug!("Running {:?}", cli.command);

    let api = XhsApi::from_settings(&settings).context("Failed to build API client")?;
    let output = commands::execute(&api, cli.command).await?;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
