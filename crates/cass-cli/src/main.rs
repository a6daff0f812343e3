//! 🚀 cass-cli: the front door. Parses flags, loads config, points the drain at the right sink.
//!
//! 🎬 *[narrator voice]* "It all started with a simple main() function..."
//! 📦 Thin on purpose: the lib crate does the draining, this crate decides which drain
//! and where the complaints go. Logs and progress to stderr. Data to stdout. 🦆

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use cass::DrainMode;

/// 🌌 Drain a Kinesis transit shard to stdout or into the analyzer.
#[derive(Debug, Parser)]
#[command(name = "cass-cli", version)]
struct Cli {
    /// Optional TOML file layered over the CASSIOPEIA_* environment.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Drain the transit to stdout, one JSON line per record.
    Fetch,
    /// Drain the transit into one bulk payload and POST it to the analyzer entry.
    Pull,
    /// Print the effective configuration. Touches nothing on the network.
    Env,
}

/// 🚀 main(): where it all begins. The "I pressed enter and held my breath" moment.
#[tokio::main]
async fn main() -> Result<()> {
    // 📡 stderr, because stdout is spoken for
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let the_cli = Cli::parse();

    if let Err(err) = dispatch(the_cli).await {
        error!("💀 error: {}", err);
        // -- 🧅 peel the onion of sadness, one layer at a time
        let mut the_vibes_are_giving_credential_issues = false;
        for cause in err.chain().skip(1) {
            error!("⚠️  cause: {}", cause);
            let cause_str = cause.to_string();
            if cause_str.contains("credentials")
                || cause_str.contains("AccessDenied")
                || cause_str.contains("UnrecognizedClient")
                || cause_str.contains("ExpiredToken")
            {
                the_vibes_are_giving_credential_issues = true;
            }
        }

        if the_vibes_are_giving_credential_issues {
            error!(
                "🔧 hint: this smells like AWS credentials. Check AWS_PROFILE, \
                AWS_ACCESS_KEY_ID and friends, and that the role can read the transit. \
                Even IAM needs a coffee sometimes. ☕"
            );
        }

        // 🗑️ Exit with prejudice.
        std::process::exit(1);
    }

    // ✅ Caught up. Pop the champagne. 🍾
    Ok(())
}

async fn dispatch(cli: Cli) -> Result<()> {
    let app_config = cass::app_config::load_config(cli.config.as_deref())
        .context("💀 In cass-cli we couldn't load the config. Check the CASSIOPEIA_* variables and the --config file, if you gave one.")?;

    match cli.command {
        Command::Fetch => {
            cass::run(&app_config, DrainMode::Fetch).await?;
        }
        Command::Pull => {
            let the_summary = cass::run(&app_config, DrainMode::Pull).await?;
            if let Some(the_response) = the_summary.response {
                println!("{the_response}");
            }
        }
        Command::Env => {
            println!("{}", cass::env_table(&app_config));
        }
    }
    Ok(())
}
