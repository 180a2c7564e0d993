use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stellar_core::auth::Identity;
use stellar_gateway::bootstrap::{auth_gate, build_state};
use stellar_gateway::logging::init_logging;
use stellar_gateway::server::serve;
use stellar_infrastructure::{ConfigService, StellarPaths};

#[derive(Parser)]
#[command(name = "stellar")]
#[command(about = "Stellar - real-time advisor consultations", long_about = None)]
struct Cli {
    /// Config file (defaults to <config dir>/stellar/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP and WebSocket server
    Serve,
    /// Print a signed credential for a user id
    IssueToken {
        #[arg(long)]
        user: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ConfigService::new(cli.config).load()?;

    match cli.command {
        Commands::Serve => {
            let paths = StellarPaths::new(config.storage.data_dir.as_deref())?;
            let _guard = init_logging(&config.logging, &paths.logs_dir())?;
            let state = build_state(&config)?;
            serve(&config.server, state).await?;
        }
        Commands::IssueToken { user } => {
            if user.trim().is_empty() {
                bail!("--user must not be empty");
            }
            config.validate()?;
            let token = auth_gate(&config)?.issue(&Identity::new(user.trim()))?;
            println!("{token}");
        }
    }

    Ok(())
}
