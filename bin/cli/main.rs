//! DataDAO CLI
//!
//! Command line client for a running DataDAO server.

mod commands;
mod style;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use datadao::{Address, DaoClient};
use style::print_error;

#[derive(Parser, Debug)]
#[command(name = "datadao")]
#[command(about = "DataDAO marketplace command line client", version)]
struct Cli {
    /// DataDAO server URL
    #[arg(long, default_value = "http://localhost:3000", env = "DATADAO_URL", global = true)]
    api_url: String,

    /// Address to act as on state-changing commands
    #[arg(long, env = "DATADAO_ACTOR", global = true)]
    actor: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show DAO statistics
    Stats,

    /// Show token balance and stake
    Balance {
        /// Address to inspect (defaults to --actor)
        address: Option<String>,
    },

    /// Request test tokens from the faucet
    Faucet {
        /// Address to fund (defaults to --actor)
        address: Option<String>,
    },

    /// Join the DAO by staking tokens
    Join {
        #[arg(long)]
        stake: u64,
        #[arg(long)]
        name: Option<String>,
    },

    /// Add stake
    Stake { amount: u64 },

    /// Manage tasks
    Task {
        #[command(subcommand)]
        command: commands::task::TaskCommand,
    },

    /// Submit a content reference to a task
    Submit {
        task_id: u64,
        content_reference: String,
        #[arg(long)]
        encrypted: bool,
    },

    /// Approve or reject a submission
    Review {
        submission_id: u64,
        #[arg(long, conflicts_with = "reject")]
        approve: bool,
        #[arg(long)]
        reject: bool,
        #[arg(long)]
        feedback: Option<String>,
    },

    /// Governance proposals
    Proposal {
        #[command(subcommand)]
        command: commands::proposal::ProposalCommand,
    },
}

fn parse_address(raw: &str) -> Result<Address> {
    Address::parse(raw).map_err(|e| anyhow!("{}", e))
}

/// The address given explicitly, or the configured actor.
fn target_address(explicit: Option<&str>, actor: Option<&str>) -> Result<Address> {
    let raw = explicit
        .or(actor)
        .ok_or_else(|| anyhow!("No address given; pass one or set --actor / DATADAO_ACTOR"))?;
    parse_address(raw)
}

fn build_client(cli: &Cli) -> Result<DaoClient> {
    let client = DaoClient::new(&cli.api_url);
    Ok(match cli.actor.as_deref() {
        Some(raw) => client.with_actor(parse_address(raw)?),
        None => client,
    })
}

async fn run(cli: Cli) -> Result<()> {
    let client = build_client(&cli)?;
    let actor = cli.actor.as_deref();

    match cli.command {
        Command::Stats => commands::stats::run(&client).await,
        Command::Balance { address } => {
            let address = target_address(address.as_deref(), actor)?;
            commands::account::balance(&client, &address).await
        }
        Command::Faucet { address } => {
            let address = target_address(address.as_deref(), actor)?;
            commands::account::faucet(&client, &address).await
        }
        Command::Join { stake, name } => commands::account::join(&client, stake, name.as_deref()).await,
        Command::Stake { amount } => commands::account::stake(&client, amount).await,
        Command::Task { command } => commands::task::run(&client, command).await,
        Command::Submit {
            task_id,
            content_reference,
            encrypted,
        } => commands::task::submit(&client, task_id, &content_reference, encrypted).await,
        Command::Review {
            submission_id,
            approve,
            reject,
            feedback,
        } => {
            if approve == reject {
                return Err(anyhow!("Pass exactly one of --approve or --reject"));
            }
            commands::task::review(&client, submission_id, approve, feedback.as_deref()).await
        }
        Command::Proposal { command } => commands::proposal::run(&client, command).await,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
