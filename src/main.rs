//! repo-guardian command line.
//!
//! ```text
//! CLI args / interactive line
//!     → config (TOML + env overrides) and secrets (.env / env)
//!     → ProtectionAgent
//!     → JSON result on stdout, logs on stderr
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};

use repo_guardian::agent::{ProtectionAgent, SetupValidator};
use repo_guardian::analysis::LicenseType;
use repo_guardian::config::{resolve_config, AgentConfig, Secrets};
use repo_guardian::lifecycle::{spawn_ctrl_c_handler, until_shutdown, Shutdown};
use repo_guardian::observability::{logging, metrics};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "repo-guardian", version)]
#[command(about = "Register GitHub repositories on Filecoin and file DMCA reports against copies")]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// A line typed in interactive mode.
#[derive(Parser)]
#[command(no_binary_name = true)]
struct InteractiveLine {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Check environment, network, wallet, contracts, storage and model
    Validate,
    /// Show network, account, contract and storage status
    Status,
    /// Register a repository with a generated license
    Register {
        url: String,
        #[arg(short, long, default_value = "MIT")]
        license: LicenseType,
    },
    /// Compare two repositories
    Analyze { url1: String, url2: String },
    /// Security audit of a repository
    Audit {
        url: String,
        /// Also scan recent commit messages
        #[arg(long)]
        extensive: bool,
    },
    /// Scan for copies of one or all registered repositories
    Scan { repo_id: Option<u64> },
    /// Report an infringing repository and claim the bounty
    Bounty { url: String, repo_id: Option<u64> },
    /// Claimable bounty of an address (default: own account)
    Balance { address: Option<String> },
    /// Withdraw accumulated bounty rewards
    Withdraw,
    /// Top bounty reporters this session
    Leaderboard,
    /// Most recently registered repositories
    Query {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Register, audit and scan in one go
    Workflow { url: String },
    /// Read commands from stdin until quit or Ctrl-C
    Interactive,
}

const INTERACTIVE_HELP: &str = "\
Commands:
  validate | status | leaderboard | withdraw
  register <url> [--license MIT|Apache-2.0|GPL-3.0|BSD-3-Clause|Custom-AI]
  analyze <url1> <url2>
  audit <url> [--extensive]
  scan [repo_id]
  bounty <url> [repo_id]
  balance [address]
  query [--limit N]
  workflow <url>
  help | quit | exit";

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn execute(agent: &ProtectionAgent, command: Command) -> CliResult<()> {
    match command {
        Command::Validate => print_json(&agent.validate().await),
        Command::Status => print_json(&agent.status().await),
        Command::Register { url, license } => print_json(&agent.register(&url, license).await?),
        Command::Analyze { url1, url2 } => print_json(&agent.compare(&url1, &url2).await?),
        Command::Audit { url, extensive } => print_json(&agent.audit(&url, extensive).await?),
        Command::Scan { repo_id } => print_json(&agent.scan(repo_id).await?),
        Command::Bounty { url, repo_id } => print_json(&agent.report_bounty(&url, repo_id).await?),
        Command::Balance { address } => {
            print_json(&agent.bounty_balance(address.as_deref()).await?)
        }
        Command::Withdraw => print_json(&agent.withdraw_bounty().await?),
        Command::Leaderboard => print_json(&agent.leaderboard()),
        Command::Query { limit } => print_json(&agent.query(limit).await?),
        Command::Workflow { url } => print_json(&agent.workflow(&url).await?),
        Command::Interactive => {
            eprintln!("Already in interactive mode");
            Ok(())
        }
    }
}

async fn interactive(agent: &ProtectionAgent, shutdown: Shutdown) -> CliResult<()> {
    let mut shutdown_rx = shutdown.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprintln!("repo-guardian interactive mode. Type 'help' for commands.");

    loop {
        eprint!("guardian> ");
        let Some(line) = until_shutdown(&mut shutdown_rx, lines.next_line()).await else {
            break;
        };
        let Some(line) = line? else { break };

        let words: Vec<&str> = line.split_whitespace().collect();
        match words.first().copied() {
            None => continue,
            Some("quit" | "exit") => break,
            Some("help") => {
                eprintln!("{}", INTERACTIVE_HELP);
                continue;
            }
            Some(_) => {}
        }

        match InteractiveLine::try_parse_from(words) {
            Ok(parsed) => {
                let command = execute(agent, parsed.command);
                match until_shutdown(&mut shutdown_rx, command).await {
                    Some(Ok(())) => {}
                    Some(Err(e)) => eprintln!("Error: {}", e),
                    None => {
                        tracing::warn!("Command cancelled by shutdown");
                        break;
                    }
                }
            }
            Err(e) => eprintln!("{}", e.render()),
        }
    }

    tracing::info!("Interactive session ended");
    Ok(())
}

fn init_observability(config: &AgentConfig) {
    logging::init_logging(&config.observability.log_level);

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }
}

#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();

    // .env must be loaded before config overrides read the environment.
    let _ = dotenv::dotenv();
    let config = resolve_config(cli.config.as_deref())?;
    init_observability(&config);
    let secrets = Secrets::from_env();

    tracing::debug!(
        rpc_url = %config.blockchain.rpc_url,
        chain_id = config.blockchain.chain_id,
        "Configuration loaded"
    );

    // Validation must work even when the agent cannot be built.
    if let Command::Validate = cli.command {
        let report = SetupValidator::new(config, secrets).run().await;
        print_json(&report)?;
        if !report.ready {
            std::process::exit(1);
        }
        return Ok(());
    }

    let agent = ProtectionAgent::new(config, secrets)?;

    match cli.command {
        Command::Interactive => {
            let shutdown = Shutdown::new();
            let handler = spawn_ctrl_c_handler(shutdown.clone());
            interactive(&agent, shutdown).await?;
            handler.abort();
        }
        command => {
            if let Err(e) = execute(&agent, command).await {
                tracing::error!(error = %e, "Command failed");
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
