//! ticketsync - Keeps tickets mirrored between a service desk and an incident manager
//!
//! Main entry point for the ticketsync CLI.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use ticketsync::config::{validate_config, SyncConfig};
use ticketsync::delivery::{BatchDriver, Delivery, RedeliveryPolicy};
use ticketsync::integrations::DryRunClient;
use ticketsync::reconcile::Reconciler;
use ticketsync::server::WebhookServer;
use ticketsync::store::{DedupStore, MemoryStore, SqliteStore};
use ticketsync::ticket::Direction;

/// ticketsync - Mirror tickets between a service desk and an incident manager
#[derive(Parser, Debug)]
#[command(name = "ticketsync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: ~/.config/ticketsync/config.yaml)
    #[arg(short, long, env = "TICKETSYNC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a template configuration
    Init,

    /// Check the configuration for problems
    Validate,

    /// Reconcile webhook bodies read from a file or stdin
    Reconcile {
        /// Direction of the events (inbound, outbound)
        direction: Direction,

        /// JSON file holding one webhook body or an array of them ("-" for stdin)
        input: String,

        /// Use an in-memory store and log remote calls instead of making them
        #[arg(long)]
        dry_run: bool,

        /// Events reconciled at once
        #[arg(long, default_value = "1")]
        concurrency: usize,

        /// Redeliveries of an event after a transient failure
        #[arg(long, default_value = "3")]
        redeliveries: u32,
    },

    /// Show stored rows for a ticket
    Show {
        /// Direction the ticket was mirrored in (inbound, outbound)
        direction: Direction,

        /// Ticket id in the originating system
        local_id: String,
    },

    /// Run the webhook receiver
    Serve {
        /// Address to listen on (overrides server.bind)
        #[arg(short, long)]
        bind: Option<String>,

        /// Log one JSON object per line
        #[arg(long)]
        json_logs: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let logging = match cli.command {
        Commands::Serve { json_logs: true, .. } => ticketsync::logging::init_json(),
        _ => ticketsync::logging::init(),
    };
    if let Err(e) = logging {
        eprintln!("Failed to initialize logging: {}", e);
    }

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Init creates the config, so it cannot need one
    if let Commands::Init = cli.command {
        return handle_init_command(cli.config);
    }

    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Validate => handle_validate_command(&config),

        Commands::Reconcile {
            direction,
            input,
            dry_run,
            concurrency,
            redeliveries,
        } => {
            let reconciler = if dry_run {
                let system = match direction {
                    Direction::Inbound => "service_desk",
                    Direction::Outbound => "incident_manager",
                };
                Reconciler::new(
                    config.mapper(direction)?,
                    Arc::new(MemoryStore::new()),
                    Arc::new(DryRunClient::new(system)),
                )
            } else {
                Reconciler::from_config(&config, direction)
                    .with_context(|| format!("could not set up {} reconciler", direction))?
            };

            let raw = read_input(&input)?;
            let deliveries = Delivery::split(&raw)?;

            let policy = RedeliveryPolicy {
                max_redeliveries: redeliveries,
                ..Default::default()
            };
            let driver = BatchDriver::new(Arc::new(reconciler))
                .with_policy(policy)
                .with_concurrency(concurrency);

            let reports = driver.run(deliveries).await;
            let mut failed = 0;
            for report in &reports {
                match &report.result {
                    Ok(outcome) => println!("{} {}", report.id, serde_json::to_string(outcome)?),
                    Err(e) => {
                        failed += 1;
                        println!("{} error after {} attempt(s): {}", report.id, report.attempts, e);
                    }
                }
            }

            if failed > 0 {
                bail!("{} of {} event(s) failed", failed, reports.len());
            }
            Ok(())
        }

        Commands::Show {
            direction,
            local_id,
        } => {
            let store = DedupStore::new(Arc::new(SqliteStore::open(&config.store, direction)?));
            let rows = store.partition(&local_id)?;

            if rows.is_empty() {
                println!("No {} rows for {}", direction, local_id);
                return Ok(());
            }

            println!("{} row(s) for {} ({}):", rows.len(), local_id, direction);
            println!();
            for row in rows {
                println!("  comment {:<12} → {}  (updated {})", row.event.comment_id, row.remote_id, row.updated_at);
                if let Some(ref status) = row.event.status {
                    println!("    status: {}", status);
                }
                if let Some(ref comment) = row.event.comment {
                    println!("    comment: {}", comment);
                }
            }
            Ok(())
        }

        Commands::Serve { bind, .. } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let inbound = Reconciler::from_config(&config, Direction::Inbound)
                .context("could not set up inbound reconciler")?;
            let outbound = Reconciler::from_config(&config, Direction::Outbound)
                .context("could not set up outbound reconciler")?;

            WebhookServer::new(inbound, outbound).run(&bind).await?;
            Ok(())
        }

        Commands::Init => unreachable!("Init is handled before the config is loaded"),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<SyncConfig> {
    let config = match path {
        Some(path) => SyncConfig::load(path)?,
        None => match SyncConfig::load_default() {
            Ok(config) => config,
            Err(ticketsync::SyncError::Config(msg)) if msg.contains("Config file not found") => {
                bail!("No configuration found. Run 'ticketsync init' first to create one.")
            }
            Err(e) => return Err(e.into()),
        },
    };
    Ok(config)
}

fn read_input(input: &str) -> Result<Vec<u8>> {
    let mut raw = Vec::new();
    if input == "-" {
        std::io::stdin()
            .read_to_end(&mut raw)
            .context("could not read stdin")?;
    } else {
        raw = std::fs::read(input).with_context(|| format!("could not read {}", input))?;
    }
    Ok(raw)
}

fn handle_validate_command(config: &SyncConfig) -> Result<()> {
    match validate_config(config) {
        Ok(()) => {
            println!("✓ Configuration is valid");
            Ok(())
        }
        Err(errors) => {
            println!("Found {} problem(s):", errors.len());
            for error in &errors {
                println!("  - {}", error);
            }
            bail!("configuration is invalid")
        }
    }
}

fn handle_init_command(config_path: Option<PathBuf>) -> Result<()> {
    let config_file = config_path.unwrap_or_else(SyncConfig::default_path);

    // Check if already initialized
    if config_file.exists() {
        println!("Configuration already exists at {}", config_file.display());
        return Ok(());
    }

    SyncConfig::template().save(&config_file)?;

    println!("✓ Created configuration at {}", config_file.display());
    println!();
    println!("Next steps:");
    println!("  1. Point inbound.service_desk.url and outbound.incident.url at your systems");
    println!("  2. Export TICKETSYNC_DESK_PASSWORD and TICKETSYNC_INCIDENT_PASSWORD");
    println!("  3. Check the result:");
    println!("     ticketsync validate");

    Ok(())
}
