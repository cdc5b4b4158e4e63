use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mimic_proxy::config::Config;
use mimic_proxy::proxy::{ProxyEngine, ProxyServer, DEFAULT_LOG_CAPACITY};
use mimic_proxy::recording::Recorder;
use mimic_proxy::replay::{load_interactions, ReplayEngine};
use tracing_subscriber::EnvFilter;

/// Mimic: API mocking proxy. Intercepts HTTP traffic, answers matching
/// requests from scenarios, forwards the rest, and records traffic for replay.
#[derive(Parser, Debug)]
#[command(name = "mimic")]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the proxy server
    Start {
        /// Port to listen on
        #[arg(short, long, default_value_t = 8080)]
        port: u16,

        /// Path to a scenario configuration file. Without it the proxy runs
        /// in pure forwarding mode.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Also record forwarded traffic to this file
        #[arg(long)]
        record: Option<PathBuf>,

        /// Number of recent requests kept for the control API
        #[arg(long, default_value_t = DEFAULT_LOG_CAPACITY)]
        log_capacity: usize,
    },

    /// Start the proxy in recording mode (no scenarios, record everything)
    Record {
        /// Port to listen on
        #[arg(short, long, default_value_t = 8080)]
        port: u16,

        /// Output file for recorded traffic
        #[arg(short, long, default_value = "traffic.json")]
        output: PathBuf,
    },

    /// Replay a recorded traffic file
    Replay {
        /// Recorded traffic file
        file: PathBuf,

        /// Re-issue against this base URL instead of the recorded hosts
        #[arg(short, long)]
        target: Option<String>,
    },

    /// Manage scenarios
    Scenarios {
        #[command(subcommand)]
        command: ScenariosCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ScenariosCommand {
    /// List the scenarios in a configuration file
    List {
        /// Scenario configuration file
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Command::Start {
            port,
            config,
            record,
            log_capacity,
        } => {
            let scenarios = config
                .map(|path| Config::from_file(path).map(|c| c.scenarios))
                .transpose()?;
            let recorder = record.map(Recorder::new);
            serve(port, scenarios, recorder, log_capacity).await
        }
        Command::Record { port, output } => {
            serve(port, None, Some(Recorder::new(output)), DEFAULT_LOG_CAPACITY).await
        }
        Command::Replay { file, target } => replay(&file, target.as_deref()).await,
        Command::Scenarios {
            command: ScenariosCommand::List { config },
        } => {
            let config = Config::from_file(&config)?;
            for scenario in &config.scenarios {
                let method = scenario.match_rule.method.as_deref().unwrap_or("*");
                let path = if scenario.match_rule.path.is_empty() {
                    "*"
                } else {
                    &scenario.match_rule.path
                };
                println!(
                    "- {} ({} {} -> {})",
                    scenario.name,
                    method,
                    path,
                    scenario.response.effective_status()
                );
            }
            Ok(())
        }
    }
}

async fn serve(
    port: u16,
    scenarios: Option<Vec<mimic_proxy::config::Scenario>>,
    recorder: Option<Recorder>,
    log_capacity: usize,
) -> Result<(), anyhow::Error> {
    let engine = ProxyEngine::new(scenarios, recorder, log_capacity);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let server = ProxyServer::bind(addr, engine)?;
    server.run().await
}

async fn replay(file: &PathBuf, target: Option<&str>) -> Result<(), anyhow::Error> {
    let interactions = load_interactions(file)?;
    println!("Replaying {} interactions...", interactions.len());

    let engine = ReplayEngine::new(target)?;
    let outcomes = engine.replay(&interactions).await;

    let mut failures = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(status) => println!(
                "[{}] {} {} -> {}",
                outcome.index + 1,
                outcome.method,
                outcome.url,
                status
            ),
            Err(e) => {
                failures += 1;
                println!(
                    "[{}] {} {} -> error: {}",
                    outcome.index + 1,
                    outcome.method,
                    outcome.url,
                    e
                );
            }
        }
    }
    println!(
        "Done: {} replayed, {} failed",
        outcomes.len() - failures,
        failures
    );
    Ok(())
}
