mod config;

use cadre_agent::LlmGateway;
use cadre_gateway::GatewayServer;
use cadre_orchestrator::{
    ExecutionStatus, ExportFormat, Orchestrator, Priority, ProgressFn, WorkflowExecution,
};
use clap::{Parser, Subcommand};
use config::{load_config, CadreConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cadre", about = "Cadre: multi-agent task orchestration")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "cadre.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one request to completion and print the report
    Run {
        /// The work request, in plain language
        request: String,
        /// low, normal, high or urgent
        #[arg(long, default_value = "normal")]
        priority: Priority,
        /// markdown or json
        #[arg(short, long, default_value = "markdown")]
        format: ExportFormat,
    },
    /// List the agents in the roster
    Agents,
    /// Start the HTTP gateway
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

fn build_orchestrator(config: &CadreConfig) -> anyhow::Result<Orchestrator> {
    let roster = config.roster()?;
    for provider in config.missing_providers(&roster) {
        warn!(provider = %provider, "Provider is referenced but not configured");
    }
    let gateway = LlmGateway::from_configs(&config.providers)?;
    info!(
        agents = roster.len(),
        providers = ?gateway.providers(),
        "Orchestrator ready"
    );
    Ok(Orchestrator::new(
        &config.orchestrator,
        roster,
        Arc::new(gateway),
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Run {
            request,
            priority,
            format,
        } => {
            let orchestrator = build_orchestrator(&config)?;
            let observer: ProgressFn = Arc::new(|e: &WorkflowExecution| {
                eprintln!("[{:>3}%] {}", e.progress, e.status);
            });
            let execution = orchestrator
                .submit_with_observer(&request, priority, observer)
                .await;

            println!("{}", format.render(&execution)?);
            if execution.status == ExecutionStatus::Failed {
                anyhow::bail!(
                    "run failed: {}",
                    execution.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
        Commands::Agents => {
            let roster = config.roster()?;
            println!("Agents:");
            for agent in roster.agents() {
                let caps: Vec<&str> = agent.capabilities.iter().map(String::as_str).collect();
                println!(
                    "  {:<18} {} ({}) via {}",
                    agent.id, agent.name, agent.department, agent.provider
                );
                println!("  {:<18} {}", "", caps.join(", "));
            }
            println!("\nTotal: {} agent(s)", roster.len());
        }
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let orchestrator = Arc::new(build_orchestrator(&config)?);
            let app = GatewayServer::build(orchestrator);

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!("Cadre gateway listening on {}", addr);
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
