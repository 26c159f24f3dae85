//! AgentMesh CLI — run the orchestrator and its workflows from a terminal.
//!
//! Reuses the same core domain logic (agentmesh-core) and server bootstrap
//! (agentmesh-server) as the HTTP service.

use agentmesh_cli::commands;
use clap::{Parser, Subcommand};

/// AgentMesh — agent workflow orchestrator
#[derive(Parser)]
#[command(name = "agentmesh", version, about = "AgentMesh — agent workflow orchestrator")]
pub struct Cli {
    /// YAML file with extra workflow templates
    #[arg(long, global = true, env = "AGENTMESH_WORKFLOWS_FILE")]
    workflows: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP + WebSocket server
    Serve {
        /// Host to bind to
        #[arg(long, env = "AGENTMESH_HOST", default_value = "127.0.0.1")]
        host: String,
        /// Port to listen on
        #[arg(long, env = "AGENTMESH_PORT", default_value_t = 8081)]
        port: u16,
    },

    /// List workflow templates
    Workflows,

    /// Execute a workflow once and print the result
    Run {
        /// Workflow template id (e.g. "fraud_detection")
        name: String,
        /// Caller identity
        #[arg(long)]
        user_id: Option<String>,
        /// Parameters as a JSON object
        #[arg(long, default_value = "{}")]
        params: String,
    },

    /// Resolve a capability through the tier chain
    Resolve {
        /// list_products, get_product or get_cart
        capability: String,
        /// Parameters as a JSON object
        #[arg(long, default_value = "{}")]
        params: String,
    },

    /// List registered agents
    Agents,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agentmesh_core=warn,agentmesh_server=info,agentmesh_cli=info".into()),
        )
        .try_init();

    let workflows = cli.workflows.as_deref();
    let result = match cli.command {
        Commands::Serve { host, port } => commands::server::run(host, port, workflows.map(String::from)).await,
        Commands::Workflows => match commands::init_state(workflows).await {
            Ok(state) => commands::workflow::list(&state).map(|_| ()),
            Err(e) => Err(e),
        },
        Commands::Run {
            name,
            user_id,
            params,
        } => match commands::init_state(workflows).await {
            Ok(state) => commands::workflow::run(&state, &name, user_id, &params)
                .await
                .map(|_| ()),
            Err(e) => Err(e),
        },
        Commands::Resolve { capability, params } => match commands::init_state(workflows).await {
            Ok(state) => commands::resolve::run(&state, &capability, &params)
                .await
                .map(|_| ()),
            Err(e) => Err(e),
        },
        Commands::Agents => match commands::init_state(workflows).await {
            Ok(state) => commands::agent::list(&state).await.map(|_| ()),
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
