use clap::Parser;
use ledger_core::{mine::ProofSearch, Ledger, LedgerError};
use ledger_node::{
    constants::{DEFAULT_LISTEN, DEFAULT_PEER_PORT, DEFAULT_PEER_TIMEOUT_SECS},
    router, AppState, NodeConfig,
};
use std::{net::SocketAddr, time::Duration};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ledger-node")]
#[command(about = "Proof-of-work ledger node")]
struct Args {
    /// Address to listen on, e.g. 127.0.0.1:5000
    #[arg(long, default_value = DEFAULT_LISTEN)]
    listen: String,

    /// Reward address for mined blocks (random UUIDv4 when omitted)
    #[arg(long)]
    node_id: Option<String>,

    /// Peer address to register at startup; repeatable
    #[arg(long = "peer")]
    peers: Vec<String>,

    /// Port used to fetch chains from registered peers
    #[arg(long, default_value_t = DEFAULT_PEER_PORT)]
    peer_port: u16,

    /// Per-peer timeout for chain fetches
    #[arg(long, default_value_t = DEFAULT_PEER_TIMEOUT_SECS)]
    peer_timeout_secs: u64,

    /// Search proofs on all cores
    #[arg(long)]
    parallel_mining: bool,
}

impl TryFrom<&Args> for NodeConfig {
    type Error = LedgerError;

    fn try_from(args: &Args) -> Result<Self, Self::Error> {
        let search = if args.parallel_mining {
            ProofSearch::Parallel
        } else {
            ProofSearch::Sequential
        };
        NodeConfig::new(
            args.node_id.clone(),
            args.peer_port,
            Duration::from_secs(args.peer_timeout_secs),
            search,
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let state = AppState::new(Ledger::new(), NodeConfig::try_from(&args)?)?;
    if !args.peers.is_empty() {
        let nodes = state.register_nodes(args.peers.as_slice())?;
        info!(?nodes, "registered bootstrap peers");
    }

    let addr: SocketAddr = args.listen.parse()?;
    info!(node_id = state.node_id(), "ledger-node listening on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install ctrl-c handler");
    }
    info!("shutting down");
}
