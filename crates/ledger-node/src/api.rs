use crate::{
    config::NodeConfig,
    peers::{ChainResponse, NodeRegistry, PeerClient},
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ledger_core::{
    consensus::Resolution,
    mine::{self, ProofSearch},
    Amount, Block, Ledger, LedgerError, SharedLedger, Transaction,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::task::JoinError;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub ledger: SharedLedger,
    pub registry: Arc<RwLock<NodeRegistry>>,
    peers: PeerClient,
    node_id: Arc<str>,
    search: ProofSearch,
}

impl AppState {
    pub fn new(ledger: Ledger, config: NodeConfig) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self {
            ledger: SharedLedger::new(ledger),
            registry: Arc::default(),
            peers: PeerClient::new(config.peer_port, config.peer_timeout)?,
            node_id: config.node_id.into(),
            search: config.search,
        })
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn register_nodes<S: AsRef<str>>(&self, addresses: &[S]) -> Result<Vec<String>, LedgerError> {
        let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        registry.register_all(addresses)?;
        Ok(registry.nodes())
    }

    pub fn nodes(&self) -> Vec<String> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .nodes()
    }

    /// One consensus round against every registered peer.
    pub async fn resolve(&self) -> Result<Resolution, ApiError> {
        let candidates = self.peers.fetch_all(self.nodes()).await;
        let peers = candidates.len();
        let ledger = self.ledger.clone();
        let resolution =
            tokio::task::spawn_blocking(move || ledger.resolve_conflicts(candidates)).await?;
        info!(
            peers,
            replaced = resolution.replaced(),
            length = resolution.chain().len(),
            "consensus round finished"
        );
        Ok(resolution)
    }
}

/// Error body returned by every handler: `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        let status = match e {
            LedgerError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        LedgerError::InvalidArgument(e.body_text()).into()
    }
}

impl From<JoinError> for ApiError {
    fn from(e: JoinError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("background task failed: {e}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = %self.status, error = %self.message, "request failed");
        }
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MineResponse {
    pub message: String,
    pub index: u64,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub previous_hash: String,
}

/// Fields stay optional so a missing one is reported as an invalid argument
/// rather than a generic decode failure.
#[derive(Deserialize)]
pub struct NewTransaction {
    sender: Option<String>,
    recipient: Option<String>,
    amount: Option<Amount>,
}

impl NewTransaction {
    fn validate(self) -> Result<(String, String, Amount), LedgerError> {
        let missing = |field: &str| LedgerError::InvalidArgument(format!("missing field `{field}`"));
        Ok((
            self.sender.ok_or_else(|| missing("sender"))?,
            self.recipient.ok_or_else(|| missing("recipient"))?,
            self.amount.ok_or_else(|| missing("amount"))?,
        ))
    }
}

#[derive(Serialize, Deserialize)]
pub struct TransactionAccepted {
    pub message: String,
    pub index: u64,
}

#[derive(Serialize, Deserialize)]
pub struct PendingResponse {
    pub transactions: Vec<Transaction>,
    pub count: usize,
}

#[derive(Deserialize)]
pub struct RegisterNodes {
    nodes: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize)]
pub struct NodesRegistered {
    pub message: String,
    pub nodes: Vec<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResolveResponse {
    #[serde(rename_all = "camelCase")]
    Replaced { message: String, new_chain: Vec<Block> },
    Authoritative { message: String, chain: Vec<Block> },
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(Health { status: "ok" }) }))
        .route("/mine", get(mine_block))
        .route("/transactions/new", post(new_transaction))
        .route("/transactions/pending", get(pending_transactions))
        .route("/chain", get(full_chain))
        .route("/nodes/register", post(register_nodes))
        .route("/nodes/resolve", get(resolve_nodes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn mine_block(State(state): State<AppState>) -> Result<Json<MineResponse>, ApiError> {
    let ledger = state.ledger.clone();
    let miner = state.node_id.clone();
    let search = state.search;
    let block =
        tokio::task::spawn_blocking(move || mine::mine(&ledger, &miner, search)).await??;

    Ok(Json(MineResponse {
        message: "New Block forged.".to_string(),
        index: block.index,
        transactions: block.transactions,
        proof: block.proof,
        previous_hash: block.previous_hash,
    }))
}

async fn new_transaction(
    State(state): State<AppState>,
    payload: Result<Json<NewTransaction>, JsonRejection>,
) -> Result<(StatusCode, Json<TransactionAccepted>), ApiError> {
    let Json(payload) = payload?;
    let (sender, recipient, amount) = payload.validate()?;
    let index = state.ledger.new_transaction(sender, recipient, amount)?;

    Ok((
        StatusCode::CREATED,
        Json(TransactionAccepted {
            message: format!("Transaction will be added to Block {index}"),
            index,
        }),
    ))
}

async fn pending_transactions(State(state): State<AppState>) -> Json<PendingResponse> {
    let transactions = state.ledger.pending();
    Json(PendingResponse {
        count: transactions.len(),
        transactions,
    })
}

async fn full_chain(State(state): State<AppState>) -> Json<ChainResponse> {
    let chain = state.ledger.snapshot();
    Json(ChainResponse {
        length: chain.len(),
        chain,
    })
}

async fn register_nodes(
    State(state): State<AppState>,
    payload: Result<Json<RegisterNodes>, JsonRejection>,
) -> Result<(StatusCode, Json<NodesRegistered>), ApiError> {
    let Json(payload) = payload?;
    let nodes = payload
        .nodes
        .filter(|nodes| !nodes.is_empty())
        .ok_or_else(|| LedgerError::InvalidArgument("please supply a valid list of nodes".into()))?;

    let registered = state.register_nodes(nodes.as_slice())?;
    info!(added = nodes.len(), total = registered.len(), "registered nodes");
    Ok((
        StatusCode::CREATED,
        Json(NodesRegistered {
            message: "New nodes have been added".to_string(),
            nodes: registered,
        }),
    ))
}

async fn resolve_nodes(State(state): State<AppState>) -> Result<Json<ResolveResponse>, ApiError> {
    Ok(Json(match state.resolve().await? {
        Resolution::Replaced(new_chain) => ResolveResponse::Replaced {
            message: "Our chain was replaced".to_string(),
            new_chain,
        },
        Resolution::Authoritative(chain) => ResolveResponse::Authoritative {
            message: "Our chain is authoritative".to_string(),
            chain,
        },
    }))
}
