use axum::http::Uri;
use ledger_core::{consensus::PeerChain, Block, LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, time::Duration};
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Body of `GET /chain`, both served and fetched from peers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainResponse {
    pub chain: Vec<Block>,
    pub length: usize,
}

/// Extract the hostname from a node address such as `http://10.0.0.1:6000`.
/// Scheme, port and path are dropped and the host is lowercased; a bare
/// `host:port` is accepted too.
pub fn hostname(address: &str) -> Result<String> {
    let uri: Uri = address
        .trim()
        .parse()
        .map_err(|e| LedgerError::InvalidArgument(format!("invalid node address {address:?}: {e}")))?;
    uri.host()
        .filter(|host| !host.is_empty())
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| LedgerError::InvalidArgument(format!("node address {address:?} has no host")))
}

/// Known peer hostnames, deduplicated and kept in sorted order.
#[derive(Clone, Debug, Default)]
pub struct NodeRegistry {
    nodes: BTreeSet<String>,
}

impl NodeRegistry {
    /// Registers every address or none of them.
    pub fn register_all<S: AsRef<str>>(&mut self, addresses: &[S]) -> Result<()> {
        let hosts = addresses
            .iter()
            .map(|a| hostname(a.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        self.nodes.extend(hosts);
        Ok(())
    }

    pub fn nodes(&self) -> Vec<String> {
        self.nodes.iter().cloned().collect()
    }
}

/// Fetches chains from peers over HTTP.
#[derive(Clone, Debug)]
pub struct PeerClient {
    client: reqwest::Client,
    port: u16,
}

impl PeerClient {
    pub fn new(port: u16, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, port })
    }

    pub async fn fetch_chain(&self, host: &str) -> Result<Vec<Block>> {
        let url = format!("http://{host}:{}/chain", self.port);
        debug!(%url, "fetching peer chain");

        let unreachable = |e: reqwest::Error| LedgerError::PeerUnreachable {
            peer: host.to_string(),
            reason: e.to_string(),
        };
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(unreachable)?;

        let body: ChainResponse = res
            .json()
            .await
            .map_err(|e| LedgerError::MalformedChain(format!("{host}: {e}")))?;
        if body.length != body.chain.len() {
            return Err(LedgerError::MalformedChain(format!(
                "{host}: reported length {} but sent {} blocks",
                body.length,
                body.chain.len()
            )));
        }
        Ok(body.chain)
    }

    /// Fetch from every host concurrently and wait for all of them.
    pub async fn fetch_all(&self, hosts: Vec<String>) -> Vec<PeerChain> {
        let mut tasks = JoinSet::new();
        for host in hosts {
            let client = self.clone();
            tasks.spawn(async move {
                let chain = client.fetch_chain(&host).await;
                PeerChain::new(host, chain)
            });
        }

        let mut candidates = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(candidate) => candidates.push(candidate),
                Err(e) => warn!(error = %e, "peer fetch task failed"),
            }
        }
        candidates
    }
}
