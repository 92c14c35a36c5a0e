use ledger_core::{mine::ProofSearch, LedgerError, Result};
use std::time::Duration;
use uuid::Uuid;

/// Runtime settings for a node, independent of how they were supplied.
#[derive(Clone, Debug)]
pub struct NodeConfig {
    /// Recipient of mining rewards.
    pub node_id: String,
    /// Port used to reach registered peers; the registry keeps hostnames only.
    pub peer_port: u16,
    pub peer_timeout: Duration,
    pub search: ProofSearch,
}

impl NodeConfig {
    /// A missing `node_id` gets a fresh random one; a blank one is refused.
    pub fn new(
        node_id: Option<String>,
        peer_port: u16,
        peer_timeout: Duration,
        search: ProofSearch,
    ) -> Result<Self> {
        let config = Self {
            node_id: node_id.unwrap_or_else(random_node_id),
            peer_port,
            peer_timeout,
            search,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.node_id.trim().is_empty() {
            return Err(LedgerError::InvalidArgument(
                "node id must not be blank".into(),
            ));
        }
        Ok(())
    }
}

pub fn random_node_id() -> String {
    Uuid::new_v4().simple().to_string()
}
