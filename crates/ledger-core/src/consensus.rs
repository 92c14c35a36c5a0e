//! Longest valid chain wins.

use crate::{chain::validate_chain, Block, Result, SharedLedger};
use tracing::{info, warn};

/// What one peer returned for a resolution round.
#[derive(Debug)]
pub struct PeerChain {
    pub peer: String,
    pub chain: Result<Vec<Block>>,
}

impl PeerChain {
    pub fn new(peer: impl Into<String>, chain: Result<Vec<Block>>) -> Self {
        Self {
            peer: peer.into(),
            chain,
        }
    }
}

/// Outcome of a resolution round, with the chain the ledger held once it
/// finished.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Replaced(Vec<Block>),
    Authoritative(Vec<Block>),
}

impl Resolution {
    pub fn replaced(&self) -> bool {
        matches!(self, Resolution::Replaced(_))
    }

    pub fn chain(&self) -> &[Block] {
        match self {
            Resolution::Replaced(chain) | Resolution::Authoritative(chain) => chain,
        }
    }
}

/// Pick the longest candidate that is strictly longer than `current_len` and
/// passes validation. Failed fetches and invalid chains are skipped.
pub fn select_longest_valid<I>(current_len: usize, candidates: I) -> Option<PeerChain>
where
    I: IntoIterator<Item = PeerChain>,
{
    let mut best_len = current_len;
    let mut best = None;

    for candidate in candidates {
        let chain = match &candidate.chain {
            Ok(chain) => chain,
            Err(e) => {
                warn!(peer = %candidate.peer, error = %e, "skipping peer");
                continue;
            }
        };
        if chain.len() <= best_len {
            continue;
        }
        if let Err(e) = validate_chain(chain) {
            warn!(peer = %candidate.peer, len = chain.len(), error = %e, "rejecting invalid chain");
            continue;
        }
        best_len = chain.len();
        best = Some(candidate);
    }
    best
}

impl SharedLedger {
    /// Validation runs without the lock; the length comparison is repeated
    /// under it so a block sealed in the meantime still counts.
    pub fn resolve_conflicts<I>(&self, candidates: I) -> Resolution
    where
        I: IntoIterator<Item = PeerChain>,
    {
        let winner = select_longest_valid(self.len(), candidates);
        self.adopt_if_longer(winner)
    }

    fn adopt_if_longer(&self, winner: Option<PeerChain>) -> Resolution {
        let mut ledger = self.lock();
        let Some(PeerChain {
            peer,
            chain: Ok(chain),
        }) = winner
        else {
            return Resolution::Authoritative(ledger.chain().to_vec());
        };

        if chain.len() <= ledger.len() {
            info!(%peer, "local chain grew during resolution, keeping it");
            return Resolution::Authoritative(ledger.chain().to_vec());
        }
        info!(%peer, from = ledger.len(), to = chain.len(), "chain replaced");
        ledger.adopt_chain(chain.clone());
        Resolution::Replaced(chain)
    }
}
