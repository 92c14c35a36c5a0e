use crate::{
    constants::{MAX_MINING_ATTEMPTS, MINING_REWARD, PROOFS_PER_BATCH, REWARD_SENDER},
    pow::{compute_proof, is_valid_proof},
    Block, LedgerError, Result, SharedLedger,
};
use rayon::prelude::*;
use tracing::{debug, info};

/// How a miner searches for the next proof.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProofSearch {
    #[default]
    Sequential,
    Parallel,
}

impl ProofSearch {
    pub fn search(self, last_proof: u64) -> u64 {
        match self {
            ProofSearch::Sequential => compute_proof(last_proof),
            ProofSearch::Parallel => compute_proof_parallel(last_proof),
        }
    }
}

/// Searches proofs across the rayon pool one batch at a time.
///
/// `find_first` keeps the lowest hit within a batch and batches are scanned in
/// order, so the result always equals `compute_proof(last_proof)`.
pub fn compute_proof_parallel(last_proof: u64) -> u64 {
    let mut start = 0u64;
    loop {
        let end = start.saturating_add(PROOFS_PER_BATCH);
        if let Some(proof) = (start..end)
            .into_par_iter()
            .find_first(|proof| is_valid_proof(last_proof, *proof))
        {
            return proof;
        }
        start = end;
    }
}

/// Mine one block: find a proof for the current tip without holding the
/// lock, then queue the reward for `miner` and seal.
///
/// If another block lands (or the chain is replaced) while searching, the
/// proof is stale and the search restarts from the new tip.
pub fn mine(ledger: &SharedLedger, miner: &str, search: ProofSearch) -> Result<Block> {
    for attempt in 1..=MAX_MINING_ATTEMPTS {
        let tip = ledger.lock().last_block()?.clone();
        let proof = search.search(tip.proof);

        let mut guard = ledger.lock();
        if guard.last_block()? != &tip {
            debug!(attempt, stale_index = tip.index, "chain tip moved during proof search");
            continue;
        }

        guard.new_transaction(REWARD_SENDER, miner, MINING_REWARD)?;
        let block = guard.new_block(proof, None);
        info!(
            "Mined block {} with proof {} and hash {}",
            block.index,
            block.proof,
            block.hash_hex()
        );
        return Ok(block);
    }

    Err(LedgerError::StaleProof {
        attempts: MAX_MINING_ATTEMPTS,
    })
}
