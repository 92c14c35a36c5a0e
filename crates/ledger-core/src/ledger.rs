use crate::{
    chain::genesis_block,
    constants::GENESIS_PREVIOUS_HASH,
    Amount, Block, LedgerError, Result, Transaction,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// The canonical chain plus the transactions waiting for the next block.
#[derive(Clone, Debug)]
pub struct Ledger {
    chain: Vec<Block>,
    pending: Vec<Transaction>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// A ledger holding only the genesis block.
    pub fn new() -> Self {
        Self {
            chain: vec![genesis_block()],
            pending: Vec::new(),
        }
    }

    /// Seal the pending transactions into a new block and append it.
    ///
    /// Without an explicit `previous_hash` the block links to the hash of the
    /// current last block.
    pub fn new_block(&mut self, proof: u64, previous_hash: Option<String>) -> Block {
        let previous_hash = previous_hash.unwrap_or_else(|| {
            self.chain
                .last()
                .map(Block::hash_hex)
                .unwrap_or_else(|| GENESIS_PREVIOUS_HASH.to_string())
        });
        let index = self.chain.len() as u64 + 1;
        let transactions = std::mem::take(&mut self.pending);

        let block = Block::new(index, transactions, proof, previous_hash);
        debug!(
            index,
            txs = block.transactions.len(),
            proof,
            "sealed block"
        );
        self.chain.push(block.clone());
        block
    }

    /// Queue a transaction and return the index of the block it is expected
    /// to land in. The slot is not reserved.
    pub fn new_transaction(
        &mut self,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: impl Into<Amount>,
    ) -> Result<u64> {
        let tx = Transaction::new(sender, recipient, amount);
        if tx.sender.trim().is_empty() {
            return Err(LedgerError::InvalidArgument("sender must not be empty".into()));
        }
        if tx.recipient.trim().is_empty() {
            return Err(LedgerError::InvalidArgument(
                "recipient must not be empty".into(),
            ));
        }
        if tx.amount.is_negative() {
            return Err(LedgerError::InvalidArgument(format!(
                "amount must not be negative, got {}",
                tx.amount
            )));
        }

        let next_index = self.last_block()?.index + 1;
        self.pending.push(tx);
        Ok(next_index)
    }

    pub fn last_block(&self) -> Result<&Block> {
        self.chain.last().ok_or(LedgerError::EmptyChain)
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    /// Swap in a whole chain. Pending transactions stay queued.
    pub(crate) fn adopt_chain(&mut self, chain: Vec<Block>) {
        self.chain = chain;
    }
}

/// A `Ledger` behind a single mutex, cheap to clone into request handlers.
#[derive(Clone, Debug, Default)]
pub struct SharedLedger {
    inner: Arc<Mutex<Ledger>>,
}

impl SharedLedger {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    /// Every ledger mutation leaves it consistent, so a poisoned lock is
    /// still safe to use.
    pub fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> Vec<Block> {
        self.lock().chain().to_vec()
    }

    pub fn pending(&self) -> Vec<Transaction> {
        self.lock().pending().to_vec()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn new_transaction(
        &self,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: impl Into<Amount>,
    ) -> Result<u64> {
        self.lock().new_transaction(sender, recipient, amount)
    }
}
