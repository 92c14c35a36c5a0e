pub mod consensus;
pub mod constants;
pub mod error;
pub mod ledger;
pub mod mine;

pub use error::{LedgerError, Result};
pub use ledger::{Ledger, SharedLedger};

use serde::{Deserialize, Serialize};
use serde_json::Number;
use sha2::{Digest, Sha256};
use std::{
    fmt,
    time::{SystemTime, UNIX_EPOCH},
};

pub type Hash = [u8; 32];

/// A JSON number carried through unchanged, so `5` hashes as `5` and `0.5`
/// as `0.5`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(Number);

impl Amount {
    pub fn is_negative(&self) -> bool {
        match self.0.as_i64() {
            Some(v) => v < 0,
            None => self.0.as_f64().is_some_and(|v| v < 0.0),
        }
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(Number::from(value))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub amount: Amount,
}

impl Transaction {
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: impl Into<Amount>,
    ) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            amount: amount.into(),
        }
    }

    /// The coinbase-style transaction paying a miner for a sealed block.
    pub fn reward(recipient: impl Into<String>) -> Self {
        Self::new(
            constants::REWARD_SENDER,
            recipient,
            constants::MINING_REWARD,
        )
    }
}

/// Field order is part of the hash: serde emits keys in declaration order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub index: u64,
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub previous_hash: String,
}

impl Block {
    pub fn new(
        index: u64,
        transactions: Vec<Transaction>,
        proof: u64,
        previous_hash: String,
    ) -> Self {
        Self {
            index,
            timestamp: now_millis(),
            transactions,
            proof,
            previous_hash,
        }
    }

    /// Compact JSON with fixed key order; two processes agree on these bytes
    /// for the same logical block.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("block serialization is infallible")
    }

    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical_bytes());
        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest[..]);
        out
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash())
    }
}

/// Milliseconds since the Unix epoch; a clock set before 1970 reads as zero.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

pub mod pow {
    use super::Hash;
    use crate::constants::POW_TARGET_DIFFICULTY;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use sha2::{Digest, Sha256};

    /// The text that gets hashed: base64 of both proofs in decimal, back to back.
    pub fn guess(last_proof: u64, proof: u64) -> String {
        STANDARD.encode(format!("{last_proof}{proof}"))
    }

    pub fn proof_digest(last_proof: u64, proof: u64) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(guess(last_proof, proof).as_bytes());
        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest[..]);
        out
    }

    /// True iff the hex digest of the guess starts with four `'0'` characters.
    pub fn is_valid_proof(last_proof: u64, proof: u64) -> bool {
        count_leading_zero_bits(&proof_digest(last_proof, proof)) >= POW_TARGET_DIFFICULTY
    }

    /// Lowest proof, counting up from zero, that validates against `last_proof`.
    pub fn compute_proof(last_proof: u64) -> u64 {
        let mut proof = 0u64;
        while !is_valid_proof(last_proof, proof) {
            proof += 1;
        }
        proof
    }

    pub fn count_leading_zero_bits(hash: &Hash) -> u32 {
        let mut total = 0u32;
        for b in hash {
            if *b == 0 {
                total += 8;
            } else {
                total += b.leading_zeros();
                break;
            }
        }
        total
    }
}

pub mod chain {
    use super::*;
    use crate::constants::{GENESIS_PREVIOUS_HASH, GENESIS_PROOF};

    /// The block every ledger starts from.
    pub fn genesis_block() -> Block {
        Block::new(1, vec![], GENESIS_PROOF, GENESIS_PREVIOUS_HASH.to_string())
    }

    /// Walk the chain from its second block and report the first broken
    /// hash link or proof.
    pub fn validate_chain(chain: &[Block]) -> Result<()> {
        let Some(first) = chain.first() else {
            return Err(LedgerError::EmptyChain);
        };

        let mut last_block = first;
        for (pos, block) in chain.iter().enumerate().skip(1) {
            let index = pos as u64 + 1;
            if block.previous_hash != last_block.hash_hex() {
                return Err(LedgerError::BrokenLink { index });
            }
            if !pow::is_valid_proof(last_block.proof, block.proof) {
                return Err(LedgerError::InvalidProof { index });
            }
            last_block = block;
        }
        Ok(())
    }

    pub fn is_valid_chain(chain: &[Block]) -> bool {
        validate_chain(chain).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{GENESIS_PREVIOUS_HASH, HASH_HEX_SIZE};

    fn fixed_genesis() -> Block {
        let mut genesis = chain::genesis_block();
        genesis.timestamp = 1_600_000_000_000;
        genesis
    }

    fn build_chain(len: usize) -> Vec<Block> {
        let mut blocks = vec![chain::genesis_block()];
        while blocks.len() < len {
            let last = blocks.last().unwrap();
            let block = Block::new(
                last.index + 1,
                vec![Transaction::reward("miner")],
                pow::compute_proof(last.proof),
                last.hash_hex(),
            );
            blocks.push(block);
        }
        blocks
    }

    #[test]
    fn leading_zero_bits_examples() {
        let mut h = [0u8; 32];
        assert_eq!(pow::count_leading_zero_bits(&h), 256);
        h[0] = 0x0F; // 00001111
        assert_eq!(pow::count_leading_zero_bits(&h), 4);
        h = [0u8; 32];
        h[1] = 0x80; // 00000000 10000000
        assert_eq!(pow::count_leading_zero_bits(&h), 8);
        h[2] = 0x10;
        h[1] = 0x00;
        assert_eq!(pow::count_leading_zero_bits(&h), 19);
    }

    #[test]
    fn guess_is_base64_of_concatenated_proofs() {
        assert_eq!(pow::guess(100, 40545), "MTAwNDA1NDU=");
        assert_eq!(pow::guess(100, 35293), "MTAwMzUyOTM=");
    }

    #[test]
    fn proof_digest_example() {
        assert_eq!(
            hex::encode(pow::proof_digest(100, 40545)),
            "0000b13b20be76d8ffefab79b3e7c84091d3e0afc9a1d1b52dabde165e3d3343"
        );
        assert_eq!(
            hex::encode(pow::proof_digest(100, 0)),
            "1bef42216429610f616071678bc2810991100a081dcea1188898af096a8fe3ee"
        );
    }

    #[test]
    fn compute_proof_known_values() {
        assert_eq!(pow::compute_proof(100), 40545);
        assert_eq!(pow::compute_proof(40545), 71134);
        assert_eq!(pow::compute_proof(0), 71526);
    }

    #[test]
    fn computed_proof_is_always_valid() {
        for last in [0u64, 1, 7, 100, 12_345, u32::MAX as u64] {
            let proof = pow::compute_proof(last);
            assert!(pow::is_valid_proof(last, proof));
            // Nothing below it validates.
            assert!((0..proof).step_by(997).all(|p| !pow::is_valid_proof(last, p)));
        }
    }

    #[test]
    fn is_valid_proof_is_deterministic() {
        for proof in [0u64, 1, 40544, 40545, 40546] {
            assert_eq!(
                pow::is_valid_proof(100, proof),
                pow::is_valid_proof(100, proof)
            );
        }
        assert!(pow::is_valid_proof(100, 40545));
        assert!(!pow::is_valid_proof(100, 40544));
    }

    #[test]
    fn genesis_block_example() {
        let genesis = chain::genesis_block();
        assert_eq!(genesis.index, 1);
        assert_eq!(genesis.proof, 100);
        assert_eq!(genesis.previous_hash, GENESIS_PREVIOUS_HASH);
        assert_eq!(genesis.previous_hash.len(), HASH_HEX_SIZE);
        assert!(genesis.transactions.is_empty());
        assert!(genesis.timestamp > 0);
    }

    #[test]
    fn transaction_serialization_example() {
        let tx = Transaction::new("Alice", "Bob", 10u64);
        let json = serde_json::to_string(&tx).unwrap();
        assert_eq!(json, r#"{"sender":"Alice","recipient":"Bob","amount":10}"#);
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(tx, back);
    }

    #[test]
    fn fractional_amounts_keep_their_json_form() {
        let tx: Transaction =
            serde_json::from_str(r#"{"sender":"a","recipient":"b","amount":0.5}"#).unwrap();
        assert_eq!(tx.amount, serde_json::from_str::<Amount>("0.5").unwrap());
        assert_eq!(
            serde_json::to_string(&tx).unwrap(),
            r#"{"sender":"a","recipient":"b","amount":0.5}"#
        );
        let five: Amount = serde_json::from_str("5.0").unwrap();
        assert_eq!(five.to_string(), "5.0");
        assert!(!five.is_negative());
    }

    #[test]
    fn negative_amounts_are_detected() {
        for text in ["-1", "-0.25", "-9223372036854775808"] {
            let amount: Amount = serde_json::from_str(text).unwrap();
            assert!(amount.is_negative(), "{text}");
        }
        for text in ["0", "0.0", "18446744073709551615"] {
            let amount: Amount = serde_json::from_str(text).unwrap();
            assert!(!amount.is_negative(), "{text}");
        }
    }

    #[test]
    fn reward_transaction() {
        let tx = Transaction::reward("node-a");
        assert_eq!(tx.sender, "0");
        assert_eq!(tx.recipient, "node-a");
        assert_eq!(tx.amount, Amount::from(1u64));
    }

    #[test]
    fn canonical_bytes_have_fixed_key_order() {
        let genesis = fixed_genesis();
        let expected = format!(
            r#"{{"index":1,"timestamp":1600000000000,"transactions":[],"proof":100,"previousHash":"{GENESIS_PREVIOUS_HASH}"}}"#
        );
        assert_eq!(String::from_utf8(genesis.canonical_bytes()).unwrap(), expected);
    }

    #[test]
    fn block_hash_example() {
        let genesis = fixed_genesis();
        assert_eq!(
            genesis.hash_hex(),
            "1ed2b4111eb004ff75a572163503b5ba828bc46091c40ec590e200e678eedc4a"
        );

        let block = Block {
            index: 2,
            timestamp: 1_600_000_001_000,
            transactions: vec![Transaction::reward("node")],
            proof: 40545,
            previous_hash: genesis.hash_hex(),
        };
        assert_eq!(
            block.hash_hex(),
            "c97799cbf53f086931874e9bc248e3535a5d4f3e67bd857afebd88fde5e53284"
        );
        assert!(chain::is_valid_chain(&[genesis, block]));
    }

    #[test]
    fn block_hash_consistency() {
        let block = fixed_genesis();
        assert_eq!(block.hash(), block.hash());
        let reparsed: Block = serde_json::from_slice(&block.canonical_bytes()).unwrap();
        assert_eq!(block.hash(), reparsed.hash());
    }

    #[test]
    fn block_hash_changes_with_proof() {
        let mut block = fixed_genesis();
        let hash1 = block.hash();
        block.proof += 1;
        assert_ne!(hash1, block.hash());
    }

    #[test]
    fn block_hash_changes_with_transactions() {
        let mut block = fixed_genesis();
        let hash1 = block.hash();
        block.transactions.push(Transaction::new("a", "b", 5u64));
        assert_ne!(hash1, block.hash());
    }

    #[test]
    fn validate_empty_chain() {
        assert_eq!(chain::validate_chain(&[]), Err(LedgerError::EmptyChain));
        assert!(!chain::is_valid_chain(&[]));
    }

    #[test]
    fn single_block_chain_is_valid() {
        assert!(chain::is_valid_chain(&[chain::genesis_block()]));
    }

    #[test]
    fn honest_chain_is_valid() {
        let blocks = build_chain(4);
        assert_eq!(chain::validate_chain(&blocks), Ok(()));
        for (n, block) in blocks.iter().enumerate().skip(1) {
            assert_eq!(block.previous_hash, blocks[n - 1].hash_hex());
        }
    }

    #[test]
    fn tampered_previous_hash_is_rejected() {
        let mut blocks = build_chain(3);
        blocks[2].previous_hash = "ab".repeat(32);
        assert_eq!(
            chain::validate_chain(&blocks),
            Err(LedgerError::BrokenLink { index: 3 })
        );
    }

    #[test]
    fn tampered_proof_is_rejected() {
        let mut blocks = build_chain(3);
        // Altering the last proof keeps all hash links intact.
        blocks[2].proof += 1;
        assert_eq!(
            chain::validate_chain(&blocks),
            Err(LedgerError::InvalidProof { index: 3 })
        );
    }

    #[test]
    fn tampered_transactions_break_the_next_link() {
        let mut blocks = build_chain(3);
        blocks[1].transactions.push(Transaction::new("eve", "eve", 1_000u64));
        assert_eq!(
            chain::validate_chain(&blocks),
            Err(LedgerError::BrokenLink { index: 3 })
        );
    }
}
