pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
/// Leading zero bits a proof digest needs, i.e. four leading hex zeros.
pub const POW_TARGET_DIFFICULTY: u32 = 16;
pub const GENESIS_PROOF: u64 = 100;
/// Stands in for the predecessor hash of the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";
pub const REWARD_SENDER: &str = "0";
pub const MINING_REWARD: u64 = 1;
pub const MAX_MINING_ATTEMPTS: usize = 8;
pub const PROOFS_PER_BATCH: u64 = 1 << 14;
