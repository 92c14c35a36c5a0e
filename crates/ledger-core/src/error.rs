use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("chain is empty")]
    EmptyChain,

    #[error("malformed chain: {0}")]
    MalformedChain(String),

    #[error("peer {peer} unreachable: {reason}")]
    PeerUnreachable { peer: String, reason: String },

    /// `index` is the 1-based position of the offending block.
    #[error("block {index} does not link to the hash of its predecessor")]
    BrokenLink { index: u64 },

    #[error("block {index} carries an invalid proof of work")]
    InvalidProof { index: u64 },

    #[error("chain tip kept moving, gave up after {attempts} mining attempts")]
    StaleProof { attempts: usize },
}

pub type Result<T> = std::result::Result<T, LedgerError>;
