pub const DEFAULT_LISTEN: &str = "127.0.0.1:5000";
pub const DEFAULT_PEER_PORT: u16 = 5000;
pub const DEFAULT_PEER_TIMEOUT_SECS: u64 = 5;
