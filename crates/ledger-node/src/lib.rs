pub mod api;
pub mod config;
pub mod constants;
pub mod peers;

pub use api::{router, AppState};
pub use config::NodeConfig;
