pub mod config;
pub mod loopback;
pub mod report;

pub use config::{CliConfig, LoopbackConfig};
pub use loopback::LoopbackProvider;
