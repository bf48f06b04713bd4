pub mod agent;
pub mod asset;
pub mod config;
pub mod connectors;
pub mod graph;
pub mod ingest;
pub mod integrations;
pub mod monitor;
pub mod time;

pub use config::Config;
pub use config::ConfigError;
pub use config::LogLevel;
