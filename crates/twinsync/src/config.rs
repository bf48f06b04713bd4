//! Configuration file parsing and structures.
//!
//! twinsync reads one TOML file. Every section is optional; the sections a
//! command needs are checked when that command starts.

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::filter::Targets;

use crate::graph::RetryPolicy;

/// Top-level configuration structure
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    /// Gateway to poll; required by `agent`
    #[serde(default)]
    pub bridge: Option<BridgeConfig>,

    /// Event transport; required by `agent` and `ingest`
    #[serde(default)]
    pub mqtt: Option<MqttConfig>,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Remote graph store; required by `ingest`
    #[serde(default)]
    pub graph_store: Option<GraphStoreConfig>,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default)]
    pub level: LogLevel,

    /// Per-target levels, e.g. `"twinsync::graph" = "debug"`
    #[serde(default)]
    pub overrides: HashMap<String, LogLevel>,
}

impl LoggingConfig {
    pub fn targets(&self) -> Targets {
        Targets::new()
            .with_default(LevelFilter::from(self.level))
            .with_targets(
                self.overrides
                    .iter()
                    .map(|(target, level)| (target.clone(), LevelFilter::from(*level))),
            )
    }
}

fn default_poll_interval_ms() -> u64 {
    10_000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_event_channel() -> String {
    "hueEvents".to_string()
}

/// Producer side: polling and event emission
#[derive(Debug, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Directory holding the persisted population
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Topic change and snapshot events are published on
    #[serde(default = "default_event_channel")]
    pub event_channel: String,

    /// Any message on this topic triggers a full snapshot
    #[serde(default)]
    pub resync_topic: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            data_dir: default_data_dir(),
            event_channel: default_event_channel(),
            resync_topic: None,
        }
    }
}

impl AgentConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_bridge_timeout_ms() -> u64 {
    5_000
}

/// An already paired Hue bridge
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Host or host:port of the bridge
    pub address: String,

    /// API username issued by the bridge at pairing time
    pub username: String,

    #[serde(default = "default_bridge_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    "twinsync".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    /// MQTT broker hostname or IP address
    pub broker: String,

    #[serde(default = "default_mqtt_port")]
    pub port: u16,

    /// Base client id; each command connects as `<client_id>-<command>`
    #[serde(default = "default_client_id")]
    pub client_id: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

impl MqttConfig {
    /// Connection settings for one command. The broker drops an existing
    /// session when another client connects with the same id, so `agent`
    /// and `ingest` sharing a config file must not share an id.
    pub fn for_role(&self, role: &str) -> MqttConfig {
        MqttConfig {
            client_id: format!("{}-{}", self.client_id, role),
            ..self.clone()
        }
    }
}

fn default_sources() -> Vec<String> {
    vec!["hue".to_string()]
}

/// Consumer side: events to graph operations
#[derive(Debug, Deserialize)]
pub struct IngestConfig {
    /// Connector keys allowed to handle events
    #[serde(default = "default_sources")]
    pub sources_enabled: Vec<String>,

    /// Fetch existing node and model ids before mapping a snapshot, so
    /// that stale ones are deleted
    #[serde(default)]
    pub reconcile: bool,

    /// Topic to consume; defaults to `agent.event_channel`
    #[serde(default)]
    pub topic: Option<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            sources_enabled: default_sources(),
            reconcile: false,
            topic: None,
        }
    }
}

fn default_max_retries() -> u32 {
    5
}

fn default_base_ms() -> u64 {
    500
}

fn default_max_ms() -> u64 {
    8_000
}

#[derive(Debug, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_base_ms")]
    pub base_ms: u64,

    #[serde(default = "default_max_ms")]
    pub max_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_ms: default_base_ms(),
            max_ms: default_max_ms(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.base_ms),
            max_delay: Duration::from_millis(self.max_ms),
        }
    }
}

fn default_store_timeout_ms() -> u64 {
    30_000
}

/// Azure Digital Twins style REST endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct GraphStoreConfig {
    /// e.g. `https://my-instance.api.weu.digitaltwins.azure.net`
    pub endpoint: String,

    /// Bearer token sent with every request
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_store_timeout_ms")]
    pub timeout_ms: u64,

    /// Delete and recreate catalog models that already exist
    #[serde(default)]
    pub replace_existing_models: bool,
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().to_path_buf(), e))?;

        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Cross-field checks serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "agent.poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.agent.event_channel.is_empty() {
            return Err(ConfigError::Invalid(
                "agent.event_channel must not be empty".to_string(),
            ));
        }
        if self.retry.base_ms == 0 {
            return Err(ConfigError::Invalid(
                "retry.base_ms must be greater than zero".to_string(),
            ));
        }
        if self.retry.max_ms < self.retry.base_ms {
            return Err(ConfigError::Invalid(format!(
                "retry.max_ms ({}) is smaller than retry.base_ms ({})",
                self.retry.max_ms, self.retry.base_ms
            )));
        }
        if self.ingest.sources_enabled.is_empty() {
            return Err(ConfigError::Invalid(
                "ingest.sources_enabled must name at least one source".to_string(),
            ));
        }
        if let Some(store) = &self.graph_store {
            if !store.endpoint.starts_with("http://") && !store.endpoint.starts_with("https://") {
                return Err(ConfigError::Invalid(format!(
                    "graph_store.endpoint must be an http(s) URL, got {:?}",
                    store.endpoint
                )));
            }
        }
        Ok(())
    }

    /// Topic the ingestor consumes
    pub fn ingest_topic(&self) -> &str {
        self.ingest
            .topic
            .as_deref()
            .unwrap_or(&self.agent.event_channel)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing [{0}] section")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.agent.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.agent.event_channel, "hueEvents");
        assert_eq!(config.ingest.sources_enabled, vec!["hue"]);
        assert!(!config.ingest.reconcile);
        assert_eq!(config.retry.policy(), RetryPolicy::default());
        assert!(config.bridge.is_none());
        assert_eq!(config.ingest_topic(), "hueEvents");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [logging]
            level = "warn"
            overrides."twinsync::graph" = "debug"

            [agent]
            poll_interval_ms = 2500
            data_dir = "/var/lib/twinsync"
            event_channel = "home/hue/events"
            resync_topic = "home/hue/resync"

            [bridge]
            address = "192.168.1.20"
            username = "abcdef0123456789"

            [mqtt]
            broker = "localhost"
            username = "twinsync"
            password = "secret"

            [ingest]
            sources_enabled = ["hue"]
            reconcile = true
            topic = "home/hue/ingest"

            [retry]
            max_retries = 3
            base_ms = 250

            [graph_store]
            endpoint = "https://twins.example.net"
            token = "tok"
        "#;

        let config = Config::parse(toml).unwrap();
        assert_eq!(config.logging.level, LogLevel::Warn);
        assert_eq!(config.logging.overrides["twinsync::graph"], LogLevel::Debug);
        assert_eq!(config.agent.data_dir, PathBuf::from("/var/lib/twinsync"));
        assert_eq!(config.agent.resync_topic.as_deref(), Some("home/hue/resync"));

        let bridge = config.bridge.as_ref().unwrap();
        assert_eq!(bridge.timeout_ms, 5000);

        let mqtt = config.mqtt.as_ref().unwrap();
        assert_eq!(mqtt.port, 1883);
        assert_eq!(mqtt.client_id, "twinsync");

        assert!(config.ingest.reconcile);
        assert_eq!(config.ingest_topic(), "home/hue/ingest");

        let policy = config.retry.policy();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(250));
        assert_eq!(policy.max_delay, Duration::from_millis(8000));

        let store = config.graph_store.as_ref().unwrap();
        assert_eq!(store.timeout_ms, 30_000);
        assert!(!store.replace_existing_models);
    }

    #[test]
    fn test_commands_get_distinct_client_ids() {
        let toml = r#"
            [mqtt]
            broker = "localhost"
            client_id = "hall"
        "#;
        let config = Config::parse(toml).unwrap();
        let mqtt = config.mqtt.as_ref().unwrap();

        let agent = mqtt.for_role("agent");
        let ingest = mqtt.for_role("ingest");
        assert_eq!(agent.client_id, "hall-agent");
        assert_eq!(ingest.client_id, "hall-ingest");
        assert_eq!(agent.broker, "localhost");
        assert_eq!(ingest.port, 1883);
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let err = Config::parse("[agent]\npoll_interval_ms = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_max_backoff_below_base_is_rejected() {
        let err = Config::parse("[retry]\nbase_ms = 1000\nmax_ms = 10").unwrap_err();
        assert!(err.to_string().contains("retry.max_ms"));
    }

    #[test]
    fn test_non_http_endpoint_is_rejected() {
        let err = Config::parse("[graph_store]\nendpoint = \"twins.example.net\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_unknown_section_is_rejected() {
        let err = Config::parse("[integrations]\nfoo = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_bridge_requires_username() {
        let err = Config::parse("[bridge]\naddress = \"10.0.0.2\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("twinsync.toml");
        std::fs::write(&path, "[agent]\nevent_channel = \"events\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.agent.event_channel, "events");

        let err = Config::from_file(temp_dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(..)));
    }

    #[test]
    fn test_example_config_parses() {
        let config = Config::parse(include_str!("../../../twinsync.example.toml")).unwrap();
        assert_eq!(config.agent.resync_topic.as_deref(), Some("hueEvents/resync"));
        assert_eq!(config.bridge.unwrap().timeout_ms, 5000);
        assert_eq!(config.mqtt.unwrap().port, 1883);
        assert!(!config.graph_store.unwrap().replace_existing_models);
    }
}
