use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use clap::Subcommand;
use tokio::sync::Mutex;
use tracing::error;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;
use twinsync::agent::Agent;
use twinsync::asset::AssetObservationEvent;
use twinsync::connectors;
use twinsync::connectors::Existing;
use twinsync::graph::summarize;
use twinsync::graph::Executor;
use twinsync::graph::HttpGraphStore;
use twinsync::ingest::plan;
use twinsync::ingest::Ingestor;
use twinsync::integrations::hue_bridge::HueBridge;
use twinsync::integrations::mqtt::MqttClient;
use twinsync::integrations::mqtt::MqttPublisher;
use twinsync::integrations::mqtt::RumqttcClient;
use twinsync::monitor::Poller;
use twinsync::monitor::SnapshotStore;
use twinsync::Config;
use twinsync::ConfigError;

/// Keep graph-store digital twins in sync with Hue lights and sensors
#[derive(Parser)]
#[command(name = "twinsync", version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "twinsync.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Poll the bridge and publish observation events
    Agent,

    /// Consume observation events and apply them to the graph store
    Ingest,

    /// Print the graph operations one event file maps to, without applying them
    Plan {
        /// Snapshot or change event, as published on the event channel
        event: PathBuf,

        /// JSON array of node ids already in the store
        #[arg(long)]
        existing_nodes: Option<PathBuf>,

        /// JSON array of model ids already in the store
        #[arg(long)]
        existing_models: Option<PathBuf>,

        /// One line per operation instead of JSON
        #[arg(long)]
        summary: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // `plan` works offline and does not need a config file.
    let config = match (&cli.command, cli.config.exists()) {
        (Command::Plan { .. }, false) => Config::default(),
        _ => Config::from_file(&cli.config)
            .with_context(|| format!("Failed to load {}", cli.config.display()))?,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(config.logging.targets()),
        )
        .init();

    match cli.command {
        Command::Agent => run_agent(&config).await,
        Command::Ingest => run_ingest(&config).await,
        Command::Plan {
            event,
            existing_nodes,
            existing_models,
            summary,
        } => run_plan(
            &config,
            &event,
            existing_nodes.as_deref(),
            existing_models.as_deref(),
            summary,
        ),
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}

async fn connect_mqtt(config: &Config, role: &str) -> anyhow::Result<Arc<Mutex<RumqttcClient>>> {
    let mqtt = config
        .mqtt
        .as_ref()
        .ok_or(ConfigError::Missing("mqtt"))?
        .for_role(role);
    let mut client = RumqttcClient::new(&mqtt);
    client
        .connect()
        .await
        .with_context(|| format!("Failed to connect to {}:{}", mqtt.broker, mqtt.port))?;
    info!(
        client_id = %mqtt.client_id,
        "Connected to MQTT broker {}:{}",
        mqtt.broker,
        mqtt.port
    );
    Ok(Arc::new(Mutex::new(client)))
}

async fn run_agent(config: &Config) -> anyhow::Result<()> {
    let bridge = config.bridge.as_ref().ok_or(ConfigError::Missing("bridge"))?;
    let observer = HueBridge::new(bridge).context("Failed to create bridge client")?;
    let client = connect_mqtt(config, "agent").await?;

    let channel = config.agent.event_channel.as_str();
    let poller = Poller::new(
        observer,
        MqttPublisher::new(client.clone(), channel),
        SnapshotStore::new(&config.agent.data_dir),
        config.agent.poll_interval(),
    );
    let agent = Agent::new(poller, Arc::new(MqttPublisher::new(client.clone(), channel)));

    info!("twinsync agent starting, publishing on {}", channel);
    agent
        .run(&client, config.agent.resync_topic.as_deref(), shutdown_signal())
        .await
        .context("Agent failed")?;
    info!("twinsync agent stopped");
    Ok(())
}

async fn run_ingest(config: &Config) -> anyhow::Result<()> {
    let store_config = config
        .graph_store
        .as_ref()
        .ok_or(ConfigError::Missing("graph_store"))?;
    let store = HttpGraphStore::new(store_config).context("Failed to create graph store client")?;
    let executor =
        Executor::new(store).replace_existing_models(store_config.replace_existing_models);
    let ingestor = Ingestor::new(
        connectors::pick(&config.ingest.sources_enabled),
        executor,
        config.retry.policy(),
        config.ingest.reconcile,
    );

    let client = connect_mqtt(config, "ingest").await?;
    let topic = config.ingest_topic();
    tokio::select! {
        result = ingestor.run(&client, topic) => result.context("Event subscription failed")?,
        _ = shutdown_signal() => {}
    }
    info!("twinsync ingest stopped");
    Ok(())
}

fn read_ids(path: &Path) -> anyhow::Result<Vec<String>> {
    let contents =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_slice(&contents)
        .with_context(|| format!("{} is not a JSON array of strings", path.display()))
}

fn run_plan(
    config: &Config,
    event: &Path,
    existing_nodes: Option<&Path>,
    existing_models: Option<&Path>,
    summary: bool,
) -> anyhow::Result<()> {
    let payload =
        std::fs::read(event).with_context(|| format!("Failed to read {}", event.display()))?;
    let event = AssetObservationEvent::from_slice(&payload)
        .with_context(|| format!("Failed to decode {}", event.display()))?;

    let connector = connectors::pick(&config.ingest.sources_enabled).with_context(|| {
        format!(
            "No registered connector is enabled by {:?}",
            config.ingest.sources_enabled
        )
    })?;

    let node_ids = existing_nodes.map(read_ids).transpose()?;
    let model_ids = existing_models.map(read_ids).transpose()?;
    let operations = plan(
        connector.as_ref(),
        &event,
        Existing {
            node_ids: node_ids.as_deref(),
            model_ids: model_ids.as_deref(),
        },
    );

    if summary {
        println!("{}", summarize(&operations));
    } else {
        println!("{}", serde_json::to_string_pretty(&operations)?);
    }
    Ok(())
}
