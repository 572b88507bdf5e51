//! WebServer entry point
//!
//! Hosts the batch manager in-process and exposes it over HTTP and WebSocket.

use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use orchestrator::{BatchManager, BroadcastStatusChannel, FileBatchStore, OrchestratorConfig, TopicCatalog};
use producer::{LlmSampleGenerator, RealApiClient, SimulatedGenerator};
use shared::{logging, process_info, ProcessId, SampleGenerator};
use webserver::{AppState, WebServer};

#[derive(Parser, Debug)]
#[command(name = "webserver")]
#[command(about = "HTTP and WebSocket front end for batch generation")]
struct Args {
    /// Port for HTTP server
    #[arg(long, default_value = "8080")]
    port: u16,

    /// Directory holding batches.json and samples.jsonl
    #[arg(long, default_value = "./output")]
    data_dir: PathBuf,

    /// JSON topic catalog replacing the built-in one
    #[arg(long)]
    topics_file: Option<PathBuf>,

    /// Use the simulated generator instead of real providers
    #[arg(long)]
    simulate: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    ProcessId::init_webserver();
    logging::init_tracing_with_level(Some(&args.log_level));
    logging::log_startup(ProcessId::current(), &format!("webserver on port {}", args.port));

    let config = OrchestratorConfig::from_env().context("loading orchestrator configuration")?;
    let catalog = match &args.topics_file {
        Some(path) => TopicCatalog::from_file(path)
            .await
            .with_context(|| format!("loading topic catalog {}", path.display()))?,
        None => TopicCatalog::default(),
    };

    let generator: Arc<dyn SampleGenerator> = if args.simulate {
        process_info!(ProcessId::current(), "🎲 Running with the simulated generator");
        Arc::new(SimulatedGenerator::new(0.1)?)
    } else {
        Arc::new(LlmSampleGenerator::new(RealApiClient::from_env()))
    };
    let store = Arc::new(FileBatchStore::with_base_dir(args.data_dir.clone()));
    let channel = BroadcastStatusChannel::default();

    let manager = BatchManager::new(config, catalog, generator, store, Arc::new(channel.clone()))?;
    let state = AppState::new(Arc::new(manager), channel);

    let http_addr = SocketAddr::from(([127, 0, 0, 1], args.port));
    WebServer::new(state, http_addr).run().await?;

    logging::log_success(ProcessId::current(), "WebServer stopped gracefully");
    Ok(())
}
