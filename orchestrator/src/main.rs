//! Headless batch runner
//!
//! Starts one batch with the file store, waits for it to finish and prints
//! the final snapshot. Ctrl+C requests a stop; the job still finalises.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;

use orchestrator::{
    BatchManager, BroadcastStatusChannel, FileBatchStore, OrchestratorConfig, TopicCatalog,
};
use producer::{LlmSampleGenerator, RealApiClient, SimulatedGenerator};
use shared::{
    logging, process_debug, process_info, Difficulty, ProcessId, ProviderId, SampleGenerator, SampleTypeFilter,
    StartBatchRequest,
};

/// Batch generation job runner
#[derive(Parser)]
#[command(name = "orchestrator")]
#[command(about = "Runs one sample generation batch to completion")]
pub struct Args {
    /// Number of samples to generate
    #[arg(long)]
    pub target: u32,

    /// Starting provider (groq, cerebras, ollama, google, mistral); defaults to the first in PROVIDER_ORDER
    #[arg(long)]
    pub provider: Option<ProviderId>,

    /// Starting model; defaults to the provider's first model
    #[arg(long)]
    pub model: Option<String>,

    /// Restrict work to one category or "Category - Subcategory"
    #[arg(long)]
    pub topic: Option<String>,

    /// Override the difficulty of every work item
    #[arg(long)]
    pub difficulty: Option<Difficulty>,

    /// Sample type, or "balance" to rotate through all four
    #[arg(long, default_value = "balance")]
    pub sample_type: SampleTypeFilter,

    /// Directory holding batches.json and samples.jsonl
    #[arg(long, default_value = "./output")]
    pub data_dir: PathBuf,

    /// JSON topic catalog replacing the built-in one
    #[arg(long)]
    pub topics_file: Option<PathBuf>,

    /// Use the simulated generator instead of real providers
    #[arg(long)]
    pub simulate: bool,

    /// Failure probability for the simulated generator
    #[arg(long, default_value = "0.1")]
    pub failure_rate: f64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    ProcessId::init_orchestrator();
    logging::init_tracing_with_level(Some(&args.log_level));
    logging::log_startup(ProcessId::current(), "batch orchestrator");

    let config = OrchestratorConfig::from_env().context("loading orchestrator configuration")?;
    let catalog = match &args.topics_file {
        Some(path) => TopicCatalog::from_file(path)
            .await
            .with_context(|| format!("loading topic catalog {}", path.display()))?,
        None => TopicCatalog::default(),
    };

    let generator: Arc<dyn SampleGenerator> = if args.simulate {
        process_debug!(ProcessId::current(), "🎲 Simulated generator, failure rate {}", args.failure_rate);
        Arc::new(SimulatedGenerator::new(args.failure_rate).context("configuring the simulated generator")?)
    } else {
        Arc::new(LlmSampleGenerator::new(RealApiClient::from_env()))
    };
    let store = Arc::new(FileBatchStore::with_base_dir(args.data_dir.clone()));
    let channel = Arc::new(BroadcastStatusChannel::default());

    let manager = Arc::new(BatchManager::new(config, catalog, generator, store, channel)?);

    let request = StartBatchRequest {
        target: args.target,
        provider: args.provider,
        model: args.model.clone(),
        topic: args.topic.clone(),
        difficulty: args.difficulty,
        sample_type: args.sample_type,
    };
    let batch_id = manager.start(request).await?;
    process_info!(ProcessId::current(), "📁 Writing to {}", args.data_dir.display());

    let signal_manager = Arc::clone(&manager);
    let signal_batch = batch_id.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                logging::log_shutdown(ProcessId::current(), "Received Ctrl+C signal");
                if let Err(e) = signal_manager.stop(Some(&signal_batch)).await {
                    logging::log_error(ProcessId::current(), "Stop request", &e);
                }
            }
            Err(err) => logging::log_error(ProcessId::current(), "Signal handling", &err),
        }
    });

    let job = manager.wait(&batch_id).await?;
    println!("{}", serde_json::to_string_pretty(&job)?);

    logging::log_success(
        ProcessId::current(),
        &format!(
            "Batch {} {} with {}/{} samples ({} persisted)",
            job.id, job.status, job.samples_generated, job.target, job.samples_persisted
        ),
    );
    Ok(())
}
