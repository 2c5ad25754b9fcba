use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::Result;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use pixcache::domain::ImageId;
use pixcache::infrastructure::config::Command;
use pixcache::infrastructure::{
    CliArgs, ConfigStore, EngineConfig, FileCache, LoadEngine, SourceRouter, main_context,
};
use pixcache::presentation::ImageSlot;

fn init_logging(config: &EngineConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = &config.log_path {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<EngineConfig> {
    let mut config = match ConfigStore::new() {
        Ok(store) => store.load_config(args.config.as_deref())?,
        Err(_) => EngineConfig::default(),
    };
    config.merge_args(args);
    Ok(config)
}

async fn open_file_cache(config: &EngineConfig) -> Result<FileCache> {
    let cache = match &config.cache_dir {
        Some(dir) => FileCache::new(dir.clone()).await?,
        None => FileCache::default_location().await?,
    };
    Ok(cache)
}

async fn fetch(config: &EngineConfig, ids: Vec<String>) -> Result<()> {
    let file_cache = open_file_cache(config).await?;
    let source = Arc::new(SourceRouter::new(
        config.fetch_timeouts(),
        config.content_root.clone(),
    )?);
    let (queue, runner) = main_context();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    let engine = LoadEngine::builder(file_cache, source, Arc::new(queue))
        .config(config.engine_config())
        .events(event_tx)
        .build()?;

    let slots: Vec<Arc<ImageSlot>> = ids
        .into_iter()
        .map(|id| Arc::new(ImageSlot::new(ImageId::new(id), None)))
        .collect();

    let ui = tokio::spawn(runner.run());

    let mut outstanding = 0usize;
    for slot in &slots {
        if engine.request(slot.id().clone(), slot) == pixcache::domain::LoadStage::Queued {
            outstanding += 1;
        }
    }

    while outstanding > 0 {
        let Some(event) = event_rx.recv().await else {
            break;
        };
        info!(id = %event.id, outcome = ?event.outcome, "Load finished");
        outstanding -= 1;
    }

    for slot in &slots {
        println!("{}: {}", slot.id(), slot.describe());
    }
    info!(stats = %engine.memory_cache().stats(), "Done");

    drop(engine);
    ui.abort();
    Ok(())
}

async fn clear(config: &EngineConfig) -> Result<()> {
    let file_cache = open_file_cache(config).await?;
    file_cache.clear().await;
    println!("Cleared {}", file_cache.dir().display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    init_logging(&config)?;

    info!(version = pixcache::VERSION, "Starting pixcache");

    match args.command {
        Command::Fetch { ids } => fetch(&config, ids).await,
        Command::Clear => clear(&config).await,
    }
}
