use storage_slot_resolver::cache::CachedProvider;
use storage_slot_resolver::cli::Cli;
use storage_slot_resolver::layout::StorageLayout;
use storage_slot_resolver::output;
use storage_slot_resolver::provider::{GenesisProvider, SnapshotProvider, WordProvider};
use storage_slot_resolver::resolver::Resolver;

use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Main entry point for the slot scanner
#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Logs go to stderr so `--json` output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let keys = cli.key_set().map_err(|e| eyre::eyre!("invalid --key: {e}"))?;
    let layout = StorageLayout::from_file(&cli.layout)?;

    if !cli.json {
        output::print_banner(&cli.contract, &cli.layout, layout.storage.len());
    }

    let (source, kind, path) = match (&cli.snapshot, &cli.genesis) {
        (Some(path), _) => {
            let provider: Arc<dyn WordProvider> = Arc::new(SnapshotProvider::from_file(path)?);
            (provider, "Snapshot", path)
        }
        (None, Some(path)) => {
            let provider: Arc<dyn WordProvider> = Arc::new(GenesisProvider::from_file(path)?);
            (provider, "Genesis", path)
        }
        (None, None) => eyre::bail!("one of --snapshot or --genesis is required"),
    };
    if !cli.json {
        output::print_source(kind, path);
    }

    let cached = cli
        .cache_config()
        .map(|config| Arc::new(CachedProvider::new(source.clone(), config)));
    let provider: Arc<dyn WordProvider> = match &cached {
        Some(cached) => cached.clone() as Arc<dyn WordProvider>,
        None => source,
    };

    let resolver = Resolver::new(provider, cli.contract, layout, cli.resolver_config());
    info!(contract = %cli.contract, "resolving storage");

    match &cli.variable {
        Some(label) => {
            let slot = resolver.layout().variable(label)?.slot_number()?;
            let value = resolver.resolve_variable(label, &keys).await?;
            if cli.json {
                output::print_json(&serde_json::json!({
                    "label": label,
                    "slot": slot.to_string(),
                    "value": value,
                }))?;
            } else {
                output::print_variable(label, slot, &value);
            }
        }
        None => {
            let slots = resolver.resolve_all(&keys).await?;
            if cli.json {
                output::print_json(&slots)?;
            } else {
                output::print_slots(&slots);
            }
        }
    }

    if let (Some(cached), false) = (&cached, cli.json) {
        output::print_cache_stats(&cached.stats());
    }

    Ok(())
}
