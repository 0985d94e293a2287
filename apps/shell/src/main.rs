use std::{sync::Arc, time::Duration};

use anyhow::Result;
use clap::Parser;
use loader_core::{config, DatasetClient, PassthroughStateBuilder};
use shared::events::StoreEvent;

/// Minimal shell around the dataset loader: performs one load and prints
/// every event the loader emits until the chains go quiet.
#[derive(Parser, Debug)]
struct Args {
    /// Base address of the dataset catalog API; overrides viewer.toml.
    #[arg(long)]
    server_address: Option<String>,
    /// Location path of the dataset to load, e.g. "/flu" or "/narratives/intro".
    #[arg(long)]
    path: String,
    /// Raw search string, e.g. "?n=3".
    #[arg(long, default_value = "")]
    search: String,
    /// Optional second tree to load side by side, e.g. "flu/h3n2/na".
    #[arg(long)]
    tree_too: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let args = Args::parse();

    let mut settings = config::load_settings();
    if let Some(address) = args.server_address {
        settings.server_address = address;
    }
    let resolver = config::resolver_from_settings(&settings);
    let client = DatasetClient::new(
        &settings.server_address,
        resolver,
        Arc::new(PassthroughStateBuilder),
    );
    let mut events = client.subscribe_events();

    client.load_dataset(&args.path, &args.search).await;

    if let Some(resource) = args.tree_too {
        let parts: Vec<String> = resource.split('/').map(str::to_string).collect();
        let segment = parts.last().cloned().unwrap_or_default();
        client.load_second_tree(&segment, &parts).await;
    }

    // Drain whatever the background chains still deliver.
    while let Ok(event) = tokio::time::timeout(Duration::from_secs(2), events.recv()).await {
        let Ok(event) = event else { break };
        match event {
            StoreEvent::DataInvalid => println!("data invalidated"),
            StoreEvent::CleanStart {
                pathname_should_be,
                state,
            } => println!(
                "clean start: pathname={} state_bytes={}",
                pathname_should_be.as_deref().unwrap_or("<unchanged>"),
                state.0.to_string().len()
            ),
            StoreEvent::TipFrequenciesLoaded { data } => {
                println!("tip frequencies loaded ({} bytes)", data.to_string().len());
            }
            StoreEvent::SetAvailable { data } => {
                println!("available datasets: {data}");
            }
            StoreEvent::RedirectNotFound { message } => println!("not found: {message}"),
            StoreEvent::Warning { message, details } => {
                println!("warning: {message} ({details})");
            }
            StoreEvent::TreeTooData { segment, .. } => {
                println!("second tree loaded: {segment}");
            }
        }
    }

    Ok(())
}
