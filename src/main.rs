mod app;
mod client;
mod config;
mod error;
mod interaction;
mod projection;
mod store;
#[cfg(test)]
mod testing;
mod util;
mod workflow;

use std::io;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::client::{Backend, HttpBackend};
use crate::config::{Args, Config};

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cluster_lens=info"));
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging();

    let config = Config::from_args(args)?;
    info!(backend = %config.backend_url, k = config.initial_k, "starting cluster-lens");

    let backend: Arc<dyn Backend> =
        Arc::new(HttpBackend::new(config.backend_url.clone(), config.timeout));
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "cluster-lens",
        options,
        Box::new(move |cc| Ok(Box::new(app::ClusterLensApp::new(cc, config, backend)))),
    )
    .map_err(|error| anyhow!("explorer window failed: {error}"))
}
