use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use url::Url;

use crate::store::clamp_k;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Base URL of the clustering service.
    #[arg(long, env = "CLUSTER_LENS_BACKEND", default_value = "http://localhost:8000")]
    pub backend_url: String,

    /// Connect and read timeout for backend requests.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Cluster count preset in the re-cluster control (clamped to 2..=10).
    #[arg(long, default_value_t = 3)]
    pub initial_k: i64,

    /// Number of semantic search results to request.
    #[arg(long, default_value_t = 10)]
    pub search_top_k: usize,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub backend_url: Url,
    pub timeout: Duration,
    pub initial_k: u8,
    pub search_top_k: usize,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self> {
        let backend_url = Url::parse(&args.backend_url)
            .with_context(|| format!("invalid backend URL {}", args.backend_url))?;
        if !matches!(backend_url.scheme(), "http" | "https") {
            bail!("backend URL must use http or https, got {}", backend_url.scheme());
        }
        if backend_url.cannot_be_a_base() {
            bail!("backend URL {backend_url} cannot be used as a base");
        }
        if args.timeout_secs == 0 {
            bail!("--timeout-secs must be at least 1");
        }

        Ok(Self {
            backend_url,
            timeout: Duration::from_secs(args.timeout_secs),
            initial_k: clamp_k(args.initial_k),
            search_top_k: args.search_top_k.max(1),
        })
    }
}
