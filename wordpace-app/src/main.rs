mod cli;
pub mod api;

use anyhow::Result;
use clap::Parser;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::commands::run_cli;
use cli::opts::Cli;

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Cli::parse();
    let rt = Runtime::new()?;
    rt.block_on(run_cli(args))
}
