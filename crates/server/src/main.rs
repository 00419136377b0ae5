#![forbid(unsafe_code)]

mod config;
mod entry;
mod server;
mod support;
mod tools;

use anyhow::Context;
use census_storage::SqliteStore;
use clap::Parser;
use config::Config;
use tracing_subscriber::EnvFilter;

const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "census-server";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

pub(crate) struct CensusServer {
    initialized: bool,
    store: SqliteStore,
}

fn init_tracing(filter: &str) {
    // stdout carries the protocol; diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn open_store(config: &Config) -> anyhow::Result<SqliteStore> {
    if config.in_memory {
        return SqliteStore::open_in_memory().context("open in-memory store");
    }
    SqliteStore::open(&config.storage_dir)
        .with_context(|| format!("open store at {}", config.storage_dir.display()))
}

fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_tracing(&config.log_filter);

    let store = open_store(&config)?;
    tracing::info!(
        storage = %store
            .storage_dir()
            .map(|dir| dir.display().to_string())
            .unwrap_or_else(|| ":memory:".to_string()),
        "census server ready"
    );

    let mut server = CensusServer::new(store);
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    entry::run_stdio(&mut server, stdin.lock(), stdout.lock()).context("stdio transport")?;
    Ok(())
}
