#![forbid(unsafe_code)]

use clap::Parser;
use std::path::PathBuf;

/// Agricultural census registry served as JSON-RPC tools over stdio.
#[derive(Parser, Debug, Clone)]
#[command(name = "census_server", version)]
#[command(about = "Agricultural census registry (newline JSON-RPC over stdio)")]
pub(crate) struct Config {
    /// Directory holding the SQLite database
    #[arg(long, env = "CENSUS_STORAGE_DIR", default_value = "./census_data")]
    pub(crate) storage_dir: PathBuf,

    /// Keep everything in memory; nothing is written to disk. Wins over the
    /// storage directory
    #[arg(long)]
    pub(crate) in_memory: bool,

    /// Log filter directives (e.g. "info", "census_storage=debug"); logs go to stderr
    #[arg(long = "log", env = "CENSUS_LOG", default_value = "info")]
    pub(crate) log_filter: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_flags() {
        let config = Config::try_parse_from(["census_server"]).expect("parse");
        assert!(!config.in_memory);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "census_server",
            "--storage-dir",
            "/tmp/census",
            "--log",
            "debug",
        ])
        .expect("parse");
        assert_eq!(config.storage_dir, PathBuf::from("/tmp/census"));
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn in_memory_parses_alongside_a_storage_dir() {
        let config = Config::try_parse_from([
            "census_server",
            "--in-memory",
            "--storage-dir",
            "/tmp/census",
        ])
        .expect("parse");
        assert!(config.in_memory);
        assert_eq!(config.storage_dir, PathBuf::from("/tmp/census"));
    }
}
