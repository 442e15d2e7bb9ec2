//! CLI subcommand implementations

pub mod check;
pub mod init;
pub mod license;

use crate::config::{CliConfig, CONFIG_FILE};
use crate::file_store::{self, FileStore};
use anyhow::{Context, Result};
use lichen_core::Sdk;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Resolves the config path: explicit flag or ./lichen.toml.
fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
}

/// Loads the config and builds a fully wired SDK over the file-backed
/// option store.
fn load_sdk(explicit_config: Option<&Path>) -> Result<Sdk> {
    let path = config_path(explicit_config);
    let config = CliConfig::load(&path)?;
    let store_path =
        file_store::default_path().context("Could not determine config directory")?;
    config.build_sdk(Arc::new(FileStore::open(store_path)))
}
