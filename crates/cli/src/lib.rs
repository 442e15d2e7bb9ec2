//! Lichen CLI library — exposed for integration tests

pub mod commands;
pub mod config;
pub mod file_store;

use clap::{Parser, Subcommand};
use lichen_core::ProductKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lichen")]
#[command(about = "License keys and update checks for Lichen-integrated extensions", long_about = None)]
#[command(version = lichen_core::VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to lichen.toml (default: ./lichen.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a lichen.toml configuration
    Init {
        /// Path to initialize (default: current directory)
        path: Option<PathBuf>,
    },

    /// Check registered products for updates
    Check {
        /// Restrict the check to plugins or themes
        #[arg(long, value_enum)]
        kind: Option<KindArg>,
    },

    /// Manage license keys
    License {
        #[command(subcommand)]
        action: commands::license::LicenseCommand,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum KindArg {
    Plugin,
    Theme,
}

impl From<KindArg> for ProductKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Plugin => ProductKind::Plugin,
            KindArg::Theme => ProductKind::Theme,
        }
    }
}
