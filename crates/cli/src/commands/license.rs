//! License command — activate, deactivate, and inspect license keys

use anyhow::{bail, Result};
use colored::Colorize;
use lichen_core::{LicenseError, LicenseState, Sdk};
use std::path::Path;

#[derive(Debug, Clone, clap::Subcommand)]
pub enum LicenseCommand {
    /// Show license status for every product, or one
    Status {
        /// Product id or slug
        product: Option<String>,
    },
    /// Activate a license key for a product
    Activate {
        /// Product id or slug
        product: String,
        /// The license key to activate
        #[arg(long)]
        key: String,
    },
    /// Deactivate the license on this site (the key is kept)
    Deactivate {
        /// Product id or slug
        product: String,
    },
    /// Remove the stored key and license record
    Delete {
        /// Product id or slug
        product: String,
    },
}

pub fn run(config: Option<&Path>, action: &LicenseCommand) -> Result<()> {
    let sdk = super::load_sdk(config)?;

    match action {
        LicenseCommand::Status { product } => run_status(&sdk, product.as_deref()),
        LicenseCommand::Activate { product, key } => {
            run_activate(&sdk, &resolve(&sdk, product)?, key)
        }
        LicenseCommand::Deactivate { product } => run_deactivate(&sdk, &resolve(&sdk, product)?),
        LicenseCommand::Delete { product } => run_delete(&sdk, &resolve(&sdk, product)?),
    }
}

/// Accepts a product id or a slug; slugs are convenient, ids are exact.
fn resolve(sdk: &Sdk, query: &str) -> Result<String> {
    if sdk.product(query).is_some() {
        return Ok(query.to_string());
    }

    let matches: Vec<&str> = sdk
        .stores()
        .flat_map(|store| store.products())
        .filter(|product| product.slug() == query)
        .map(|product| product.id())
        .collect();

    match matches.as_slice() {
        [id] => Ok((*id).to_string()),
        [] => bail!("No registered product matches {query:?}"),
        _ => bail!("{query:?} is ambiguous; use the product id"),
    }
}

fn run_status(sdk: &Sdk, product: Option<&str>) -> Result<()> {
    let ids: Vec<String> = match product {
        Some(query) => vec![resolve(sdk, query)?],
        None => sdk
            .stores()
            .flat_map(|store| store.products())
            .map(|product| product.id().to_string())
            .collect(),
    };

    if ids.is_empty() {
        eprintln!("  No products registered. Add them to lichen.toml first.");
        return Ok(());
    }

    for id in ids {
        print_status(sdk, &id);
    }
    Ok(())
}

fn run_activate(sdk: &Sdk, product_id: &str, key: &str) -> Result<()> {
    eprint!("  Activating {}... ", product_id.bold());
    match sdk.activate_license(product_id, key) {
        Ok(_) => {
            eprintln!("{}", "done".green());
            print_status(sdk, product_id);
        }
        Err(e) => {
            eprintln!("{}", "failed".red());
            print_failure(&e);
        }
    }
    Ok(())
}

fn run_deactivate(sdk: &Sdk, product_id: &str) -> Result<()> {
    eprint!("  Deactivating {}... ", product_id.bold());
    match sdk.deactivate_license(product_id) {
        Ok(_) => {
            eprintln!("{}", "done".green());
            eprintln!("  The key was kept; activate again any time.");
        }
        Err(e) => {
            eprintln!("{}", "failed".red());
            print_failure(&e);
        }
    }
    Ok(())
}

fn run_delete(sdk: &Sdk, product_id: &str) -> Result<()> {
    sdk.delete_license(product_id)?;
    eprintln!(
        "  {} License removed for {}.",
        "\u{2713}".green(),
        product_id.bold()
    );
    Ok(())
}

fn print_status(sdk: &Sdk, product_id: &str) {
    let state = match sdk.license_state(product_id) {
        Some(state) => state,
        None => return,
    };

    let label = match state {
        LicenseState::Unlicensed => "unlicensed".dimmed(),
        LicenseState::PendingActivation => "pending activation".yellow(),
        LicenseState::Active => "active".green(),
        LicenseState::Inactive => "inactive".yellow(),
        LicenseState::NeedsAttention(_) => "needs attention".red(),
    };
    eprintln!("  {}: {}", product_id.bold(), label);

    if let Some(message) = sdk.license_status_message(product_id) {
        eprintln!("    {}", message.dimmed());
    }
}

fn print_failure(error: &LicenseError) {
    eprintln!("  {}", error.user_message());
    if let LicenseError::Transport(e) = error {
        eprintln!("  {}", e.to_string().dimmed());
    }
}
