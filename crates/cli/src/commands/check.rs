//! Check command — run the update sweep and report per product

use anyhow::Result;
use colored::Colorize;
use lichen_core::{ProductKind, Sdk, UpdateDelta};
use std::path::Path;

/// Runs `lichen check`, optionally restricted to one product kind.
///
/// Store failures never fail the command: a store that can't be reached is
/// simply absent from this cycle's results, the same way the host
/// application would keep working without update info.
pub fn run(config: Option<&Path>, kind: Option<ProductKind>) -> Result<()> {
    let sdk = super::load_sdk(config)?;

    let kinds: &[ProductKind] = match kind {
        Some(ProductKind::Plugin) => &[ProductKind::Plugin],
        Some(ProductKind::Theme) => &[ProductKind::Theme],
        None => &[ProductKind::Plugin, ProductKind::Theme],
    };

    let mut any = false;
    for kind in kinds {
        let delta = sdk.check_updates(*kind);
        any |= !delta.is_empty();
        print_delta(&sdk, *kind, &delta);
    }

    if !any {
        eprintln!("  No version information available.");
    }

    Ok(())
}

fn print_delta(sdk: &Sdk, kind: ProductKind, delta: &UpdateDelta) {
    for (product_id, record) in &delta.updates_available {
        let new_version = record.info().new_version.as_deref().unwrap_or("?");
        let current = sdk
            .product(product_id)
            .map(|(_, p)| p.version())
            .unwrap_or("?");
        eprintln!(
            "  {} {} {}: {} \u{2192} {}",
            "\u{2191}".green().bold(),
            kind,
            product_id.bold(),
            current.dimmed(),
            new_version.green()
        );
        if let Some(url) = record.info().url.as_deref() {
            eprintln!("    {}", url.dimmed());
        }
    }

    for (product_id, _) in &delta.no_update {
        eprintln!(
            "  {} {} {}: up to date",
            "\u{2713}".dimmed(),
            kind,
            product_id
        );
    }
}
