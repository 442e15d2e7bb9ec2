//! User-facing license messages
//!
//! Every remote error code maps to exactly one message category through a
//! lookup table, so adding a code is a one-line change and the mapping is
//! testable without touching control flow. Unmapped codes fall back to the
//! generic try-again message. Products can override any template by string
//! key at registration.

use crate::license::record::{LicenseRecord, LicenseStatus};
use crate::product::Product;
use chrono::{NaiveDate, NaiveDateTime};

/// Message category for a remote rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Expired,
    Disabled,
    Missing,
    InvalidForSite,
    LimitReached,
    NotActivable,
    Deactivated,
    Generic,
}

/// Remote error code → message category.
const CODE_KINDS: &[(&str, MessageKind)] = &[
    ("expired", MessageKind::Expired),
    ("revoked", MessageKind::Disabled),
    ("disabled", MessageKind::Disabled),
    ("missing", MessageKind::Missing),
    ("invalid", MessageKind::InvalidForSite),
    ("invalid_item_id", MessageKind::InvalidForSite),
    ("item_name_mismatch", MessageKind::InvalidForSite),
    ("key_mismatch", MessageKind::InvalidForSite),
    ("site_inactive", MessageKind::InvalidForSite),
    ("no_activations_left", MessageKind::LimitReached),
    ("license_not_activable", MessageKind::NotActivable),
    ("deactivated", MessageKind::Deactivated),
];

/// Default message templates, overridable per product by key.
const DEFAULT_STRINGS: &[(&str, &str)] = &[
    ("license_expired", "Your license key expired on {date}."),
    ("license_expired_no_date", "Your license key has expired."),
    ("license_disabled", "Your license key has been disabled."),
    ("license_missing", "Invalid license. Please verify it."),
    ("license_invalid_for_site", "Your license is not active for this URL."),
    ("license_invalid_for_item", "This appears to be an invalid license key for {name}."),
    ("license_limit_reached", "Your license key has reached its activation limit."),
    (
        "license_not_activable",
        "The key you entered belongs to a bundle, please use the product specific license key.",
    ),
    ("license_deactivated", "Your license key has been deactivated."),
    ("license_generic_failure", "An error occurred, please try again."),
    ("license_active", "Your license key is active."),
    ("license_active_lifetime", "License key never expires."),
    ("license_active_expires", "Your license key expires on {date}."),
    (
        "license_active_expires_soon",
        "Your license key expires soon! It expires on {date}.",
    ),
    ("license_inactive", "License is not active."),
    ("license_unlicensed", "Unlicensed: currently not receiving updates."),
];

/// Window before expiry in which a valid license starts warning.
const EXPIRING_SOON_SECS: i64 = 30 * 24 * 60 * 60;

/// Category for a remote error code. Unmapped codes are `Generic`.
pub fn kind_for_code(code: &str) -> MessageKind {
    CODE_KINDS
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, kind)| *kind)
        .unwrap_or(MessageKind::Generic)
}

/// Template lookup with per-product overrides.
fn template(key: &str, product: Option<&Product>) -> String {
    if let Some(text) = product.and_then(|p| p.string(key)) {
        return text.to_string();
    }
    DEFAULT_STRINGS
        .iter()
        .find(|(known, _)| *known == key)
        .map(|(_, text)| (*text).to_string())
        .unwrap_or_default()
}

/// The generic try-again message with no product overrides applied.
pub fn generic_failure() -> String {
    template("license_generic_failure", None)
}

/// Display message for a rejected license operation.
pub fn rejection_message(
    code: &str,
    expires: Option<&str>,
    item_name: Option<&str>,
    product: Option<&Product>,
) -> String {
    match kind_for_code(code) {
        MessageKind::Expired => match expires.map(format_expiry) {
            Some(date) => template("license_expired", product).replace("{date}", &date),
            None => template("license_expired_no_date", product),
        },
        MessageKind::Disabled => template("license_disabled", product),
        MessageKind::Missing => template("license_missing", product),
        MessageKind::InvalidForSite => match item_name {
            Some(name) => template("license_invalid_for_item", product).replace("{name}", name),
            None => template("license_invalid_for_site", product),
        },
        MessageKind::LimitReached => template("license_limit_reached", product),
        MessageKind::NotActivable => template("license_not_activable", product),
        MessageKind::Deactivated => template("license_deactivated", product),
        MessageKind::Generic => template("license_generic_failure", product),
    }
}

/// Display text for a stored license record, for the admin status row.
pub fn status_message(record: &LicenseRecord, now: u64, product: Option<&Product>) -> String {
    match record.status {
        LicenseStatus::Valid | LicenseStatus::Active => valid_message(record, now, product),
        LicenseStatus::Expired => match record.expires.as_deref().map(format_expiry) {
            Some(date) => template("license_expired", product).replace("{date}", &date),
            None => template("license_expired_no_date", product),
        },
        LicenseStatus::Disabled | LicenseStatus::Revoked => template("license_disabled", product),
        LicenseStatus::Missing => template("license_missing", product),
        LicenseStatus::Invalid
        | LicenseStatus::InvalidItemId
        | LicenseStatus::ItemNameMismatch
        | LicenseStatus::KeyMismatch
        | LicenseStatus::SiteInactive => match record.item_name.as_deref() {
            Some(name) => template("license_invalid_for_item", product).replace("{name}", name),
            None => template("license_invalid_for_site", product),
        },
        LicenseStatus::NoActivationsLeft => template("license_limit_reached", product),
        LicenseStatus::LicenseNotActivable => template("license_not_activable", product),
        LicenseStatus::Deactivated | LicenseStatus::Inactive => {
            template("license_inactive", product)
        }
        LicenseStatus::Unknown => template("license_unlicensed", product),
    }
}

fn valid_message(record: &LicenseRecord, now: u64, product: Option<&Product>) -> String {
    if record.is_lifetime() {
        return template("license_active_lifetime", product);
    }

    let Some(expires) = record.expires.as_deref() else {
        return template("license_active", product);
    };

    let date = format_expiry(expires);
    let key = match expiry_timestamp(expires) {
        Some(ts) if ts > now as i64 && ts - (now as i64) < EXPIRING_SOON_SECS => {
            "license_active_expires_soon"
        }
        _ => "license_active_expires",
    };
    template(key, product).replace("{date}", &date)
}

/// Human formatting for a wire expiry string; unparseable dates pass
/// through as-is.
fn format_expiry(raw: &str) -> String {
    match parse_expiry(raw) {
        Some(date) => date.format("%B %-d, %Y").to_string(),
        None => raw.to_string(),
    }
}

fn parse_expiry(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(23, 59, 59))
        })
}

fn expiry_timestamp(raw: &str) -> Option<i64> {
    parse_expiry(raw).map(|dt| dt.and_utc().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::ProductConfig;
    use serde_json::Map;

    fn record(status: LicenseStatus, expires: Option<&str>) -> LicenseRecord {
        LicenseRecord {
            status,
            activated: status.is_usable(),
            expires: expires.map(str::to_string),
            item_name: None,
            last_sync: None,
            extra: Map::new(),
        }
    }

    #[test]
    fn every_known_code_has_a_non_generic_kind() {
        for (code, kind) in CODE_KINDS {
            assert_eq!(kind_for_code(code), *kind);
            assert_ne!(kind_for_code(code), MessageKind::Generic, "code {code}");
        }
    }

    #[test]
    fn unmapped_code_falls_back_to_generic() {
        assert_eq!(kind_for_code("solar_flare"), MessageKind::Generic);
        assert_eq!(
            rejection_message("solar_flare", None, None, None),
            "An error occurred, please try again."
        );
    }

    #[test]
    fn expired_rejection_contains_the_formatted_date() {
        let message = rejection_message("expired", Some("2024-01-01"), None, None);
        assert!(message.contains("January 1, 2024"), "{message}");
    }

    #[test]
    fn limit_reached_has_its_own_message() {
        let message = rejection_message("no_activations_left", None, None, None);
        assert_eq!(message, "Your license key has reached its activation limit.");
    }

    #[test]
    fn invalid_with_item_name_names_the_product() {
        let message = rejection_message("item_name_mismatch", None, Some("My Plugin"), None);
        assert!(message.contains("My Plugin"), "{message}");
    }

    #[test]
    fn product_overrides_replace_the_default_template() {
        let product = crate::product::Product::new(
            ProductConfig::plugin(1, "p/p.toml", "1.0")
                .with_string("license_missing", "That key does not exist."),
            "store_a",
        )
        .unwrap();
        assert_eq!(
            rejection_message("missing", None, None, Some(&product)),
            "That key does not exist."
        );
    }

    #[test]
    fn lifetime_license_never_expires() {
        let message = status_message(&record(LicenseStatus::Valid, Some("lifetime")), 0, None);
        assert_eq!(message, "License key never expires.");
    }

    #[test]
    fn valid_license_far_from_expiry_shows_the_date() {
        // 2027-03-01 is comfortably more than 30 days past t=1.7e9
        // (2023-11-14).
        let message = status_message(
            &record(LicenseStatus::Valid, Some("2027-03-01 23:59:59")),
            1_700_000_000,
            None,
        );
        assert_eq!(message, "Your license key expires on March 1, 2027.");
    }

    #[test]
    fn valid_license_close_to_expiry_warns() {
        // 2023-11-20 is six days after t=1.7e9.
        let message = status_message(
            &record(LicenseStatus::Valid, Some("2023-11-20")),
            1_700_000_000,
            None,
        );
        assert!(message.starts_with("Your license key expires soon!"), "{message}");
    }

    #[test]
    fn unparseable_expiry_passes_through() {
        let message = rejection_message("expired", Some("someday"), None, None);
        assert!(message.contains("someday"), "{message}");
    }

    #[test]
    fn unknown_status_reads_as_unlicensed() {
        let message = status_message(&record(LicenseStatus::Unknown, None), 0, None);
        assert_eq!(message, "Unlicensed: currently not receiving updates.");
    }
}
