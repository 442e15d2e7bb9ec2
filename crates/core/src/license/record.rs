//! Persisted license state

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// License status as reported by the remote store. The wire set has grown
/// over the years; anything unrecognized maps to `Unknown` rather than
/// failing the whole record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseStatus {
    Active,
    Inactive,
    Valid,
    Invalid,
    Expired,
    Disabled,
    Revoked,
    Missing,
    InvalidItemId,
    ItemNameMismatch,
    KeyMismatch,
    NoActivationsLeft,
    LicenseNotActivable,
    Deactivated,
    SiteInactive,
    #[serde(other)]
    Unknown,
}

impl LicenseStatus {
    /// Whether this status means the key is good on this site.
    pub fn is_usable(self) -> bool {
        matches!(self, LicenseStatus::Active | LicenseStatus::Valid)
    }
}

/// The last known state of a license key, as reported by the store on the
/// most recent activate/deactivate exchange. Extra remote metadata
/// (activation counts, customer info) rides along untyped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseRecord {
    pub status: LicenseStatus,
    /// Whether the key has been activated for this site. Only meaningful
    /// alongside a usable status.
    #[serde(default)]
    pub activated: bool,
    /// Expiration date string, or the literal `lifetime`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    /// When this record was last confirmed against the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LicenseRecord {
    pub fn is_lifetime(&self) -> bool {
        self.expires.as_deref() == Some("lifetime")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_status_deserializes_to_unknown() {
        let record: LicenseRecord =
            serde_json::from_value(json!({"status": "quarantined"})).unwrap();
        assert_eq!(record.status, LicenseStatus::Unknown);
        assert!(!record.activated);
    }

    #[test]
    fn record_round_trips_with_extra_metadata() {
        let raw = json!({
            "status": "valid",
            "activated": true,
            "expires": "2027-03-01 23:59:59",
            "item_name": "My Plugin",
            "activations_left": 3
        });
        let record: LicenseRecord = serde_json::from_value(raw).unwrap();
        assert_eq!(record.status, LicenseStatus::Valid);
        assert!(record.status.is_usable());
        assert_eq!(record.extra["activations_left"], json!(3));

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["activations_left"], json!(3));
        assert_eq!(back["expires"], json!("2027-03-01 23:59:59"));
    }

    #[test]
    fn lifetime_expiry_is_recognized() {
        let record: LicenseRecord =
            serde_json::from_value(json!({"status": "valid", "expires": "lifetime"})).unwrap();
        assert!(record.is_lifetime());
    }

    #[test]
    fn only_active_and_valid_are_usable() {
        assert!(LicenseStatus::Active.is_usable());
        assert!(LicenseStatus::Valid.is_usable());
        assert!(!LicenseStatus::Expired.is_usable());
        assert!(!LicenseStatus::Deactivated.is_usable());
        assert!(!LicenseStatus::Unknown.is_usable());
    }
}
