//! Host environment descriptor
//!
//! Every outbound request identifies the installation it originates from:
//! the site URL and which runtime environment it is (so stores can exclude
//! staging activations from license limits, for example).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Runtime environment label reported to the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentLabel {
    Local,
    Development,
    Staging,
    #[default]
    Production,
}

impl fmt::Display for EnvironmentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvironmentLabel::Local => write!(f, "local"),
            EnvironmentLabel::Development => write!(f, "development"),
            EnvironmentLabel::Staging => write!(f, "staging"),
            EnvironmentLabel::Production => write!(f, "production"),
        }
    }
}

impl EnvironmentLabel {
    /// Parses a label, defaulting to `Production` for unknown strings.
    pub fn parse(value: &str) -> Self {
        match value {
            "local" => EnvironmentLabel::Local,
            "development" => EnvironmentLabel::Development,
            "staging" => EnvironmentLabel::Staging,
            _ => EnvironmentLabel::Production,
        }
    }
}

/// The installation the SDK is running inside.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    /// Public URL of this installation.
    pub site_url: String,
    /// Runtime environment label.
    pub label: EnvironmentLabel,
}

impl Environment {
    pub fn new(site_url: impl Into<String>, label: EnvironmentLabel) -> Self {
        Self {
            site_url: site_url.into(),
            label,
        }
    }

    /// Production environment at the given URL.
    pub fn production(site_url: impl Into<String>) -> Self {
        Self::new(site_url, EnvironmentLabel::Production)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_round_trips_through_display() {
        for label in [
            EnvironmentLabel::Local,
            EnvironmentLabel::Development,
            EnvironmentLabel::Staging,
            EnvironmentLabel::Production,
        ] {
            assert_eq!(EnvironmentLabel::parse(&label.to_string()), label);
        }
    }

    #[test]
    fn unknown_label_defaults_to_production() {
        assert_eq!(EnvironmentLabel::parse("qa"), EnvironmentLabel::Production);
    }
}
