//! Plugin metadata.
//!
//! Each modem plugin describes the device family it targets. The extraction
//! pipeline only needs the three identification hints below, all of which may
//! be missing when the modem has not been matched to a plugin yet.

use serde::{Deserialize, Serialize};

/// Identification hints carried by the plugin that drove an inspection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginMetadata {
    /// Vendor name, e.g. "quectel" or "Nordic Semiconductor".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    /// Model name, e.g. "EC25" or "nrf9160".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Plugin category, e.g. "automotive", "lte_cat1", "5g_highperf".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl PluginMetadata {
    pub fn for_vendor(vendor: impl Into<String>) -> Self {
        Self {
            vendor: Some(vendor.into()),
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Vendor name normalized for registry lookup (trimmed, lowercase).
    /// Blank names count as missing.
    pub fn vendor_key(&self) -> Option<String> {
        normalize(self.vendor.as_deref())
    }

    /// Model name trimmed and lowercased.
    pub fn model_key(&self) -> Option<String> {
        normalize(self.model.as_deref())
    }

    /// Case-insensitive category comparison.
    pub fn is_category(&self, category: &str) -> bool {
        self.category
            .as_deref()
            .is_some_and(|c| c.trim().eq_ignore_ascii_case(category))
    }

    /// Fill any missing hint from `fallback`.
    pub fn or(self, fallback: &PluginMetadata) -> Self {
        Self {
            vendor: self.vendor.or_else(|| fallback.vendor.clone()),
            model: self.model.or_else(|| fallback.model.clone()),
            category: self.category.or_else(|| fallback.category.clone()),
        }
    }
}

fn normalize(value: Option<&str>) -> Option<String> {
    value
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_key_normalizes() {
        let meta = PluginMetadata::for_vendor("  Quectel ");
        assert_eq!(meta.vendor_key().as_deref(), Some("quectel"));
    }

    #[test]
    fn blank_vendor_is_missing() {
        assert_eq!(PluginMetadata::for_vendor("   ").vendor_key(), None);
        assert_eq!(PluginMetadata::default().vendor_key(), None);
    }

    #[test]
    fn category_match_ignores_case() {
        let meta = PluginMetadata::for_vendor("quectel").with_category("Automotive");
        assert!(meta.is_category("automotive"));
        assert!(!meta.is_category("lte_cat1"));
        assert!(!PluginMetadata::default().is_category("automotive"));
    }

    #[test]
    fn or_fills_only_missing_hints() {
        let cli = PluginMetadata {
            vendor: None,
            model: Some("EG25".into()),
            category: None,
        };
        let file = PluginMetadata::for_vendor("quectel")
            .with_model("EC25")
            .with_category("iot");
        let merged = cli.or(&file);
        assert_eq!(merged.vendor.as_deref(), Some("quectel"));
        assert_eq!(merged.model.as_deref(), Some("EG25"));
        assert_eq!(merged.category.as_deref(), Some("iot"));
    }
}
