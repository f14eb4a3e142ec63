use std::collections::BTreeMap;

use cellprobe_common::PluginMetadata;
use serde::Deserialize;

pub const CONFIG_VERSION: u32 = 1;

/// Fields at or above this confidence are listed as high-confidence.
pub const DEFAULT_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CliConfigInput {
    pub version: u32,
    pub plugin: PluginInput,
    /// Extra vendor name → registered extractor name.
    pub aliases: BTreeMap<String, String>,
    pub report: ReportInput,
    pub batch: BatchInput,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PluginInput {
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReportInput {
    pub high_confidence_threshold: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BatchInput {
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CliConfig {
    pub version: u32,
    /// Fallback metadata for captures that carry none.
    pub plugin: PluginMetadata,
    pub aliases: BTreeMap<String, String>,
    pub high_confidence_threshold: f64,
    pub workers: usize,
}

fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get()).min(8)
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            plugin: PluginMetadata::default(),
            aliases: BTreeMap::new(),
            high_confidence_threshold: DEFAULT_THRESHOLD,
            workers: default_workers(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

impl CliConfigInput {
    pub fn resolve(self) -> Result<CliConfig, String> {
        let version = if self.version == 0 {
            CONFIG_VERSION
        } else {
            self.version
        };
        if version != CONFIG_VERSION {
            return Err(format!(
                "unsupported config version {version}, expected {CONFIG_VERSION}"
            ));
        }

        let threshold = self
            .report
            .high_confidence_threshold
            .unwrap_or(DEFAULT_THRESHOLD);
        if !(0.0..=1.0).contains(&threshold) {
            return Err(format!(
                "high_confidence_threshold must be within [0, 1], got {}",
                threshold
            ));
        }

        let aliases = self
            .aliases
            .into_iter()
            .filter_map(|(alias, target)| {
                let (alias, target) = (alias.trim().to_string(), target.trim().to_string());
                if alias.is_empty() || target.is_empty() {
                    None
                } else {
                    Some((alias, target))
                }
            })
            .collect();

        Ok(CliConfig {
            version,
            plugin: PluginMetadata {
                vendor: non_empty(self.plugin.vendor),
                model: non_empty(self.plugin.model),
                category: non_empty(self.plugin.category),
            },
            aliases,
            high_confidence_threshold: threshold,
            workers: self.batch.workers.unwrap_or_else(default_workers).max(1),
        })
    }
}

impl CliConfig {
    /// Parse and validate a config file. Every table is optional, so an
    /// empty document resolves to the defaults.
    pub fn from_toml_str(input: &str) -> Result<Self, String> {
        toml::from_str::<CliConfigInput>(input)
            .map_err(|e| format!("config is not valid TOML: {e}"))?
            .resolve()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_toml_config_basic() {
        let toml = r#"
            version = 1

            [plugin]
            vendor = "quectel"
            model = " EC25 "

            [aliases]
            "Quectel Wireless Solutions Co., Ltd." = "quectel"

            [report]
            high_confidence_threshold = 0.9

            [batch]
            workers = 3
        "#;
        let cfg = CliConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.plugin.vendor.as_deref(), Some("quectel"));
        assert_eq!(cfg.plugin.model.as_deref(), Some("EC25"));
        assert_eq!(cfg.plugin.category, None);
        assert_eq!(
            cfg.aliases.get("Quectel Wireless Solutions Co., Ltd.").map(String::as_str),
            Some("quectel")
        );
        assert_eq!(cfg.high_confidence_threshold, 0.9);
        assert_eq!(cfg.workers, 3);
    }

    #[test]
    fn empty_config_is_default() {
        let cfg = CliConfig::from_toml_str("  \n").unwrap();
        assert_eq!(cfg, CliConfig::default());
        assert_eq!(CliConfig::from_toml_str("# comments only\n").unwrap(), cfg);
        assert_eq!(cfg.high_confidence_threshold, DEFAULT_THRESHOLD);
        assert!(cfg.workers >= 1);
    }

    #[test]
    fn rejects_unknown_version_and_bad_threshold() {
        assert!(CliConfig::from_toml_str("version = 2").is_err());
        assert!(CliConfig::from_toml_str("[report]\nhigh_confidence_threshold = 1.5").is_err());
        assert!(CliConfig::from_toml_str("[plugin\n").is_err());
    }

    #[test]
    fn zero_workers_and_blank_aliases() {
        let toml = r#"
            [batch]
            workers = 0
            [aliases]
            " " = "quectel"
            "acme" = ""
        "#;
        let cfg = CliConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.workers, 1);
        assert!(cfg.aliases.is_empty());
        assert_eq!(cfg.plugin, PluginMetadata::default());
    }
}
