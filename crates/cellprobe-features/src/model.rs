//! The Feature Snapshot.
//!
//! [`ModemFeatures`] is the immutable result of one pipeline run. Every
//! canonical field sits next to a `<field>_confidence` member; a field that
//! was not extracted holds its typed default (`"Unknown"`, `false`, empty,
//! `None`) with confidence exactly 0.0.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::confidence;
use crate::error::FeatureError;
use crate::field::Section;

/// Placeholder for text fields that were not extracted.
pub const UNKNOWN: &str = "Unknown";

fn unknown() -> String {
    UNKNOWN.to_string()
}

// ── Enumerations ────────────────────────────────────────────────────

/// Radio access technology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NetworkTechnology {
    #[serde(rename = "GSM")]
    Gsm,
    #[serde(rename = "UMTS")]
    Umts,
    #[serde(rename = "LTE")]
    Lte,
    #[serde(rename = "LTE-M")]
    LteM,
    #[serde(rename = "NB-IoT")]
    NbIot,
    #[serde(rename = "5G-NR")]
    FivegNr,
    #[serde(rename = "5G NSA")]
    FivegNsa,
    #[serde(rename = "5G SA")]
    FivegSa,
}

impl NetworkTechnology {
    pub const ALL: [NetworkTechnology; 8] = [
        NetworkTechnology::Gsm,
        NetworkTechnology::Umts,
        NetworkTechnology::Lte,
        NetworkTechnology::LteM,
        NetworkTechnology::NbIot,
        NetworkTechnology::FivegNr,
        NetworkTechnology::FivegNsa,
        NetworkTechnology::FivegSa,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            NetworkTechnology::Gsm => "GSM",
            NetworkTechnology::Umts => "UMTS",
            NetworkTechnology::Lte => "LTE",
            NetworkTechnology::LteM => "LTE-M",
            NetworkTechnology::NbIot => "NB-IoT",
            NetworkTechnology::FivegNr => "5G-NR",
            NetworkTechnology::FivegNsa => "5G NSA",
            NetworkTechnology::FivegSa => "5G SA",
        }
    }

    /// Case-sensitive tag lookup.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.tag() == tag)
    }
}

impl fmt::Display for NetworkTechnology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl std::str::FromStr for NetworkTechnology {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| format!("unknown network technology: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimStatus {
    Ready,
    PinRequired,
    NotInserted,
    Error,
    #[default]
    Unknown,
}

impl SimStatus {
    pub fn tag(self) -> &'static str {
        match self {
            SimStatus::Ready => "ready",
            SimStatus::PinRequired => "pin_required",
            SimStatus::NotInserted => "not_inserted",
            SimStatus::Error => "error",
            SimStatus::Unknown => "unknown",
        }
    }

    /// Case-sensitive tag lookup.
    pub fn from_tag(tag: &str) -> Option<Self> {
        [
            SimStatus::Ready,
            SimStatus::PinRequired,
            SimStatus::NotInserted,
            SimStatus::Error,
            SimStatus::Unknown,
        ]
        .into_iter()
        .find(|s| s.tag() == tag)
    }
}

impl fmt::Display for SimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl std::str::FromStr for SimStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| format!("unknown SIM status: {s}"))
    }
}

// ── Sections ────────────────────────────────────────────────────────

/// One canonical field of a section, as listed by `entries()`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEntry {
    pub name: &'static str,
    pub value: Value,
    pub confidence: f64,
}

fn entry(name: &'static str, value: impl Into<Value>, confidence: f64) -> FieldEntry {
    FieldEntry {
        name,
        value: value.into(),
        confidence,
    }
}

fn text_list(items: &[String]) -> Value {
    Value::Array(items.iter().cloned().map(Value::String).collect())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicInfo {
    pub manufacturer: String,
    pub manufacturer_confidence: f64,
    pub model: String,
    pub model_confidence: f64,
    pub revision: String,
    pub revision_confidence: f64,
    pub imei: String,
    pub imei_confidence: f64,
    pub serial_number: String,
    pub serial_number_confidence: f64,
}

impl Default for BasicInfo {
    fn default() -> Self {
        Self {
            manufacturer: unknown(),
            manufacturer_confidence: 0.0,
            model: unknown(),
            model_confidence: 0.0,
            revision: unknown(),
            revision_confidence: 0.0,
            imei: unknown(),
            imei_confidence: 0.0,
            serial_number: unknown(),
            serial_number_confidence: 0.0,
        }
    }
}

impl BasicInfo {
    pub fn entries(&self) -> Vec<FieldEntry> {
        vec![
            entry("manufacturer", self.manufacturer.clone(), self.manufacturer_confidence),
            entry("model", self.model.clone(), self.model_confidence),
            entry("revision", self.revision.clone(), self.revision_confidence),
            entry("imei", self.imei.clone(), self.imei_confidence),
            entry("serial_number", self.serial_number.clone(), self.serial_number_confidence),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkCapabilities {
    pub supported_technologies: Vec<NetworkTechnology>,
    pub supported_technologies_confidence: f64,
    pub lte_bands: Vec<u16>,
    pub lte_bands_confidence: f64,
    pub fiveg_bands: Vec<String>,
    pub fiveg_bands_confidence: f64,
    pub max_downlink_speed: String,
    pub max_downlink_speed_confidence: f64,
    pub max_uplink_speed: String,
    pub max_uplink_speed_confidence: f64,
    pub carrier_aggregation: bool,
    pub carrier_aggregation_confidence: f64,
    pub lte_category: String,
    pub lte_category_confidence: f64,
}

impl Default for NetworkCapabilities {
    fn default() -> Self {
        Self {
            supported_technologies: Vec::new(),
            supported_technologies_confidence: 0.0,
            lte_bands: Vec::new(),
            lte_bands_confidence: 0.0,
            fiveg_bands: Vec::new(),
            fiveg_bands_confidence: 0.0,
            max_downlink_speed: unknown(),
            max_downlink_speed_confidence: 0.0,
            max_uplink_speed: unknown(),
            max_uplink_speed_confidence: 0.0,
            carrier_aggregation: false,
            carrier_aggregation_confidence: 0.0,
            lte_category: unknown(),
            lte_category_confidence: 0.0,
        }
    }
}

impl NetworkCapabilities {
    pub fn entries(&self) -> Vec<FieldEntry> {
        let techs: Vec<String> = self
            .supported_technologies
            .iter()
            .map(|t| t.tag().to_string())
            .collect();
        vec![
            entry(
                "supported_technologies",
                text_list(&techs),
                self.supported_technologies_confidence,
            ),
            entry("lte_bands", self.lte_bands.clone(), self.lte_bands_confidence),
            entry("fiveg_bands", text_list(&self.fiveg_bands), self.fiveg_bands_confidence),
            entry(
                "max_downlink_speed",
                self.max_downlink_speed.clone(),
                self.max_downlink_speed_confidence,
            ),
            entry(
                "max_uplink_speed",
                self.max_uplink_speed.clone(),
                self.max_uplink_speed_confidence,
            ),
            entry(
                "carrier_aggregation",
                self.carrier_aggregation,
                self.carrier_aggregation_confidence,
            ),
            entry("lte_category", self.lte_category.clone(), self.lte_category_confidence),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceFeatures {
    pub volte_supported: bool,
    pub volte_supported_confidence: f64,
    pub vowifi_supported: bool,
    pub vowifi_supported_confidence: f64,
    pub circuit_switched_voice: bool,
    pub circuit_switched_voice_confidence: f64,
}

impl VoiceFeatures {
    pub fn entries(&self) -> Vec<FieldEntry> {
        vec![
            entry("volte_supported", self.volte_supported, self.volte_supported_confidence),
            entry("vowifi_supported", self.vowifi_supported, self.vowifi_supported_confidence),
            entry(
                "circuit_switched_voice",
                self.circuit_switched_voice,
                self.circuit_switched_voice_confidence,
            ),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GnssInfo {
    pub gnss_supported: bool,
    pub gnss_supported_confidence: f64,
    pub supported_systems: Vec<String>,
    pub supported_systems_confidence: f64,
    pub last_location: Option<String>,
    pub last_location_confidence: f64,
}

impl GnssInfo {
    pub fn entries(&self) -> Vec<FieldEntry> {
        vec![
            entry("gnss_supported", self.gnss_supported, self.gnss_supported_confidence),
            entry(
                "supported_systems",
                text_list(&self.supported_systems),
                self.supported_systems_confidence,
            ),
            entry("last_location", self.last_location.clone(), self.last_location_confidence),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerManagement {
    pub psm_supported: bool,
    pub psm_supported_confidence: f64,
    pub edrx_supported: bool,
    pub edrx_supported_confidence: f64,
    pub power_class: String,
    pub power_class_confidence: f64,
    /// Millivolts.
    pub battery_voltage: Option<u32>,
    pub battery_voltage_confidence: f64,
}

impl Default for PowerManagement {
    fn default() -> Self {
        Self {
            psm_supported: false,
            psm_supported_confidence: 0.0,
            edrx_supported: false,
            edrx_supported_confidence: 0.0,
            power_class: unknown(),
            power_class_confidence: 0.0,
            battery_voltage: None,
            battery_voltage_confidence: 0.0,
        }
    }
}

impl PowerManagement {
    pub fn entries(&self) -> Vec<FieldEntry> {
        vec![
            entry("psm_supported", self.psm_supported, self.psm_supported_confidence),
            entry("edrx_supported", self.edrx_supported, self.edrx_supported_confidence),
            entry("power_class", self.power_class.clone(), self.power_class_confidence),
            entry("battery_voltage", self.battery_voltage, self.battery_voltage_confidence),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimInfo {
    pub sim_status: SimStatus,
    pub sim_status_confidence: f64,
    pub iccid: String,
    pub iccid_confidence: f64,
    pub imsi: String,
    pub imsi_confidence: f64,
    pub operator: String,
    pub operator_confidence: f64,
}

impl Default for SimInfo {
    fn default() -> Self {
        Self {
            sim_status: SimStatus::Unknown,
            sim_status_confidence: 0.0,
            iccid: unknown(),
            iccid_confidence: 0.0,
            imsi: unknown(),
            imsi_confidence: 0.0,
            operator: unknown(),
            operator_confidence: 0.0,
        }
    }
}

impl SimInfo {
    pub fn entries(&self) -> Vec<FieldEntry> {
        vec![
            entry("sim_status", self.sim_status.tag(), self.sim_status_confidence),
            entry("iccid", self.iccid.clone(), self.iccid_confidence),
            entry("imsi", self.imsi.clone(), self.imsi_confidence),
            entry("operator", self.operator.clone(), self.operator_confidence),
        ]
    }
}

/// The six typed sections, as built by the assembler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sections {
    pub basic_info: BasicInfo,
    pub network_capabilities: NetworkCapabilities,
    pub voice_features: VoiceFeatures,
    pub gnss_info: GnssInfo,
    pub power_management: PowerManagement,
    pub sim_info: SimInfo,
}

// ── Snapshot ────────────────────────────────────────────────────────

/// Immutable feature profile of one modem inspection.
///
/// Deserializing goes through [`ModemFeatures::new`]: a stored aggregate is
/// ignored and recomputed, and confidences outside [0, 1] are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredFeatures")]
pub struct ModemFeatures {
    basic_info: BasicInfo,
    network_capabilities: NetworkCapabilities,
    voice_features: VoiceFeatures,
    gnss_info: GnssInfo,
    power_management: PowerManagement,
    sim_info: SimInfo,
    vendor_specific: BTreeMap<String, Value>,
    parsing_errors: Vec<String>,
    aggregate_confidence: f64,
}

impl Default for ModemFeatures {
    fn default() -> Self {
        Self::new(Sections::default(), BTreeMap::new(), Vec::new())
    }
}

/// Serialized snapshot layout, before validation.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StoredFeatures {
    basic_info: BasicInfo,
    network_capabilities: NetworkCapabilities,
    voice_features: VoiceFeatures,
    gnss_info: GnssInfo,
    power_management: PowerManagement,
    sim_info: SimInfo,
    vendor_specific: BTreeMap<String, Value>,
    parsing_errors: Vec<String>,
}

impl TryFrom<StoredFeatures> for ModemFeatures {
    type Error = FeatureError;

    fn try_from(stored: StoredFeatures) -> Result<Self, Self::Error> {
        let sections = Sections {
            basic_info: stored.basic_info,
            network_capabilities: stored.network_capabilities,
            voice_features: stored.voice_features,
            gnss_info: stored.gnss_info,
            power_management: stored.power_management,
            sim_info: stored.sim_info,
        };
        let features = ModemFeatures::new(sections, stored.vendor_specific, stored.parsing_errors);
        if let Some((section, e)) = features
            .entries()
            .into_iter()
            .find(|(_, e)| !(0.0..=1.0).contains(&e.confidence))
        {
            return Err(FeatureError::ConfidenceOutOfRange {
                field: format!("{}.{}", section.name(), e.name),
                value: e.confidence,
            });
        }
        Ok(features)
    }
}

impl ModemFeatures {
    /// Seal the sections into a snapshot. The aggregate confidence is
    /// computed here, from the sections themselves.
    pub fn new(
        sections: Sections,
        vendor_specific: BTreeMap<String, Value>,
        parsing_errors: Vec<String>,
    ) -> Self {
        let mut features = Self {
            basic_info: sections.basic_info,
            network_capabilities: sections.network_capabilities,
            voice_features: sections.voice_features,
            gnss_info: sections.gnss_info,
            power_management: sections.power_management,
            sim_info: sections.sim_info,
            vendor_specific,
            parsing_errors,
            aggregate_confidence: 0.0,
        };
        features.aggregate_confidence = confidence::aggregate(features.confidences());
        features
    }

    pub fn basic_info(&self) -> &BasicInfo {
        &self.basic_info
    }

    pub fn network_capabilities(&self) -> &NetworkCapabilities {
        &self.network_capabilities
    }

    pub fn voice_features(&self) -> &VoiceFeatures {
        &self.voice_features
    }

    pub fn gnss_info(&self) -> &GnssInfo {
        &self.gnss_info
    }

    pub fn power_management(&self) -> &PowerManagement {
        &self.power_management
    }

    pub fn sim_info(&self) -> &SimInfo {
        &self.sim_info
    }

    pub fn vendor_specific(&self) -> &BTreeMap<String, Value> {
        &self.vendor_specific
    }

    pub fn parsing_errors(&self) -> &[String] {
        &self.parsing_errors
    }

    pub fn aggregate_confidence(&self) -> f64 {
        self.aggregate_confidence
    }

    /// Every canonical field, section by section.
    pub fn entries(&self) -> Vec<(Section, FieldEntry)> {
        let sections = [
            (Section::BasicInfo, self.basic_info.entries()),
            (Section::NetworkCapabilities, self.network_capabilities.entries()),
            (Section::VoiceFeatures, self.voice_features.entries()),
            (Section::GnssInfo, self.gnss_info.entries()),
            (Section::PowerManagement, self.power_management.entries()),
            (Section::SimInfo, self.sim_info.entries()),
        ];
        sections
            .into_iter()
            .flat_map(|(section, entries)| entries.into_iter().map(move |e| (section, e)))
            .collect()
    }

    /// Every paired confidence across all sections.
    pub fn confidences(&self) -> impl Iterator<Item = f64> {
        self.entries().into_iter().map(|(_, e)| e.confidence)
    }

    /// Fields with confidence `>= threshold`, keyed `section.field`.
    pub fn high_confidence_features(&self, threshold: f64) -> BTreeMap<String, Value> {
        self.select(|c| c >= threshold)
    }

    /// Fields with confidence `< threshold`, keyed `section.field`.
    pub fn low_confidence_features(&self, threshold: f64) -> BTreeMap<String, Value> {
        self.select(|c| c < threshold)
    }

    fn select(&self, keep: impl Fn(f64) -> bool) -> BTreeMap<String, Value> {
        self.entries()
            .into_iter()
            .filter(|(_, e)| keep(e.confidence))
            .map(|(section, e)| (format!("{}.{}", section.name(), e.name), e.value))
            .collect()
    }

    /// Plain nested mapping with field names preserved 1:1.
    pub fn to_mapping(&self) -> Result<Map<String, Value>, FeatureError> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Err(FeatureError::NotAnObject("non-object")),
        }
    }

    pub fn from_mapping(mapping: Map<String, Value>) -> Result<Self, FeatureError> {
        Ok(serde_json::from_value(Value::Object(mapping))?)
    }

    pub fn to_json(&self) -> Result<String, FeatureError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, FeatureError> {
        Ok(serde_json::from_str(json)?)
    }

    /// One-line human description.
    pub fn summary(&self) -> String {
        let b = &self.basic_info;
        let techs = if self.network_capabilities.supported_technologies.is_empty() {
            "no technologies".to_string()
        } else {
            self.network_capabilities
                .supported_technologies
                .iter()
                .map(|t| t.tag())
                .collect::<Vec<_>>()
                .join("/")
        };
        format!(
            "{} {} ({}): {}, SIM {}, aggregate confidence {:.2}, {} parsing errors",
            b.manufacturer,
            b.model,
            b.revision,
            techs,
            self.sim_info.sim_status,
            self.aggregate_confidence,
            self.parsing_errors.len()
        )
    }
}

impl fmt::Display for ModemFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}
