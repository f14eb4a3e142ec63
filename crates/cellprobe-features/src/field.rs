//! Field extraction results.
//!
//! Every extractor (standards, vendor, or an external plugin parser) reports
//! what it found as a [`FieldSet`]: an ordered map from a closed set of
//! canonical field identifiers to a value and its confidence, plus an open
//! vendor-specific bag for anything outside the canonical schema.
//!
//! A value and its confidence live in the same [`Extracted`] entry, so they
//! are always replaced together during fusion.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

use crate::confidence;

/// Suffix of the flat-map key that carries a field's confidence.
pub const CONFIDENCE_SUFFIX: &str = "_confidence";

/// Reserved flat-map key holding the vendor-specific bag.
pub const VENDOR_SPECIFIC_KEY: &str = "vendor_specific";

// ── Sections ───────────────────────────────────────────────────────────────

/// Snapshot section a canonical field belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    BasicInfo,
    NetworkCapabilities,
    VoiceFeatures,
    GnssInfo,
    PowerManagement,
    SimInfo,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::BasicInfo,
        Section::NetworkCapabilities,
        Section::VoiceFeatures,
        Section::GnssInfo,
        Section::PowerManagement,
        Section::SimInfo,
    ];

    /// Key of the section in the serialized snapshot.
    pub fn name(self) -> &'static str {
        match self {
            Section::BasicInfo => "basic_info",
            Section::NetworkCapabilities => "network_capabilities",
            Section::VoiceFeatures => "voice_features",
            Section::GnssInfo => "gnss_info",
            Section::PowerManagement => "power_management",
            Section::SimInfo => "sim_info",
        }
    }

    /// Human label used in diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            Section::BasicInfo => "basic info",
            Section::NetworkCapabilities => "network capabilities",
            Section::VoiceFeatures => "voice features",
            Section::GnssInfo => "GNSS info",
            Section::PowerManagement => "power management",
            Section::SimInfo => "SIM info",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Field Identifiers ──────────────────────────────────────────────────────

/// Canonical feature field.
///
/// Declaration order is the iteration order of a [`FieldSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldId {
    Manufacturer,
    Model,
    Revision,
    Imei,
    SerialNumber,
    SupportedTechnologies,
    LteBands,
    FivegBands,
    MaxDownlinkSpeed,
    MaxUplinkSpeed,
    CarrierAggregation,
    LteCategory,
    VolteSupported,
    VowifiSupported,
    CircuitSwitchedVoice,
    GnssSupported,
    SupportedSystems,
    LastLocation,
    PsmSupported,
    EdrxSupported,
    PowerClass,
    BatteryVoltage,
    SimStatus,
    Iccid,
    Imsi,
    Operator,
}

impl FieldId {
    pub const ALL: [FieldId; 26] = [
        FieldId::Manufacturer,
        FieldId::Model,
        FieldId::Revision,
        FieldId::Imei,
        FieldId::SerialNumber,
        FieldId::SupportedTechnologies,
        FieldId::LteBands,
        FieldId::FivegBands,
        FieldId::MaxDownlinkSpeed,
        FieldId::MaxUplinkSpeed,
        FieldId::CarrierAggregation,
        FieldId::LteCategory,
        FieldId::VolteSupported,
        FieldId::VowifiSupported,
        FieldId::CircuitSwitchedVoice,
        FieldId::GnssSupported,
        FieldId::SupportedSystems,
        FieldId::LastLocation,
        FieldId::PsmSupported,
        FieldId::EdrxSupported,
        FieldId::PowerClass,
        FieldId::BatteryVoltage,
        FieldId::SimStatus,
        FieldId::Iccid,
        FieldId::Imsi,
        FieldId::Operator,
    ];

    /// Flat key of the field, identical to its member name in the snapshot.
    pub fn name(self) -> &'static str {
        match self {
            FieldId::Manufacturer => "manufacturer",
            FieldId::Model => "model",
            FieldId::Revision => "revision",
            FieldId::Imei => "imei",
            FieldId::SerialNumber => "serial_number",
            FieldId::SupportedTechnologies => "supported_technologies",
            FieldId::LteBands => "lte_bands",
            FieldId::FivegBands => "fiveg_bands",
            FieldId::MaxDownlinkSpeed => "max_downlink_speed",
            FieldId::MaxUplinkSpeed => "max_uplink_speed",
            FieldId::CarrierAggregation => "carrier_aggregation",
            FieldId::LteCategory => "lte_category",
            FieldId::VolteSupported => "volte_supported",
            FieldId::VowifiSupported => "vowifi_supported",
            FieldId::CircuitSwitchedVoice => "circuit_switched_voice",
            FieldId::GnssSupported => "gnss_supported",
            FieldId::SupportedSystems => "supported_systems",
            FieldId::LastLocation => "last_location",
            FieldId::PsmSupported => "psm_supported",
            FieldId::EdrxSupported => "edrx_supported",
            FieldId::PowerClass => "power_class",
            FieldId::BatteryVoltage => "battery_voltage",
            FieldId::SimStatus => "sim_status",
            FieldId::Iccid => "iccid",
            FieldId::Imsi => "imsi",
            FieldId::Operator => "operator",
        }
    }

    pub fn from_name(name: &str) -> Option<FieldId> {
        FieldId::ALL.into_iter().find(|id| id.name() == name)
    }

    pub fn section(self) -> Section {
        use FieldId::*;
        match self {
            Manufacturer | Model | Revision | Imei | SerialNumber => Section::BasicInfo,
            SupportedTechnologies | LteBands | FivegBands | MaxDownlinkSpeed | MaxUplinkSpeed
            | CarrierAggregation | LteCategory => Section::NetworkCapabilities,
            VolteSupported | VowifiSupported | CircuitSwitchedVoice => Section::VoiceFeatures,
            GnssSupported | SupportedSystems | LastLocation => Section::GnssInfo,
            PsmSupported | EdrxSupported | PowerClass | BatteryVoltage => {
                Section::PowerManagement
            }
            SimStatus | Iccid | Imsi | Operator => Section::SimInfo,
        }
    }

    /// Flat key of the paired confidence, e.g. `imei_confidence`.
    pub fn confidence_key(self) -> String {
        format!("{}{CONFIDENCE_SUFFIX}", self.name())
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Values ─────────────────────────────────────────────────────────────────

/// Dynamically typed field value.
///
/// Equality is exact: lists compare element-wise in order and floats compare
/// bit-for-bit through `f64::eq`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Name of the variant, for type-mismatch diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Bool(_) => "boolean",
            FieldValue::Int(_) => "integer",
            FieldValue::Float(_) => "number",
            FieldValue::Text(_) => "text",
            FieldValue::List(_) => "list",
            FieldValue::Map(_) => "mapping",
        }
    }

    /// Convert from JSON. `null` has no field value and yields `None`;
    /// `null` entries inside lists and mappings are dropped.
    pub fn from_json(value: &Value) -> Option<FieldValue> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(FieldValue::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(FieldValue::Int(i)),
                None => n.as_f64().map(FieldValue::Float),
            },
            Value::String(s) => Some(FieldValue::Text(s.clone())),
            Value::Array(items) => Some(FieldValue::List(
                items.iter().filter_map(FieldValue::from_json).collect(),
            )),
            Value::Object(map) => Some(FieldValue::Map(
                map.iter()
                    .filter_map(|(k, v)| FieldValue::from_json(v).map(|v| (k.clone(), v)))
                    .collect(),
            )),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Int(i) => Value::from(*i),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::List(items) => Value::Array(items.iter().map(FieldValue::to_json).collect()),
            FieldValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Int(i) => write!(f, "{i}"),
            FieldValue::Float(x) => write!(f, "{x}"),
            FieldValue::Text(s) => write!(f, "{s:?}"),
            FieldValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            FieldValue::Map(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::Int(i64::from(v))
    }
}

impl From<u16> for FieldValue {
    fn from(v: u16) -> Self {
        FieldValue::Int(i64::from(v))
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(items: Vec<T>) -> Self {
        FieldValue::List(items.into_iter().map(Into::into).collect())
    }
}

// ── Extracted Entry ────────────────────────────────────────────────────────

/// A value together with the confidence its extractor assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub value: FieldValue,
    /// Always within `[0.0, 1.0]`.
    pub confidence: f64,
}

impl Extracted {
    pub fn new(value: impl Into<FieldValue>, confidence: f64) -> Self {
        Self {
            value: value.into(),
            confidence: confidence::clamp(confidence),
        }
    }
}

// ── Field Set ──────────────────────────────────────────────────────────────

/// Partial mapping from canonical fields to extracted values, plus the
/// vendor-specific bag. The common output of every extractor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet {
    fields: BTreeMap<FieldId, Extracted>,
    vendor: BTreeMap<String, Value>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value; the confidence is clamped into `[0.0, 1.0]`.
    pub fn insert(&mut self, id: FieldId, value: impl Into<FieldValue>, confidence: f64) {
        self.fields.insert(id, Extracted::new(value, confidence));
    }

    /// Replace the whole entry for `id`, returning the previous one.
    pub fn set(&mut self, id: FieldId, entry: Extracted) -> Option<Extracted> {
        self.fields.insert(id, entry)
    }

    pub fn get(&self, id: FieldId) -> Option<&Extracted> {
        self.fields.get(&id)
    }

    pub fn value(&self, id: FieldId) -> Option<&FieldValue> {
        self.fields.get(&id).map(|e| &e.value)
    }

    /// Confidence of `id`, or 0.0 when the field is absent.
    pub fn confidence(&self, id: FieldId) -> f64 {
        self.fields.get(&id).map_or(0.0, |e| e.confidence)
    }

    pub fn contains(&self, id: FieldId) -> bool {
        self.fields.contains_key(&id)
    }

    /// Entries in [`FieldId`] declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (FieldId, &Extracted)> {
        self.fields.iter().map(|(id, e)| (*id, e))
    }

    /// Number of canonical fields present (the vendor bag is not counted).
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when neither canonical fields nor vendor-specific entries exist.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.vendor.is_empty()
    }

    pub fn vendor_specific(&self) -> &BTreeMap<String, Value> {
        &self.vendor
    }

    pub fn insert_vendor(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.vendor.insert(key.into(), value.into());
    }

    /// Key-wise union into the bag; entries from `other` win on collision.
    pub fn extend_vendor(&mut self, other: &BTreeMap<String, Value>) {
        for (k, v) in other {
            self.vendor.insert(k.clone(), v.clone());
        }
    }

    /// Fold `other` in, overwriting fields it also carries.
    pub fn merge(&mut self, other: FieldSet) {
        self.fields.extend(other.fields);
        self.vendor.extend(other.vendor);
    }

    /// Build a field set from a flat `field` / `field_confidence` mapping.
    ///
    /// Keys that are not canonical fields are ignored. A value without a
    /// paired confidence key gets confidence 0.0. Returns the diagnostics
    /// produced while converting.
    pub fn from_flat_map(map: &Map<String, Value>) -> (FieldSet, Vec<String>) {
        let mut set = FieldSet::new();
        let mut diagnostics = Vec::new();

        for (key, raw) in map {
            if key == VENDOR_SPECIFIC_KEY {
                match raw {
                    Value::Object(bag) => {
                        for (k, v) in bag {
                            set.vendor.insert(k.clone(), v.clone());
                        }
                    }
                    Value::Null => {}
                    other => diagnostics.push(format!(
                        "pre-parsed: '{VENDOR_SPECIFIC_KEY}' must be a mapping, got {}",
                        json_kind(other)
                    )),
                }
                continue;
            }
            if key.ends_with(CONFIDENCE_SUFFIX) {
                continue;
            }
            let Some(id) = FieldId::from_name(key) else {
                tracing::debug!(key = %key, "ignoring non-canonical pre-parsed key");
                continue;
            };
            let Some(value) = FieldValue::from_json(raw) else {
                continue;
            };

            let confidence = match map.get(&id.confidence_key()) {
                None | Some(Value::Null) => confidence::NONE,
                Some(Value::Number(n)) => {
                    let c = n.as_f64().unwrap_or(0.0);
                    if !(0.0..=1.0).contains(&c) {
                        diagnostics.push(format!(
                            "pre-parsed: confidence {c} for '{key}' is outside [0, 1], clamped"
                        ));
                    }
                    c
                }
                Some(other) => {
                    diagnostics.push(format!(
                        "pre-parsed: confidence for '{key}' must be a number, got {}",
                        json_kind(other)
                    ));
                    confidence::NONE
                }
            };
            set.insert(id, value, confidence);
        }

        (set, diagnostics)
    }

    /// Flatten into `field` / `field_confidence` keys plus `vendor_specific`.
    pub fn to_flat_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        for (id, entry) in self.iter() {
            map.insert(id.name().to_string(), entry.value.to_json());
            map.insert(id.confidence_key(), Value::from(entry.confidence));
        }
        if !self.vendor.is_empty() {
            map.insert(
                VENDOR_SPECIFIC_KEY.to_string(),
                Value::Object(self.vendor.clone().into_iter().collect()),
            );
        }
        map
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "text",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

// ── Stage Output ───────────────────────────────────────────────────────────

/// Fields produced by one pipeline stage together with its diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageOutput {
    pub fields: FieldSet,
    pub diagnostics: Vec<String>,
}

impl StageOutput {
    pub fn new(fields: FieldSet, diagnostics: Vec<String>) -> Self {
        Self {
            fields,
            diagnostics,
        }
    }
}

impl From<FieldSet> for StageOutput {
    fn from(fields: FieldSet) -> Self {
        Self::new(fields, Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn names_round_trip() {
        for id in FieldId::ALL {
            assert_eq!(FieldId::from_name(id.name()), Some(id));
        }
        assert_eq!(FieldId::from_name("rssi"), None);
        assert_eq!(FieldId::from_name("imei_confidence"), None);
    }

    #[test]
    fn every_section_has_fields() {
        for section in Section::ALL {
            assert!(FieldId::ALL.iter().any(|id| id.section() == section));
        }
    }

    #[test]
    fn insert_clamps_confidence() {
        let mut set = FieldSet::new();
        set.insert(FieldId::Imei, "123", 1.7);
        set.insert(FieldId::Model, "EC25", -0.2);
        set.insert(FieldId::Revision, "R1", f64::NAN);
        assert_eq!(set.confidence(FieldId::Imei), 1.0);
        assert_eq!(set.confidence(FieldId::Model), 0.0);
        assert_eq!(set.confidence(FieldId::Revision), 0.0);
        assert_eq!(set.confidence(FieldId::Iccid), 0.0);
    }

    #[test]
    fn iteration_follows_declaration_order() {
        let mut set = FieldSet::new();
        set.insert(FieldId::Operator, "Vodafone", 1.0);
        set.insert(FieldId::Manufacturer, "Quectel", 1.0);
        set.insert(FieldId::LteBands, vec![3u16, 20], 0.7);
        let order: Vec<_> = set.iter().map(|(id, _)| id).collect();
        assert_eq!(
            order,
            vec![FieldId::Manufacturer, FieldId::LteBands, FieldId::Operator]
        );
    }

    #[test]
    fn flat_map_pairs_values_with_confidence() {
        let map = json!({
            "lte_category": "Cat-4",
            "lte_category_confidence": 0.7,
            "model": "EC25",
            "rssi": 25,
            "imsi": null,
            "vendor_specific": { "qdsp": true }
        });
        let (set, diags) = FieldSet::from_flat_map(map.as_object().unwrap());

        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(set.value(FieldId::LteCategory), Some(&FieldValue::from("Cat-4")));
        assert_eq!(set.confidence(FieldId::LteCategory), 0.7);
        assert_eq!(set.confidence(FieldId::Model), 0.0);
        assert!(!set.contains(FieldId::Imsi));
        assert_eq!(set.len(), 2);
        assert_eq!(set.vendor_specific()["qdsp"], json!(true));
    }

    #[test]
    fn flat_map_reports_bad_confidence() {
        let map = json!({
            "model": "EC25",
            "model_confidence": "high",
            "imei": "123456789012345",
            "imei_confidence": 3.0,
            "vendor_specific": [1, 2]
        });
        let (set, diags) = FieldSet::from_flat_map(map.as_object().unwrap());

        assert_eq!(set.confidence(FieldId::Model), 0.0);
        assert_eq!(set.confidence(FieldId::Imei), 1.0);
        assert_eq!(diags.len(), 3);
        assert!(diags.iter().any(|d| d.contains("'model'")));
        assert!(diags.iter().any(|d| d.contains("clamped")));
        assert!(diags.iter().any(|d| d.contains("vendor_specific")));
    }

    #[test]
    fn flat_map_inverse() {
        let mut set = FieldSet::new();
        set.insert(FieldId::Manufacturer, "Quectel", 1.0);
        set.insert(FieldId::LteBands, vec![1u16, 3, 20], 0.7);
        set.insert(FieldId::BatteryVoltage, 3800u32, 1.0);
        set.insert_vendor("system_mode", "LTE-M+NB-IoT");

        let (back, diags) = FieldSet::from_flat_map(&set.to_flat_map());
        assert!(diags.is_empty());
        assert_eq!(back, set);
    }

    #[test]
    fn display_is_readable() {
        let v = FieldValue::from(vec!["LTE", "LTE-M"]);
        assert_eq!(v.to_string(), r#"["LTE", "LTE-M"]"#);
        assert_eq!(FieldValue::from(true).to_string(), "true");
    }

    #[test]
    fn exact_equality_for_lists() {
        let a = FieldValue::from(vec![3u16, 20]);
        let b = FieldValue::from(vec![20u16, 3]);
        assert_ne!(a, b);
    }
}
