//! Fused field set → typed snapshot sections.
//!
//! Every canonical field ends up with a value: the fused one when it has the
//! right shape, otherwise the section default with confidence 0.0. Values of
//! the wrong shape and enumeration strings that match no tag are reported as
//! diagnostics; nothing here fails.

use crate::field::{FieldId, FieldSet, FieldValue};
use crate::model::{
    BasicInfo, GnssInfo, NetworkCapabilities, NetworkTechnology, PowerManagement, Sections,
    SimInfo, SimStatus, VoiceFeatures, UNKNOWN,
};

/// Typed reads over the fused set, collecting diagnostics as it goes.
struct Reader<'a> {
    fused: &'a FieldSet,
    diagnostics: Vec<String>,
}

impl<'a> Reader<'a> {
    fn new(fused: &'a FieldSet) -> Self {
        Self {
            fused,
            diagnostics: Vec::new(),
        }
    }

    /// Convert the value of `id` with `convert`; absent or mismatched values
    /// yield `None`.
    fn read<T>(
        &mut self,
        id: FieldId,
        expected: &str,
        convert: impl FnOnce(&FieldValue) -> Option<T>,
    ) -> Option<(T, f64)> {
        let entry = self.fused.get(id)?;
        match convert(&entry.value) {
            Some(value) => Some((value, entry.confidence)),
            None => {
                tracing::warn!(field = %id, expected, got = entry.value.kind(), "field type mismatch");
                self.diagnostics.push(format!(
                    "assembler: '{id}' expected {expected}, got {}",
                    entry.value.kind()
                ));
                None
            }
        }
    }

    fn text(&mut self, id: FieldId) -> (String, f64) {
        self.read(id, "text", |v| match v {
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Int(n) => Some(n.to_string()),
            FieldValue::Float(x) => Some(x.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| (UNKNOWN.to_string(), 0.0))
    }

    fn optional_text(&mut self, id: FieldId) -> (Option<String>, f64) {
        match self.read(id, "text", |v| v.as_str().map(str::to_string)) {
            Some((s, c)) => (Some(s), c),
            None => (None, 0.0),
        }
    }

    fn flag(&mut self, id: FieldId) -> (bool, f64) {
        self.read(id, "boolean", FieldValue::as_bool)
            .unwrap_or((false, 0.0))
    }

    fn text_list(&mut self, id: FieldId) -> (Vec<String>, f64) {
        self.read(id, "list of text", |v| {
            v.as_list()?
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
    }

    fn band_list(&mut self, id: FieldId) -> (Vec<u16>, f64) {
        self.read(id, "list of band numbers", |v| {
            v.as_list()?
                .iter()
                .map(|item| item.as_i64().and_then(|n| u16::try_from(n).ok()))
                .collect()
        })
        .unwrap_or_default()
    }

    fn millivolts(&mut self, id: FieldId) -> (Option<u32>, f64) {
        match self.read(id, "millivolts", |v| v.as_i64().and_then(|n| u32::try_from(n).ok())) {
            Some((mv, c)) => (Some(mv), c),
            None => (None, 0.0),
        }
    }

    /// Technology tags match case-sensitively; unknown tags are dropped.
    fn technologies(&mut self, id: FieldId) -> (Vec<NetworkTechnology>, f64) {
        let Some((tags, confidence)) = self.read(id, "list of technology tags", |v| {
            v.as_list()?
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<String>>>()
        }) else {
            return (Vec::new(), 0.0);
        };

        let mut technologies = Vec::new();
        for tag in &tags {
            match NetworkTechnology::from_tag(tag) {
                Some(t) if !technologies.contains(&t) => technologies.push(t),
                Some(_) => {}
                None => {
                    tracing::warn!(field = %id, tag = %tag, "unknown network technology");
                    self.diagnostics
                        .push(format!("assembler: unknown network technology '{tag}' in '{id}'"));
                }
            }
        }
        if technologies.is_empty() && !tags.is_empty() {
            return (technologies, 0.0);
        }
        (technologies, confidence)
    }

    fn sim_status(&mut self, id: FieldId) -> (SimStatus, f64) {
        let Some((tag, confidence)) = self.read(id, "SIM status tag", |v| v.as_str().map(str::to_string))
        else {
            return (SimStatus::Unknown, 0.0);
        };
        match SimStatus::from_tag(&tag) {
            Some(status) => (status, confidence),
            None => {
                tracing::warn!(field = %id, tag = %tag, "unknown SIM status");
                self.diagnostics
                    .push(format!("assembler: unknown SIM status '{tag}' in '{id}'"));
                (SimStatus::Unknown, 0.0)
            }
        }
    }
}

/// Build the six typed sections from a fused field set.
///
/// Diagnostics are returned in field order.
pub fn assemble(fused: &FieldSet) -> (Sections, Vec<String>) {
    let mut r = Reader::new(fused);

    let (manufacturer, manufacturer_confidence) = r.text(FieldId::Manufacturer);
    let (model, model_confidence) = r.text(FieldId::Model);
    let (revision, revision_confidence) = r.text(FieldId::Revision);
    let (imei, imei_confidence) = r.text(FieldId::Imei);
    let (serial_number, serial_number_confidence) = r.text(FieldId::SerialNumber);
    let basic_info = BasicInfo {
        manufacturer,
        manufacturer_confidence,
        model,
        model_confidence,
        revision,
        revision_confidence,
        imei,
        imei_confidence,
        serial_number,
        serial_number_confidence,
    };

    let (supported_technologies, supported_technologies_confidence) =
        r.technologies(FieldId::SupportedTechnologies);
    let (lte_bands, lte_bands_confidence) = r.band_list(FieldId::LteBands);
    let (fiveg_bands, fiveg_bands_confidence) = r.text_list(FieldId::FivegBands);
    let (max_downlink_speed, max_downlink_speed_confidence) = r.text(FieldId::MaxDownlinkSpeed);
    let (max_uplink_speed, max_uplink_speed_confidence) = r.text(FieldId::MaxUplinkSpeed);
    let (carrier_aggregation, carrier_aggregation_confidence) =
        r.flag(FieldId::CarrierAggregation);
    let (lte_category, lte_category_confidence) = r.text(FieldId::LteCategory);
    let network_capabilities = NetworkCapabilities {
        supported_technologies,
        supported_technologies_confidence,
        lte_bands,
        lte_bands_confidence,
        fiveg_bands,
        fiveg_bands_confidence,
        max_downlink_speed,
        max_downlink_speed_confidence,
        max_uplink_speed,
        max_uplink_speed_confidence,
        carrier_aggregation,
        carrier_aggregation_confidence,
        lte_category,
        lte_category_confidence,
    };

    let (volte_supported, volte_supported_confidence) = r.flag(FieldId::VolteSupported);
    let (vowifi_supported, vowifi_supported_confidence) = r.flag(FieldId::VowifiSupported);
    let (circuit_switched_voice, circuit_switched_voice_confidence) =
        r.flag(FieldId::CircuitSwitchedVoice);
    let voice_features = VoiceFeatures {
        volte_supported,
        volte_supported_confidence,
        vowifi_supported,
        vowifi_supported_confidence,
        circuit_switched_voice,
        circuit_switched_voice_confidence,
    };

    let (gnss_supported, gnss_supported_confidence) = r.flag(FieldId::GnssSupported);
    let (supported_systems, supported_systems_confidence) = r.text_list(FieldId::SupportedSystems);
    let (last_location, last_location_confidence) = r.optional_text(FieldId::LastLocation);
    let gnss_info = GnssInfo {
        gnss_supported,
        gnss_supported_confidence,
        supported_systems,
        supported_systems_confidence,
        last_location,
        last_location_confidence,
    };

    let (psm_supported, psm_supported_confidence) = r.flag(FieldId::PsmSupported);
    let (edrx_supported, edrx_supported_confidence) = r.flag(FieldId::EdrxSupported);
    let (power_class, power_class_confidence) = r.text(FieldId::PowerClass);
    let (battery_voltage, battery_voltage_confidence) = r.millivolts(FieldId::BatteryVoltage);
    let power_management = PowerManagement {
        psm_supported,
        psm_supported_confidence,
        edrx_supported,
        edrx_supported_confidence,
        power_class,
        power_class_confidence,
        battery_voltage,
        battery_voltage_confidence,
    };

    let (sim_status, sim_status_confidence) = r.sim_status(FieldId::SimStatus);
    let (iccid, iccid_confidence) = r.text(FieldId::Iccid);
    let (imsi, imsi_confidence) = r.text(FieldId::Imsi);
    let (operator, operator_confidence) = r.text(FieldId::Operator);
    let sim_info = SimInfo {
        sim_status,
        sim_status_confidence,
        iccid,
        iccid_confidence,
        imsi,
        imsi_confidence,
        operator,
        operator_confidence,
    };

    let sections = Sections {
        basic_info,
        network_capabilities,
        voice_features,
        gnss_info,
        power_management,
        sim_info,
    };
    (sections, r.diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_gives_defaults() {
        let (sections, diagnostics) = assemble(&FieldSet::new());
        assert_eq!(sections, Sections::default());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn values_and_confidences_are_copied() {
        let mut f = FieldSet::new();
        f.insert(FieldId::Manufacturer, "Quectel", 1.0);
        f.insert(FieldId::LteBands, vec![1u16, 3, 20], 0.7);
        f.insert(FieldId::FivegBands, vec!["n78"], 0.7);
        f.insert(FieldId::CarrierAggregation, true, 0.3);
        f.insert(FieldId::LastLocation, "52.52,13.40", 1.0);
        f.insert(FieldId::BatteryVoltage, 3800u32, 1.0);
        f.insert(FieldId::SimStatus, "ready", 1.0);

        let (s, diagnostics) = assemble(&f);
        assert!(diagnostics.is_empty());
        assert_eq!(s.basic_info.manufacturer, "Quectel");
        assert_eq!(s.basic_info.manufacturer_confidence, 1.0);
        assert_eq!(s.basic_info.model, UNKNOWN);
        assert_eq!(s.basic_info.model_confidence, 0.0);
        assert_eq!(s.network_capabilities.lte_bands, vec![1, 3, 20]);
        assert_eq!(s.network_capabilities.lte_bands_confidence, 0.7);
        assert_eq!(s.network_capabilities.fiveg_bands, vec!["n78"]);
        assert!(s.network_capabilities.carrier_aggregation);
        assert_eq!(s.gnss_info.last_location.as_deref(), Some("52.52,13.40"));
        assert_eq!(s.power_management.battery_voltage, Some(3800));
        assert_eq!(s.sim_info.sim_status, SimStatus::Ready);
    }

    #[test]
    fn technology_tags_are_case_sensitive() {
        let mut f = FieldSet::new();
        f.insert(FieldId::SupportedTechnologies, vec!["LTE", "lte", "LTE-M"], 1.0);
        let (s, diagnostics) = assemble(&f);
        assert_eq!(
            s.network_capabilities.supported_technologies,
            vec![NetworkTechnology::Lte, NetworkTechnology::LteM]
        );
        assert_eq!(s.network_capabilities.supported_technologies_confidence, 1.0);
        assert_eq!(
            diagnostics,
            vec!["assembler: unknown network technology 'lte' in 'supported_technologies'"]
        );
    }

    #[test]
    fn all_unknown_technologies_drop_confidence() {
        let mut f = FieldSet::new();
        f.insert(FieldId::SupportedTechnologies, vec!["WiMAX"], 0.7);
        let (s, diagnostics) = assemble(&f);
        assert!(s.network_capabilities.supported_technologies.is_empty());
        assert_eq!(s.network_capabilities.supported_technologies_confidence, 0.0);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn unknown_sim_status_downgrades() {
        let mut f = FieldSet::new();
        f.insert(FieldId::SimStatus, "READY", 1.0);
        let (s, diagnostics) = assemble(&f);
        assert_eq!(s.sim_info.sim_status, SimStatus::Unknown);
        assert_eq!(s.sim_info.sim_status_confidence, 0.0);
        assert_eq!(diagnostics, vec!["assembler: unknown SIM status 'READY' in 'sim_status'"]);
    }

    #[test]
    fn wrong_shapes_fall_back_to_defaults() {
        let mut f = FieldSet::new();
        f.insert(FieldId::VolteSupported, "yes", 0.7);
        f.insert(FieldId::LteBands, vec!["B3"], 0.7);
        f.insert(FieldId::BatteryVoltage, -5i64, 1.0);
        f.insert(FieldId::Imei, 123456789012345i64, 0.5);

        let (s, diagnostics) = assemble(&f);
        assert!(!s.voice_features.volte_supported);
        assert_eq!(s.voice_features.volte_supported_confidence, 0.0);
        assert!(s.network_capabilities.lte_bands.is_empty());
        assert_eq!(s.network_capabilities.lte_bands_confidence, 0.0);
        assert_eq!(s.power_management.battery_voltage, None);
        assert_eq!(s.basic_info.imei, "123456789012345");
        assert_eq!(s.basic_info.imei_confidence, 0.5);
        assert_eq!(diagnostics.len(), 3);
        assert_eq!(diagnostics[0], "assembler: 'lte_bands' expected list of band numbers, got list");
    }
}
