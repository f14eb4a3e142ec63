//! Vendor-neutral extraction from 3GPP TS 27.007 commands.
//!
//! One parse operation per snapshot section. A command contributes only when
//! it is present with success status; its payload (echo and final `OK`
//! removed) is matched against the field's rules in priority order and the
//! first hit records its captured value and tier. A command that answered
//! but matched no rule leaves the field out, exactly like a missing command.

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use cellprobe_common::ResponseTable;

use crate::band;
use crate::category::{self, CategoryParser};
use crate::confidence::{EXACT, GUESSED, INFERRED, MALFORMED};
use crate::fault;
use crate::field::{FieldId, FieldSet, FieldValue, Section, StageOutput};
use crate::model::{NetworkTechnology, SimStatus};
use crate::rules::{Classifier, RuleMatch, RuleSet};

// ── Command Coverage ────────────────────────────────────────────────

const MANUFACTURER_COMMANDS: &[&str] = &["AT+CGMI", "AT+GMI"];
const MODEL_COMMANDS: &[&str] = &["AT+CGMM", "AT+GMM"];
const REVISION_COMMANDS: &[&str] = &["AT+CGMR", "AT+GMR"];
const IMEI_COMMANDS: &[&str] = &["AT+CGSN", "AT+GSN", "AT+CGSN=1"];
const SERIAL_COMMANDS: &[&str] = &["AT+CGSN=0"];
const IDENTIFICATION_COMMANDS: &[&str] = &["ATI", "AT+CGMM"];
const BAND_COMMANDS: &[&str] = &["AT+QNWINFO", "AT+COPS?", "AT+CGDCONT?"];
const ACCESS_TECHNOLOGY_COMMANDS: &[&str] = &["AT+COPS?", "AT+COPS=?", "AT+QNWINFO"];
const IMS_COMMANDS: &[&str] = &["AT+CIREG?", "AT+COPS?"];
const CS_VOICE_COMMANDS: &[&str] = &["AT+CEVDP?", "AT+CVMOD?"];
const GNSS_COMMANDS: &[&str] = &["AT+CGNSPWR?", "AT+CGPS?", "AT+QGPS?"];
const PSM_COMMANDS: &[&str] = &["AT+CPSMS?"];
const EDRX_COMMANDS: &[&str] = &["AT+CEDRXS?", "AT+CEDRXRDP"];
const BATTERY_COMMANDS: &[&str] = &["AT+CBC"];
const SIM_STATUS_COMMANDS: &[&str] = &["AT+CPIN?"];
const ICCID_COMMANDS: &[&str] = &["AT+CCID", "AT+QCCID", "AT+ICCID"];
const IMSI_COMMANDS: &[&str] = &["AT+CIMI"];
const OPERATOR_COMMANDS: &[&str] = &["AT+COPS?", "AT+CSPN?"];

/// Plausible battery range in millivolts.
pub const BATTERY_RANGE_MV: RangeInclusive<u32> = 1800..=4500;

const GNSS_SYSTEMS: &[&str] = &["GPS", "GLONASS", "Galileo", "BeiDou", "QZSS", "NavIC", "SBAS"];

// ── Payload Helpers ─────────────────────────────────────────────────

/// Payloads of the successful commands among `commands`, in the given order.
fn payloads<'a>(
    table: &'a ResponseTable,
    commands: &'static [&'static str],
) -> impl Iterator<Item = (&'static str, String)> + 'a {
    commands
        .iter()
        .filter_map(move |cmd| table.successful(cmd).map(|r| (*cmd, r.payload_text())))
}

/// First rule hit, trying each successful command in turn.
fn first_hit(
    table: &ResponseTable,
    commands: &'static [&'static str],
    rules: &RuleSet,
) -> Option<(&'static str, RuleMatch)> {
    payloads(table, commands).find_map(|(cmd, text)| rules.first_match(&text).map(|m| (cmd, m)))
}

fn first_class<T: Clone>(
    table: &ResponseTable,
    commands: &'static [&'static str],
    classifier: &Classifier<T>,
) -> Option<(&'static str, T, f64)> {
    payloads(table, commands).find_map(|(cmd, text)| {
        classifier
            .classify(&text)
            .map(|(outcome, tier)| (cmd, outcome, tier))
    })
}

fn record(
    fields: &mut FieldSet,
    id: FieldId,
    value: impl Into<FieldValue>,
    tier: f64,
    command: &str,
) {
    tracing::debug!(field = %id, command, confidence = tier, "standard rule matched");
    fields.insert(id, value, tier);
}

/// Digit-count check for identifiers. A value failing it keeps at most the
/// malformed tier.
fn check_digits(id: FieldId, value: &str, lengths: RangeInclusive<usize>, tier: f64) -> f64 {
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) && lengths.contains(&value.len()) {
        tier
    } else {
        tracing::warn!(field = %id, value, "identifier failed structural check");
        tier.min(MALFORMED)
    }
}

/// Network access technology from a `+COPS` `<AcT>` code (3GPP TS 27.007).
pub fn technology_from_act(code: u8) -> Option<NetworkTechnology> {
    match code {
        0 | 1 | 3 => Some(NetworkTechnology::Gsm),
        2 | 4 | 5 | 6 => Some(NetworkTechnology::Umts),
        7 | 10 => Some(NetworkTechnology::Lte),
        8 => Some(NetworkTechnology::LteM),
        9 => Some(NetworkTechnology::NbIot),
        11 | 12 => Some(NetworkTechnology::FivegSa),
        13 => Some(NetworkTechnology::FivegNsa),
        _ => None,
    }
}

/// Network access technology from a textual mode such as `FDD LTE` or `NR5G-SA`.
pub fn technology_from_name(name: &str) -> Option<NetworkTechnology> {
    let upper = name.to_ascii_uppercase();
    let has = |needle: &str| upper.contains(needle);
    if has("NSA") {
        Some(NetworkTechnology::FivegNsa)
    } else if has("NR5G") || has("5G") || upper.starts_with("NR") {
        if has("SA") {
            Some(NetworkTechnology::FivegSa)
        } else {
            Some(NetworkTechnology::FivegNr)
        }
    } else if has("EMTC") || has("CAT-M") || has("LTE-M") || has("CATM") {
        Some(NetworkTechnology::LteM)
    } else if has("NBIOT") || has("NB-IOT") || has("CAT-NB") {
        Some(NetworkTechnology::NbIot)
    } else if has("LTE") || has("E-UTRAN") {
        Some(NetworkTechnology::Lte)
    } else if has("WCDMA") || has("UMTS") || has("HSPA") || has("HSDPA") || has("HSUPA") || has("TDSCDMA") {
        Some(NetworkTechnology::Umts)
    } else if has("GSM") || has("EDGE") || has("GPRS") {
        Some(NetworkTechnology::Gsm)
    } else {
        None
    }
}

fn canonical_gnss_system(raw: &str) -> Option<&'static str> {
    let lower = raw.to_ascii_lowercase();
    if lower == "bds" {
        return Some("BeiDou");
    }
    GNSS_SYSTEMS
        .iter()
        .copied()
        .find(|s| s.eq_ignore_ascii_case(&lower))
}

/// Millivolts from a captured voltage and optional unit.
fn battery_millivolts(value: &str, unit: Option<&str>) -> Option<u32> {
    let volts = unit == Some("V") || value.contains('.');
    if volts {
        let v: f64 = value.parse().ok()?;
        let mv = (v * 1000.0).round();
        (0.0..=f64::from(u32::MAX)).contains(&mv).then_some(mv as u32)
    } else {
        value.parse().ok()
    }
}

// ── Extractor ───────────────────────────────────────────────────────

/// Extractor for standard commands. Immutable after construction.
#[derive(Debug, Clone)]
pub struct StandardsExtractor {
    manufacturer: RuleSet,
    model: RuleSet,
    revision: RuleSet,
    imei: RuleSet,
    serial_number: RuleSet,
    category: CategoryParser,
    power_class: RuleSet,
    nr_line: RuleSet,
    lte_band: RuleSet,
    lte_frequency: RuleSet,
    nr_band: RuleSet,
    act_code: RuleSet,
    act_name: RuleSet,
    volte: Classifier<bool>,
    vowifi: Classifier<bool>,
    cs_voice: RuleSet,
    gnss: Classifier<bool>,
    gnss_system: RuleSet,
    psm: Classifier<bool>,
    edrx: Classifier<bool>,
    battery: RuleSet,
    sim_status: Classifier<SimStatus>,
    iccid: RuleSet,
    imsi: RuleSet,
    operator: RuleSet,
}

impl Default for StandardsExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardsExtractor {
    pub fn new() -> Self {
        Self {
            manufacturer: RuleSet::new(&[
                (r#"(?mi)^\+C?GMI:\s*"?([^"\r\n]+?)"?\s*$"#, EXACT),
                (r"(?mi)^Manufacturer:\s*([A-Za-z0-9][\w .&\-]*?)\s*$", EXACT),
                (r"(?m)^([A-Za-z0-9]+)\s*$", EXACT),
                (r"(?m)^([A-Za-z0-9][\w .,&\-]*?)\s*$", INFERRED),
                (r"(?m)^(\S[^\r\n]*?)\s*$", GUESSED),
            ]),
            model: RuleSet::new(&[
                (r#"(?mi)^\+C?GMM:\s*"?([^"\r\n]+?)"?\s*$"#, EXACT),
                (r"(?mi)^Model:\s*([A-Za-z0-9_\-]+)", EXACT),
                (r"(?m)^([A-Za-z0-9_\-]+)\s*$", EXACT),
                (r"(?m)^(\S[^\r\n]*?)\s*$", GUESSED),
            ]),
            revision: RuleSet::new(&[
                (r#"(?mi)^\+C?GMR:\s*"?([^"\r\n]+?)"?\s*$"#, EXACT),
                (r"(?mi)Revision:\s*([\w.\-]+)", EXACT),
                (r"(?m)^([\w.\-]+)\s*$", EXACT),
                (r"(?m)^(\S[^\r\n]*?)\s*$", GUESSED),
            ]),
            imei: RuleSet::new(&[
                (r"\b(\d{15})\b", EXACT),
                (r"(?i)IMEI:\s*(\d{14,17})", EXACT),
                (r#"(?m)^\+C?GSN:\s*"?(\d{14,17})"?"#, EXACT),
                (r"(?m)^(\d{14,17})\s*$", EXACT),
            ]),
            serial_number: RuleSet::new(&[
                (r#"(?m)^\+CGSN:\s*"?([A-Za-z0-9\-]+)"?"#, EXACT),
                (r"(?mi)^(?:SN|Serial(?:\s+Number)?)\s*:\s*([A-Za-z0-9\-]+)", EXACT),
                (r"(?m)^([A-Za-z0-9\-]{6,})\s*$", INFERRED),
            ]),
            category: CategoryParser::new(),
            power_class: RuleSet::new(&[(r"(?i)\bpower\s*class\s*:?\s*(\d)\b", INFERRED)]),
            nr_line: RuleSet::new(&[(r"(?i)\bNR(?:5G)?\b|\bNR5G-|\b5G\b", EXACT)]),
            lte_band: RuleSet::new(&[
                (r"(?i)\bBand\s*(\d{1,3})\b", INFERRED),
                (r"\bB(\d{1,3})\b", INFERRED),
            ]),
            lte_frequency: RuleSet::new(&[(r"(?i)\b(\d{3,4})\s*MHz\b", GUESSED)]),
            nr_band: RuleSet::new(&[
                (r"(?i)\bNR5?G?[\s-]+BAND\s*(\d{1,3})\b", INFERRED),
                (r"\bn(\d{1,3})\b", INFERRED),
            ]),
            act_code: RuleSet::new(&[
                (r#"\+COPS:\s*\d+\s*,\s*\d+\s*,\s*"[^"]*"\s*,\s*(\d{1,2})"#, INFERRED),
                (r#"\(\d,\s*"[^"]*",\s*"[^"]*",\s*"[^"]*",\s*(\d{1,2})\)"#, INFERRED),
            ]),
            act_name: RuleSet::new(&[(r#"\+QNWINFO:\s*"([^"]+)""#, INFERRED)]),
            volte: Classifier::new(&[
                (r"(?m)^\+CIREG:\s*\d+\s*,\s*1\b", true, EXACT),
                (r"(?i)\b(?:VoLTE|IMS)\b[^\n]*\bnot\s+(?:registered|enabled)", false, INFERRED),
                (r"(?i)VoLTE[^\n]*\benabled", true, INFERRED),
                (r"(?i)IMS[^\n]*\bregistered", true, INFERRED),
            ]),
            vowifi: Classifier::new(&[(
                r"(?i)\b(?:VoWiFi|WFC|Wi-?Fi\s+calling)\b[^\n]*\b(?:enabled|registered|supported)",
                true,
                INFERRED,
            )]),
            cs_voice: RuleSet::new(&[
                (r"\+CEVDP:\s*([1-4])", EXACT),
                (r"\+CVMOD:\s*([0-3])", INFERRED),
            ]),
            gnss: Classifier::new(&[
                (r"(?m)^\+(?:CGNSPWR|CGPS|QGPS):\s*\d", true, EXACT),
                (r"(?i)GPS[^\n]*supported", true, INFERRED),
                (r"(?i)GNSS[^\n]*enabled", true, INFERRED),
            ]),
            gnss_system: RuleSet::new(&[(
                r"(?i)\b(GPS|GLONASS|Galileo|BeiDou|BDS|QZSS|NavIC|SBAS)\b",
                INFERRED,
            )]),
            psm: Classifier::new(&[
                (r"(?m)^\+CPSMS:\s*1\b", true, EXACT),
                (r"(?m)^\+CPSMS:\s*0\b", true, INFERRED),
                (r"(?i)PSM[^\n]*enabled", true, INFERRED),
            ]),
            edrx: Classifier::new(&[
                (r"(?m)^\+CEDRXS:\s*\d", true, EXACT),
                (r"(?m)^\+CEDRXRDP:\s*[1-5]\b", true, INFERRED),
            ]),
            battery: RuleSet::new(&[
                (r"(?m)^\+CBC:\s*\d+\s*,\s*\d+\s*,\s*(\d+(?:\.\d+)?)\s*(V|mV)?", EXACT),
                (r"(?m)^\+CBC:\s*(\d+(?:\.\d+)?)\s*(V|mV)\b", EXACT),
            ]),
            sim_status: Classifier::new(&[
                (r"(?mi)^\+CPIN:\s*READY\b", SimStatus::Ready, EXACT),
                (r"(?mi)^\+CPIN:\s*(?:PH-)?(?:SIM|NET)\s+(?:PIN|PUK)2?\b", SimStatus::PinRequired, EXACT),
                (r"(?i)not\s+inserted", SimStatus::NotInserted, EXACT),
                (r"(?i)\bSIM[^\n]*\bready\b", SimStatus::Ready, INFERRED),
                (r"\bSIM\s+PIN\b", SimStatus::PinRequired, INFERRED),
            ]),
            iccid: RuleSet::new(&[
                (r#"(?mi)^\+[QI]?CCID:\s*"?([0-9A-F]{10,24})"?"#, EXACT),
                (r#"(?i)ICCID:\s*"?([0-9A-F]{10,24})"#, EXACT),
                (r"(?m)^(\d{10,24}[Ff]?)\s*$", EXACT),
            ]),
            imsi: RuleSet::new(&[
                (r#"(?m)^\+CIMI:\s*"?(\d{5,16})"?"#, EXACT),
                (r"(?m)^(\d{5,16})\s*$", EXACT),
            ]),
            operator: RuleSet::new(&[
                (r#"\+COPS:\s*\d+\s*,\s*\d+\s*,\s*"([^"]+)""#, EXACT),
                (r#"\+CSPN:\s*"([^"]+)""#, EXACT),
            ]),
        }
    }

    /// Run every section parser inside its own fault boundary.
    pub fn extract_all(&self, table: &ResponseTable) -> StageOutput {
        let parsers: [(Section, fn(&Self, &ResponseTable) -> FieldSet); 6] = [
            (Section::BasicInfo, Self::parse_basic_info),
            (Section::NetworkCapabilities, Self::parse_network_capabilities),
            (Section::VoiceFeatures, Self::parse_voice_features),
            (Section::GnssInfo, Self::parse_gnss_info),
            (Section::PowerManagement, Self::parse_power_management),
            (Section::SimInfo, Self::parse_sim_info),
        ];

        let mut out = StageOutput::default();
        for (section, parse) in parsers {
            match fault::guard(|| parse(self, table)) {
                Ok(fields) => out.fields.merge(fields),
                Err(panic) => {
                    tracing::warn!(%section, panic = %panic, "standard extraction fault");
                    out.diagnostics
                        .push(format!("standards: {section} extraction failed: {panic}"));
                }
            }
        }
        tracing::debug!(fields = out.fields.len(), "standard extraction complete");
        out
    }

    // ── Basic Info ──────────────────────────────────────────────────

    pub fn parse_basic_info(&self, table: &ResponseTable) -> FieldSet {
        let mut fields = FieldSet::new();

        let text_rules = [
            (FieldId::Manufacturer, MANUFACTURER_COMMANDS, &self.manufacturer),
            (FieldId::Model, MODEL_COMMANDS, &self.model),
            (FieldId::Revision, REVISION_COMMANDS, &self.revision),
            (FieldId::SerialNumber, SERIAL_COMMANDS, &self.serial_number),
        ];
        for (id, commands, rules) in text_rules {
            if let Some((cmd, m)) = first_hit(table, commands, rules) {
                if !m.value().is_empty() {
                    record(&mut fields, id, m.value(), m.tier, cmd);
                }
            }
        }

        if let Some((cmd, m)) = first_hit(table, IMEI_COMMANDS, &self.imei) {
            let imei = m.value();
            let tier = check_digits(FieldId::Imei, imei, 15..=15, m.tier);
            record(&mut fields, FieldId::Imei, imei, tier, cmd);
        }

        fields
    }

    // ── Network Capabilities ────────────────────────────────────────

    pub fn parse_network_capabilities(&self, table: &ResponseTable) -> FieldSet {
        let mut fields = FieldSet::new();

        let mut lte = BTreeSet::new();
        let mut lte_tier: f64 = 0.0;
        let mut nr = BTreeSet::new();
        let mut nr_tier: f64 = 0.0;
        for (_, text) in payloads(table, BAND_COMMANDS) {
            for line in text.lines() {
                for m in self.nr_band.all_matches(line) {
                    if let Ok(n) = m.value().parse::<u16>() {
                        if band::is_valid(n, true) {
                            nr.insert(n);
                            nr_tier = nr_tier.max(m.tier);
                        }
                    }
                }
                if self.nr_line.is_match(line) {
                    continue;
                }
                for m in self.lte_band.all_matches(line) {
                    if let Ok(n) = m.value().parse::<u16>() {
                        if band::is_valid(n, false) {
                            if band::find(n, false).is_none() {
                                tracing::debug!(band = n, "LTE band not in catalog");
                            }
                            lte.insert(n);
                            lte_tier = lte_tier.max(m.tier);
                        }
                    }
                }
                for m in self.lte_frequency.all_matches(line) {
                    let guess = m
                        .value()
                        .parse::<u16>()
                        .ok()
                        .and_then(band::lte_band_for_frequency);
                    if let Some(b) = guess {
                        tracing::debug!(band = %b, "LTE band guessed from carrier frequency");
                        lte.insert(b.number);
                        lte_tier = lte_tier.max(m.tier);
                    }
                }
            }
        }
        if !lte.is_empty() {
            let bands: Vec<u16> = lte.into_iter().collect();
            record(&mut fields, FieldId::LteBands, bands, lte_tier, "band query");
        }
        if !nr.is_empty() {
            let bands: Vec<String> = nr.into_iter().map(|n| format!("n{n}")).collect();
            record(&mut fields, FieldId::FivegBands, bands, nr_tier, "band query");
        }

        let mut technologies = BTreeSet::new();
        let mut tech_tier: f64 = 0.0;
        for (_, text) in payloads(table, ACCESS_TECHNOLOGY_COMMANDS) {
            for m in self.act_code.all_matches(&text) {
                if let Some(t) = m.value().parse().ok().and_then(technology_from_act) {
                    technologies.insert(t);
                    tech_tier = tech_tier.max(m.tier);
                }
            }
            for m in self.act_name.all_matches(&text) {
                if let Some(t) = technology_from_name(m.value()) {
                    technologies.insert(t);
                    tech_tier = tech_tier.max(m.tier);
                }
            }
        }
        if !technologies.is_empty() {
            let tags: Vec<&str> = technologies.into_iter().map(|t| t.tag()).collect();
            record(
                &mut fields,
                FieldId::SupportedTechnologies,
                tags,
                tech_tier,
                "access technology",
            );
        }

        let mentioned = payloads(table, IDENTIFICATION_COMMANDS)
            .find_map(|(cmd, text)| self.category.parse(&text).map(|c| (cmd, c)));
        if let Some((cmd, label)) = mentioned {
            if let Some(cat) = category::lookup(&label) {
                fields.insert(
                    FieldId::MaxDownlinkSpeed,
                    category::format_rate(cat.downlink_kbps),
                    GUESSED,
                );
                fields.insert(
                    FieldId::MaxUplinkSpeed,
                    category::format_rate(cat.uplink_kbps),
                    GUESSED,
                );
                fields.insert(FieldId::CarrierAggregation, cat.carrier_aggregation, GUESSED);
            }
            record(&mut fields, FieldId::LteCategory, label, INFERRED, cmd);
        }

        if let Some((cmd, m)) = first_hit(table, &["ATI"], &self.power_class) {
            record(&mut fields, FieldId::PowerClass, format!("Class {}", m.value()), m.tier, cmd);
        }

        fields
    }

    // ── Voice Features ──────────────────────────────────────────────

    pub fn parse_voice_features(&self, table: &ResponseTable) -> FieldSet {
        let mut fields = FieldSet::new();

        if let Some((cmd, supported, tier)) = first_class(table, IMS_COMMANDS, &self.volte) {
            record(&mut fields, FieldId::VolteSupported, supported, tier, cmd);
        }
        if let Some((cmd, supported, tier)) = first_class(table, IMS_COMMANDS, &self.vowifi) {
            record(&mut fields, FieldId::VowifiSupported, supported, tier, cmd);
        }
        if let Some((cmd, m)) = first_hit(table, CS_VOICE_COMMANDS, &self.cs_voice) {
            // +CEVDP 4 is "IMS PS voice only"; +CVMOD 1 is "VoIP only".
            let ims_only = match m.index {
                0 => m.value() == "4",
                _ => m.value() == "1",
            };
            record(&mut fields, FieldId::CircuitSwitchedVoice, !ims_only, m.tier, cmd);
        }

        fields
    }

    // ── GNSS ────────────────────────────────────────────────────────

    pub fn parse_gnss_info(&self, table: &ResponseTable) -> FieldSet {
        let mut fields = FieldSet::new();

        if let Some((cmd, supported, tier)) = first_class(table, GNSS_COMMANDS, &self.gnss) {
            record(&mut fields, FieldId::GnssSupported, supported, tier, cmd);
        }

        let mut systems = Vec::new();
        for (_, text) in payloads(table, GNSS_COMMANDS) {
            for m in self.gnss_system.all_matches(&text) {
                if let Some(name) = canonical_gnss_system(m.value()) {
                    if !systems.contains(&name) {
                        systems.push(name);
                    }
                }
            }
        }
        if !systems.is_empty() {
            systems.sort_by_key(|s| GNSS_SYSTEMS.iter().position(|k| k == s));
            record(&mut fields, FieldId::SupportedSystems, systems, INFERRED, "GNSS query");
        }

        fields
    }

    // ── Power Management ────────────────────────────────────────────

    pub fn parse_power_management(&self, table: &ResponseTable) -> FieldSet {
        let mut fields = FieldSet::new();

        if let Some((cmd, supported, tier)) = first_class(table, PSM_COMMANDS, &self.psm) {
            record(&mut fields, FieldId::PsmSupported, supported, tier, cmd);
        }
        if let Some((cmd, supported, tier)) = first_class(table, EDRX_COMMANDS, &self.edrx) {
            record(&mut fields, FieldId::EdrxSupported, supported, tier, cmd);
        }
        if let Some((cmd, m)) = first_hit(table, BATTERY_COMMANDS, &self.battery) {
            match battery_millivolts(m.value(), m.group(2)) {
                Some(mv) => {
                    let tier = if BATTERY_RANGE_MV.contains(&mv) {
                        m.tier
                    } else {
                        tracing::warn!(mv, "battery voltage outside plausible range");
                        m.tier.min(MALFORMED)
                    };
                    record(&mut fields, FieldId::BatteryVoltage, mv, tier, cmd);
                }
                None => tracing::warn!(value = m.value(), "unparseable battery voltage"),
            }
        }

        fields
    }

    // ── SIM ─────────────────────────────────────────────────────────

    pub fn parse_sim_info(&self, table: &ResponseTable) -> FieldSet {
        let mut fields = FieldSet::new();

        if let Some((cmd, status, tier)) = first_class(table, SIM_STATUS_COMMANDS, &self.sim_status)
        {
            record(&mut fields, FieldId::SimStatus, status.tag(), tier, cmd);
        }

        if let Some((cmd, m)) = first_hit(table, ICCID_COMMANDS, &self.iccid) {
            let iccid = m.value().trim_end_matches(['F', 'f']);
            let tier = check_digits(FieldId::Iccid, iccid, 19..=20, m.tier);
            record(&mut fields, FieldId::Iccid, iccid, tier, cmd);
        }

        if let Some((cmd, m)) = first_hit(table, IMSI_COMMANDS, &self.imsi) {
            let imsi = m.value();
            let tier = check_digits(FieldId::Imsi, imsi, 14..=15, m.tier);
            record(&mut fields, FieldId::Imsi, imsi, tier, cmd);
        }

        if let Some((cmd, m)) = first_hit(table, OPERATOR_COMMANDS, &self.operator) {
            record(&mut fields, FieldId::Operator, m.value(), m.tier, cmd);
        }

        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellprobe_common::{CommandResponse, ResponseStatus};

    fn table(entries: &[(&str, &[&str])]) -> ResponseTable {
        entries
            .iter()
            .map(|(cmd, lines)| CommandResponse::success(*cmd, lines.iter().copied()))
            .collect()
    }

    fn text(fields: &FieldSet, id: FieldId) -> Option<&str> {
        fields.value(id).and_then(|v| v.as_str())
    }

    #[test]
    fn all_builtin_rules_compile() {
        let s = StandardsExtractor::new();
        assert_eq!(s.manufacturer.len(), 5);
        assert_eq!(s.model.len(), 4);
        assert_eq!(s.revision.len(), 4);
        assert_eq!(s.imei.len(), 4);
        assert_eq!(s.serial_number.len(), 3);
        assert_eq!(s.nr_line.len(), 1);
        assert_eq!(s.lte_band.len(), 2);
        assert_eq!(s.nr_band.len(), 2);
        assert_eq!(s.act_code.len(), 2);
        assert_eq!(s.volte.len(), 4);
        assert_eq!(s.cs_voice.len(), 2);
        assert_eq!(s.gnss.len(), 3);
        assert_eq!(s.psm.len(), 3);
        assert_eq!(s.edrx.len(), 2);
        assert_eq!(s.battery.len(), 2);
        assert_eq!(s.sim_status.len(), 5);
        assert_eq!(s.iccid.len(), 3);
        assert_eq!(s.imsi.len(), 2);
        assert_eq!(s.operator.len(), 2);
    }

    #[test]
    fn basic_info_exact_matches() {
        let t = table(&[
            ("AT+CGMI", &["AT+CGMI", "Quectel", "OK"]),
            ("AT+CGMM", &["EC25", "OK"]),
            ("AT+CGMR", &["Revision: EC25EFAR06A03M4G", "OK"]),
            ("AT+CGSN", &["867698041234567", "OK"]),
        ]);
        let f = StandardsExtractor::new().parse_basic_info(&t);
        assert_eq!(text(&f, FieldId::Manufacturer), Some("Quectel"));
        assert_eq!(text(&f, FieldId::Model), Some("EC25"));
        assert_eq!(text(&f, FieldId::Revision), Some("EC25EFAR06A03M4G"));
        assert_eq!(text(&f, FieldId::Imei), Some("867698041234567"));
        for id in [FieldId::Manufacturer, FieldId::Model, FieldId::Revision, FieldId::Imei] {
            assert_eq!(f.confidence(id), 1.0, "{id}");
        }
        assert!(!f.contains(FieldId::SerialNumber));
    }

    #[test]
    fn multi_word_manufacturer_is_inferred() {
        let t = table(&[("AT+CGMI", &["Nordic Semiconductor ASA", "OK"])]);
        let f = StandardsExtractor::new().parse_basic_info(&t);
        assert_eq!(text(&f, FieldId::Manufacturer), Some("Nordic Semiconductor ASA"));
        assert_eq!(f.confidence(FieldId::Manufacturer), INFERRED);
    }

    #[test]
    fn prefixed_manufacturer() {
        let t = table(&[("AT+CGMI", &["+CGMI: \"SIMCOM INCORPORATED\"", "OK"])]);
        let f = StandardsExtractor::new().parse_basic_info(&t);
        assert_eq!(text(&f, FieldId::Manufacturer), Some("SIMCOM INCORPORATED"));
        assert_eq!(f.confidence(FieldId::Manufacturer), EXACT);
    }

    #[test]
    fn imei_with_wrong_length_is_malformed() {
        let t = table(&[("AT+CGSN", &["8676980412345678", "OK"])]);
        let f = StandardsExtractor::new().parse_basic_info(&t);
        assert_eq!(text(&f, FieldId::Imei), Some("8676980412345678"));
        assert_eq!(f.confidence(FieldId::Imei), MALFORMED);
    }

    #[test]
    fn failed_or_empty_commands_are_omitted() {
        let mut t = table(&[("AT+CGMM", &["OK"])]);
        t.insert(CommandResponse::failure("AT+CGMI", ResponseStatus::Error));
        let f = StandardsExtractor::new().parse_basic_info(&t);
        assert!(f.is_empty());
    }

    #[test]
    fn serial_number_from_cgsn_zero() {
        let t = table(&[("AT+CGSN=0", &["+CGSN: \"R5CR20ABCDE\"", "OK"])]);
        let f = StandardsExtractor::new().parse_basic_info(&t);
        assert_eq!(text(&f, FieldId::SerialNumber), Some("R5CR20ABCDE"));
        assert_eq!(f.confidence(FieldId::SerialNumber), EXACT);
    }

    #[test]
    fn lte_and_nr_bands_are_kept_apart() {
        let t = table(&[(
            "AT+QNWINFO",
            &[
                "+QNWINFO: \"FDD LTE\",\"46001\",\"LTE BAND 3\",1650",
                "+QNWINFO: \"NR5G-NSA\",\"46001\",\"NR5G BAND 78\",627264",
                "OK",
            ],
        )]);
        let f = StandardsExtractor::new().parse_network_capabilities(&t);
        assert_eq!(f.value(FieldId::LteBands), Some(&FieldValue::from(vec![3u16])));
        assert_eq!(f.confidence(FieldId::LteBands), INFERRED);
        assert_eq!(f.value(FieldId::FivegBands), Some(&FieldValue::from(vec!["n78"])));
        assert_eq!(
            f.value(FieldId::SupportedTechnologies),
            Some(&FieldValue::from(vec!["LTE", "5G NSA"]))
        );
    }

    #[test]
    fn frequency_mentions_are_guesses() {
        let t = table(&[("AT+COPS?", &["LTE 1800 MHz, 800MHz", "OK"])]);
        let f = StandardsExtractor::new().parse_network_capabilities(&t);
        assert_eq!(f.value(FieldId::LteBands), Some(&FieldValue::from(vec![3u16, 20])));
        assert_eq!(f.confidence(FieldId::LteBands), GUESSED);
    }

    #[test]
    fn bands_are_sorted_and_deduplicated() {
        let t = table(&[
            ("AT+QNWINFO", &["Band 20, B3, band 3", "OK"]),
            ("AT+CGDCONT?", &["Band 1", "OK"]),
        ]);
        let f = StandardsExtractor::new().parse_network_capabilities(&t);
        assert_eq!(f.value(FieldId::LteBands), Some(&FieldValue::from(vec![1u16, 3, 20])));
    }

    #[test]
    fn cops_act_code_maps_to_technology() {
        let t = table(&[("AT+COPS?", &["+COPS: 0,0,\"Vodafone\",7", "OK"])]);
        let f = StandardsExtractor::new().parse_network_capabilities(&t);
        assert_eq!(
            f.value(FieldId::SupportedTechnologies),
            Some(&FieldValue::from(vec!["LTE"]))
        );
        assert_eq!(f.confidence(FieldId::SupportedTechnologies), INFERRED);

        let s = StandardsExtractor::new().parse_sim_info(&t);
        assert_eq!(text(&s, FieldId::Operator), Some("Vodafone"));
        assert_eq!(s.confidence(FieldId::Operator), EXACT);
    }

    #[test]
    fn act_code_table() {
        assert_eq!(technology_from_act(0), Some(NetworkTechnology::Gsm));
        assert_eq!(technology_from_act(2), Some(NetworkTechnology::Umts));
        assert_eq!(technology_from_act(8), Some(NetworkTechnology::LteM));
        assert_eq!(technology_from_act(9), Some(NetworkTechnology::NbIot));
        assert_eq!(technology_from_act(13), Some(NetworkTechnology::FivegNsa));
        assert_eq!(technology_from_act(14), None);
    }

    #[test]
    fn technology_names() {
        assert_eq!(technology_from_name("FDD LTE"), Some(NetworkTechnology::Lte));
        assert_eq!(technology_from_name("NR5G-SA"), Some(NetworkTechnology::FivegSa));
        assert_eq!(technology_from_name("NR5G-NSA"), Some(NetworkTechnology::FivegNsa));
        assert_eq!(technology_from_name("eMTC"), Some(NetworkTechnology::LteM));
        assert_eq!(technology_from_name("NBIoT"), Some(NetworkTechnology::NbIot));
        assert_eq!(technology_from_name("HSPA+"), Some(NetworkTechnology::Umts));
        assert_eq!(technology_from_name("EDGE"), Some(NetworkTechnology::Gsm));
        assert_eq!(technology_from_name("No Service"), None);
    }

    #[test]
    fn category_drives_speed_guesses() {
        let t = table(&[("ATI", &["Quectel", "EC25", "Revision: EC25EFAR06A03M4G", "LTE Cat 4", "OK"])]);
        let f = StandardsExtractor::new().parse_network_capabilities(&t);
        assert_eq!(text(&f, FieldId::LteCategory), Some("Cat-4"));
        assert_eq!(f.confidence(FieldId::LteCategory), INFERRED);
        assert_eq!(text(&f, FieldId::MaxDownlinkSpeed), Some("150 Mbps"));
        assert_eq!(text(&f, FieldId::MaxUplinkSpeed), Some("50 Mbps"));
        assert_eq!(f.value(FieldId::CarrierAggregation), Some(&FieldValue::Bool(false)));
        assert_eq!(f.confidence(FieldId::MaxDownlinkSpeed), GUESSED);
    }

    #[test]
    fn ims_registration() {
        let s = StandardsExtractor::new();
        let f = s.parse_voice_features(&table(&[("AT+CIREG?", &["+CIREG: 0,1", "OK"])]));
        assert_eq!(f.value(FieldId::VolteSupported), Some(&FieldValue::Bool(true)));
        assert_eq!(f.confidence(FieldId::VolteSupported), EXACT);

        let f = s.parse_voice_features(&table(&[("AT+CIREG?", &["IMS not registered", "OK"])]));
        assert_eq!(f.value(FieldId::VolteSupported), Some(&FieldValue::Bool(false)));
        assert_eq!(f.confidence(FieldId::VolteSupported), INFERRED);

        let f = s.parse_voice_features(&table(&[("AT+CIREG?", &["+CIREG: 0,0", "OK"])]));
        assert!(!f.contains(FieldId::VolteSupported));
    }

    #[test]
    fn voice_domain_preference() {
        let s = StandardsExtractor::new();
        let f = s.parse_voice_features(&table(&[("AT+CEVDP?", &["+CEVDP: 3", "OK"])]));
        assert_eq!(f.value(FieldId::CircuitSwitchedVoice), Some(&FieldValue::Bool(true)));
        let f = s.parse_voice_features(&table(&[("AT+CEVDP?", &["+CEVDP: 4", "OK"])]));
        assert_eq!(f.value(FieldId::CircuitSwitchedVoice), Some(&FieldValue::Bool(false)));
        let f = s.parse_voice_features(&table(&[("AT+CVMOD?", &["+CVMOD: 1", "OK"])]));
        assert_eq!(f.value(FieldId::CircuitSwitchedVoice), Some(&FieldValue::Bool(false)));
        assert_eq!(f.confidence(FieldId::CircuitSwitchedVoice), INFERRED);
    }

    #[test]
    fn gnss_power_query() {
        let t = table(&[("AT+QGPS?", &["+QGPS: 0", "OK"]), ("AT+CGPS?", &["GPS GLONASS BDS supported", "OK"])]);
        let f = StandardsExtractor::new().parse_gnss_info(&t);
        assert_eq!(f.value(FieldId::GnssSupported), Some(&FieldValue::Bool(true)));
        assert_eq!(f.confidence(FieldId::GnssSupported), INFERRED);
        assert_eq!(
            f.value(FieldId::SupportedSystems),
            Some(&FieldValue::from(vec!["GPS", "GLONASS", "BeiDou"]))
        );
    }

    #[test]
    fn structured_gnss_answer_is_exact() {
        let t = table(&[("AT+CGNSPWR?", &["+CGNSPWR: 1", "OK"])]);
        let f = StandardsExtractor::new().parse_gnss_info(&t);
        assert_eq!(f.confidence(FieldId::GnssSupported), EXACT);
        assert!(!f.contains(FieldId::SupportedSystems));
    }

    #[test]
    fn power_saving_modes() {
        let t = table(&[
            ("AT+CPSMS?", &["+CPSMS: 1,,,\"00100100\",\"00000011\"", "OK"]),
            ("AT+CEDRXS?", &["+CEDRXS: 4,\"0101\"", "OK"]),
        ]);
        let f = StandardsExtractor::new().parse_power_management(&t);
        assert_eq!(f.value(FieldId::PsmSupported), Some(&FieldValue::Bool(true)));
        assert_eq!(f.confidence(FieldId::PsmSupported), EXACT);
        assert_eq!(f.value(FieldId::EdrxSupported), Some(&FieldValue::Bool(true)));
    }

    #[test]
    fn battery_voltage_units() {
        let s = StandardsExtractor::new();
        let f = s.parse_power_management(&table(&[("AT+CBC", &["+CBC: 0,85,3921", "OK"])]));
        assert_eq!(f.value(FieldId::BatteryVoltage), Some(&FieldValue::Int(3921)));
        assert_eq!(f.confidence(FieldId::BatteryVoltage), EXACT);

        let f = s.parse_power_management(&table(&[("AT+CBC", &["+CBC: 3.950V", "OK"])]));
        assert_eq!(f.value(FieldId::BatteryVoltage), Some(&FieldValue::Int(3950)));

        let f = s.parse_power_management(&table(&[("AT+CBC", &["+CBC: 0,0,9000", "OK"])]));
        assert_eq!(f.confidence(FieldId::BatteryVoltage), MALFORMED);
    }

    #[test]
    fn sim_status_variants() {
        let s = StandardsExtractor::new();
        let cases: [(&str, &str); 4] = [
            ("+CPIN: READY", "ready"),
            ("+CPIN: SIM PIN", "pin_required"),
            ("+CPIN: SIM PUK", "pin_required"),
            ("+CME ERROR: SIM not inserted", "not_inserted"),
        ];
        for (line, expected) in cases {
            let f = s.parse_sim_info(&table(&[("AT+CPIN?", &[line, "OK"])]));
            assert_eq!(text(&f, FieldId::SimStatus), Some(expected), "{line}");
            assert_eq!(f.confidence(FieldId::SimStatus), EXACT);
        }
    }

    #[test]
    fn iccid_and_imsi_checks() {
        let s = StandardsExtractor::new();
        let t = table(&[
            ("AT+QCCID", &["+QCCID: 89860318760234567890", "OK"]),
            ("AT+CIMI", &["460011234567890", "OK"]),
        ]);
        let f = s.parse_sim_info(&t);
        assert_eq!(text(&f, FieldId::Iccid), Some("89860318760234567890"));
        assert_eq!(f.confidence(FieldId::Iccid), EXACT);
        assert_eq!(text(&f, FieldId::Imsi), Some("460011234567890"));
        assert_eq!(f.confidence(FieldId::Imsi), EXACT);

        let f = s.parse_sim_info(&table(&[("AT+CCID", &["+CCID: 8986031876023456789F", "OK"])]));
        assert_eq!(text(&f, FieldId::Iccid), Some("8986031876023456789"));
        assert_eq!(f.confidence(FieldId::Iccid), EXACT);

        let f = s.parse_sim_info(&table(&[("AT+CCID", &["+CCID: 898603187602", "OK"])]));
        assert_eq!(f.confidence(FieldId::Iccid), MALFORMED);
    }

    #[test]
    fn operator_falls_back_to_spn() {
        let t = table(&[("AT+CSPN?", &["+CSPN: \"giffgaff\",0", "OK"])]);
        let f = StandardsExtractor::new().parse_sim_info(&t);
        assert_eq!(text(&f, FieldId::Operator), Some("giffgaff"));
    }

    #[test]
    fn extract_all_collects_every_section() {
        let t = table(&[
            ("AT+CGMI", &["Quectel", "OK"]),
            ("AT+CPIN?", &["+CPIN: READY", "OK"]),
            ("AT+CPSMS?", &["+CPSMS: 0", "OK"]),
        ]);
        let out = StandardsExtractor::new().extract_all(&t);
        assert!(out.diagnostics.is_empty());
        assert_eq!(out.fields.len(), 3);
        assert_eq!(out.fields.confidence(FieldId::PsmSupported), INFERRED);
    }
}
