//! LTE UE categories (3GPP TS 36.306) and the peak rates they imply.

use regex::Regex;

/// Capabilities implied by a UE category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UeCategory {
    /// Canonical label, e.g. `Cat-4`, `Cat-M1`.
    pub label: &'static str,
    /// Peak downlink rate in kbit/s.
    pub downlink_kbps: u32,
    /// Peak uplink rate in kbit/s.
    pub uplink_kbps: u32,
    pub carrier_aggregation: bool,
}

const fn cat(label: &'static str, dl_mbps: u32, ul_mbps: u32, ca: bool) -> UeCategory {
    UeCategory {
        label,
        downlink_kbps: dl_mbps * 1000,
        uplink_kbps: ul_mbps * 1000,
        carrier_aggregation: ca,
    }
}

pub const CATEGORIES: &[UeCategory] = &[
    cat("Cat-1", 10, 5, false),
    cat("Cat-2", 50, 25, false),
    cat("Cat-3", 100, 50, false),
    cat("Cat-4", 150, 50, false),
    cat("Cat-5", 300, 75, false),
    cat("Cat-6", 300, 50, true),
    cat("Cat-7", 300, 100, true),
    cat("Cat-8", 3000, 1500, true),
    cat("Cat-9", 450, 50, true),
    cat("Cat-10", 450, 100, true),
    cat("Cat-11", 600, 50, true),
    cat("Cat-12", 600, 100, true),
    cat("Cat-13", 390, 150, true),
    cat("Cat-15", 800, 225, true),
    cat("Cat-16", 1000, 105, true),
    cat("Cat-18", 1200, 211, true),
    cat("Cat-19", 1600, 211, true),
    cat("Cat-20", 2000, 316, true),
    cat("Cat-M1", 1, 1, false),
    UeCategory {
        label: "Cat-NB1",
        downlink_kbps: 26,
        uplink_kbps: 62,
        carrier_aggregation: false,
    },
    UeCategory {
        label: "Cat-NB2",
        downlink_kbps: 127,
        uplink_kbps: 159,
        carrier_aggregation: false,
    },
];

/// Parses category mentions such as `Cat4`, `CAT-M1`, `Category 6`, `cat nb1`.
#[derive(Debug, Clone)]
pub struct CategoryParser {
    pattern: Option<Regex>,
}

impl Default for CategoryParser {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryParser {
    pub fn new() -> Self {
        let pattern = Regex::new(r"(?i)\bCat(?:egory)?[-\s_.]*(M1|NB[12]|\d{1,2})\b")
            .map_err(|e| tracing::error!(error = %e, "invalid category pattern"))
            .ok();
        Self { pattern }
    }

    /// Canonical label of the first category mentioned in `text`.
    pub fn parse(&self, text: &str) -> Option<String> {
        let caps = self.pattern.as_ref()?.captures(text)?;
        let raw = caps.get(1)?.as_str();
        Some(normalize(raw))
    }
}

/// `4` → `Cat-4`, `m1` → `Cat-M1`, `nb1` → `Cat-NB1`.
pub fn normalize(raw: &str) -> String {
    let raw = raw.trim();
    match raw.parse::<u8>() {
        Ok(n) => format!("Cat-{n}"),
        Err(_) => format!("Cat-{}", raw.to_ascii_uppercase()),
    }
}

pub fn lookup(label: &str) -> Option<&'static UeCategory> {
    CATEGORIES.iter().find(|c| c.label.eq_ignore_ascii_case(label))
}

/// Human rate string: `150 Mbps`, `26 kbps`.
pub fn format_rate(kbps: u32) -> String {
    if kbps >= 1000 && kbps % 1000 == 0 {
        format!("{} Mbps", kbps / 1000)
    } else {
        format!("{kbps} kbps")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_spellings() {
        let p = CategoryParser::new();
        assert_eq!(p.parse("LTE Cat4 module").as_deref(), Some("Cat-4"));
        assert_eq!(p.parse("Category 6").as_deref(), Some("Cat-6"));
        assert_eq!(p.parse("CAT-M1/NB-IoT").as_deref(), Some("Cat-M1"));
        assert_eq!(p.parse("cat nb1").as_deref(), Some("Cat-NB1"));
        assert_eq!(p.parse("Catalog"), None);
        assert_eq!(p.parse("EC25"), None);
    }

    #[test]
    fn lookup_by_label() {
        let c = lookup("cat-4").unwrap();
        assert_eq!(format_rate(c.downlink_kbps), "150 Mbps");
        assert_eq!(format_rate(c.uplink_kbps), "50 Mbps");
        assert!(!c.carrier_aggregation);
        assert!(lookup("Cat-6").unwrap().carrier_aggregation);
        assert!(lookup("Cat-14").is_none());
    }

    #[test]
    fn narrowband_rates_in_kbps() {
        let c = lookup("Cat-NB1").unwrap();
        assert_eq!(format_rate(c.downlink_kbps), "26 kbps");
    }
}
