//! # Band Catalog
//!
//! 3GPP E-UTRA and NR operating bands, keyed by band number and by the
//! nominal frequency the band is commonly advertised under ("LTE 1800").
//!
//! Modems rarely list their bands in a structured way outside vendor
//! commands. When a standard response only mentions a carrier frequency, the
//! catalog turns that mention into a band number; such guesses are scored at
//! the lowest tier by the caller.

use std::fmt;

// ─── Band Catalog ───────────────────────────────────────────────────────────

/// LTE/NR operating band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Band {
    /// 3GPP band number (e.g. 3, 20, 78).
    pub number: u16,
    /// Whether this is an NR (5G) band.
    pub nr: bool,
    /// Nominal frequency in MHz the band is marketed under.
    pub freq_mhz: u16,
    pub duplex: Duplex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Duplex {
    Fdd,
    Tdd,
}

impl fmt::Display for Duplex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Duplex::Fdd => write!(f, "FDD"),
            Duplex::Tdd => write!(f, "TDD"),
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tech = if self.nr { "n" } else { "B" };
        write!(
            f,
            "{}{} ({}MHz, {})",
            tech, self.number, self.freq_mhz, self.duplex
        )
    }
}

const fn lte(number: u16, freq_mhz: u16, duplex: Duplex) -> Band {
    Band {
        number,
        nr: false,
        freq_mhz,
        duplex,
    }
}

const fn nr(number: u16, freq_mhz: u16, duplex: Duplex) -> Band {
    Band {
        number,
        nr: true,
        freq_mhz,
        duplex,
    }
}

/// Bands in common deployment worldwide.
///
/// Where several bands share a nominal frequency the most widely deployed
/// one comes first, so frequency lookups resolve to it.
pub const BANDS: &[Band] = &[
    // ─── LTE FDD ───────────────────────────────────────────────────
    lte(1, 2100, Duplex::Fdd),
    lte(2, 1900, Duplex::Fdd),
    lte(3, 1800, Duplex::Fdd),
    lte(4, 1700, Duplex::Fdd),
    lte(5, 850, Duplex::Fdd),
    lte(7, 2600, Duplex::Fdd),
    lte(8, 900, Duplex::Fdd),
    lte(20, 800, Duplex::Fdd),
    lte(28, 700, Duplex::Fdd),
    lte(12, 700, Duplex::Fdd),
    lte(13, 750, Duplex::Fdd),
    lte(14, 750, Duplex::Fdd),
    lte(17, 700, Duplex::Fdd),
    lte(18, 850, Duplex::Fdd),
    lte(19, 850, Duplex::Fdd),
    lte(25, 1900, Duplex::Fdd),
    lte(26, 850, Duplex::Fdd),
    lte(32, 1500, Duplex::Fdd),
    lte(66, 1700, Duplex::Fdd),
    lte(71, 600, Duplex::Fdd),
    // ─── LTE TDD ───────────────────────────────────────────────────
    lte(38, 2600, Duplex::Tdd),
    lte(39, 1900, Duplex::Tdd),
    lte(40, 2300, Duplex::Tdd),
    lte(41, 2500, Duplex::Tdd),
    lte(42, 3500, Duplex::Tdd),
    lte(43, 3700, Duplex::Tdd),
    lte(48, 3600, Duplex::Tdd),
    // ─── NR ────────────────────────────────────────────────────────
    nr(1, 2100, Duplex::Fdd),
    nr(3, 1800, Duplex::Fdd),
    nr(5, 850, Duplex::Fdd),
    nr(7, 2600, Duplex::Fdd),
    nr(8, 900, Duplex::Fdd),
    nr(20, 800, Duplex::Fdd),
    nr(28, 700, Duplex::Fdd),
    nr(66, 1700, Duplex::Fdd),
    nr(71, 600, Duplex::Fdd),
    nr(38, 2600, Duplex::Tdd),
    nr(40, 2300, Duplex::Tdd),
    nr(41, 2500, Duplex::Tdd),
    nr(77, 3700, Duplex::Tdd),
    nr(78, 3500, Duplex::Tdd),
    nr(79, 4700, Duplex::Tdd),
    nr(257, 28000, Duplex::Tdd),
    nr(258, 26000, Duplex::Tdd),
    nr(260, 39000, Duplex::Tdd),
    nr(261, 28000, Duplex::Tdd),
];

/// Highest E-UTRA band number accepted from free text.
pub const MAX_LTE_BAND: u16 = 300;

/// Highest NR band number accepted from free text.
pub const MAX_NR_BAND: u16 = 512;

/// Look up a band by number.
pub fn find(number: u16, nr: bool) -> Option<&'static Band> {
    BANDS.iter().find(|b| b.number == number && b.nr == nr)
}

/// The LTE band most commonly advertised under `freq_mhz`.
pub fn lte_band_for_frequency(freq_mhz: u16) -> Option<&'static Band> {
    BANDS.iter().find(|b| !b.nr && b.freq_mhz == freq_mhz)
}

/// Whether `number` is a plausible band number for the technology.
pub fn is_valid(number: u16, nr: bool) -> bool {
    let max = if nr { MAX_NR_BAND } else { MAX_LTE_BAND };
    (1..=max).contains(&number)
}
