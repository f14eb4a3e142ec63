//! Priority merge of the three field sources.
//!
//! Sources are layered lowest first: pre-parsed, then vendor, then
//! standards. A higher layer replaces the whole entry of a lower one, so a
//! value never keeps the confidence of the source it displaced. Replacing a
//! different value is recorded as a diagnostic naming the field and both
//! sources. The vendor-specific bag is a key-wise union in the same order.

use std::collections::BTreeMap;
use std::fmt;

use crate::field::{FieldId, FieldSet, StageOutput};

/// Where a fused value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Source {
    PreParsed,
    Vendor,
    Standards,
}

impl Source {
    pub fn label(self) -> &'static str {
        match self {
            Source::PreParsed => "pre-parsed",
            Source::Vendor => "vendor",
            Source::Standards => "standards",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Accumulator that remembers the source of every field it holds.
#[derive(Debug, Default)]
struct Fused {
    fields: FieldSet,
    origin: BTreeMap<FieldId, Source>,
    diagnostics: Vec<String>,
}

impl Fused {
    fn overlay(&mut self, layer: &FieldSet, source: Source) {
        for (id, entry) in layer.iter() {
            if let (Some(held), Some(&from)) = (self.fields.get(id), self.origin.get(&id)) {
                if held.value != entry.value {
                    tracing::warn!(
                        field = %id,
                        kept = %source,
                        replaced = %from,
                        winner = %entry.value,
                        loser = %held.value,
                        "fusion conflict"
                    );
                    self.diagnostics.push(format!(
                        "fusion: '{id}' from {source} ({}) overrides {from} ({})",
                        entry.value, held.value
                    ));
                }
            }
            self.fields.set(id, entry.clone());
            self.origin.insert(id, source);
        }
        self.fields.extend_vendor(layer.vendor_specific());
    }
}

/// Merge with priority standards > vendor > pre-parsed.
///
/// Equal values are not conflicts; the higher-priority entry still replaces
/// the lower one together with its confidence.
pub fn fuse(standards: &FieldSet, vendor: &FieldSet, pre_parsed: &FieldSet) -> StageOutput {
    let mut fused = Fused::default();
    fused.overlay(pre_parsed, Source::PreParsed);
    fused.overlay(vendor, Source::Vendor);
    fused.overlay(standards, Source::Standards);

    tracing::debug!(
        fields = fused.fields.len(),
        vendor_keys = fused.fields.vendor_specific().len(),
        conflicts = fused.diagnostics.len(),
        "fused field sources"
    );
    StageOutput::new(fused.fields, fused.diagnostics)
}
