//! Extraction pipeline entry points.
//!
//! `extract_features` runs standards extraction, vendor dispatch, fusion and
//! assembly for one inspection and always returns a complete snapshot.
//! `extract_batch` runs independent inspections on a bounded worker pool.

use std::collections::BTreeMap;
use std::thread;

use cellprobe_common::{Capture, PluginMetadata, ResponseTable};
use crossbeam_channel::bounded;
use serde_json::{Map, Value};

use crate::assembler;
use crate::fault;
use crate::field::FieldSet;
use crate::fusion;
use crate::model::{ModemFeatures, Sections};
use crate::standards::StandardsExtractor;
use crate::vendor::VendorRegistry;

/// One inspection's inputs, owned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inspection {
    pub responses: ResponseTable,
    pub plugin: PluginMetadata,
    pub pre_parsed: Option<Map<String, Value>>,
}

impl Inspection {
    pub fn new(responses: ResponseTable, plugin: PluginMetadata) -> Self {
        Self {
            responses,
            plugin,
            pre_parsed: None,
        }
    }

    pub fn with_pre_parsed(mut self, pre_parsed: Map<String, Value>) -> Self {
        self.pre_parsed = Some(pre_parsed);
        self
    }
}

impl From<Capture> for Inspection {
    fn from(capture: Capture) -> Self {
        Self {
            responses: capture.responses,
            plugin: capture.plugin,
            pre_parsed: capture.pre_parsed,
        }
    }
}

/// Standards extractor plus vendor registry. Immutable once built, so one
/// instance can serve concurrent inspections.
#[derive(Debug)]
pub struct FeatureExtractor {
    standards: StandardsExtractor,
    vendors: VendorRegistry,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureExtractor {
    /// Extractor with the built-in vendor registry.
    pub fn new() -> Self {
        Self::with_registry(VendorRegistry::with_builtin())
    }

    pub fn with_registry(vendors: VendorRegistry) -> Self {
        Self {
            standards: StandardsExtractor::new(),
            vendors,
        }
    }

    pub fn registry(&self) -> &VendorRegistry {
        &self.vendors
    }

    /// Build the feature snapshot of one inspection.
    ///
    /// Never fails: extractor faults, conflicts and unknown enumeration
    /// values end up in the snapshot's parsing errors, in stage order.
    pub fn extract_features(
        &self,
        responses: &ResponseTable,
        plugin: &PluginMetadata,
        pre_parsed: Option<&Map<String, Value>>,
    ) -> ModemFeatures {
        match fault::guard(|| self.run(responses, plugin, pre_parsed)) {
            Ok(features) => features,
            Err(panic) => {
                tracing::error!(panic = %panic, "feature pipeline fault");
                ModemFeatures::new(
                    Sections::default(),
                    BTreeMap::new(),
                    vec![format!("pipeline: fault: {panic}")],
                )
            }
        }
    }

    fn run(
        &self,
        responses: &ResponseTable,
        plugin: &PluginMetadata,
        pre_parsed: Option<&Map<String, Value>>,
    ) -> ModemFeatures {
        let standards = self.standards.extract_all(responses);
        let vendor = self.vendors.dispatch(responses, plugin, &standards.fields);
        let (pre_parsed, pre_parsed_diagnostics) = pre_parsed
            .map(FieldSet::from_flat_map)
            .unwrap_or_default();
        let fused = fusion::fuse(&standards.fields, &vendor.fields, &pre_parsed);
        let (sections, assembler_diagnostics) = assembler::assemble(&fused.fields);

        let mut diagnostics = standards.diagnostics;
        diagnostics.extend(vendor.diagnostics);
        diagnostics.extend(pre_parsed_diagnostics);
        diagnostics.extend(fused.diagnostics);
        diagnostics.extend(assembler_diagnostics);

        let features = ModemFeatures::new(
            sections,
            fused.fields.vendor_specific().clone(),
            diagnostics,
        );
        tracing::info!(
            commands = responses.len(),
            vendor = plugin.vendor.as_deref().unwrap_or("-"),
            fields = fused.fields.len(),
            parsing_errors = features.parsing_errors().len(),
            aggregate_confidence = features.aggregate_confidence(),
            "feature extraction complete"
        );
        features
    }

    /// Run every inspection on up to `workers` threads.
    ///
    /// Output order equals input order. `workers` of zero is treated as one.
    pub fn extract_batch(&self, inspections: &[Inspection], workers: usize) -> Vec<ModemFeatures> {
        let workers = workers.clamp(1, inspections.len().max(1));
        let (job_tx, job_rx) = bounded::<(usize, &Inspection)>(workers);
        let (result_tx, result_rx) = bounded::<(usize, ModemFeatures)>(inspections.len().max(1));

        thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    for (index, inspection) in job_rx {
                        let features = self.extract_features(
                            &inspection.responses,
                            &inspection.plugin,
                            inspection.pre_parsed.as_ref(),
                        );
                        if result_tx.send((index, features)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(job_rx);
            drop(result_tx);

            for job in inspections.iter().enumerate() {
                if job_tx.send(job).is_err() {
                    tracing::warn!("batch workers exited early");
                    break;
                }
            }
            drop(job_tx);
        });

        let mut results: Vec<Option<ModemFeatures>> = vec![None; inspections.len()];
        for (index, features) in result_rx.try_iter() {
            results[index] = Some(features);
        }
        tracing::debug!(inspections = inspections.len(), workers, "batch extraction complete");
        results.into_iter().map(Option::unwrap_or_default).collect()
    }
}

/// One-shot extraction with the built-in registry.
pub fn extract_features(
    responses: &ResponseTable,
    plugin: &PluginMetadata,
    pre_parsed: Option<&Map<String, Value>>,
) -> ModemFeatures {
    FeatureExtractor::new().extract_features(responses, plugin, pre_parsed)
}
