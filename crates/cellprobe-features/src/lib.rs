//! Modem feature extraction for cellprobe.
//!
//! This crate contains:
//! - **Standards extraction**: 3GPP TS 27.007 command parsing into canonical fields
//! - **Vendor extractors**: a name-keyed registry of proprietary command parsers
//! - **Fusion**: priority merge of standards, vendor and pre-parsed values
//! - **Assembly**: typed snapshot sections, confidence aggregation, diagnostics

pub mod assembler;
pub mod band;
pub mod category;
pub mod confidence;
pub mod error;
mod fault;
pub mod field;
pub mod fusion;
pub mod model;
pub mod pipeline;
pub mod rules;
pub mod standards;
pub mod vendor;

pub use error::{ExtractError, FeatureError};
pub use field::{Extracted, FieldId, FieldSet, FieldValue, Section, StageOutput};
pub use model::{ModemFeatures, NetworkTechnology, SimStatus};
pub use pipeline::{FeatureExtractor, Inspection, extract_features};
pub use standards::StandardsExtractor;
pub use vendor::{VendorExtractor, VendorRegistry};
