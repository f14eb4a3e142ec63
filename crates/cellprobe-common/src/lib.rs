//! Shared types for cellprobe.
//!
//! This crate contains:
//! - **Response records**: one AT command exchange and the per-inspection table of them
//! - **Plugin metadata**: vendor / model / category hints used for extractor routing
//! - **Capture files**: JSON documents bundling a response table with its metadata

pub mod capture;
pub mod error;
pub mod plugin;
pub mod response;

pub use capture::Capture;
pub use error::CommonError;
pub use plugin::PluginMetadata;
pub use response::{CommandResponse, ResponseStatus, ResponseTable};
