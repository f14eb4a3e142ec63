//! Capture documents.
//!
//! A capture is the JSON record of one inspection as produced by the command
//! executor: the plugin metadata that drove it, every response it collected,
//! and optionally the flat key/value output of the plugin's own parsers.
//!
//! ```json
//! {
//!   "plugin": { "vendor": "quectel", "model": "EC25" },
//!   "responses": {
//!     "AT+CGMI": { "lines": ["Quectel", "OK"], "status": "success", "elapsed_s": 0.12 }
//!   },
//!   "pre_parsed": { "lte_category": "Cat-4", "lte_category_confidence": 0.7 }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::CommonError;
use crate::plugin::PluginMetadata;
use crate::response::ResponseTable;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Capture {
    #[serde(default)]
    pub plugin: PluginMetadata,
    #[serde(default)]
    pub responses: ResponseTable,
    /// Flat field map from plugin-level parsers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_parsed: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Capture {
    pub fn from_json_str(input: &str) -> Result<Self, CommonError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, CommonError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::ResponseStatus;

    #[test]
    fn parse_minimal_capture() {
        let capture = Capture::from_json_str(
            r#"{
                "plugin": { "vendor": "quectel", "model": "EC25" },
                "responses": {
                    "AT+CGMI": { "lines": ["Quectel", "OK"], "status": "success", "elapsed_s": 0.12 },
                    "AT+CGMM": { "status": "timeout", "retry_count": 3 }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(capture.plugin.vendor_key().as_deref(), Some("quectel"));
        assert_eq!(capture.responses.len(), 2);
        assert_eq!(
            capture.responses.get("AT+CGMM").unwrap().status,
            ResponseStatus::Timeout
        );
        assert!(capture.pre_parsed.is_none());
    }

    #[test]
    fn empty_document_is_empty_capture() {
        let capture = Capture::from_json_str("{}").unwrap();
        assert!(capture.responses.is_empty());
        assert_eq!(capture.plugin, PluginMetadata::default());
    }

    #[test]
    fn rejects_bad_status() {
        let err = Capture::from_json_str(
            r#"{ "responses": { "AT": { "status": "maybe" } } }"#,
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("invalid capture document"));
    }

    #[test]
    fn rejects_unrepresentable_elapsed() {
        for elapsed in ["1e30", "-0.5"] {
            let json = format!(
                r#"{{ "responses": {{ "AT+CGMI": {{ "status": "success", "elapsed_s": {elapsed} }} }} }}"#
            );
            let err = Capture::from_json_str(&json).unwrap_err();
            assert!(err.to_string().contains("invalid elapsed time"), "{err}");
        }
    }

    #[test]
    fn pre_parsed_is_kept_verbatim() {
        let capture = Capture::from_json_str(
            r#"{ "pre_parsed": { "lte_category": "Cat-4", "rssi": 25 } }"#,
        )
        .unwrap();
        let pre = capture.pre_parsed.unwrap();
        assert_eq!(pre["lte_category"], "Cat-4");
        assert_eq!(pre["rssi"], 25);
    }
}
