//! JSON serialization for probe reports.

use crate::result::ProbeReport;

/// Serialize a ProbeReport to a compact JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (should not happen for ProbeReport).
pub fn to_json(report: &ProbeReport) -> Result<String, serde_json::Error> {
    serde_json::to_string(report)
}

/// Serialize a ProbeReport to a pretty-printed JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (should not happen for ProbeReport).
pub fn to_json_pretty(report: &ProbeReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}
