use std::path::Path;

use serde::Serialize;

use crate::error::GlmError;

/// Serialize a report to a JSON string.
pub fn report_to_json<T: Serialize>(report: &T, pretty: bool) -> Result<String, GlmError> {
    let content = if pretty {
        serde_json::to_string_pretty(report)?
    } else {
        serde_json::to_string(report)?
    };
    Ok(content)
}

/// Write a report (fit summary or case study) to a JSON file.
pub fn write_report_json<T: Serialize>(
    report: &T,
    path: impl AsRef<Path>,
    pretty: bool,
) -> Result<(), GlmError> {
    std::fs::write(path.as_ref(), report_to_json(report, pretty)?)?;
    Ok(())
}
