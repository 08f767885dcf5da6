//! History export: an ordered JSON array of event records.
//!
//! Each record is `{sequence, kind, source, created_at, ...payload}`. The
//! export is for audit and debugging; nothing reads it back into a run.

use std::path::Path;

use crate::error::Result;
use crate::event::Event;

/// Render events as JSON records, in history order.
pub fn to_records(events: &[Event]) -> Result<Vec<serde_json::Value>> {
    events
        .iter()
        .map(|e| serde_json::to_value(e).map_err(Into::into))
        .collect()
}

/// Pretty-printed JSON array of records.
pub fn to_json_string(events: &[Event]) -> Result<String> {
    Ok(serde_json::to_string_pretty(&to_records(events)?)?)
}

/// Write the export to `path`, replacing any existing file.
pub fn write_json_file(path: &Path, events: &[Event]) -> Result<()> {
    let json = to_json_string(events)?;
    std::fs::write(path, json)?;
    tracing::debug!(path = %path.display(), events = events.len(), "Exported history");
    Ok(())
}
