//! Resolving signal names given on the command line.

use fst_common::Handle;
use fst_reader::{Reader, SignalInfo};

/// Maps each query to a declared signal. A query is either a full dotted name or a
/// handle number.
pub fn resolve(
    signals: &[SignalInfo],
    max_handle: u64,
    queries: &[String],
) -> Result<Vec<(String, Handle)>, Box<dyn std::error::Error>> {
    let mut resolved = Vec::with_capacity(queries.len());
    for query in queries {
        if let Some(found) = signals.iter().find(|s| s.name == *query) {
            resolved.push((found.name.clone(), found.handle));
            continue;
        }
        let handle = query
            .parse::<u32>()
            .ok()
            .filter(|&raw| raw >= 1 && u64::from(raw) <= max_handle)
            .map(Handle::from_raw)
            .ok_or_else(|| format!("no signal named '{query}'"))?;
        let name = signals
            .iter()
            .find(|s| s.handle == handle)
            .map_or_else(|| format!("#{handle}"), |s| s.name.clone());
        resolved.push((name, handle));
    }
    Ok(resolved)
}

/// Opens `file`, failing with the path in the message.
pub fn open(file: &str) -> Result<Reader, Box<dyn std::error::Error>> {
    Reader::open(file).map_err(|e| format!("{file}: {e}").into())
}
