//! Full-scan diff between what the source holds and what the local index
//! says the server holds.

use std::collections::HashSet;

use docsync_core::build_external_id;
use docsync_core::models::LocalIndexEntry;

use crate::source::ScannedFile;

/// Result of comparing a scan to the local index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanDiff {
    /// New, or modified since the last acknowledged sync.
    pub to_upsert: Vec<ScannedFile>,
    /// Indexed but no longer present in the scan.
    pub to_delete: Vec<LocalIndexEntry>,
    pub unchanged: usize,
}

/// `files` must already be scope-filtered. A file is upserted when it has
/// no index entry or its change token exceeds the indexed one.
pub fn compute_scan_diff(
    scope_id: &str,
    files: &[ScannedFile],
    index: &[LocalIndexEntry],
) -> ScanDiff {
    let by_id: std::collections::HashMap<&str, &LocalIndexEntry> = index
        .iter()
        .map(|entry| (entry.external_id.as_str(), entry))
        .collect();

    let mut diff = ScanDiff::default();
    let mut seen = HashSet::with_capacity(files.len());

    for file in files {
        let external_id = build_external_id(scope_id, &file.path);
        match by_id.get(external_id.as_str()) {
            Some(entry) if file.change_token <= entry.last_seen_change_token => {
                diff.unchanged += 1;
            }
            _ => diff.to_upsert.push(file.clone()),
        }
        seen.insert(external_id);
    }

    diff.to_delete = index
        .iter()
        .filter(|entry| !seen.contains(&entry.external_id))
        .cloned()
        .collect();
    diff
}
