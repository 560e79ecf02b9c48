//! Stable, source-scoped document identifiers: `{scope_id}::{normalized_path}`.
//!
//! A rename produces a different id; renames are synced as delete(old) plus
//! upsert(new).

pub const EXTERNAL_ID_SEPARATOR: &str = "::";

/// Normalize a vault-relative path: `\` becomes `/`, empty and `.`
/// segments are removed (so leading `./`, leading `/`, and duplicate
/// slashes disappear).
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Build the external id for a path inside a source scope.
pub fn build_external_id(scope_id: &str, path: &str) -> String {
    format!("{scope_id}{EXTERNAL_ID_SEPARATOR}{}", normalize_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equivalent_paths_share_an_id() {
        let expected = "vault-1::notes/daily/2024-01-01.md";
        assert_eq!(build_external_id("vault-1", "notes/daily/2024-01-01.md"), expected);
        assert_eq!(build_external_id("vault-1", "./notes//daily/2024-01-01.md"), expected);
        assert_eq!(build_external_id("vault-1", "/notes/daily/2024-01-01.md"), expected);
        assert_eq!(build_external_id("vault-1", "notes\\daily\\2024-01-01.md"), expected);
    }

    #[test]
    fn scopes_partition_ids() {
        assert_ne!(build_external_id("a", "x.md"), build_external_id("b", "x.md"));
    }
}
