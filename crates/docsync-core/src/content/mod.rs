//! Content normalization and hashing used for change detection and dedup.
//!
//! Hash equality is treated as an authoritative "nothing changed" signal by
//! both the agent (skip the round-trip) and the server (`unchanged` skip), so
//! the digest is a cryptographic one.

pub mod external_id;

pub use external_id::{build_external_id, normalize_path, EXTERNAL_ID_SEPARATOR};

/// Normalize raw document text so that edits without semantic content do not
/// change the hash.
///
/// - a leading UTF-8 BOM is removed
/// - CRLF and lone CR become LF
/// - trailing spaces and tabs are stripped from every line
/// - trailing blank lines are dropped
///
/// Leading indentation is kept: it is meaningful in markdown.
pub fn normalize(raw: &str) -> String {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines: Vec<&str> = unified
        .split('\n')
        .map(|line| line.trim_end_matches([' ', '\t']))
        .collect();
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

/// BLAKE3 digest of already-normalized text, 64 lowercase hex chars.
pub fn hash(normalized: &str) -> String {
    blake3::hash(normalized.as_bytes()).to_hex().to_string()
}

/// `hash(normalize(raw))`.
pub fn content_hash(raw: &str) -> String {
    hash(&normalize(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_endings_and_trailing_whitespace_do_not_change_hash() {
        let a = "# Title\n\nbody text\n";
        let b = "\u{feff}# Title  \r\n\r\nbody text\t\r\n\r\n\r\n";
        assert_eq!(normalize(a), normalize(b));
        assert_eq!(content_hash(a), content_hash(b));
    }

    #[test]
    fn indentation_is_semantic() {
        assert_ne!(content_hash("- a\n  - b"), content_hash("- a\n- b"));
    }

    #[test]
    fn hash_is_fixed_length_hex() {
        let h = hash("");
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(h, hash(""));
    }

    #[test]
    fn empty_and_whitespace_only_normalize_to_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \n\t\n"), "");
    }
}
