/// Hash and alias normalization
///
/// Every key this crate writes goes through [`canonical_key`]. Data written by
/// older tooling may still carry a `0x` prefix or upper-case digits, so the
/// resolver compares through [`hashes_equal`] instead of raw string equality.

/// Strip a single leading `0x` / `0X`
pub fn strip_hex_prefix(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

/// Canonical form of a hash: trimmed, no prefix, lower-case
pub fn canonical_key(value: &str) -> String {
    strip_hex_prefix(value.trim()).to_ascii_lowercase()
}

/// Two hash encodings are equal if they agree after prefix stripping and case folding
pub fn hashes_equal(a: &str, b: &str) -> bool {
    canonical_key(a) == canonical_key(b)
}

/// True when the value decodes as a non-empty hex string once canonicalized
pub fn is_hex_hash(value: &str) -> bool {
    let key = canonical_key(value);
    !key.is_empty() && hex::decode(&key).is_ok()
}

/// True if `value` can be used as a file stem in the uploads directory
pub fn is_safe_name(value: &str) -> bool {
    !value.is_empty()
        && value != "."
        && value != ".."
        && !value.contains(|c| matches!(c, '/' | '\\' | '\0'))
}

/// Probe keys for a lookup: exact, lower-cased, canonical (deduplicated, in order)
pub fn probe_keys(alias: &str) -> Vec<String> {
    let mut keys = Vec::with_capacity(3);
    for key in [alias.to_string(), alias.to_lowercase(), canonical_key(alias)] {
        if !key.is_empty() && !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}
