//! Canonical key normalization
//!
//! Every variable key that enters the system is funneled through
//! [`normalize_key`] exactly once, before deduplication. The canonical form
//! is lowercase snake_case: camelCase boundaries become underscores, any run
//! of characters outside `[a-z0-9]` becomes a single underscore, and
//! underscores never lead, trail, or double up.
//!
//! The function is total (no input panics) and idempotent: normalizing an
//! already-canonical key returns it unchanged. An empty result means the raw
//! key carried no usable characters; callers treat that as an extraction
//! error, not a valid key.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Strict descriptor-key invariant: leading letter, snake_case segments
    static ref CANONICAL_KEY: Regex =
        Regex::new(r"^[a-z][a-z0-9]*(_[a-z0-9]+)*$").expect("canonical key pattern");
}

/// Normalize an arbitrary raw key into the canonical snake_case convention.
///
/// `PolicyNumber`, `policy-number`, `Policy Number`, and `policy_number` all
/// normalize to `policy_number`.
pub fn normalize_key(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    let mut prev: Option<char> = None;

    for c in raw.chars() {
        // camelCase boundary: lower or digit followed by an uppercase letter
        if c.is_ascii_uppercase() {
            if let Some(p) = prev {
                if p.is_ascii_lowercase() || p.is_ascii_digit() {
                    pending_sep = true;
                }
            }
        }

        let lowered = c.to_ascii_lowercase();
        if lowered.is_ascii_lowercase() || lowered.is_ascii_digit() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(lowered);
        } else {
            pending_sep = true;
        }
        prev = Some(c);
    }

    out
}

/// Check the stricter `VariableDescriptor` key invariant: canonical
/// snake_case with a leading letter.
pub fn is_canonical_key(key: &str) -> bool {
    CANONICAL_KEY.is_match(key)
}
