//! Deterministic content identity
//!
//! Every record is keyed by a hash of its normalized text, so the same
//! content always maps to the same id across runs and machines. The id is
//! the leaf dependency of the whole system: consolidation, label merging,
//! batch selection, and reconciliation all key on it.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use unicode_normalization::UnicodeNormalization;

/// Stable content-derived record identifier (128-bit hex).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize text prior to hashing: NFC form, whitespace runs collapsed
/// to a single space, leading/trailing whitespace trimmed.
pub fn normalize(text: &str) -> String {
    let nfc: String = text.nfc().collect();
    let mut out = String::with_capacity(nfc.len());
    let mut in_whitespace = false;
    for ch in nfc.chars() {
        if ch.is_whitespace() {
            in_whitespace = true;
        } else {
            if in_whitespace && !out.is_empty() {
                out.push(' ');
            }
            in_whitespace = false;
            out.push(ch);
        }
    }
    out
}

/// Compute the stable content id for a text.
///
/// Pure function of the normalized text: equal normalized text yields an
/// equal id, always. The id is the first 128 bits of a SHA-256 digest over
/// the normalized UTF-8 bytes, hex-encoded.
pub fn identify(text: &str) -> RecordId {
    let normalized = normalize(text);
    let digest = Sha256::digest(normalized.as_bytes());
    let hex = digest[..16].iter().map(|b| format!("{b:02x}")).collect();
    RecordId(hex)
}
