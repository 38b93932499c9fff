use sha1::{Digest, Sha1};

/// The length of a SHA-1 digest rendered as hex.
pub const HASH_HEX_LEN: usize = 40;

/// The length of the hash prefix sent to the range API (5 hex characters).
pub const PREFIX_LEN: usize = 5;

/// Hex lookup table, uppercase to match the range API and dataset format.
const HEX_CHARS: &[u8; 16] = b"0123456789ABCDEF";

/// Hashes the password with SHA-1 and returns the uppercase hex digest.
pub fn sha1_hex_upper(password: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(password.as_bytes());
    let hash: [u8; 20] = hasher.finalize().into();

    let mut out = String::with_capacity(HASH_HEX_LEN);
    for byte in hash {
        out.push(HEX_CHARS[(byte >> 4) as usize] as char);
        out.push(HEX_CHARS[(byte & 0x0f) as usize] as char);
    }
    out
}

/// Splits an uppercase hex digest into the range prefix (first 5 chars) and the
/// 35-character suffix that the range API returns per line.
#[inline]
pub fn split_range_key(hex_digest: &str) -> (&str, &str) {
    hex_digest.split_at(PREFIX_LEN)
}

/// Returns true if the input is exactly one uppercase or lowercase hex digest.
pub(crate) fn is_sha1_hex(candidate: &str) -> bool {
    candidate.len() == HASH_HEX_LEN && candidate.bytes().all(|b| b.is_ascii_hexdigit())
}
