use chrono::{DateTime, Utc};
use rand::prelude::*;

/// Code alphabet with the visually ambiguous `0 O 1 I` left out.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub const DEFAULT_CODE_LENGTH: usize = 8;

/// Draws `length` characters from the code alphabet. Codes of 6+ characters
/// get a `-` at the midpoint for readability.
pub fn generate_random_code(length: usize) -> String {
    let mut rng = rand::rngs::StdRng::from_entropy();

    let mut code: String = (0..length)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect();

    if length >= 6 {
        code.insert(length / 2, '-');
    }

    code
}

/// Derives a per-customer code from a shared base code: the first 4 base
/// characters plus a 4-character suffix hashed from the identifier. The same
/// (base, identifier) pair always yields the same code; collisions between
/// identifiers are possible and acceptable, these are discount codes, not
/// credentials.
pub fn generate_unique_code(base_code: &str, identifier: &str) -> String {
    let clean_base: String = base_code.chars().filter(|c| *c != '-').collect();

    // 32-bit rolling hash, h = h * 31 + byte, with wrapping semantics.
    let mut hash: i32 = 0;
    for byte in identifier.bytes() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(byte as i32);
    }
    let positive = hash.unsigned_abs();

    let mut suffix = String::with_capacity(4);
    for i in 0..4 {
        let index = (positive >> (i * 5)) as usize % CODE_ALPHABET.len();
        suffix.push(CODE_ALPHABET[index] as char);
    }

    let prefix: String = clean_base.chars().take(4).collect();
    format!("{prefix}-{suffix}")
}

/// Uppercases and, for codes longer than 4 characters without a separator,
/// inserts the midpoint `-`.
pub fn format_promotion_code(code: &str) -> String {
    let upper = code.to_uppercase();
    if upper.contains('-') || upper.chars().count() <= 4 {
        return upper;
    }

    let chars: Vec<char> = upper.chars().collect();
    let middle = chars.len() / 2;
    let mut formatted: String = chars[..middle].iter().collect();
    formatted.push('-');
    formatted.extend(&chars[middle..]);
    formatted
}

/// A promotion with no expiry date never expires.
pub fn is_promotion_expired(expiry_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expiry_date.map_or(false, |expiry| expiry < now)
}
