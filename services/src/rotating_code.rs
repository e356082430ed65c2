//! Stateless rotating check-in codes.
//!
//! A code is a pure function of the event secret and one unix second. The
//! display shows the code for "now"; a scanner's submission is accepted if it
//! matches any of the last `tolerance` seconds. Nothing is stored server-side.

use std::collections::HashSet;

pub const BASE62: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
pub const DEFAULT_LENGTH: usize = 10;

const SEED: u64 = 0x9E37_79B1_85EB_CA87;
const MULTIPLIER: u64 = 11_400_714_785_074_694_791;

fn avalanche(bytes: &[u8]) -> u64 {
    bytes.iter().fold(SEED, |mut v, &b| {
        v ^= u64::from(b);
        v = v.wrapping_mul(MULTIPLIER);
        v = v.rotate_left(31);
        v ^ (v >> 33)
    })
}

/// Base62 code of [`DEFAULT_LENGTH`] characters for `(secret, unix_seconds)`.
pub fn generate_code(secret: &str, unix_seconds: i64) -> String {
    generate_code_with(secret, unix_seconds, BASE62, DEFAULT_LENGTH)
}

/// Code for `(secret, unix_seconds)` in an arbitrary alphabet.
///
/// The hash is reduced modulo `|charset|^length` and written most-significant
/// digit first, left-padded with the alphabet's zero digit. An empty charset
/// yields an empty code.
pub fn generate_code_with(secret: &str, unix_seconds: i64, charset: &str, length: usize) -> String {
    let digits: Vec<char> = charset.chars().collect();
    if digits.is_empty() || length == 0 {
        return String::new();
    }

    let base = digits.len() as u128;
    let hashed = u128::from(avalanche(format!("{secret}:{unix_seconds}").as_bytes()));
    let mut value = match u32::try_from(length).ok().and_then(|n| base.checked_pow(n)) {
        Some(modulus) => hashed % modulus,
        None => hashed,
    };

    let mut out = vec![digits[0]; length];
    for slot in out.iter_mut().rev() {
        *slot = digits[(value % base) as usize];
        value /= base;
    }
    out.into_iter().collect()
}

/// Codes for the seconds `[now - tolerance + 1, now]`. Future seconds are
/// never included; a non-positive tolerance accepts nothing.
pub fn valid_codes(secret: &str, now: i64, tolerance_seconds: i64) -> HashSet<String> {
    if tolerance_seconds <= 0 {
        return HashSet::new();
    }
    (now - tolerance_seconds + 1..=now)
        .map(|t| generate_code(secret, t))
        .collect()
}

pub fn verify(candidate: &str, secret: &str, now: i64, tolerance_seconds: i64) -> bool {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return false;
    }
    valid_codes(secret, now, tolerance_seconds).contains(candidate)
}
