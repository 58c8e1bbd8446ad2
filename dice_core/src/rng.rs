use hmac::{Hmac, Mac};
use sha2::Sha512;

use crate::error::{DiceError, DiceResult};

// Provably-fair derivation:
// server_seed (key) + "client_seed-nonce" -> HMAC-SHA512 -> lowercase hex
// -> first 5-char window <= 999999 -> (value % 10000) / 100 in [0,100)

pub type HmacSha512 = Hmac<Sha512>;

pub const WINDOW_LEN: usize = 5;
pub const WINDOW_CEILING: u32 = 999_999;

/// Builds `client_seed || '-' || decimal(nonce)` in a fresh buffer.
pub fn hmac_message(client_seed: &[u8], nonce: u64) -> Vec<u8> {
    let nonce = nonce.to_string();
    let mut msg = Vec::with_capacity(client_seed.len() + 1 + nonce.len());
    msg.extend_from_slice(client_seed);
    msg.push(b'-');
    msg.extend_from_slice(nonce.as_bytes());
    msg
}

pub fn hmac_bytes(server_seed: &[u8], client_seed: &[u8], nonce: u64) -> [u8; 64] {
    let mut mac = HmacSha512::new_from_slice(server_seed).expect("HMAC takes keys of any length");
    mac.update(&hmac_message(client_seed, nonce));
    let res = mac.finalize().into_bytes();
    let mut out = [0u8; 64];
    out.copy_from_slice(&res);
    out
}

pub fn compute_hmac_hex(server_seed: &[u8], client_seed: &[u8], nonce: u64) -> String {
    hex::encode(hmac_bytes(server_seed, client_seed, nonce))
}

/// Scans non-overlapping 5-char windows and returns the first value at or
/// below [`WINDOW_CEILING`]. A trailing partial window is never read, and a
/// window that is not plain hex is skipped like an oversized one.
pub fn select_window(hmac_hex: &str) -> Option<u32> {
    hmac_hex
        .as_bytes()
        .chunks_exact(WINDOW_LEN)
        .filter(|w| w.iter().all(u8::is_ascii_hexdigit))
        .filter_map(|w| std::str::from_utf8(w).ok())
        .filter_map(|w| u32::from_str_radix(w, 16).ok())
        .find(|v| *v <= WINDOW_CEILING)
}

/// Integer modulo first, then a single conversion, so the result is exactly
/// hundredths/100 with no accumulated drift.
pub fn normalize(selected: u32) -> f64 {
    f64::from(selected % 10_000) / 100.0
}

pub fn outcome_from_hex(hmac_hex: &str, nonce: u64) -> DiceResult<f64> {
    select_window(hmac_hex)
        .map(normalize)
        .ok_or(DiceError::InvalidDerivation { nonce })
}

/// Pure outcome for a `(server_seed, client_seed, nonce)` triple.
pub fn compute_outcome(server_seed: &[u8], client_seed: &[u8], nonce: u64) -> DiceResult<f64> {
    outcome_from_hex(&compute_hmac_hex(server_seed, client_seed, nonce), nonce)
}
