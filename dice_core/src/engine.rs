use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DiceError, DiceResult};
use crate::rng::{compute_hmac_hex, compute_outcome, outcome_from_hex};

/// One issued outcome together with the HMAC it was read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roll {
    pub nonce: u64,
    pub outcome: f64,
    pub hmac_hex: String,
}

/// Derive the full roll for a triple without touching any session state.
pub fn roll_at(server_seed: &[u8], client_seed: &[u8], nonce: u64) -> DiceResult<Roll> {
    let hmac_hex = compute_hmac_hex(server_seed, client_seed, nonce);
    let outcome = outcome_from_hex(&hmac_hex, nonce)?;
    Ok(Roll {
        nonce,
        outcome,
        hmac_hex,
    })
}

/// Verify that `claimed` is the outcome the revealed seeds produce at `nonce`.
///
/// Seeds are taken as given; an empty server seed is a setup error here, never
/// a cue to generate one.
pub fn verify_outcome(
    client_seed: &[u8],
    server_seed: &[u8],
    nonce: u64,
    claimed: f64,
) -> DiceResult<bool> {
    if client_seed.is_empty() {
        return Err(DiceError::BlankClientSeed);
    }
    if server_seed.is_empty() {
        return Err(DiceError::MissingServerSeed);
    }
    let outcome = compute_outcome(server_seed, client_seed, nonce)?;
    let verified = outcome == claimed;
    debug!(nonce, claimed, outcome, verified, "verified outcome");
    Ok(verified)
}

/// Like [`verify_outcome`], but also checks the published HMAC.
pub fn verify_roll(client_seed: &[u8], server_seed: &[u8], roll: &Roll) -> DiceResult<bool> {
    if client_seed.is_empty() {
        return Err(DiceError::BlankClientSeed);
    }
    if server_seed.is_empty() {
        return Err(DiceError::MissingServerSeed);
    }
    let expected = roll_at(server_seed, client_seed, roll.nonce)?;
    let verified = expected.outcome == roll.outcome && expected.hmac_hex == roll.hmac_hex;
    debug!(nonce = roll.nonce, verified, "verified roll");
    Ok(verified)
}
