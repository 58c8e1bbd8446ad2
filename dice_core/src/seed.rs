use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

use crate::error::{DiceError, DiceResult};

pub const SERVER_SEED_LEN: usize = 32;

pub type Commitment = [u8; 32];

/// SHA-256 over the raw server seed bytes. Published before play.
pub fn commit(server_seed: &[u8]) -> Commitment {
    Sha256::digest(server_seed).into()
}

pub fn commitment_hex(server_seed: &[u8]) -> String {
    hex::encode(commit(server_seed))
}

pub fn verify_commitment(server_seed: &[u8], commitment: &[u8]) -> bool {
    commit(server_seed).as_slice() == commitment
}

pub fn generate_server_seed<R: RngCore + CryptoRng>(rng: &mut R) -> DiceResult<Vec<u8>> {
    let mut seed = vec![0u8; SERVER_SEED_LEN];
    rng.try_fill_bytes(&mut seed)
        .map_err(|err| DiceError::RandomSourceUnavailable(err.to_string()))?;
    Ok(seed)
}
